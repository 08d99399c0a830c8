//! Application layer containing business logic and shared state.

pub mod payments;
pub mod state;
pub mod verifier;

pub use payments::PaymentService;
pub use state::AppState;
pub use verifier::{VerificationConfig, VerificationService};
