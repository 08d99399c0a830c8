//! Infrastructure layer implementations.

pub mod clock;
pub mod ledger;
pub mod observability;
pub mod store;

pub use clock::TokioTicker;
pub use ledger::{CustodialSigner, RpcClientConfig, RpcLedgerClient, signing_key_from_strkey};
pub use observability::TracingReporter;
pub use store::InMemoryPaymentStore;
