//! Application state management.

use std::sync::Arc;

use crate::domain::{LedgerClient, PaymentStore};

use super::payments::PaymentService;
use super::verifier::VerificationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PaymentService>,
    pub verifier: Arc<VerificationService>,
    pub store: Arc<dyn PaymentStore>,
    pub ledger: Arc<dyn LedgerClient>,
}

impl AppState {
    /// Create a new application state
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        ledger: Arc<dyn LedgerClient>,
        verifier: Arc<VerificationService>,
    ) -> Self {
        let service = Arc::new(PaymentService::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&verifier),
        ));
        Self {
            service,
            verifier,
            store,
            ledger,
        }
    }
}
