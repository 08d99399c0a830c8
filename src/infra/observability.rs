//! Structured reporting of verification outcomes.

use tracing::{error, info, warn};

use crate::domain::{OutcomeReporter, VerificationOutcome, VerificationReason, VerificationRequest};

/// Emits one `tracing` event per terminal outcome, keyed by payment id and
/// transaction hash so operators can reconcile against the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl OutcomeReporter for TracingReporter {
    fn report(&self, request: &VerificationRequest, outcome: &VerificationOutcome) {
        let transaction_hash = outcome.transaction_hash.as_deref().unwrap_or("-");
        match outcome.reason {
            VerificationReason::Verified => info!(
                payment_id = %request.payment_id,
                payer_tx = %request.transaction_hash,
                transaction_hash = %transaction_hash,
                reason = %outcome.reason,
                "Payment verified on-chain"
            ),
            // the transaction may still land; flag for reconciliation
            VerificationReason::ConfirmationTimeout | VerificationReason::Cancelled => warn!(
                payment_id = %request.payment_id,
                payer_tx = %request.transaction_hash,
                transaction_hash = %transaction_hash,
                reason = %outcome.reason,
                "On-chain verification unresolved, reconcile out of band"
            ),
            VerificationReason::NotConfigured => warn!(
                payment_id = %request.payment_id,
                reason = %outcome.reason,
                "PAYMENT_CONTRACT_ID is not configured, skipping on-chain verification"
            ),
            _ => error!(
                payment_id = %request.payment_id,
                payer_tx = %request.transaction_hash,
                transaction_hash = %transaction_hash,
                reason = %outcome.reason,
                "On-chain verification rejected"
            ),
        }
    }
}
