//! Payment lifecycle: creation, listing, export and on-chain confirmation.

use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::{
    AppError, ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, HealthResponse,
    HealthStatus, LedgerClient, Payment, PaymentFilter, PaymentListQuery, PaymentPage,
    PaymentStatus, PaymentStore, StoreError, TimelineEvent, ValidationError, VerificationOutcome,
    VerificationReason,
};

use super::verifier::VerificationService;

/// Column header of the CSV export
pub const CSV_HEADER: &str = "ID,OrderID,Amount,Currency,Status,Email,Date";

/// Application service for merchant payments
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    ledger: Arc<dyn LedgerClient>,
    verifier: Arc<VerificationService>,
    /// Payments with a confirmation in flight
    confirming: DashSet<String>,
}

/// Exclusive right to confirm one payment, released on drop
struct ConfirmationClaim<'a> {
    confirming: &'a DashSet<String>,
    id: String,
}

impl Drop for ConfirmationClaim<'_> {
    fn drop(&mut self) {
        self.confirming.remove(&self.id);
    }
}

impl PaymentService {
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        ledger: Arc<dyn LedgerClient>,
        verifier: Arc<VerificationService>,
    ) -> Self {
        Self {
            store,
            ledger,
            verifier,
            confirming: DashSet::new(),
        }
    }

    fn claim_confirmation(&self, id: &str) -> Result<ConfirmationClaim<'_>, AppError> {
        if !self.confirming.insert(id.to_string()) {
            return Err(StoreError::InvalidState(format!(
                "Payment {id} already has a confirmation in progress"
            ))
            .into());
        }
        Ok(ConfirmationClaim {
            confirming: &self.confirming,
            id: id.to_string(),
        })
    }

    #[instrument(skip(self, request), fields(merchant_id = %request.merchant_id))]
    pub async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, AppError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        let payment = self.store.create_payment(request).await?;
        info!(id = %payment.id, amount = payment.amount, currency = %payment.currency, "Payment created");
        Ok(payment)
    }

    pub async fn get_payment(&self, id: &str) -> Result<Payment, AppError> {
        self.store
            .get_payment(id)
            .await?
            .ok_or_else(|| AppError::Store(StoreError::NotFound(format!("Payment {id}"))))
    }

    pub async fn list_payments(&self, query: &PaymentListQuery) -> Result<PaymentPage, AppError> {
        query
            .validate()
            .map_err(|e| AppError::Validation(ValidationError::Multiple(e.to_string())))?;
        self.store
            .list_payments(&query.filter(), query.page(), query.limit())
            .await
    }

    /// Render every payment matching the filter as CSV
    pub async fn export_csv(&self, filter: &PaymentFilter) -> Result<String, AppError> {
        let payments = self.store.export_payments(filter).await?;

        let mut csv = String::with_capacity(64 * (payments.len() + 1));
        csv.push_str(CSV_HEADER);
        for p in &payments {
            csv.push('\n');
            let _ = write!(
                csv,
                "{},{},{},{},{},{},{}",
                csv_field(&p.id),
                csv_field(p.order_id.as_deref().unwrap_or("")),
                p.amount,
                csv_field(&p.currency),
                p.status,
                csv_field(&p.customer_email),
                p.created_at.to_rfc3339(),
            );
        }
        info!(rows = payments.len(), "Payments exported");
        Ok(csv)
    }

    /// Confirm a payment against the ledger.
    ///
    /// The payment moves to `pending_confirmation` first. A verified outcome
    /// settles it, a failed on-chain execution fails it, and anything else
    /// leaves it awaiting confirmation so the caller can retry. Only one
    /// confirmation per payment runs at a time; a concurrent one is refused
    /// with `InvalidState`.
    #[instrument(skip(self, request), fields(payment_id = %id))]
    pub async fn confirm_payment(
        &self,
        id: &str,
        request: &ConfirmPaymentRequest,
    ) -> Result<ConfirmPaymentResponse, AppError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        let _claim = self.claim_confirmation(id)?;
        let payment = self.get_payment(id).await?;
        if !payment.status.accepts_confirmation() {
            return Err(StoreError::InvalidState(format!(
                "Payment {id} is {} and cannot be confirmed",
                payment.status
            ))
            .into());
        }

        self.store
            .record_verification(
                id,
                PaymentStatus::PendingConfirmation,
                Some(&request.transaction_hash),
                Some(&request.payer_address),
                TimelineEvent::with_detail("confirmation_received", &request.transaction_hash),
            )
            .await?;

        let outcome = self
            .verifier
            .verify_payment_on_chain(&payment.verification_request(request))
            .await;

        let (status, event) = settle(&outcome);
        let payment = self
            .store
            .record_verification(id, status, None, None, event)
            .await?;

        Ok(ConfirmPaymentResponse { payment, outcome })
    }

    pub async fn health_check(&self) -> HealthResponse {
        let store_health = match self.store.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        let ledger_health = match self.ledger.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        HealthResponse::new(store_health, ledger_health, self.verifier.is_configured())
    }
}

/// Payment status and timeline entry for a verification outcome
fn settle(outcome: &VerificationOutcome) -> (PaymentStatus, TimelineEvent) {
    let detail = outcome
        .transaction_hash
        .clone()
        .unwrap_or_else(|| outcome.reason.to_string());
    match outcome.reason {
        VerificationReason::Verified => (
            PaymentStatus::Verified,
            TimelineEvent::with_detail("payment_verified", detail),
        ),
        VerificationReason::ChainExecutionFailed => (
            PaymentStatus::Failed,
            TimelineEvent::with_detail("payment_failed", detail),
        ),
        reason => (
            PaymentStatus::PendingConfirmation,
            TimelineEvent::with_detail("verification_rejected", reason.as_str()),
        ),
    }
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\"")).into()
    } else {
        value.into()
    }
}
