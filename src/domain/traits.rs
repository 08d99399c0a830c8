//! Domain traits defining contracts for external systems.

use std::time::Duration;

use async_trait::async_trait;

use super::error::AppError;
use super::transaction::{PreparedTransaction, SignedTransaction, Transaction};
use super::types::{
    CreatePaymentRequest, LedgerAccount, Payment, PaymentFilter, PaymentPage, PaymentStatus,
    PollResult, SubmissionResult, TimelineEvent, VerificationOutcome, VerificationRequest,
};

/// Ledger network RPC operations used by the verification workflow.
///
/// Each call is a single network round trip with no internal retrying;
/// retry and polling policy belongs to the caller.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Check ledger RPC connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Fetch the current state of an account.
    /// Fails with `AccountLookup` on transport or not-found conditions.
    async fn fetch_account(&self, public_key: &str) -> Result<LedgerAccount, AppError>;

    /// Simulate the transaction and attach its resource data.
    /// Fails with `Simulation` if the call would revert or cannot be estimated.
    async fn prepare_transaction(&self, tx: Transaction)
    -> Result<PreparedTransaction, AppError>;

    /// Submit a signed transaction.
    /// An explicit network rejection is `Ok` with an `Error` status;
    /// `Err(Submission)` means the transaction may never have been sent.
    async fn submit_transaction(&self, tx: &SignedTransaction)
    -> Result<SubmissionResult, AppError>;

    /// Query the status of a submitted transaction once.
    /// `NotFound` is a legitimate result; `Err(StatusQuery)` is a transport failure.
    async fn get_transaction_status(&self, hash: &str) -> Result<PollResult, AppError>;
}

/// Custodial signing key used to authorize verification transactions
pub trait TransactionSigner: Send + Sync {
    /// Account id (G-strkey) of the signing key
    fn public_key(&self) -> String;

    /// Sign a prepared transaction for the network it is bound to
    fn sign(&self, tx: PreparedTransaction) -> Result<SignedTransaction, AppError>;
}

/// Source of timed waits, replaceable by a virtual clock in tests
#[async_trait]
pub trait Ticker: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Receives the terminal outcome of every verification request
pub trait OutcomeReporter: Send + Sync {
    fn report(&self, request: &VerificationRequest, outcome: &VerificationOutcome);
}

/// Payment record store
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Check store availability
    async fn health_check(&self) -> Result<(), AppError>;

    /// Persist a new payment
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment, AppError>;

    /// Get a single payment by id
    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError>;

    /// List payments matching the filter, one page at a time (pages start at 1)
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: u32,
        limit: u32,
    ) -> Result<PaymentPage, AppError>;

    /// All payments matching the filter, sorted, for export
    async fn export_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError>;

    /// Update status and payer details and append a timeline event.
    ///
    /// The check and the write happen atomically. A payment that no longer
    /// accepts confirmation (verified, failed or expired) is left untouched
    /// and the call fails with `StoreError::InvalidState`.
    async fn record_verification(
        &self,
        id: &str,
        status: PaymentStatus,
        transaction_hash: Option<&str>,
        payer_address: Option<&str>,
        event: TimelineEvent,
    ) -> Result<Payment, AppError>;
}
