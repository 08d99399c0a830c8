//! Domain layer containing core business types, traits, and error definitions.

pub mod amount;
pub mod error;
pub mod strkey;
pub mod traits;
pub mod transaction;
pub mod types;

pub use amount::{STROOPS_PER_UNIT, from_ledger_units, to_ledger_units};
pub use error::{AppError, ConfigError, LedgerError, StoreError, ValidationError};
pub use traits::{LedgerClient, OutcomeReporter, PaymentStore, Ticker, TransactionSigner};
pub use transaction::{
    PreparedTransaction, SignedTransaction, SorobanData, Transaction, TransactionBuilder,
};
pub use types::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, ErrorDetail,
    ErrorResponse, HealthResponse, HealthStatus, LedgerAccount, PageMeta, Payment, PaymentFilter,
    PaymentListQuery, PaymentPage, PaymentStatus, PollResult, SortDirection, SortKey,
    SubmissionResult, SubmissionStatus, TimelineEvent, TransactionStatus, VerificationOutcome,
    VerificationReason, VerificationRequest,
};
