//! Domain types with validation support.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Input to a single on-chain verification. Built by the caller, never persisted here.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub payment_id: String,
    pub transaction_hash: String,
    pub payer_address: String,
    pub amount: f64,
}

impl VerificationRequest {
    #[must_use]
    pub fn new(
        payment_id: impl Into<String>,
        transaction_hash: impl Into<String>,
        payer_address: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            transaction_hash: transaction_hash.into(),
            payer_address: payer_address.into(),
            amount,
        }
    }
}

/// Source account state of the custodial signer, fetched fresh per submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Account id (G-strkey)
    pub account_id: String,
    /// Current sequence number; the next transaction uses `sequence + 1`
    pub sequence: i64,
}

impl LedgerAccount {
    #[must_use]
    pub fn new(account_id: impl Into<String>, sequence: i64) -> Self {
        Self {
            account_id: account_id.into(),
            sequence,
        }
    }
}

/// Status the network reports for a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Accepted for inclusion, hand off to polling
    Queued,
    /// Explicitly rejected by the network
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    pub hash: String,
    /// Network-provided detail for an `Error` status
    pub error_detail: Option<String>,
}

impl SubmissionResult {
    #[must_use]
    pub fn queued(hash: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Queued,
            hash: hash.into(),
            error_detail: None,
        }
    }

    #[must_use]
    pub fn error(hash: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Error,
            hash: hash.into(),
            error_detail: Some(detail.into()),
        }
    }
}

/// Result of one status poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Not yet indexed; transient
    NotFound,
    /// Applied successfully; terminal
    Success,
    /// Applied but the contract call failed; terminal
    Failed,
}

impl TransactionStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    pub status: TransactionStatus,
}

impl PollResult {
    #[must_use]
    pub fn new(status: TransactionStatus) -> Self {
        Self { status }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(TransactionStatus::NotFound)
    }

    #[must_use]
    pub fn success() -> Self {
        Self::new(TransactionStatus::Success)
    }

    #[must_use]
    pub fn failed() -> Self {
        Self::new(TransactionStatus::Failed)
    }
}

/// Terminal reason code of a verification attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    /// Contract call succeeded on-chain
    Verified,
    /// No contract id configured; nothing was sent
    NotConfigured,
    /// Amount, account lookup, build or simulation failed; nothing was sent
    BuildFailed,
    /// Signing or submission failed, or the network rejected the transaction
    SubmitFailed,
    /// Transaction landed but the contract call failed
    ChainExecutionFailed,
    /// Transaction was not found within the polling budget
    ConfirmationTimeout,
    /// Caller cancelled before a terminal status was observed
    Cancelled,
}

impl VerificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NotConfigured => "not_configured",
            Self::BuildFailed => "build_failed",
            Self::SubmitFailed => "submit_failed",
            Self::ChainExecutionFailed => "chain_execution_failed",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the payment may be verified again later.
    ///
    /// Only a successful verification and an on-chain contract failure are
    /// definitive about the payment itself.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Verified | Self::ChainExecutionFailed)
    }
}

impl std::str::FromStr for VerificationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(Self::Verified),
            "not_configured" => Ok(Self::NotConfigured),
            "build_failed" => Ok(Self::BuildFailed),
            "submit_failed" => Ok(Self::SubmitFailed),
            "chain_execution_failed" => Ok(Self::ChainExecutionFailed),
            "confirmation_timeout" => Ok(Self::ConfirmationTimeout),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid verification reason: {}", s)),
        }
    }
}

impl std::fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single result of a verification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub reason: VerificationReason,
    /// Hash of the verification transaction, once one was built
    pub transaction_hash: Option<String>,
}

impl VerificationOutcome {
    #[must_use]
    pub fn verified(transaction_hash: impl Into<String>) -> Self {
        Self {
            verified: true,
            reason: VerificationReason::Verified,
            transaction_hash: Some(transaction_hash.into()),
        }
    }

    #[must_use]
    pub fn rejected(reason: VerificationReason, transaction_hash: Option<String>) -> Self {
        Self {
            verified: false,
            reason,
            transaction_hash,
        }
    }
}

/// Lifecycle status of a payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, waiting for the customer to pay
    #[default]
    Pending,
    /// Payer reported a transaction, on-chain verification in progress or retryable
    PendingConfirmation,
    /// Confirmed by the verification contract
    Verified,
    /// Verification contract rejected the payment
    Failed,
    /// Not paid before expiration
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingConfirmation => "pending_confirmation",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    /// Whether an on-chain verification may be started from this status
    #[must_use]
    pub fn accepts_confirmation(&self) -> bool {
        matches!(self, Self::Pending | Self::PendingConfirmation)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "pending_confirmation" => Ok(Self::PendingConfirmation),
            "verified" => Ok(Self::Verified),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry in a payment's audit timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TimelineEvent {
    #[schema(example = "payment_created")]
    pub event: String,
    pub timestamp: DateTime<Utc>,
    /// Optional detail such as a verification reason code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TimelineEvent {
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            timestamp: Utc::now(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(event: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(event)
        }
    }
}

/// Lifetime of a new payment before it expires
pub const PAYMENT_TTL_SECS: i64 = 3600;

/// Merchant payment record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Payment {
    #[schema(example = "0191d6a4-5c1e-7a8b-9c2d-3e4f5a6b7c8d")]
    pub id: String,
    pub merchant_id: String,
    pub order_id: Option<String>,
    #[schema(example = 25.5)]
    pub amount: f64,
    #[schema(example = "USDC")]
    pub currency: String,
    pub customer_email: String,
    pub status: PaymentStatus,
    pub checkout_url: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    /// Ledger transaction reported by the payer
    pub transaction_hash: Option<String>,
    /// Payer ledger address (G-strkey)
    pub payer_address: Option<String>,
    pub timeline: Vec<TimelineEvent>,
    pub expiration: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[must_use]
    pub fn new(id: String, request: &CreatePaymentRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            merchant_id: request.merchant_id.clone(),
            order_id: request.order_id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            customer_email: request.customer_email.clone(),
            status: PaymentStatus::Pending,
            checkout_url: String::new(),
            metadata: request
                .metadata
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            transaction_hash: None,
            payer_address: None,
            timeline: vec![TimelineEvent::new("payment_created")],
            expiration: now + Duration::seconds(PAYMENT_TTL_SECS),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the verification input for this payment
    #[must_use]
    pub fn verification_request(&self, confirm: &ConfirmPaymentRequest) -> VerificationRequest {
        VerificationRequest::new(
            self.id.clone(),
            confirm.transaction_hash.clone(),
            confirm.payer_address.clone(),
            self.amount,
        )
    }
}

/// Request to create a payment
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "Merchant id is required"))]
    pub merchant_id: String,
    pub order_id: Option<String>,
    #[validate(range(min = 0.0000001, message = "Amount must be greater than 0"))]
    #[schema(example = 25.5)]
    pub amount: f64,
    #[validate(length(min = 1, max = 12, message = "Currency is required"))]
    #[schema(example = "USDC")]
    pub currency: String,
    #[validate(email(message = "Customer email must be valid"))]
    pub customer_email: String,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// Request to confirm a payment on-chain
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, message = "Transaction hash is required"))]
    pub transaction_hash: String,
    #[validate(length(min = 1, message = "Payer address is required"))]
    #[schema(example = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF")]
    pub payer_address: String,
}

/// Response of the confirm endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmPaymentResponse {
    pub payment: Payment,
    pub outcome: VerificationOutcome,
}

/// Column to sort payment listings by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Amount,
    Status,
    Currency,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Structured filter for payment listings and exports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub currency: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Matches id or order id substrings, or the customer email case-insensitively
    pub search: Option<String>,
    pub sort_by: SortKey,
    pub order: SortDirection,
}

impl PaymentFilter {
    /// Returns true if the payment satisfies every set criterion
    #[must_use]
    pub fn matches(&self, payment: &Payment) -> bool {
        if self.status.is_some_and(|s| s != payment.status) {
            return false;
        }
        if self
            .currency
            .as_ref()
            .is_some_and(|c| c != &payment.currency)
        {
            return false;
        }
        if self.date_from.is_some_and(|from| payment.created_at < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| payment.created_at > to) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = payment.id.contains(search.as_str())
                || payment
                    .order_id
                    .as_deref()
                    .is_some_and(|o| o.contains(search.as_str()))
                || payment.customer_email.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Order two payments according to `sort_by` and `order`
    #[must_use]
    pub fn compare(&self, a: &Payment, b: &Payment) -> std::cmp::Ordering {
        let ordering = match self.sort_by {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Amount => a.amount.total_cmp(&b.amount),
            SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            SortKey::Currency => a.currency.cmp(&b.currency),
        };
        match self.order {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Query string of the list and export endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListQuery {
    /// Page number, starting at 1 (default: 1)
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,
    /// Page size (1-100, default: 10)
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub status: Option<PaymentStatus>,
    pub currency: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort_by: Option<SortKey>,
    pub order: Option<SortDirection>,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

impl PaymentListQuery {
    #[must_use]
    pub fn filter(&self) -> PaymentFilter {
        PaymentFilter {
            status: self.status,
            currency: self.currency.clone().filter(|c| !c.is_empty()),
            date_from: self.date_from,
            date_to: self.date_to,
            search: self.search.clone().filter(|s| !s.is_empty()),
            sort_by: self.sort_by.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// One page of payments
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentPage {
    pub data: Vec<Payment>,
    pub meta: PageMeta,
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems unavailable
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Payment store health status
    pub store: HealthStatus,
    /// Ledger RPC health status
    pub ledger: HealthStatus,
    /// Whether a verification contract id is configured
    pub verification_configured: bool,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(store: HealthStatus, ledger: HealthStatus, verification_configured: bool) -> Self {
        // the store is critical, the ledger only degrades verification
        let status = match (&store, &ledger) {
            (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
            (HealthStatus::Healthy, HealthStatus::Healthy) if verification_configured => {
                HealthStatus::Healthy
            }
            _ => HealthStatus::Degraded,
        };
        Self {
            status,
            store,
            ledger,
            verification_configured,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error type identifier
    #[schema(example = "validation_error")]
    pub r#type: String,
    /// Human-readable error message
    #[schema(example = "Amount must be greater than 0")]
    pub message: String,
}
