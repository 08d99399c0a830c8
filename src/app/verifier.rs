//! On-chain payment verification.
//!
//! Drives one verification request through
//! `build -> simulate -> sign -> submit -> poll` and always ends in a
//! [`VerificationOutcome`]. Ledger faults never escape this module; each one
//! is folded into a reason code and reported once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, instrument, warn};

use crate::domain::strkey::{self, StrKeyKind};
use crate::domain::transaction::{
    DEFAULT_BASE_FEE, DEFAULT_TX_TIMEOUT, TESTNET_PASSPHRASE, verify_payment_call,
};
use crate::domain::{
    AppError, ConfigError, LedgerClient, LedgerError, OutcomeReporter, SubmissionStatus, Ticker,
    TransactionBuilder, TransactionSigner, TransactionStatus, VerificationOutcome,
    VerificationReason, VerificationRequest, to_ledger_units,
};
use crate::infra::{TokioTicker, TracingReporter};

/// Wait between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status polls before giving up on confirmation
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 10;

/// Upper bound on any single ledger round trip
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on waiting for another request to finish submitting
pub const DEFAULT_SUBMISSION_WAIT: Duration = Duration::from_secs(45);

/// Tuning for the verification workflow
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Verification contract (`C...`). `None` disables on-chain verification.
    pub contract_id: Option<String>,
    pub network_passphrase: String,
    pub base_fee: u32,
    pub tx_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub call_timeout: Duration,
    /// How long a request may queue behind in-flight submissions
    pub submission_wait: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            contract_id: None,
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            base_fee: DEFAULT_BASE_FEE,
            tx_timeout: DEFAULT_TX_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            submission_wait: DEFAULT_SUBMISSION_WAIT,
        }
    }
}

impl VerificationConfig {
    /// Load tuning knobs from `VERIFY_*` environment variables, keeping the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let contract_id = env::var("PAYMENT_CONTRACT_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let network_passphrase = env::var("SOROBAN_NETWORK_PASSPHRASE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.network_passphrase);

        let base_fee = env::var("VERIFY_BASE_FEE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.base_fee);

        let poll_interval = env::var("VERIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        let max_poll_attempts = env::var("VERIFY_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_poll_attempts);

        let call_timeout = env::var("VERIFY_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.call_timeout);

        let submission_wait = env::var("VERIFY_SUBMISSION_WAIT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.submission_wait);

        Self {
            contract_id,
            network_passphrase,
            base_fee,
            tx_timeout: defaults.tx_timeout,
            poll_interval,
            max_poll_attempts,
            call_timeout,
            submission_wait,
        }
    }

    #[must_use]
    pub fn with_contract_id(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }
}

/// Pipeline stage a fault was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Build,
    Submit,
}

impl Stage {
    fn reason(self, error: &AppError) -> VerificationReason {
        match (self, error) {
            // another submission consumed the sequence number first
            (_, AppError::Ledger(LedgerError::SequenceConflict(_))) => {
                VerificationReason::SubmitFailed
            }
            (Stage::Build, _) => VerificationReason::BuildFailed,
            (Stage::Submit, _) => VerificationReason::SubmitFailed,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Submit => "submit",
        }
    }
}

/// Verifies payments by invoking the verification contract from the
/// custodial account and waiting for the ledger to confirm it.
pub struct VerificationService {
    config: VerificationConfig,
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn TransactionSigner>,
    ticker: Arc<dyn Ticker>,
    reporter: Arc<dyn OutcomeReporter>,
    /// Held from account fetch through submit so concurrent requests never
    /// build on the same sequence number.
    submission_lock: Mutex<()>,
}

impl VerificationService {
    /// Production wiring: tokio timer and `tracing` reporter.
    pub fn new(
        config: VerificationConfig,
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, AppError> {
        Self::with_collaborators(
            config,
            ledger,
            signer,
            Arc::new(TokioTicker),
            Arc::new(TracingReporter),
        )
    }

    pub fn with_collaborators(
        mut config: VerificationConfig,
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn TransactionSigner>,
        ticker: Arc<dyn Ticker>,
        reporter: Arc<dyn OutcomeReporter>,
    ) -> Result<Self, AppError> {
        config.contract_id = config
            .contract_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        if let Some(ref contract_id) = config.contract_id {
            if !strkey::is_valid(StrKeyKind::Contract, contract_id) {
                return Err(ConfigError::InvalidValue {
                    key: "PAYMENT_CONTRACT_ID".to_string(),
                    message: "expected a C... contract address".to_string(),
                }
                .into());
            }
        }
        if config.network_passphrase.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SOROBAN_NETWORK_PASSPHRASE".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        if config.max_poll_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "VERIFY_MAX_POLL_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        info!(
            configured = config.contract_id.is_some(),
            signer = %signer.public_key(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            max_poll_attempts = config.max_poll_attempts,
            "Verification service initialized"
        );

        Ok(Self {
            config,
            ledger,
            signer,
            ticker,
            reporter,
            submission_lock: Mutex::new(()),
        })
    }

    /// Whether a verification contract is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.contract_id.is_some()
    }

    #[must_use]
    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Account id of the custodial signer
    #[must_use]
    pub fn signer_public_key(&self) -> String {
        self.signer.public_key()
    }

    /// Verify a payment on-chain. Never fails; every fault becomes a
    /// rejected outcome.
    pub async fn verify_payment_on_chain(
        &self,
        request: &VerificationRequest,
    ) -> VerificationOutcome {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.verify_payment_on_chain_with_cancel(request, cancel_rx)
            .await
    }

    /// Like [`Self::verify_payment_on_chain`], aborting with `cancelled` once
    /// the watch flag turns `true`. Cancellation is honoured before submission
    /// and while polling; a submitted transaction is never recalled.
    #[instrument(skip(self, request, cancel), fields(payment_id = %request.payment_id))]
    pub async fn verify_payment_on_chain_with_cancel(
        &self,
        request: &VerificationRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> VerificationOutcome {
        let outcome = self.run(request, &mut cancel).await;
        self.reporter.report(request, &outcome);
        outcome
    }

    async fn run(
        &self,
        request: &VerificationRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> VerificationOutcome {
        let Some(contract_id) = self.config.contract_id.as_deref() else {
            return VerificationOutcome::rejected(VerificationReason::NotConfigured, None);
        };

        let hash = match self.build_and_submit(contract_id, request, cancel).await {
            Ok(hash) => hash,
            Err(rejected) => return rejected,
        };

        self.poll_until_terminal(hash, cancel).await
    }

    /// Build, simulate, sign and submit. Returns the hash of the queued
    /// transaction.
    async fn build_and_submit(
        &self,
        contract_id: &str,
        request: &VerificationRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<String, VerificationOutcome> {
        let stroops = to_ledger_units(request.amount)
            .map_err(|e| self.reject(Stage::Build, e.into(), None))?;
        let operation = verify_payment_call(contract_id, request, stroops)
            .map_err(|e| self.reject(Stage::Build, e.into(), None))?;

        let _guard = self.acquire_submission_slot(cancel).await?;

        let source = self.signer.public_key();
        let account = self
            .bounded(self.ledger.fetch_account(&source), LedgerError::AccountLookup)
            .await
            .map_err(|e| self.reject(Stage::Build, e, None))?;

        let tx = TransactionBuilder::new(&account, &self.config.network_passphrase)
            .base_fee(self.config.base_fee)
            .timeout(self.config.tx_timeout)
            .add_operation(operation)
            .build()
            .map_err(|e| self.reject(Stage::Build, e.into(), None))?;

        let prepared = self
            .bounded(self.ledger.prepare_transaction(tx), LedgerError::Simulation)
            .await
            .map_err(|e| self.reject(Stage::Build, e, None))?;

        if *cancel.borrow() {
            debug!("Cancelled before submission");
            return Err(VerificationOutcome::rejected(
                VerificationReason::Cancelled,
                None,
            ));
        }

        let signed = self
            .signer
            .sign(prepared)
            .map_err(|e| self.reject(Stage::Submit, e, None))?;
        let local_hash = signed
            .hash()
            .map_err(|e| self.reject(Stage::Submit, e.into(), None))?;

        let result = self
            .bounded(
                self.ledger.submit_transaction(&signed),
                LedgerError::Submission,
            )
            .await
            .map_err(|e| self.reject(Stage::Submit, e, Some(local_hash.clone())))?;

        match result.status {
            SubmissionStatus::Queued => {
                let hash = if result.hash.is_empty() {
                    local_hash
                } else {
                    result.hash
                };
                debug!(transaction_hash = %hash, sequence = account.sequence + 1, "Transaction queued");
                Ok(hash)
            }
            SubmissionStatus::Error => {
                let hash = if result.hash.is_empty() {
                    local_hash
                } else {
                    result.hash
                };
                warn!(
                    transaction_hash = %hash,
                    detail = %result.error_detail.as_deref().unwrap_or("-"),
                    "Submission rejected by the network"
                );
                Err(VerificationOutcome::rejected(
                    VerificationReason::SubmitFailed,
                    Some(hash),
                ))
            }
        }
    }

    /// Wait for the submission lock, giving up after `submission_wait` or as
    /// soon as the request is cancelled.
    async fn acquire_submission_slot(
        &self,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<MutexGuard<'_, ()>, VerificationOutcome> {
        tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                debug!("Cancelled while waiting to submit");
                Err(VerificationOutcome::rejected(VerificationReason::Cancelled, None))
            }
            acquired = tokio::time::timeout(
                self.config.submission_wait,
                self.submission_lock.lock(),
            ) => acquired.map_err(|_| {
                let error = LedgerError::Submission(format!(
                    "submission slot not free within {}ms",
                    self.config.submission_wait.as_millis()
                ));
                self.reject(Stage::Submit, error.into(), None)
            }),
        }
    }

    /// Poll the transaction status until it is terminal, the attempt budget
    /// runs out, or the request is cancelled.
    async fn poll_until_terminal(
        &self,
        hash: String,
        cancel: &mut watch::Receiver<bool>,
    ) -> VerificationOutcome {
        for attempt in 1..=self.config.max_poll_attempts {
            if attempt > 1 {
                tokio::select! {
                    _ = self.ticker.sleep(self.config.poll_interval) => {}
                    _ = cancelled(cancel) => {
                        debug!(attempt, "Cancelled while polling");
                        return VerificationOutcome::rejected(VerificationReason::Cancelled, Some(hash));
                    }
                }
            }
            if *cancel.borrow() {
                return VerificationOutcome::rejected(VerificationReason::Cancelled, Some(hash));
            }

            match self
                .bounded(
                    self.ledger.get_transaction_status(&hash),
                    LedgerError::StatusQuery,
                )
                .await
            {
                Ok(poll) => match poll.status {
                    TransactionStatus::Success => return VerificationOutcome::verified(hash),
                    TransactionStatus::Failed => {
                        return VerificationOutcome::rejected(
                            VerificationReason::ChainExecutionFailed,
                            Some(hash),
                        );
                    }
                    TransactionStatus::NotFound => {
                        debug!(attempt, transaction_hash = %hash, "Transaction not yet visible");
                    }
                },
                // a failed poll still counts against the budget
                Err(e) => warn!(attempt, transaction_hash = %hash, error = %e, "Status poll failed"),
            }
        }

        VerificationOutcome::rejected(VerificationReason::ConfirmationTimeout, Some(hash))
    }

    /// Run a ledger call under `call_timeout`; expiry becomes the
    /// operation's own error kind.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AppError>>,
        kind: fn(String) -> LedgerError,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(kind(format!(
                "no response within {}ms",
                self.config.call_timeout.as_millis()
            ))
            .into()),
        }
    }

    fn reject(
        &self,
        stage: Stage,
        error: AppError,
        transaction_hash: Option<String>,
    ) -> VerificationOutcome {
        let reason = stage.reason(&error);
        warn!(stage = stage.as_str(), reason = %reason, error = %error, "Verification step failed");
        VerificationOutcome::rejected(reason, transaction_hash)
    }
}

/// Resolves once the flag is set. A dropped sender can no longer cancel, so
/// the future then stays pending.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
