//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::transaction::SorobanData;
use crate::domain::{
    AppError, CreatePaymentRequest, LedgerAccount, LedgerClient, LedgerError, OutcomeReporter,
    Payment, PaymentFilter, PaymentPage, PaymentStatus, PaymentStore, PollResult,
    PreparedTransaction, SignedTransaction, StoreError, SubmissionResult, Ticker, TimelineEvent,
    Transaction, TransactionStatus, VerificationOutcome, VerificationRequest,
};
use crate::infra::InMemoryPaymentStore;

/// Resource fee attached by the mock simulation
pub const MOCK_RESOURCE_FEE: u32 = 1_000;

/// Base64 `SorobanTransactionData` with an empty footprint and zero resources
pub const MOCK_TRANSACTION_DATA: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// Scripted response to a `submit_transaction` call
#[derive(Debug, Clone)]
pub enum SubmitScript {
    Queued,
    /// Rejected under the transaction's own hash
    Rejected(String),
    /// Rejected with the network reporting this hash
    RejectedWithHash(String, String),
    Fail(LedgerError),
}

/// Scriptable ledger client.
///
/// Each operation pops its next scripted result; once a script runs dry the
/// call succeeds (polls report `NotFound`). The account sequence advances on
/// every queued submission, like the real network.
pub struct MockLedgerClient {
    fetch_script: Mutex<VecDeque<Result<(), LedgerError>>>,
    prepare_script: Mutex<VecDeque<Result<(), LedgerError>>>,
    submit_script: Mutex<VecDeque<SubmitScript>>,
    poll_script: Mutex<VecDeque<Result<TransactionStatus, LedgerError>>>,
    submit_delay: Mutex<Option<Duration>>,
    sequence: AtomicI64,
    is_healthy: AtomicBool,
    panic_on_call: bool,
    fetch_calls: AtomicU32,
    prepare_calls: AtomicU32,
    submit_calls: AtomicU32,
    poll_calls: AtomicU32,
    submitted: Mutex<Vec<SignedTransaction>>,
}

impl MockLedgerClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fetch_script: Mutex::new(VecDeque::new()),
            prepare_script: Mutex::new(VecDeque::new()),
            submit_script: Mutex::new(VecDeque::new()),
            poll_script: Mutex::new(VecDeque::new()),
            submit_delay: Mutex::new(None),
            sequence: AtomicI64::new(100),
            is_healthy: AtomicBool::new(true),
            panic_on_call: false,
            fetch_calls: AtomicU32::new(0),
            prepare_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// A client that must never be called; any call panics
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            panic_on_call: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_sequence(self, sequence: i64) -> Self {
        self.sequence.store(sequence, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn with_fetch_script(self, script: Vec<Result<(), LedgerError>>) -> Self {
        self.fetch_script.lock().unwrap().extend(script);
        self
    }

    #[must_use]
    pub fn with_prepare_script(self, script: Vec<Result<(), LedgerError>>) -> Self {
        self.prepare_script.lock().unwrap().extend(script);
        self
    }

    #[must_use]
    pub fn with_submit_script(self, script: Vec<SubmitScript>) -> Self {
        self.submit_script.lock().unwrap().extend(script);
        self
    }

    #[must_use]
    pub fn with_poll_script(self, script: Vec<Result<TransactionStatus, LedgerError>>) -> Self {
        self.poll_script.lock().unwrap().extend(script);
        self
    }

    /// Make every submission take this long before answering
    #[must_use]
    pub fn with_submit_delay(self, delay: Duration) -> Self {
        *self.submit_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn prepare_calls(&self) -> u32 {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u32 {
        self.fetch_calls() + self.prepare_calls() + self.submit_calls() + self.poll_calls()
    }

    /// All transactions handed to `submit_transaction` (for testing)
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.submitted.lock().unwrap().clone()
    }

    fn guard(&self, operation: &str) {
        if self.panic_on_call {
            panic!("unexpected ledger call: {operation}");
        }
    }
}

impl Default for MockLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.guard("health_check");
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(LedgerError::Connection("Unhealthy".to_string()).into());
        }
        Ok(())
    }

    async fn fetch_account(&self, public_key: &str) -> Result<LedgerAccount, AppError> {
        self.guard("fetch_account");
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(Err(e)) = self.fetch_script.lock().unwrap().pop_front() {
            return Err(e.into());
        }
        Ok(LedgerAccount::new(
            public_key,
            self.sequence.load(Ordering::SeqCst),
        ))
    }

    async fn prepare_transaction(
        &self,
        tx: Transaction,
    ) -> Result<PreparedTransaction, AppError> {
        self.guard("prepare_transaction");
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(Err(e)) = self.prepare_script.lock().unwrap().pop_front() {
            return Err(e.into());
        }
        let prepared = PreparedTransaction::from_simulation(
            tx,
            SorobanData {
                transaction_data: MOCK_TRANSACTION_DATA.to_string(),
                resource_fee: MOCK_RESOURCE_FEE,
                auth: Vec::new(),
            },
        )?;
        Ok(prepared)
    }

    async fn submit_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<SubmissionResult, AppError> {
        self.guard("submit_transaction");
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let hash = tx.hash()?;
        let script = self
            .submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SubmitScript::Queued);
        match script {
            SubmitScript::Queued => {
                self.submitted.lock().unwrap().push(tx.clone());
                self.sequence.fetch_add(1, Ordering::SeqCst);
                Ok(SubmissionResult::queued(hash))
            }
            SubmitScript::Rejected(detail) => Ok(SubmissionResult::error(hash, detail)),
            SubmitScript::RejectedWithHash(network_hash, detail) => {
                Ok(SubmissionResult::error(network_hash, detail))
            }
            SubmitScript::Fail(e) => Err(e.into()),
        }
    }

    async fn get_transaction_status(&self, _hash: &str) -> Result<PollResult, AppError> {
        self.guard("get_transaction_status");
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        match self.poll_script.lock().unwrap().pop_front() {
            Some(Ok(status)) => Ok(PollResult::new(status)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(PollResult::not_found()),
        }
    }
}

/// Ticker that returns immediately and records every requested wait
#[derive(Debug, Default)]
pub struct VirtualTicker {
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualTicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    /// Total virtual time waited
    pub fn elapsed(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Ticker for VirtualTicker {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Reporter that keeps every outcome it receives
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(VerificationRequest, VerificationOutcome)>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(VerificationRequest, VerificationOutcome)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl OutcomeReporter for RecordingReporter {
    fn report(&self, request: &VerificationRequest, outcome: &VerificationOutcome) {
        self.reports
            .lock()
            .unwrap()
            .push((request.clone(), outcome.clone()));
    }
}

/// In-memory store whose health can be toggled
pub struct MockPaymentStore {
    inner: InMemoryPaymentStore,
    is_healthy: AtomicBool,
}

impl MockPaymentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InMemoryPaymentStore::new(),
            is_healthy: AtomicBool::new(true),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    fn check_healthy(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("Unhealthy".to_string()).into());
        }
        Ok(())
    }
}

impl Default for MockPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentStore for MockPaymentStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.check_healthy()
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment, AppError> {
        self.check_healthy()?;
        self.inner.create_payment(request).await
    }

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError> {
        self.check_healthy()?;
        self.inner.get_payment(id).await
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: u32,
        limit: u32,
    ) -> Result<PaymentPage, AppError> {
        self.check_healthy()?;
        self.inner.list_payments(filter, page, limit).await
    }

    async fn export_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        self.check_healthy()?;
        self.inner.export_payments(filter).await
    }

    async fn record_verification(
        &self,
        id: &str,
        status: PaymentStatus,
        transaction_hash: Option<&str>,
        payer_address: Option<&str>,
        event: TimelineEvent,
    ) -> Result<Payment, AppError> {
        self.check_healthy()?;
        self.inner
            .record_verification(id, status, transaction_hash, payer_address, event)
            .await
    }
}
