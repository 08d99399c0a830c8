//! JSON-RPC ledger client for the Soroban RPC gateway.
//!
//! Transport failures are mapped onto the error kind of the operation that
//! was running (`AccountLookup`, `Simulation`, `Submission`, `StatusQuery`),
//! so callers can tell which stage failed without parsing messages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument, warn};

use crate::domain::transaction::SorobanData;
use crate::domain::transaction::xdr::{Limits, ReadXdr, TransactionResult, TransactionResultCode};
use crate::domain::{
    AppError, LedgerAccount, LedgerClient, LedgerError, PollResult, PreparedTransaction,
    SignedTransaction, SubmissionResult, Transaction, TransactionStatus,
};

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// HTTP timeout of a single request
    pub timeout: Duration,
    /// Retries for idempotent reads (account lookup, simulation, health)
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Abstract provider for ledger RPC interactions to enable testing
#[async_trait]
pub trait LedgerRpcProvider: Send + Sync {
    /// Send a JSON-RPC request and return its `result`
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError>;
}

/// HTTP-based JSON-RPC provider
pub struct HttpLedgerRpcProvider {
    http_client: Client,
    rpc_url: String,
}

impl HttpLedgerRpcProvider {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Ledger(LedgerError::Connection(e.to_string())))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.to_string(),
        })
    }
}

#[async_trait]
impl LedgerRpcProvider for HttpLedgerRpcProvider {
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: method.to_string(),
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Ledger(LedgerError::Timeout(e.to_string()))
                } else {
                    AppError::Ledger(LedgerError::Connection(e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Ledger(LedgerError::Rpc(format!(
                "HTTP {}",
                status
            ))));
        }

        let rpc_response: JsonRpcResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AppError::Ledger(LedgerError::Rpc(e.to_string())))?;

        if let Some(error) = rpc_response.error {
            return Err(AppError::Ledger(LedgerError::Rpc(format!(
                "{}: {}",
                error.code, error.message
            ))));
        }

        rpc_response
            .result
            .ok_or_else(|| AppError::Ledger(LedgerError::Rpc("Empty response".to_string())))
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct HealthResult {
    status: String,
}

#[derive(Debug, Deserialize)]
struct AccountResult {
    id: String,
    /// Sequence numbers are 64-bit and sent as strings
    sequence: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResult {
    transaction_data: Option<String>,
    min_resource_fee: Option<String>,
    #[serde(default)]
    results: Vec<SimulateHostFunctionResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimulateHostFunctionResult {
    #[serde(default)]
    auth: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResult {
    status: String,
    hash: String,
    error_result_xdr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetTransactionResult {
    status: String,
}

/// Soroban RPC ledger client
pub struct RpcLedgerClient {
    provider: Box<dyn LedgerRpcProvider>,
    config: RpcClientConfig,
}

impl RpcLedgerClient {
    /// Create a new RPC ledger client with custom configuration
    pub fn new(rpc_url: &str, config: RpcClientConfig) -> Result<Self, AppError> {
        let provider = HttpLedgerRpcProvider::new(rpc_url, config.timeout)?;
        info!(rpc_url = %rpc_url, "Created ledger RPC client");
        Ok(Self {
            provider: Box::new(provider),
            config,
        })
    }

    /// Create a new RPC ledger client with default configuration
    pub fn with_defaults(rpc_url: &str) -> Result<Self, AppError> {
        Self::new(rpc_url, RpcClientConfig::default())
    }

    /// Create a new client with a specific provider (useful for testing)
    pub fn with_provider(provider: Box<dyn LedgerRpcProvider>, config: RpcClientConfig) -> Self {
        Self { provider, config }
    }

    /// Make a single RPC call
    async fn rpc_call<R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R, AppError> {
        let value = self.provider.send_request(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            AppError::Ledger(LedgerError::Rpc(format!("Deserialization error: {}", e)))
        })
    }

    /// Make an RPC call with retries. Only for idempotent reads.
    #[instrument(skip(self, params))]
    async fn rpc_call_with_retry<R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R, AppError> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay).await;
            }
            match self.rpc_call(method, params.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(attempt = attempt, error = ?e, method = %method, "RPC call failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            AppError::Ledger(LedgerError::Rpc("Unknown error".to_string()))
        }))
    }
}

/// Re-tag a lower-level failure with the error kind of the running operation.
fn reclassify(err: AppError, kind: fn(String) -> LedgerError) -> AppError {
    match err {
        AppError::Ledger(inner) => AppError::Ledger(kind(inner.to_string())),
        other => AppError::Ledger(kind(other.to_string())),
    }
}

/// Result code of a base64 `TransactionResult`, if it decodes.
fn result_code(error_result_xdr: &str) -> Option<TransactionResultCode> {
    TransactionResult::from_xdr_base64(error_result_xdr, Limits::none())
        .ok()
        .map(|result| result.result.discriminant())
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let health: HealthResult = self
            .rpc_call_with_retry("getHealth", serde_json::json!({}))
            .await?;
        if health.status != "healthy" {
            return Err(AppError::Ledger(LedgerError::Connection(format!(
                "RPC reports status {}",
                health.status
            ))));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_account(&self, public_key: &str) -> Result<LedgerAccount, AppError> {
        let account: AccountResult = self
            .rpc_call_with_retry("getAccount", serde_json::json!({ "address": public_key }))
            .await
            .map_err(|e| reclassify(e, LedgerError::AccountLookup))?;

        let sequence = account.sequence.parse::<i64>().map_err(|e| {
            AppError::Ledger(LedgerError::AccountLookup(format!(
                "invalid sequence number {:?}: {}",
                account.sequence, e
            )))
        })?;
        debug!(account = %account.id, sequence = sequence, "Fetched account");
        Ok(LedgerAccount::new(account.id, sequence))
    }

    #[instrument(skip(self, tx))]
    async fn prepare_transaction(
        &self,
        tx: Transaction,
    ) -> Result<PreparedTransaction, AppError> {
        let envelope = tx.to_envelope_base64()?;
        let result: SimulateResult = self
            .rpc_call_with_retry(
                "simulateTransaction",
                serde_json::json!({ "transaction": envelope }),
            )
            .await
            .map_err(|e| reclassify(e, LedgerError::Simulation))?;

        if let Some(error) = result.error {
            return Err(AppError::Ledger(LedgerError::Simulation(error)));
        }
        let transaction_data = result.transaction_data.ok_or_else(|| {
            AppError::Ledger(LedgerError::Simulation(
                "simulation returned no transaction data".to_string(),
            ))
        })?;
        let resource_fee = result
            .min_resource_fee
            .as_deref()
            .unwrap_or("0")
            .parse::<u32>()
            .map_err(|e| {
                AppError::Ledger(LedgerError::Simulation(format!(
                    "invalid resource fee: {}",
                    e
                )))
            })?;

        let auth = result
            .results
            .into_iter()
            .flat_map(|r| r.auth)
            .collect::<Vec<_>>();

        debug!(resource_fee = resource_fee, auth_entries = auth.len(), "Simulation succeeded");
        let prepared = PreparedTransaction::from_simulation(
            tx,
            SorobanData {
                transaction_data,
                resource_fee,
                auth,
            },
        )?;
        Ok(prepared)
    }

    #[instrument(skip(self, tx))]
    async fn submit_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<SubmissionResult, AppError> {
        let envelope = tx.to_envelope_base64()?;
        let result: SendResult = self
            .rpc_call(
                "sendTransaction",
                serde_json::json!({ "transaction": envelope }),
            )
            .await
            .map_err(|e| reclassify(e, LedgerError::Submission))?;

        match result.status.as_str() {
            "PENDING" | "DUPLICATE" => {
                info!(hash = %result.hash, status = %result.status, "Transaction queued");
                Ok(SubmissionResult::queued(result.hash))
            }
            other => {
                let code = result.error_result_xdr.as_deref().and_then(result_code);
                if code == Some(TransactionResultCode::TxBadSeq) {
                    warn!(hash = %result.hash, "Transaction rejected for a stale sequence number");
                    return Err(AppError::Ledger(LedgerError::SequenceConflict(format!(
                        "{} txBAD_SEQ for {}",
                        other, result.hash
                    ))));
                }
                let detail = match (code, result.error_result_xdr) {
                    (Some(code), _) => format!("{}: {:?}", other, code),
                    (None, Some(xdr)) => format!("{}: {}", other, xdr),
                    (None, None) => other.to_string(),
                };
                warn!(hash = %result.hash, detail = %detail, "Transaction rejected by network");
                Ok(SubmissionResult::error(result.hash, detail))
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_transaction_status(&self, hash: &str) -> Result<PollResult, AppError> {
        let result: GetTransactionResult = self
            .rpc_call("getTransaction", serde_json::json!({ "hash": hash }))
            .await
            .map_err(|e| reclassify(e, LedgerError::StatusQuery))?;

        let status = match result.status.as_str() {
            "NOT_FOUND" => TransactionStatus::NotFound,
            "SUCCESS" => TransactionStatus::Success,
            "FAILED" => TransactionStatus::Failed,
            other => {
                return Err(AppError::Ledger(LedgerError::StatusQuery(format!(
                    "unknown transaction status {}",
                    other
                ))));
            }
        };
        Ok(PollResult::new(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::xdr::{
        BytesM, InvokeContractArgs, OperationBody, Signature, SignatureHint,
        SorobanAuthorizationEntry, SorobanAuthorizedFunction, SorobanAuthorizedInvocation,
        SorobanCredentials, VecM, WriteXdr,
    };
    use crate::domain::transaction::{DecoratedSignature, contract_call, verify_payment_call};
    use crate::domain::{SubmissionStatus, TransactionBuilder, VerificationRequest};
    use crate::test_utils::MOCK_TRANSACTION_DATA;
    use std::sync::Mutex;

    const ACCOUNT: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
    const CONTRACT: &str = "CAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6N4O";

    #[derive(Clone)]
    enum MockErrorKind {
        Timeout(String),
        Connection(String),
        Rpc(String),
    }

    struct ConfigurableMockProvider {
        responses: Mutex<Vec<Result<serde_json::Value, MockErrorKind>>>,
        calls: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl ConfigurableMockProvider {
        fn with_responses(responses: Vec<Result<serde_json::Value, MockErrorKind>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerRpcProvider for ConfigurableMockProvider {
        async fn send_request(
            &self,
            method: &str,
            params: serde_json::Value,
        ) -> Result<serde_json::Value, AppError> {
            let idx = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((method.to_string(), params));
                calls.len() - 1
            };

            let responses = self.responses.lock().unwrap();
            match responses.get(idx) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(MockErrorKind::Timeout(msg))) => {
                    Err(AppError::Ledger(LedgerError::Timeout(msg.clone())))
                }
                Some(Err(MockErrorKind::Connection(msg))) => {
                    Err(AppError::Ledger(LedgerError::Connection(msg.clone())))
                }
                Some(Err(MockErrorKind::Rpc(msg))) => {
                    Err(AppError::Ledger(LedgerError::Rpc(msg.clone())))
                }
                None => Ok(serde_json::Value::Null),
            }
        }
    }

    /// Client sharing the mock so tests can inspect recorded calls
    struct SharedProvider(std::sync::Arc<ConfigurableMockProvider>);

    #[async_trait]
    impl LedgerRpcProvider for SharedProvider {
        async fn send_request(
            &self,
            method: &str,
            params: serde_json::Value,
        ) -> Result<serde_json::Value, AppError> {
            self.0.send_request(method, params).await
        }
    }

    fn client_with(
        responses: Vec<Result<serde_json::Value, MockErrorKind>>,
    ) -> (RpcLedgerClient, std::sync::Arc<ConfigurableMockProvider>) {
        let provider = std::sync::Arc::new(ConfigurableMockProvider::with_responses(responses));
        let config = RpcClientConfig {
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let client =
            RpcLedgerClient::with_provider(Box::new(SharedProvider(provider.clone())), config);
        (client, provider)
    }

    fn unsigned_tx() -> Transaction {
        let account = LedgerAccount::new(ACCOUNT, 1);
        let request = VerificationRequest::new("pay_1", "abc", ACCOUNT, 1.0);
        TransactionBuilder::new(&account, "Test SDF Network ; September 2015")
            .add_operation(verify_payment_call(CONTRACT, &request, 10_000_000).unwrap())
            .build()
            .unwrap()
    }

    fn signed_tx() -> SignedTransaction {
        SignedTransaction {
            transaction: unsigned_tx(),
            signatures: vec![DecoratedSignature {
                hint: SignatureHint([0; 4]),
                signature: Signature(BytesM::try_from(vec![0u8; 64]).unwrap()),
            }],
        }
    }

    #[test]
    fn test_rpc_client_config_default() {
        let config = RpcClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 2);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (client, provider) = client_with(vec![Ok(serde_json::json!({"status": "healthy"}))]);
        assert!(client.health_check().await.is_ok());
        assert_eq!(provider.calls.lock().unwrap()[0].0, "getHealth");
    }

    #[tokio::test]
    async fn test_health_check_unhealthy_status() {
        let (client, _) = client_with(vec![Ok(serde_json::json!({"status": "catching_up"}))]);
        assert!(matches!(
            client.health_check().await,
            Err(AppError::Ledger(LedgerError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_account() {
        let (client, provider) = client_with(vec![Ok(serde_json::json!({
            "id": ACCOUNT,
            "sequence": "8589934593"
        }))]);
        let account = client.fetch_account(ACCOUNT).await.unwrap();
        assert_eq!(account, LedgerAccount::new(ACCOUNT, 8_589_934_593));

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].0, "getAccount");
        assert_eq!(calls[0].1["address"], ACCOUNT);
    }

    #[tokio::test]
    async fn test_fetch_account_transport_error_maps_to_account_lookup() {
        let (client, _) = client_with(vec![Err(MockErrorKind::Connection(
            "connection refused".to_string(),
        ))]);
        match client.fetch_account(ACCOUNT).await {
            Err(AppError::Ledger(LedgerError::AccountLookup(msg))) => {
                assert!(msg.contains("connection refused"));
            }
            other => panic!("Expected AccountLookup, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_account_invalid_sequence() {
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "id": ACCOUNT,
            "sequence": "not-a-number"
        }))]);
        assert!(matches!(
            client.fetch_account(ACCOUNT).await,
            Err(AppError::Ledger(LedgerError::AccountLookup(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_account_rpc_error_is_never_a_sequence_conflict() {
        let (client, _) = client_with(vec![Err(MockErrorKind::Rpc(
            "-32602: invalid sequence parameter".to_string(),
        ))]);
        assert!(matches!(
            client.fetch_account(ACCOUNT).await,
            Err(AppError::Ledger(LedgerError::AccountLookup(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_account_retries_reads() {
        let provider = std::sync::Arc::new(ConfigurableMockProvider::with_responses(vec![
            Err(MockErrorKind::Timeout("slow".to_string())),
            Ok(serde_json::json!({"id": ACCOUNT, "sequence": "5"})),
        ]));
        let config = RpcClientConfig {
            max_retries: 1,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let client =
            RpcLedgerClient::with_provider(Box::new(SharedProvider(provider.clone())), config);

        let account = client.fetch_account(ACCOUNT).await.unwrap();
        assert_eq!(account.sequence, 5);
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_prepare_transaction_attaches_resource_data() {
        let (client, provider) = client_with(vec![Ok(serde_json::json!({
            "transactionData": MOCK_TRANSACTION_DATA,
            "minResourceFee": "31337",
            "latestLedger": 100
        }))]);
        let tx = unsigned_tx();
        let base_fee = tx.fee();

        let prepared = client.prepare_transaction(tx).await.unwrap();
        let prepared_tx = prepared.transaction();
        assert_eq!(prepared_tx.fee(), base_fee + 31_337);
        assert!(prepared_tx.soroban_data().is_some());

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].0, "simulateTransaction");
        assert!(calls[0].1["transaction"].is_string());
    }

    #[tokio::test]
    async fn test_prepare_transaction_attaches_auth_entries() {
        let tx = unsigned_tx();
        let call: InvokeContractArgs = contract_call(&tx.body.operations[0]).unwrap().clone();
        let entry = SorobanAuthorizationEntry {
            credentials: SorobanCredentials::SourceAccount,
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(call),
                sub_invocations: VecM::default(),
            },
        };
        let encoded = entry.to_xdr_base64(Limits::none()).unwrap();

        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "transactionData": MOCK_TRANSACTION_DATA,
            "minResourceFee": "100",
            "results": [{ "auth": [encoded], "xdr": "AAAAAQ==" }]
        }))]);
        let prepared = client.prepare_transaction(tx).await.unwrap();

        let OperationBody::InvokeHostFunction(invoke) =
            &prepared.transaction().body.operations[0].body
        else {
            panic!("expected a host function invocation");
        };
        assert_eq!(invoke.auth.to_vec(), vec![entry]);
    }

    #[tokio::test]
    async fn test_prepare_transaction_rejects_malformed_transaction_data() {
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "transactionData": "AAAAAQ==",
            "minResourceFee": "100"
        }))]);
        assert!(matches!(
            client.prepare_transaction(unsigned_tx()).await,
            Err(AppError::Ledger(LedgerError::Simulation(_)))
        ));
    }

    #[tokio::test]
    async fn test_prepare_transaction_simulation_error() {
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "error": "HostError: Error(Contract, #3)",
            "latestLedger": 100
        }))]);
        match client.prepare_transaction(unsigned_tx()).await {
            Err(AppError::Ledger(LedgerError::Simulation(msg))) => {
                assert!(msg.contains("HostError"));
            }
            other => panic!("Expected Simulation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prepare_transaction_transport_error() {
        let (client, _) = client_with(vec![Err(MockErrorKind::Rpc(
            "-32603: internal".to_string(),
        ))]);
        assert!(matches!(
            client.prepare_transaction(unsigned_tx()).await,
            Err(AppError::Ledger(LedgerError::Simulation(_)))
        ));
    }

    #[tokio::test]
    async fn test_submit_transaction_pending_is_queued() {
        let (client, provider) = client_with(vec![Ok(serde_json::json!({
            "status": "PENDING",
            "hash": "abc123",
            "latestLedger": 100
        }))]);
        let result = client.submit_transaction(&signed_tx()).await.unwrap();
        assert_eq!(result.status, SubmissionStatus::Queued);
        assert_eq!(result.hash, "abc123");
        assert_eq!(provider.calls.lock().unwrap()[0].0, "sendTransaction");
    }

    #[tokio::test]
    async fn test_submit_transaction_error_status_is_a_value() {
        // txINSUFFICIENT_FEE
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "status": "ERROR",
            "hash": "abc123",
            "errorResultXdr": "AAAAAAAAAGT////3AAAAAA=="
        }))]);
        let result = client.submit_transaction(&signed_tx()).await.unwrap();
        assert_eq!(result.status, SubmissionStatus::Error);
        assert_eq!(result.hash, "abc123");
        assert_eq!(result.error_detail.unwrap(), "ERROR: TxInsufficientFee");
    }

    #[tokio::test]
    async fn test_submit_transaction_bad_seq_result_is_sequence_conflict() {
        // txBAD_SEQ
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "status": "ERROR",
            "hash": "abc123",
            "errorResultXdr": "AAAAAAAAAGT////7AAAAAA=="
        }))]);
        assert!(matches!(
            client.submit_transaction(&signed_tx()).await,
            Err(AppError::Ledger(LedgerError::SequenceConflict(_)))
        ));
    }

    #[tokio::test]
    async fn test_submit_transaction_undecodable_result_keeps_raw_detail() {
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "status": "ERROR",
            "hash": "abc123",
            "errorResultXdr": "not-xdr"
        }))]);
        let result = client.submit_transaction(&signed_tx()).await.unwrap();
        assert_eq!(result.error_detail.unwrap(), "ERROR: not-xdr");
    }

    #[tokio::test]
    async fn test_submit_transaction_try_again_later_is_error() {
        let (client, _) = client_with(vec![Ok(serde_json::json!({
            "status": "TRY_AGAIN_LATER",
            "hash": "abc123"
        }))]);
        let result = client.submit_transaction(&signed_tx()).await.unwrap();
        assert_eq!(result.status, SubmissionStatus::Error);
    }

    #[tokio::test]
    async fn test_submit_transaction_transport_error() {
        let (client, provider) = client_with(vec![Err(MockErrorKind::Timeout(
            "timed out".to_string(),
        ))]);
        assert!(matches!(
            client.submit_transaction(&signed_tx()).await,
            Err(AppError::Ledger(LedgerError::Submission(_)))
        ));
        // submissions are never retried
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_transaction_status_mapping() {
        let (client, _) = client_with(vec![
            Ok(serde_json::json!({"status": "NOT_FOUND"})),
            Ok(serde_json::json!({"status": "SUCCESS", "ledger": 1234})),
            Ok(serde_json::json!({"status": "FAILED"})),
            Ok(serde_json::json!({"status": "SOMETHING_ELSE"})),
        ]);
        assert_eq!(
            client.get_transaction_status("h").await.unwrap(),
            PollResult::not_found()
        );
        assert_eq!(
            client.get_transaction_status("h").await.unwrap(),
            PollResult::success()
        );
        assert_eq!(
            client.get_transaction_status("h").await.unwrap(),
            PollResult::failed()
        );
        assert!(matches!(
            client.get_transaction_status("h").await,
            Err(AppError::Ledger(LedgerError::StatusQuery(_)))
        ));
    }

    #[tokio::test]
    async fn test_get_transaction_status_transport_error_is_not_retried() {
        let (client, provider) = client_with(vec![Err(MockErrorKind::Connection(
            "reset".to_string(),
        ))]);
        assert!(matches!(
            client.get_transaction_status("h").await,
            Err(AppError::Ledger(LedgerError::StatusQuery(_)))
        ));
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_json_rpc_response_with_error() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"invalid request"}}"#;
        let response: JsonRpcResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -32600);
        assert_eq!(error.message, "invalid request");
    }

    #[test]
    fn test_http_provider_creation() {
        let provider =
            HttpLedgerRpcProvider::new("https://soroban-testnet.stellar.org", Duration::from_secs(5));
        assert!(provider.is_ok());
    }
}
