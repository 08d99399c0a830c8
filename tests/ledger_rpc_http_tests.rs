//! HTTP-based integration tests for the Soroban JSON-RPC ledger client.
//!
//! Uses `wiremock` to stand in for the RPC gateway and checks request
//! routing, response parsing and error classification.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method},
};

use soroban_payment_verifier::app::{VerificationConfig, VerificationService};
use soroban_payment_verifier::domain::transaction::xdr::{Limits, ReadXdr, TransactionEnvelope};
use soroban_payment_verifier::domain::transaction::{SorobanData, verify_payment_call};
use soroban_payment_verifier::domain::{
    AppError, LedgerAccount, LedgerClient, LedgerError, PreparedTransaction, SignedTransaction,
    SubmissionStatus, TransactionBuilder, TransactionSigner, TransactionStatus,
    VerificationReason, VerificationRequest,
};
use soroban_payment_verifier::infra::{CustodialSigner, RpcClientConfig, RpcLedgerClient};
use soroban_payment_verifier::test_utils::{
    MOCK_TRANSACTION_DATA, RecordingReporter, VirtualTicker,
};

const CONTRACT: &str = "CAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6N4O";
const PAYER: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
const TESTNET: &str = "Test SDF Network ; September 2015";

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    }))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

async fn mount(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(response)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> RpcLedgerClient {
    RpcLedgerClient::new(
        &server.uri(),
        RpcClientConfig {
            timeout: Duration::from_secs(5),
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        },
    )
    .unwrap()
}

fn signed_transaction(signer: &CustodialSigner) -> SignedTransaction {
    let account = LedgerAccount::new(signer.public_key(), 10);
    let request = VerificationRequest::new("pay_1", "payer_tx", PAYER, 1.0);
    let op = verify_payment_call(CONTRACT, &request, 10_000_000).unwrap();
    let tx = TransactionBuilder::new(&account, TESTNET)
        .add_operation(op)
        .build()
        .unwrap();
    let prepared = PreparedTransaction::from_simulation(
        tx,
        SorobanData {
            transaction_data: MOCK_TRANSACTION_DATA.to_string(),
            resource_fee: 500,
            auth: Vec::new(),
        },
    )
    .unwrap();
    signer.sign(prepared).unwrap()
}

#[tokio::test]
async fn test_health_check_healthy() {
    let server = MockServer::start().await;
    mount(&server, "getHealth", rpc_result(json!({ "status": "healthy" }))).await;

    assert!(client(&server).health_check().await.is_ok());
}

#[tokio::test]
async fn test_fetch_account_parses_string_sequence() {
    let server = MockServer::start().await;
    mount(
        &server,
        "getAccount",
        rpc_result(json!({ "id": PAYER, "sequence": "4294967296000" })),
    )
    .await;

    let account = client(&server).fetch_account(PAYER).await.unwrap();
    assert_eq!(account.account_id, PAYER);
    assert_eq!(account.sequence, 4_294_967_296_000);
}

#[tokio::test]
async fn test_fetch_account_not_found_is_account_lookup() {
    let server = MockServer::start().await;
    mount(&server, "getAccount", rpc_error(-32600, "Account not found")).await;

    let result = client(&server).fetch_account(PAYER).await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::AccountLookup(_)))
    ));
}

#[tokio::test]
async fn test_fetch_account_retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAccount" })))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(
        &server,
        "getAccount",
        rpc_result(json!({ "id": PAYER, "sequence": "7" })),
    )
    .await;

    let client = RpcLedgerClient::new(
        &server.uri(),
        RpcClientConfig {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
        },
    )
    .unwrap();
    let account = client.fetch_account(PAYER).await.unwrap();
    assert_eq!(account.sequence, 7);
}

#[tokio::test]
async fn test_rpc_error_mentioning_sequence_is_account_lookup() {
    let server = MockServer::start().await;
    mount(
        &server,
        "getAccount",
        rpc_error(-32602, "invalid sequence parameter"),
    )
    .await;

    let result = client(&server).fetch_account(PAYER).await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::AccountLookup(_)))
    ));
}

#[tokio::test]
async fn test_simulation_error_is_simulation_failure() {
    let server = MockServer::start().await;
    mount(
        &server,
        "simulateTransaction",
        rpc_result(json!({ "error": "HostError: contract call reverted" })),
    )
    .await;

    let signer = CustodialSigner::ephemeral();
    let tx = signed_transaction(&signer).transaction;
    let result = client(&server).prepare_transaction(tx).await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::Simulation(_)))
    ));
}

#[tokio::test]
async fn test_simulation_attaches_resource_fee() {
    let server = MockServer::start().await;
    mount(
        &server,
        "simulateTransaction",
        rpc_result(json!({ "transactionData": MOCK_TRANSACTION_DATA, "minResourceFee": "2500" })),
    )
    .await;

    let signer = CustodialSigner::ephemeral();
    let tx = signed_transaction(&signer).transaction;
    let base_fee = tx.fee();
    let prepared = client(&server).prepare_transaction(tx).await.unwrap();
    assert_eq!(prepared.transaction().fee(), base_fee + 2500);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let envelope = body["params"]["transaction"].as_str().unwrap();
    assert!(TransactionEnvelope::from_xdr_base64(envelope, Limits::none()).is_ok());
}

#[tokio::test]
async fn test_submit_pending_is_queued() {
    let server = MockServer::start().await;
    mount(
        &server,
        "sendTransaction",
        rpc_result(json!({ "status": "PENDING", "hash": "abc123" })),
    )
    .await;

    let signer = CustodialSigner::ephemeral();
    let result = client(&server)
        .submit_transaction(&signed_transaction(&signer))
        .await
        .unwrap();
    assert_eq!(result.status, SubmissionStatus::Queued);
    assert_eq!(result.hash, "abc123");
}

#[tokio::test]
async fn test_submit_error_and_try_again_later_are_rejections() {
    for status in ["ERROR", "TRY_AGAIN_LATER"] {
        let server = MockServer::start().await;
        mount(
            &server,
            "sendTransaction",
            rpc_result(json!({ "status": status, "hash": "abc123", "errorResultXdr": "AAAA" })),
        )
        .await;

        let signer = CustodialSigner::ephemeral();
        let result = client(&server)
            .submit_transaction(&signed_transaction(&signer))
            .await
            .unwrap();
        assert_eq!(result.status, SubmissionStatus::Error, "status {status}");
        assert!(result.error_detail.unwrap().starts_with(status));
    }
}

#[tokio::test]
async fn test_submit_bad_sequence_is_sequence_conflict() {
    let server = MockServer::start().await;
    // TransactionResult { fee_charged: 100, result: txBAD_SEQ }
    mount(
        &server,
        "sendTransaction",
        rpc_result(json!({
            "status": "ERROR",
            "hash": "abc123",
            "errorResultXdr": "AAAAAAAAAGT////7AAAAAA=="
        })),
    )
    .await;

    let signer = CustodialSigner::ephemeral();
    let result = client(&server)
        .submit_transaction(&signed_transaction(&signer))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::SequenceConflict(_)))
    ));
}

#[tokio::test]
async fn test_submit_rpc_error_is_submission_failure() {
    let server = MockServer::start().await;
    mount(&server, "sendTransaction", rpc_error(-32603, "sequence store unavailable")).await;

    let signer = CustodialSigner::ephemeral();
    let result = client(&server)
        .submit_transaction(&signed_transaction(&signer))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::Submission(_)))
    ));
}

#[tokio::test]
async fn test_get_transaction_statuses() {
    for (wire, expected) in [
        ("NOT_FOUND", TransactionStatus::NotFound),
        ("SUCCESS", TransactionStatus::Success),
        ("FAILED", TransactionStatus::Failed),
    ] {
        let server = MockServer::start().await;
        mount(&server, "getTransaction", rpc_result(json!({ "status": wire }))).await;
        let poll = client(&server).get_transaction_status("abc").await.unwrap();
        assert_eq!(poll.status, expected);
    }
}

#[tokio::test]
async fn test_get_transaction_http_error_is_status_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let result = client(&server).get_transaction_status("abc").await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::StatusQuery(_)))
    ));
}

#[tokio::test]
async fn test_verification_end_to_end_over_http() {
    let server = MockServer::start().await;
    let signer = Arc::new(CustodialSigner::ephemeral());
    mount(
        &server,
        "getAccount",
        rpc_result(json!({ "id": signer.public_key(), "sequence": "41" })),
    )
    .await;
    mount(
        &server,
        "simulateTransaction",
        rpc_result(json!({ "transactionData": MOCK_TRANSACTION_DATA, "minResourceFee": "1000" })),
    )
    .await;
    mount(
        &server,
        "sendTransaction",
        rpc_result(json!({ "status": "PENDING", "hash": "feedbeef" })),
    )
    .await;
    mount(
        &server,
        "getTransaction",
        rpc_result(json!({ "status": "SUCCESS" })),
    )
    .await;

    let ticker = Arc::new(VirtualTicker::new());
    let reporter = Arc::new(RecordingReporter::new());
    let service = VerificationService::with_collaborators(
        VerificationConfig::default().with_contract_id(CONTRACT),
        Arc::new(client(&server)),
        signer,
        ticker.clone(),
        reporter.clone(),
    )
    .unwrap();

    let outcome = service
        .verify_payment_on_chain(&VerificationRequest::new("pay_1", "payer_tx", PAYER, 25.5))
        .await;

    assert!(outcome.verified);
    assert_eq!(outcome.reason, VerificationReason::Verified);
    assert_eq!(outcome.transaction_hash.as_deref(), Some("feedbeef"));
    assert!(ticker.sleeps().is_empty());
    assert_eq!(reporter.count(), 1);

    let bodies: Vec<serde_json::Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    let methods: Vec<&str> = bodies
        .iter()
        .map(|body| body["method"].as_str().unwrap())
        .collect();
    assert_eq!(
        methods,
        vec![
            "getAccount",
            "simulateTransaction",
            "sendTransaction",
            "getTransaction"
        ]
    );

    let submitted = bodies[2]["params"]["transaction"].as_str().unwrap();
    let TransactionEnvelope::Tx(envelope) =
        TransactionEnvelope::from_xdr_base64(submitted, Limits::none()).unwrap()
    else {
        panic!("expected a v1 envelope");
    };
    assert_eq!(envelope.signatures.len(), 1);
    assert_eq!(envelope.tx.seq_num.0, 42);
}
