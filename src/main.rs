//! Application entry point.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use soroban_payment_verifier::api::create_router;
use soroban_payment_verifier::app::{AppState, VerificationConfig, VerificationService};
use soroban_payment_verifier::domain::{LedgerClient, PaymentStore, TransactionSigner};
use soroban_payment_verifier::infra::{
    CustodialSigner, InMemoryPaymentStore, RpcClientConfig, RpcLedgerClient,
};

const DEFAULT_RPC_URL: &str = "https://soroban-testnet.stellar.org";

/// Application configuration
struct Config {
    rpc_url: String,
    /// Custodial signing seed (`S...`); an ephemeral key is used when unset
    admin_secret: Option<SecretString>,
    verification: VerificationConfig,
    host: String,
    port: u16,
    json_logs: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        let rpc_url = env::var("SOROBAN_RPC_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let admin_secret = env::var("ADMIN_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(p) => p.parse().context("PORT must be a valid port number")?,
            Err(_) => 3000,
        };
        let json_logs = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            rpc_url,
            admin_secret,
            verification: VerificationConfig::from_env(),
            host,
            port,
            json_logs,
        })
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    info!(
        "🏗️  Soroban Payment Verifier v{}",
        env!("CARGO_PKG_VERSION")
    );

    let store: Arc<dyn PaymentStore> = Arc::new(InMemoryPaymentStore::new());
    info!("   ✓ In-memory payment store ready");

    let ledger: Arc<dyn LedgerClient> = Arc::new(
        RpcLedgerClient::new(&config.rpc_url, RpcClientConfig::default())
            .context("Failed to create ledger RPC client")?,
    );
    if let Err(e) = ledger.health_check().await {
        warn!(rpc_url = %config.rpc_url, error = %e, "   ⚠ Ledger RPC not reachable at startup");
    } else {
        info!(rpc_url = %config.rpc_url, "   ✓ Ledger RPC reachable");
    }

    let signer: Arc<dyn TransactionSigner> = Arc::new(
        CustodialSigner::from_secret(config.admin_secret.as_ref())
            .context("Failed to load ADMIN_SECRET_KEY")?,
    );

    let verifier = Arc::new(
        VerificationService::new(config.verification.clone(), Arc::clone(&ledger), signer)
            .context("Invalid verification configuration")?,
    );
    if verifier.is_configured() {
        info!("   ✓ On-chain verification enabled");
    } else {
        warn!("   ○ PAYMENT_CONTRACT_ID not set, payments will not be verified on-chain");
    }

    let app_state = Arc::new(AppState::new(store, ledger, verifier));
    let router = create_router(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🚀 Server starting on http://{}", addr);
    info!("📖 Swagger UI available at http://{}/swagger-ui", addr);
    info!("📄 OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
