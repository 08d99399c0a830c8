//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{error, info};
use utoipa::OpenApi;

use crate::app::AppState;
use crate::domain::{
    AppError, ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, ErrorDetail,
    ErrorResponse, HealthResponse, HealthStatus, LedgerError, PageMeta, Payment, PaymentListQuery,
    PaymentPage, StoreError, TimelineEvent, VerificationOutcome,
};

/// Attachment name of the CSV export
pub const EXPORT_FILENAME: &str = "payments_history.csv";

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Soroban Payment Verifier API",
        version = "0.1.0",
        description = "API for creating merchant payments and confirming them against a Soroban verification contract",
        license(
            name = "MIT"
        )
    ),
    paths(
        create_payment_handler,
        list_payments_handler,
        export_payments_handler,
        get_payment_handler,
        verify_payment_handler,
        health_check_handler,
        liveness_handler,
    ),
    components(
        schemas(
            Payment,
            CreatePaymentRequest,
            ConfirmPaymentRequest,
            ConfirmPaymentResponse,
            VerificationOutcome,
            crate::domain::VerificationReason,
            crate::domain::PaymentStatus,
            crate::domain::SortKey,
            crate::domain::SortDirection,
            TimelineEvent,
            PaymentPage,
            PageMeta,
            HealthResponse,
            HealthStatus,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "payments", description = "Payment management endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Create a payment
///
/// The payment starts `pending` and expires one hour after creation.
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created", body = Payment),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_payment_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment = state.service.create_payment(&payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// List payments with filtering, sorting and pagination
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "One page of payments", body = PaymentPage),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_payments_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentPage>, AppError> {
    let page = state.service.list_payments(&query).await?;
    Ok(Json(page))
}

/// Export payments as CSV
///
/// Takes the same filters as the list endpoint; paging parameters are ignored.
#[utoipa::path(
    get,
    path = "/payments/export",
    tag = "payments",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn export_payments_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let csv = state.service.export_csv(&query.filter()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        csv,
    ))
}

/// Get a single payment by ID
#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payments",
    params(
        ("id" = String, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment found", body = Payment),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_payment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.service.get_payment(&id).await?;
    Ok(Json(payment))
}

/// Confirm a payment on-chain
///
/// Invokes the verification contract and waits for the ledger to confirm.
/// A rejected outcome is still a `200`; inspect `outcome.reason`:
/// - `verified` → payment is `verified`
/// - `chain_execution_failed` → payment is `failed`
/// - anything else → payment stays `pending_confirmation` and may be retried
#[utoipa::path(
    post,
    path = "/payments/{id}/verify",
    tag = "payments",
    params(
        ("id" = String, Path, description = "Payment ID")
    ),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Verification finished", body = ConfirmPaymentResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment cannot be confirmed in its current state", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn verify_payment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    let response = state.service.confirm_payment(&id, &payload).await?;
    info!(
        payment_id = %id,
        reason = %response.outcome.reason,
        status = %response.payment.status,
        "Payment confirmation finished"
    );
    Ok(Json(response))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type, message) = match &self {
            AppError::Ledger(ledger_err) => match ledger_err {
                LedgerError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ledger_error",
                    self.to_string(),
                ),
                LedgerError::Timeout(_) => {
                    (StatusCode::GATEWAY_TIMEOUT, "timeout", self.to_string())
                }
                LedgerError::InvalidAmount(_) | LedgerError::InvalidAddress(_) => (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    self.to_string(),
                ),
                _ => (StatusCode::BAD_GATEWAY, "ledger_error", self.to_string()),
            },
            AppError::Store(store_err) => match store_err {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
                StoreError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate", self.to_string()),
                StoreError::InvalidState(_) => {
                    (StatusCode::CONFLICT, "invalid_state", self.to_string())
                }
                StoreError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_error",
                    self.to_string(),
                ),
            },
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                self.to_string(),
            ),
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            AppError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialization_error",
                self.to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),
            AppError::NotSupported(_) => (
                StatusCode::NOT_IMPLEMENTED,
                "not_supported",
                self.to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
