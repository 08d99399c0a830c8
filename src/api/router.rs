//! Router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;

use super::handlers::{
    ApiDoc, create_payment_handler, export_payments_handler, get_payment_handler,
    health_check_handler, list_payments_handler, liveness_handler, verify_payment_handler,
};

/// Upper bound on a single HTTP request. Confirmation polls the ledger for
/// up to about twenty seconds, so this stays well above that.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the application router
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route(
            "/payments",
            post(create_payment_handler).get(list_payments_handler),
        )
        .route("/payments/export", get(export_payments_handler))
        .route("/payments/{id}", get(get_payment_handler))
        .route("/payments/{id}/verify", post(verify_payment_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
}
