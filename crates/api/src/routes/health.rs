//! Health check endpoints.

use axum::{http::StatusCode, Json};
use telemetry::health;

use crate::response::HealthResponse;

/// GET /health - Store status plus per-brand cycle state.
pub async fn health_handler() -> Json<HealthResponse> {
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        store_connected: health().store.is_healthy(),
        components: report.components,
        brands: report.brands,
    })
}

/// GET /health/ready - Readiness probe (store has answered).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
