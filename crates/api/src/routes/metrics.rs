//! Metrics endpoint.

use axum::Json;
use telemetry::{metrics, MetricsSnapshot};

/// GET /metrics - Current counters, histograms and gauges.
pub async fn metrics_handler() -> Json<MetricsSnapshot> {
    Json(metrics().snapshot())
}
