//! Summary lookup.
//!
//! Returns the stored summary verbatim; the orchestrator is the only
//! writer, so nothing is re-validated here.

use axum::{
    extract::{Path, State},
    Json,
};
use orchestrator_core::BrandSlug;
use serde_json::Value;
use tracing::warn;

use crate::response::ApiError;
use crate::state::AppState;

/// GET /summaries/:brand - Latest published summary for a brand.
pub async fn summary_handler(
    State(state): State<AppState>,
    Path(brand): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let slug = BrandSlug::parse(&brand)?;
    let key = state.keys.summary_key(&slug);

    let Some(body) = state.store.get(&key).await? else {
        return Err(ApiError::not_found(
            "SUMMARY_001",
            format!("No summary for brand '{}'", slug),
        ));
    };

    let summary: Value = serde_json::from_str(&body).map_err(|e| {
        warn!(brand = %slug, error = %e, "Stored summary is not valid JSON");
        ApiError::internal("Stored summary is unreadable")
    })?;

    Ok(Json(summary))
}
