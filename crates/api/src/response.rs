//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orchestrator_core::Error;
use serde::{Deserialize, Serialize};
use telemetry::{BrandsReport, ComponentHealthReport};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub components: Vec<ComponentHealthReport>,
    pub brands: BrandsReport,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// API error with a machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, code, msg)
    }

    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, code, msg)
    }

    pub fn unavailable(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, code, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Store { code, message } => ApiError::unavailable(*code, message),
            Error::InvalidBrand(msg) => ApiError::bad_request("BRAND_001", msg),
            Error::Validation(msg) => ApiError::bad_request("VALIDATION", msg),
            Error::Chunk { code, message } => {
                ApiError::with_code(StatusCode::UNPROCESSABLE_ENTITY, *code, message)
            }
            _ => ApiError::internal(err.to_string()),
        }
    }
}
