//! Chunk payload validation.
//!
//! A payload is accepted only when it is a JSON object with a non-empty
//! `chunkId`, a `clusters` array, a numeric `sentiment.score` and a `brand`
//! that normalizes to the brand being drained. Anything else is rejected and
//! ends up in the brand's failed collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use validator::Validate;

use crate::brand::BrandSlug;
use crate::chunk::ChunkResult;
use crate::error::{ChunkErrorCode, Error};

/// Tag written on every quarantined payload.
pub const INVALID_CHUNK_RESULT: &str = "invalid_chunk_result";

/// Why a payload was refused.
#[derive(Debug)]
pub struct ChunkRejection {
    /// The chunk id, when the payload carried a readable one.
    pub chunk_id: Option<String>,
    pub error: Error,
}

impl ChunkRejection {
    fn new(chunk_id: Option<String>, error: Error) -> Self {
        Self { chunk_id, error }
    }
}

impl fmt::Display for ChunkRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chunk_id {
            Some(id) => write!(f, "chunk {}: {}", id, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Record appended to a brand's failed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedChunkRecord {
    pub brand: String,
    pub received_at: DateTime<Utc>,
    pub error: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// The raw payload, verbatim.
    pub payload: String,
}

impl FailedChunkRecord {
    pub fn new(
        brand: &BrandSlug,
        rejection: &ChunkRejection,
        payload: &str,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            brand: brand.to_string(),
            received_at,
            error: INVALID_CHUNK_RESULT.to_string(),
            reason: rejection.error.to_string(),
            chunk_id: rejection.chunk_id.clone(),
            payload: payload.to_string(),
        }
    }
}

/// Parses and validates one queue payload for `expected` brand.
pub fn parse_chunk(payload: &str, expected: &BrandSlug) -> Result<ChunkResult, ChunkRejection> {
    let value: Value = serde_json::from_str(payload).map_err(|e| {
        ChunkRejection::new(
            None,
            Error::chunk(ChunkErrorCode::Malformed, format!("invalid JSON: {}", e)),
        )
    })?;

    let object = value.as_object().ok_or_else(|| {
        ChunkRejection::new(
            None,
            Error::chunk(ChunkErrorCode::Malformed, "payload is not a JSON object"),
        )
    })?;

    let chunk_id = object
        .get("chunkId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let reject = |code: ChunkErrorCode, msg: String| {
        Err(ChunkRejection::new(chunk_id.clone(), Error::chunk(code, msg)))
    };

    if chunk_id.is_none() {
        return reject(
            ChunkErrorCode::MissingField,
            "chunkId must be a non-empty string".into(),
        );
    }

    if !object.get("clusters").is_some_and(Value::is_array) {
        return reject(
            ChunkErrorCode::MissingField,
            "clusters must be an array".into(),
        );
    }

    let score_is_numeric = object
        .get("sentiment")
        .and_then(|s| s.get("score"))
        .is_some_and(Value::is_number);
    if !score_is_numeric {
        return reject(
            ChunkErrorCode::MissingField,
            "sentiment.score must be a number".into(),
        );
    }

    match object.get("brand").and_then(Value::as_str) {
        Some(brand) if expected.matches(brand) => {}
        Some(brand) => {
            return reject(
                ChunkErrorCode::BrandMismatch,
                format!("expected brand '{}', got '{}'", expected, brand),
            );
        }
        None => {
            return reject(
                ChunkErrorCode::MissingField,
                "brand must be a string".into(),
            );
        }
    }

    let chunk: ChunkResult = serde_json::from_value(value).map_err(|e| {
        ChunkRejection::new(
            chunk_id.clone(),
            Error::chunk(ChunkErrorCode::Malformed, e.to_string()),
        )
    })?;

    chunk.validate().map_err(|e| {
        ChunkRejection::new(
            chunk_id.clone(),
            Error::validation(e.to_string()),
        )
    })?;

    Ok(chunk)
}
