//! Unified error types for the brand orchestrator.
//!
//! Error codes:
//! - STORE_001-002: Queue/summary store errors (retryable)
//! - CHUNK_001-003: Chunk payload errors (quarantined, never retried)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Could not open or keep a connection
    Connection,
    /// STORE_002: A command was rejected or failed mid-flight
    Command,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection => "STORE_001",
            Self::Command => "STORE_002",
        }
    }
}

/// Chunk payload error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkErrorCode {
    /// CHUNK_001: Payload is not a JSON object of the expected shape
    Malformed,
    /// CHUNK_002: A required field is missing or has the wrong type
    MissingField,
    /// CHUNK_003: Payload belongs to another brand
    BrandMismatch,
}

impl ChunkErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "CHUNK_001",
            Self::MissingField => "CHUNK_002",
            Self::BrandMismatch => "CHUNK_003",
        }
    }
}

/// Unified error type for the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error with code.
    #[error("[{code}] {message}")]
    Store { code: &'static str, message: String },

    /// Chunk payload error with code.
    #[error("[{code}] {message}")]
    Chunk { code: &'static str, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid brand: {0}")]
    InvalidBrand(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a store error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a chunk payload error.
    pub fn chunk(code: ChunkErrorCode, msg: impl Into<String>) -> Self {
        Self::Chunk {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_brand(msg: impl Into<String>) -> Self {
        Self::InvalidBrand(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// Only store failures qualify; bad payloads and bad config stay bad.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Store { code, .. } => Some(code),
            Self::Chunk { code, .. } => Some(code),
            _ => None,
        }
    }
}
