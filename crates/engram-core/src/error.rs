//! Error types for the memory engine
//!
//! One taxonomy for the whole service: validation, authorization, not-found,
//! transient and fatal backend failures, timeouts, and internal invariant
//! violations. The HTTP layer maps `ErrorCode` onto statuses; the engine only
//! decides which kind a failure is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// A single offending field inside a validation failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    /// Field path (e.g. `record.score`)
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur in the memory engine
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Request shape or range is invalid
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    /// Record id does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Embedding provider failed after retry exhaustion
    #[error("embedding provider unavailable: {0}")]
    EmbedUnavailable(String),

    /// Vector/graph/key-value store failed after retry exhaustion
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend answered with an unambiguous rejection; never retried
    #[error("backend rejected request: {0}")]
    BackendRejected(String),

    /// A single backend call failed retriably; converted to
    /// `BackendUnavailable` once the retry envelope is exhausted
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// Deadline elapsed
    #[error("operation timed out after {0:.1}s")]
    Timeout(f64),

    /// Invariant violated; details are logged, not surfaced
    #[error("internal error: {0}")]
    Internal(String),
}

impl MemoryError {
    /// Convenience constructor for single-message validation failures
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: vec![],
        }
    }

    /// Validation failure with field-level diagnostics
    pub fn validation_fields(message: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Whether the retry envelope may re-attempt the operation
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Wire code for this error kind
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::EmbedUnavailable(_) => ErrorCode::EmbedUnavailable,
            Self::BackendUnavailable(_) | Self::BackendRejected(_) | Self::Transient(_) => {
                ErrorCode::BackendUnavailable
            }
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {e}"))
    }
}

/// Wire-level error codes carried in every error response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Forbidden,
    NotFound,
    BackendUnavailable,
    EmbedUnavailable,
    Timeout,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorCode::EmbedUnavailable => "EMBED_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
