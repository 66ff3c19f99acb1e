//! Endpoint handlers
//!
//! One module per memory family. Every handler authorizes first, then
//! validates the body into its typed request shape (unknown fields are
//! rejected), dispatches into the engine, and translates engine errors
//! through [`crate::error::ApiError`].

pub mod episodic;
pub mod evaluator;
pub mod misc;
pub mod procedural;
pub mod semantic;
pub mod temporal;

use axum::body::Bytes;
use engram_core::types::UNSPECIFIED_SOURCE;
use engram_core::Provenance;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Parse a typed request out of a JSON value, surfacing the serde diagnostic
/// as a field-level validation error
pub(crate) fn from_value<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        ApiError::validation(
            format!("invalid {what}"),
            json!({ "fields": [{ "field": what, "message": e.to_string() }] }),
        )
    })
}

/// Raw request bytes as JSON; an empty body reads as `{}` so GET endpoints
/// can carry their query in the body
pub(crate) fn body_value(bytes: &Bytes) -> Result<Value, ApiError> {
    if bytes.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        ApiError::validation(
            "request body is not valid JSON",
            json!({ "fields": [{ "field": "body", "message": e.to_string() }] }),
        )
    })
}

/// Provenance stamped from the optional producer identity in the body
pub(crate) fn provenance_from(
    source: Option<String>,
    parent_ids: Option<Vec<String>>,
) -> Provenance {
    Provenance::now(
        source.unwrap_or_else(|| UNSPECIFIED_SOURCE.to_string()),
        parent_ids,
    )
}
