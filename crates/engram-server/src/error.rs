//! HTTP error mapping
//!
//! Every failure leaves the service as the same JSON object:
//! `{ "error": { "code", "message", "detail"? } }`. Internal failures are
//! logged with full context and surfaced as a generic `INTERNAL` so no
//! internal state leaks to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use engram_core::{ErrorCode, MemoryError};
use serde_json::{json, Value};
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub detail: Option<Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorCode::Forbidden, "role does not permit this endpoint")
    }

    pub fn validation(message: impl Into<String>, detail: Value) -> Self {
        Self::new(ErrorCode::ValidationError, message).with_detail(detail)
    }

    pub fn timeout(budget_seconds: f64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("request exceeded its {budget_seconds:.1}s deadline"),
        )
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BackendUnavailable | ErrorCode::EmbedUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        let code = e.code();
        match e {
            MemoryError::Validation { message, fields } => {
                let detail = if fields.is_empty() {
                    None
                } else {
                    Some(json!({ "fields": fields }))
                };
                Self {
                    code,
                    message,
                    detail,
                }
            }
            MemoryError::Internal(context) => {
                error!(context, "internal error");
                Self::new(code, "internal error")
            }
            other => Self::new(code, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
            }
        });
        if let Some(ref detail) = self.detail {
            body["error"]["detail"] = detail.clone();
        }
        (self.status(), Json(body)).into_response()
    }
}
