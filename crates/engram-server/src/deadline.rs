//! Per-request deadlines
//!
//! Every handler runs under a budget derived from the server-wide maximum
//! (`LTM_REQUEST_TIMEOUT_SECONDS`), overridable per call through the
//! `x-timeout-seconds` header, clamped to the server maximum. When the
//! budget elapses the handler future is dropped, which aborts in-flight
//! backend calls best-effort, and the caller receives `TIMEOUT`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub const TIMEOUT_HEADER: &str = "x-timeout-seconds";

/// Resolve the request's budget in seconds
pub fn budget_seconds(max_seconds: f64, header: Option<&str>) -> f64 {
    let Some(raw) = header else {
        return max_seconds;
    };
    match raw.parse::<f64>() {
        Ok(requested) if requested > 0.0 => requested.min(max_seconds),
        _ => {
            debug!(value = raw, "ignoring malformed x-timeout-seconds header");
            max_seconds
        }
    }
}

pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let max_seconds = state.ltm.config.request_timeout.as_secs_f64();
    let budget = budget_seconds(
        max_seconds,
        request
            .headers()
            .get(TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok()),
    );

    match tokio::time::timeout(
        std::time::Duration::from_secs_f64(budget),
        next.run(request),
    )
    .await
    {
        Ok(response) => response,
        Err(_) => ApiError::timeout(budget).into_response(),
    }
}
