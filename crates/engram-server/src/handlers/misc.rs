//! `/provenance`, `/stats`, `/health`

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Json;
use engram_core::MemoryType;
use serde_json::{json, Value};

use crate::auth::{authorize, Access};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /provenance/{memory_type}/{record_id}
pub async fn get_provenance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((memory_type, record_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/provenance", Access::View)?;

    let memory_type = MemoryType::parse_name(&memory_type).ok_or_else(|| {
        ApiError::validation(
            "unknown memory_type",
            json!({ "fields": [{ "field": "memory_type", "message": format!("`{memory_type}` is not a memory type") }] }),
        )
    })?;
    let provenance = state.ltm.provenance.get(memory_type, &record_id).await?;
    Ok(Json(serde_json::to_value(provenance).map_err(engram_core::MemoryError::from)?))
}

/// GET /stats — retrieval counters per memory type
pub async fn get_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/stats", Access::View)?;

    let snapshot = state.ltm.metrics.snapshot();
    Ok(Json(json!({
        "retrievals": snapshot,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    })))
}

/// GET /health
pub async fn get_health(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/health", Access::View)?;

    Ok(Json(json!({
        "status": "ok",
        "version": engram_core::VERSION,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    })))
}
