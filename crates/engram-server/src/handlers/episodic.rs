//! `/memory` and `/forget`

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use engram_core::types::validate_limit;
use engram_core::{ForgetRequest, MemoryType, QueryInput, TriplePattern};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body_value, from_value, provenance_from};
use crate::auth::{authorize, Access};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PostMemoryRequest {
    record: Value,
    #[serde(default)]
    memory_type: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
}

/// POST /memory — consolidate one episodic record
pub async fn post_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/memory", Access::Edit)?;
    let body = body_value(&body)?;
    let request: PostMemoryRequest = from_value(body, "request")?;

    let memory_type = request.memory_type.as_deref().unwrap_or("episodic");
    if memory_type != "episodic" {
        return Err(ApiError::validation(
            "POST /memory consolidates episodic records",
            json!({ "fields": [{
                "field": "memory_type",
                "message": format!("`{memory_type}` has its own consolidation endpoint"),
            }] }),
        ));
    }

    let draft = from_value(request.record, "record")?;
    let provenance = provenance_from(request.source, request.parent_ids);
    let id = state.ltm.episodic.consolidate(draft, provenance).await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct GetMemoryParams {
    #[serde(default)]
    memory_type: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetMemoryBody {
    #[serde(default)]
    query: Option<Value>,
    /// Deprecated alias of `query`
    #[serde(default)]
    task_context: Option<Value>,
}

/// GET /memory — retrieve from episodic, semantic, procedural, or evaluator
/// memory; the query travels in the body
pub async fn get_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GetMemoryParams>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/memory", Access::View)?;

    let limit = validate_limit(params.limit)?;
    let memory_type = match &params.memory_type {
        None => MemoryType::Episodic,
        Some(raw) => MemoryType::parse_name(raw).ok_or_else(|| {
            ApiError::validation(
                "unknown memory_type",
                json!({ "fields": [{ "field": "memory_type", "message": format!("`{raw}` is not a memory type") }] }),
            )
        })?,
    };

    let parsed: GetMemoryBody = from_value(body_value(&body)?, "query")?;
    let query = parsed.query.or(parsed.task_context).ok_or_else(|| {
        ApiError::validation(
            "missing query",
            json!({ "fields": [{ "field": "query", "message": "supply `query` (or the deprecated `task_context`)" }] }),
        )
    })?;

    let results = match memory_type {
        MemoryType::Episodic => {
            let query = QueryInput::from_value(query)?;
            serde_json::to_value(state.ltm.episodic.retrieve(&query, limit).await?)
        }
        MemoryType::Semantic => {
            let QueryInput::Metadata(map) = QueryInput::from_value(query)? else {
                return Err(ApiError::validation(
                    "semantic queries are triple patterns",
                    json!({ "fields": [{ "field": "query", "message": "supply a mapping over subject/predicate/object" }] }),
                ));
            };
            let pattern = TriplePattern::from_metadata(&map)?;
            serde_json::to_value(state.ltm.semantic.retrieve(&pattern, limit).await?)
        }
        MemoryType::Procedural => {
            let query = QueryInput::from_value(query)?;
            serde_json::to_value(state.ltm.procedural.vector_query(&query, limit).await?)
        }
        MemoryType::Evaluator => {
            serde_json::to_value(state.ltm.evaluator.retrieve(&query, limit).await?)
        }
        MemoryType::Temporal => {
            return Err(ApiError::validation(
                "temporal memory is served by its own endpoints",
                json!({ "fields": [{ "field": "memory_type", "message": "use /spatial_query or /temporal_snapshot" }] }),
            ));
        }
    }
    .map_err(engram_core::MemoryError::from)?;

    Ok(Json(json!({ "results": results })))
}

/// DELETE /forget — remove episodic records matching the predicate
pub async fn delete_forget(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/forget", Access::Edit)?;
    let body = body_value(&body)?;
    let request: ForgetRequest = from_value(body, "predicate")?;
    let predicate = request.into_predicate()?;
    let removed = state.ltm.episodic.forget(&predicate).await?;
    Ok(Json(json!({ "removed": removed })))
}
