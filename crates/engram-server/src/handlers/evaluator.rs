//! `/evaluator_memory` and `/forget_evaluator`

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use engram_core::types::validate_limit;
use engram_core::ForgetRequest;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body_value, from_value, provenance_from};
use crate::auth::{authorize, Access};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreCritiqueRequest {
    critique: Value,
    /// Query context the critique applies to; fingerprinted for later lookup
    query: Value,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
}

/// POST /evaluator_memory — persist one critique
pub async fn post_evaluator_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/evaluator_memory", Access::Edit)?;
    let body = body_value(&body)?;
    let request: StoreCritiqueRequest = from_value(body, "request")?;
    let provenance = provenance_from(request.source, request.parent_ids);

    let id = state
        .ltm
        .evaluator
        .store(request.critique, &request.query, provenance)
        .await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct EvaluatorQueryParams {
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EvaluatorQueryBody {
    query: Value,
}

/// GET /evaluator_memory — newest critiques matching the query fingerprint
pub async fn get_evaluator_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<EvaluatorQueryParams>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/evaluator_memory", Access::View)?;

    let limit = validate_limit(params.limit)?;
    let parsed: EvaluatorQueryBody = from_value(body_value(&body)?, "query")?;
    let results = state.ltm.evaluator.retrieve(&parsed.query, limit).await?;
    Ok(Json(json!({ "results": results })))
}

/// DELETE /forget_evaluator — remove critiques matching the predicate
pub async fn delete_forget_evaluator(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/forget_evaluator", Access::Edit)?;
    let body = body_value(&body)?;
    let request: ForgetRequest = from_value(body, "predicate")?;
    let predicate = request.into_predicate()?;
    let removed = state.ltm.evaluator.forget(&predicate).await?;
    Ok(Json(json!({ "removed": removed })))
}
