//! `/skill`, `/skill_vector_query`, `/skill_metadata_query`

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use engram_core::types::validate_limit;
use engram_core::{QueryInput, SkillDraft, SkillRepresentation};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{body_value, from_value, provenance_from};
use crate::auth::{authorize, Access};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSkillRequest {
    skill_policy: Value,
    skill_representation: SkillRepresentation,
    #[serde(default)]
    skill_metadata: Map<String, Value>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
}

/// POST /skill — persist one reusable skill
pub async fn post_skill(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/skill", Access::Edit)?;
    let body = body_value(&body)?;
    let request: StoreSkillRequest = from_value(body, "request")?;
    let provenance = provenance_from(request.source, request.parent_ids);

    let draft = SkillDraft {
        skill_policy: request.skill_policy,
        skill_representation: request.skill_representation,
        skill_metadata: request.skill_metadata,
    };
    let id = state.ltm.procedural.store(draft, provenance).await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SkillVectorQueryRequest {
    query: Value,
    #[serde(default)]
    limit: Option<i64>,
}

/// POST /skill_vector_query — skills by similarity (text or vector); a
/// metadata mapping routes to the metadata path
pub async fn post_skill_vector_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/skill_vector_query", Access::View)?;
    let body = body_value(&body)?;
    let request: SkillVectorQueryRequest = from_value(body, "request")?;

    let limit = validate_limit(request.limit)?;
    let query = QueryInput::from_value(request.query)?;
    let results = state.ltm.procedural.vector_query(&query, limit).await?;
    Ok(Json(json!({ "results": results })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SkillMetadataQueryRequest {
    filter: Map<String, Value>,
    #[serde(default)]
    limit: Option<i64>,
}

/// POST /skill_metadata_query — skills whose metadata satisfies every
/// `key = value` pair
pub async fn post_skill_metadata_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/skill_metadata_query", Access::View)?;
    let body = body_value(&body)?;
    let request: SkillMetadataQueryRequest = from_value(body, "request")?;

    let limit = validate_limit(request.limit)?;
    let results = state
        .ltm
        .procedural
        .metadata_query(&request.filter, limit)
        .await?;
    Ok(Json(json!({ "results": results })))
}
