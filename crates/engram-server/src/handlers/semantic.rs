//! `/semantic_consolidate` and `/propagate_subgraph`

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use engram_core::{ConsolidateFormat, EntitySpec, SemanticTriple};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body_value, from_value, provenance_from};
use crate::auth::{authorize, Access};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SemanticConsolidateRequest {
    payload: Value,
    format: ConsolidateFormat,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
}

/// POST /semantic_consolidate — MERGE one triple (jsonld) or run a raw
/// statement (cypher)
pub async fn post_semantic_consolidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/semantic_consolidate", Access::Edit)?;
    let body = body_value(&body)?;
    let request: SemanticConsolidateRequest = from_value(body, "request")?;
    let provenance = provenance_from(request.source, request.parent_ids);

    let result = state
        .ltm
        .semantic
        .consolidate(request.payload, request.format, provenance)
        .await?;
    Ok(Json(json!({ "result": result })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationDraft {
    subject: String,
    predicate: String,
    object: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropagateRequest {
    entities: Vec<EntitySpec>,
    relations: Vec<RelationDraft>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
}

/// POST /propagate_subgraph — MERGE a whole subgraph atomically
pub async fn post_propagate_subgraph(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/propagate_subgraph", Access::Edit)?;
    let body = body_value(&body)?;
    let request: PropagateRequest = from_value(body, "request")?;
    let provenance = provenance_from(request.source, request.parent_ids);

    let relations: Vec<SemanticTriple> = request
        .relations
        .into_iter()
        .map(|r| SemanticTriple {
            subject: r.subject,
            predicate: r.predicate,
            object: r.object,
            confidence: r.confidence,
            provenance: Some(provenance.clone()),
        })
        .collect();

    let ids = state
        .ltm
        .semantic
        .propagate_subgraph(&request.entities, &relations, provenance)
        .await?;
    Ok(Json(json!({ "ids": ids })))
}
