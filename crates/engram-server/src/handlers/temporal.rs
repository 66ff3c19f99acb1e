//! `/temporal_consolidate`, `/spatial_query`, `/temporal_snapshot`

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use engram_core::{BoundingBox, GeoPoint, TemporalFactDraft, TimeWindow};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body_value, from_value, provenance_from};
use crate::auth::{authorize, Access};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemporalConsolidateRequest {
    subject: String,
    predicate: String,
    object: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    location: Option<GeoPoint>,
    valid_from: f64,
    #[serde(default)]
    valid_to: Option<f64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
}

/// POST /temporal_consolidate — append one bitemporal fact version
pub async fn post_temporal_consolidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/temporal_consolidate", Access::Edit)?;
    let body = body_value(&body)?;
    let request: TemporalConsolidateRequest = from_value(body, "request")?;
    let provenance = provenance_from(request.source, request.parent_ids);

    let draft = TemporalFactDraft {
        subject: request.subject,
        predicate: request.predicate,
        object: request.object,
        value: request.value,
        location: request.location,
        valid_from: request.valid_from,
        valid_to: request.valid_to,
    };
    let id = state.ltm.temporal.consolidate(draft, provenance).await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct SpatialParams {
    bbox: String,
    valid_from: f64,
    #[serde(default)]
    valid_to: Option<f64>,
}

/// GET /spatial_query — facts inside a closed bbox whose validity intersects
/// the window
pub async fn get_spatial_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SpatialParams>,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/spatial_query", Access::View)?;

    let bbox = BoundingBox::parse_csv(&params.bbox)?;
    let window = TimeWindow {
        valid_from: params.valid_from,
        valid_to: params.valid_to,
    };
    let results = state.ltm.temporal.spatial_query(&bbox, &window).await?;
    Ok(Json(json!({ "results": results })))
}

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
    valid_at: f64,
    tx_at: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PairSpec {
    subject: String,
    predicate: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotBody {
    pairs: Vec<PairSpec>,
}

/// GET /temporal_snapshot — per pair, the version in force at `valid_at` as
/// the store knew it at `tx_at`
pub async fn get_temporal_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SnapshotParams>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize(&headers, "/temporal_snapshot", Access::View)?;

    let parsed: SnapshotBody = from_value(body_value(&body)?, "pairs")?;
    let pairs: Vec<(String, String)> = parsed
        .pairs
        .into_iter()
        .map(|p| (p.subject, p.predicate))
        .collect();
    let results = state
        .ltm
        .temporal
        .snapshot(params.valid_at, params.tx_at, &pairs)
        .await?;
    Ok(Json(json!({ "results": results })))
}
