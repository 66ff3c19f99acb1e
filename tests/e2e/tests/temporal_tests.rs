//! Bitemporal behavior over the HTTP surface

use axum::http::StatusCode;
use engram_core::GraphStore;
use engram_e2e_tests::{send, test_context, TestContext};
use serde_json::json;

async fn consolidate(ctx: &TestContext, object: &str, valid_from: f64, valid_to: Option<f64>) {
    let mut body = json!({
        "subject": "FranceCapital",
        "predicate": "is",
        "object": object,
        "valid_from": valid_from
    });
    if let Some(to) = valid_to {
        body["valid_to"] = json!(to);
    }
    let (status, _) = send(&ctx.app, "POST", "/temporal_consolidate", Some("editor"), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
}

async fn snapshot_objects(ctx: &TestContext, valid_at: f64, tx_at: f64) -> Vec<String> {
    let (status, body) = send(
        &ctx.app,
        "GET",
        &format!("/temporal_snapshot?valid_at={valid_at}&tx_at={tx_at}"),
        Some("viewer"),
        Some(json!({ "pairs": [{ "subject": "FranceCapital", "predicate": "is" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["object"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn snapshot_answers_as_of_any_historical_tx_time() {
    let ctx = test_context();
    consolidate(&ctx, "Paris", 1000.0, None).await;
    consolidate(&ctx, "Versailles", 500.0, Some(999.0)).await;
    consolidate(&ctx, "Paris", 1000.0, None).await;

    // Recover the server-assigned transaction times
    let versions = ctx.graph.facts_for_pair("FranceCapital", "is").await.unwrap();
    assert_eq!(versions.len(), 3);
    let (tx1, tx2, tx3) = (versions[0].tx_time, versions[1].tx_time, versions[2].tx_time);
    assert!(tx1 < tx2 && tx2 < tx3);

    // As the store stood between the second and third writes, 750 was Versailles
    let mid = snapshot_objects(&ctx, 750.0, (tx2 + tx3) / 2.0).await;
    assert_eq!(mid, vec!["Versailles"]);

    // Before the Versailles version existed, nothing covered 750
    let early = snapshot_objects(&ctx, 750.0, (tx1 + tx2) / 2.0).await;
    assert!(early.is_empty());

    // At the latest transaction time, 1200 resolves to the newest Paris version
    let late = snapshot_objects(&ctx, 1200.0, tx3 + 1.0).await;
    assert_eq!(late, vec!["Paris"]);
}

#[tokio::test]
async fn point_bbox_matches_exact_location_only() {
    let ctx = test_context();
    let (status, _) = send(
        &ctx.app,
        "POST",
        "/temporal_consolidate",
        Some("editor"),
        Some(json!({
            "subject": "landmark",
            "predicate": "at",
            "object": "corner",
            "location": { "lon": 2.35, "lat": 48.85 },
            "valid_from": 2010.0,
            "valid_to": 2020.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Zero-area bbox at the exact corner
    let (status, body) = send(
        &ctx.app,
        "GET",
        "/spatial_query?bbox=2.35,48.85,2.35,48.85&valid_from=2012&valid_to=2018",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    // A nearby point misses
    let (status, body) = send(
        &ctx.app,
        "GET",
        "/spatial_query?bbox=2.36,48.85,2.36,48.85&valid_from=2012&valid_to=2018",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn inverted_bbox_is_rejected() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "GET",
        "/spatial_query?bbox=30,35,-10,60&valid_from=0&valid_to=1",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn open_ended_validity_reaches_any_future_window() {
    let ctx = test_context();
    let (status, _) = send(
        &ctx.app,
        "POST",
        "/temporal_consolidate",
        Some("editor"),
        Some(json!({
            "subject": "hq",
            "predicate": "at",
            "object": "hq",
            "location": { "lon": 0.0, "lat": 0.0 },
            "valid_from": 2000.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/spatial_query?bbox=-1,-1,1,1&valid_from=9000&valid_to=9001",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn validity_interval_must_be_ordered() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/temporal_consolidate",
        Some("editor"),
        Some(json!({
            "subject": "s",
            "predicate": "p",
            "object": "o",
            "valid_from": 100.0,
            "valid_to": 50.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
}
