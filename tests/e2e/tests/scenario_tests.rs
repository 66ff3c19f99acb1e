//! End-to-end scenarios over the full HTTP surface

use axum::http::StatusCode;
use engram_core::types::now_ts;
use engram_core::MemoryType;
use engram_e2e_tests::{error_code, send, test_context};
use serde_json::json;

#[tokio::test]
async fn episodic_round_trip_counts_a_hit() {
    let ctx = test_context();

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": {
                "task_query": "define photosynthesis",
                "outcome": "plants convert light into chemical energy",
                "score": 0.9
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/memory?limit=1",
        Some("viewer"),
        Some(json!({ "query": { "text": "what is photosynthesis" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], json!(id));
    assert_eq!(results[0]["access_count"], json!(1));

    let snapshot = ctx.state.ltm.metrics.snapshot_of(MemoryType::Episodic);
    assert_eq!(snapshot.hits, 1);
    assert_eq!(snapshot.misses, 0);
}

#[tokio::test]
async fn task_context_is_a_deprecated_alias_of_query() {
    let ctx = test_context();
    send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": { "task_query": "alias check", "outcome": "ok", "score": 0.5 }
        })),
    )
    .await;

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/memory",
        Some("viewer"),
        Some(json!({ "task_context": { "text": "alias check" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn semantic_merge_is_idempotent_over_http() {
    let ctx = test_context();
    let payload = json!({
        "payload": { "subject": "Transformer", "predicate": "IS_A", "object": "Model" },
        "format": "jsonld"
    });

    for _ in 0..2 {
        let (status, _) = send(
            &ctx.app,
            "POST",
            "/semantic_consolidate",
            Some("editor"),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/memory?memory_type=semantic",
        Some("viewer"),
        Some(json!({ "query": { "subject": "Transformer" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(ctx.graph.entity_count(), 2);
    assert_eq!(ctx.graph.relation_count(), 1);
}

#[tokio::test]
async fn propagate_subgraph_returns_all_relation_ids() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/propagate_subgraph",
        Some("editor"),
        Some(json!({
            "entities": [
                { "name": "Paris", "kind": "city" },
                { "name": "France", "kind": "country" }
            ],
            "relations": [
                { "subject": "Paris", "predicate": "CAPITAL_OF", "object": "France" },
                { "subject": "France", "predicate": "CONTAINS", "object": "Paris" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ids"].as_array().unwrap().len(), 2);
    assert_eq!(ctx.graph.relation_count(), 2);
}

#[tokio::test]
async fn spatial_query_returns_only_facts_in_region_and_window() {
    let ctx = test_context();
    for (object, lon, lat, from, to) in [
        ("paris-fact", 2.35, 48.85, 2010.0, 2020.0),
        ("tokyo-fact", 139.69, 35.69, 2015.0, 2016.0),
    ] {
        let (status, _) = send(
            &ctx.app,
            "POST",
            "/temporal_consolidate",
            Some("editor"),
            Some(json!({
                "subject": object,
                "predicate": "located",
                "object": object,
                "location": { "lon": lon, "lat": lat },
                "valid_from": from,
                "valid_to": to
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/spatial_query?bbox=-10,35,30,60&valid_from=2012&valid_to=2018",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["subject"], json!("paris-fact"));
}

#[tokio::test]
async fn skill_round_trip_by_vector_and_metadata() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/skill",
        Some("editor"),
        Some(json!({
            "skill_policy": { "steps": ["search", "summarize"] },
            "skill_representation": "summarize scientific articles",
            "skill_metadata": { "domain": "research" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/skill_vector_query",
        Some("viewer"),
        Some(json!({ "query": { "text": "summarize articles" }, "limit": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], json!(id));

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/skill_metadata_query",
        Some("viewer"),
        Some(json!({ "filter": { "domain": "research" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/skill_metadata_query",
        Some("viewer"),
        Some(json!({ "filter": { "domain": "cooking" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn evaluator_critiques_match_by_fingerprint_newest_first() {
    let ctx = test_context();
    for verdict in ["needs sources", "improved"] {
        let (status, _) = send(
            &ctx.app,
            "POST",
            "/evaluator_memory",
            Some("editor"),
            Some(json!({
                "critique": { "verdict": verdict },
                "query": { "topic": "Photosynthesis", "depth": 1 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // Same context modulo case/whitespace/key order
    let (status, body) = send(
        &ctx.app,
        "GET",
        "/evaluator_memory?limit=1",
        Some("viewer"),
        Some(json!({ "query": { "depth": 1, "topic": "  photosynthesis " } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["critique_payload"]["verdict"], json!("improved"));
}

#[tokio::test]
async fn provenance_round_trip_for_each_consolidation() {
    let ctx = test_context();
    let (_, body) = send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": { "task_query": "trace me", "outcome": "ok", "score": 0.4 },
            "source": "supervisor",
            "parent_ids": ["plan-7"]
        })),
    )
    .await;
    let id = body["id"].as_str().unwrap();

    let (status, body) = send(
        &ctx.app,
        "GET",
        &format!("/provenance/episodic/{id}"),
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], json!("supervisor"));
    assert_eq!(body["parent_ids"], json!(["plan-7"]));

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/provenance/episodic/no-such-record",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn forgetting_tick_removes_stale_low_utility_records() {
    let ctx = test_context();
    let stale = now_ts() - 60.0 * 86_400.0;

    for i in 0..50 {
        let (status, _) = send(
            &ctx.app,
            "POST",
            "/memory",
            Some("editor"),
            Some(json!({
                "record": {
                    "task_query": format!("stale task {i}"),
                    "outcome": "done",
                    "score": 0.1,
                    "created_at": stale,
                    "last_accessed_at": stale
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    for i in 0..50 {
        let (status, _) = send(
            &ctx.app,
            "POST",
            "/memory",
            Some("editor"),
            Some(json!({
                "record": {
                    "task_query": format!("fresh task {i}"),
                    "outcome": "done",
                    "score": 0.1
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let report = ctx
        .state
        .ltm
        .forgetting
        .run_tick()
        .await
        .unwrap()
        .expect("no concurrent pass");
    assert_eq!(report.examined, 100);
    assert_eq!(report.removed, 50);
    assert_eq!(
        ctx.state.ltm.episodic.scan_records().await.unwrap().len(),
        50
    );

    // Rerunning removes nothing further
    let again = ctx.state.ltm.forgetting.run_tick().await.unwrap().unwrap();
    assert_eq!(again.removed, 0);
}

#[tokio::test]
async fn forget_endpoint_is_idempotent() {
    let ctx = test_context();
    let (_, body) = send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": { "task_query": "disposable", "outcome": "ok", "score": 0.2 }
        })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let predicate = json!({ "ids": [id] });
    let (status, body) = send(&ctx.app, "DELETE", "/forget", Some("editor"), Some(predicate.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(1));

    let (_, body) = send(&ctx.app, "DELETE", "/forget", Some("editor"), Some(predicate)).await;
    assert_eq!(body["removed"], json!(0));
}

#[tokio::test]
async fn forget_and_forget_evaluator_touch_disjoint_stores() {
    let ctx = test_context();
    send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": { "task_query": "keep me", "outcome": "ok", "score": 0.9 }
        })),
    )
    .await;
    send(
        &ctx.app,
        "POST",
        "/evaluator_memory",
        Some("editor"),
        Some(json!({ "critique": { "v": 1 }, "query": "q" })),
    )
    .await;

    // Forgetting all old evaluator critiques leaves episodic intact
    let (_, body) = send(
        &ctx.app,
        "DELETE",
        "/forget_evaluator",
        Some("editor"),
        Some(json!({ "older_than_days": 0.0 })),
    )
    .await;
    assert_eq!(body["removed"], json!(1));
    assert_eq!(
        ctx.state.ltm.episodic.scan_records().await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn health_and_stats_respond_for_viewers() {
    let ctx = test_context();
    let (status, body) = send(&ctx.app, "GET", "/health", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (status, body) = send(&ctx.app, "GET", "/stats", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["retrievals"]["episodic"]["hits"].is_u64());
}
