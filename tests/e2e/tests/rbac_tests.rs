//! Role matrix and error-shape checks at the HTTP level

use axum::http::StatusCode;
use engram_e2e_tests::{error_code, send, test_context};
use serde_json::json;

/// The full endpoint/role matrix: (method, uri, editor_only)
const MATRIX: &[(&str, &str, bool)] = &[
    ("POST", "/memory", true),
    ("GET", "/memory", false),
    ("POST", "/semantic_consolidate", true),
    ("POST", "/temporal_consolidate", true),
    ("POST", "/propagate_subgraph", true),
    ("GET", "/spatial_query?bbox=0,0,1,1&valid_from=0&valid_to=1", false),
    ("GET", "/temporal_snapshot?valid_at=0&tx_at=0", false),
    ("POST", "/skill", true),
    ("POST", "/skill_vector_query", false),
    ("POST", "/skill_metadata_query", false),
    ("POST", "/evaluator_memory", true),
    ("GET", "/evaluator_memory", false),
    ("DELETE", "/forget", true),
    ("DELETE", "/forget_evaluator", true),
    ("GET", "/provenance/episodic/some-id", false),
    ("GET", "/stats", false),
    ("GET", "/health", false),
];

#[tokio::test]
async fn every_endpoint_rejects_anonymous_and_unknown_roles() {
    let ctx = test_context();
    for (method, uri, _) in MATRIX {
        for role in [None, Some("admin")] {
            let (status, body) = send(&ctx.app, method, uri, role, None).await;
            assert_eq!(
                status,
                StatusCode::FORBIDDEN,
                "{method} {uri} with role {role:?}"
            );
            assert_eq!(error_code(&body), "FORBIDDEN");
        }
    }
}

#[tokio::test]
async fn viewers_are_rejected_from_editor_endpoints_only() {
    let ctx = test_context();
    for (method, uri, editor_only) in MATRIX {
        let (status, _) = send(&ctx.app, method, uri, Some("viewer"), None).await;
        if *editor_only {
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri} as viewer");
        } else {
            assert_ne!(status, StatusCode::FORBIDDEN, "{method} {uri} as viewer");
        }
    }
}

#[tokio::test]
async fn editors_pass_authorization_everywhere() {
    let ctx = test_context();
    for (method, uri, _) in MATRIX {
        let (status, _) = send(&ctx.app, method, uri, Some("editor"), None).await;
        assert_ne!(status, StatusCode::FORBIDDEN, "{method} {uri} as editor");
    }
}

#[tokio::test]
async fn viewer_forget_is_the_canonical_rbac_rejection() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "DELETE",
        "/forget",
        Some("viewer"),
        Some(json!({ "ids": ["x"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn malformed_bodies_yield_field_level_validation_errors() {
    let ctx = test_context();

    // Non-JSON body
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert!(body["error"]["detail"]["fields"].is_array());

    // Unknown field in the record
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": { "task_query": "q", "outcome": "o", "score": 0.5, "surprise": 1 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    // Out-of-range score
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/memory",
        Some("editor"),
        Some(json!({
            "record": { "task_query": "q", "outcome": "o", "score": 1.5 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"]["detail"]["fields"][0]["field"],
        json!("record.score")
    );
}

#[tokio::test]
async fn limit_bounds_are_enforced() {
    let ctx = test_context();

    let (status, _) = send(
        &ctx.app,
        "GET",
        "/memory?limit=1",
        Some("viewer"),
        Some(json!({ "query": { "text": "anything" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/memory?limit=51",
        Some("viewer"),
        Some(json!({ "query": { "text": "anything" } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, _) = send(
        &ctx.app,
        "GET",
        "/memory?limit=0",
        Some("viewer"),
        Some(json!({ "query": { "text": "anything" } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cypher_against_embedded_graph_surfaces_backend_unavailable() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/semantic_consolidate",
        Some("editor"),
        Some(json!({ "payload": "MATCH (n) RETURN n", "format": "cypher" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "BACKEND_UNAVAILABLE");
}

#[tokio::test]
async fn unknown_memory_type_is_a_validation_error() {
    let ctx = test_context();
    let (status, body) = send(
        &ctx.app,
        "GET",
        "/memory?memory_type=holographic",
        Some("viewer"),
        Some(json!({ "query": { "text": "x" } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}
