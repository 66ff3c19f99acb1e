//! End-to-end test harness
//!
//! Builds the full router over in-memory adapters and the deterministic
//! embedder, and keeps direct handles to the stores so tests can observe
//! persisted state (e.g. assigned transaction times).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use engram_core::{
    HashingEmbedder, InMemoryGraphStore, InMemoryKeyValueStore, InMemoryVectorStore, LtmConfig,
    LtmService,
};
use engram_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Embedding dimension used across the e2e suite
pub const TEST_DIMENSIONS: usize = 32;

pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub graph: Arc<InMemoryGraphStore>,
}

/// Full service over in-memory adapters
pub fn test_context() -> TestContext {
    let config = LtmConfig {
        embed_dimensions: TEST_DIMENSIONS,
        ..LtmConfig::default()
    };
    let graph = Arc::new(InMemoryGraphStore::new());
    let service = Arc::new(LtmService::new(
        config,
        Arc::new(InMemoryVectorStore::new()),
        graph.clone(),
        Arc::new(InMemoryKeyValueStore::new()),
        Arc::new(HashingEmbedder::new(TEST_DIMENSIONS)),
    ));
    let state = AppState::new(service);
    TestContext {
        app: build_router(state.clone()),
        state,
        graph,
    }
}

/// Send one request through the router; returns status and parsed JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    role: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header("x-role", role);
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request builds"))
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is JSON")
    };
    (status, value)
}

/// Error code out of a failure response body
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("<missing>")
}
