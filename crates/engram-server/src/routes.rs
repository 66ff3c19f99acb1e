//! Router assembly

use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::deadline;
use crate::handlers;
use crate::state::AppState;

/// Maximum concurrently-served requests
const CONCURRENCY_LIMIT: usize = 256;

/// Build the axum router with every endpoint and the shared layers
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Episodic
        .route("/memory", post(handlers::episodic::post_memory))
        .route("/memory", get(handlers::episodic::get_memory))
        .route("/forget", delete(handlers::episodic::delete_forget))
        // Semantic
        .route(
            "/semantic_consolidate",
            post(handlers::semantic::post_semantic_consolidate),
        )
        .route(
            "/propagate_subgraph",
            post(handlers::semantic::post_propagate_subgraph),
        )
        // Temporal
        .route(
            "/temporal_consolidate",
            post(handlers::temporal::post_temporal_consolidate),
        )
        .route("/spatial_query", get(handlers::temporal::get_spatial_query))
        .route(
            "/temporal_snapshot",
            get(handlers::temporal::get_temporal_snapshot),
        )
        // Procedural
        .route("/skill", post(handlers::procedural::post_skill))
        .route(
            "/skill_vector_query",
            post(handlers::procedural::post_skill_vector_query),
        )
        .route(
            "/skill_metadata_query",
            post(handlers::procedural::post_skill_metadata_query),
        )
        // Evaluator
        .route(
            "/evaluator_memory",
            post(handlers::evaluator::post_evaluator_memory),
        )
        .route(
            "/evaluator_memory",
            get(handlers::evaluator::get_evaluator_memory),
        )
        .route(
            "/forget_evaluator",
            delete(handlers::evaluator::delete_forget_evaluator),
        )
        // Lineage & operations
        .route(
            "/provenance/{memory_type}/{record_id}",
            get(handlers::misc::get_provenance),
        )
        .route("/stats", get(handlers::misc::get_stats))
        .route("/health", get(handlers::misc::get_health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .concurrency_limit(CONCURRENCY_LIMIT)
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    deadline::enforce,
                )),
        )
        .with_state(state)
}
