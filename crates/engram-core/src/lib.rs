//! # Engram Core
//!
//! Long-term memory engine for fleets of cooperating research agents.
//! Five memory modules share a set of pluggable storage adapters:
//!
//! - **Episodic**: vector-indexed records of past tasks with access-stat
//!   tracking and utility-driven forgetting
//! - **Semantic**: a knowledge graph of `(subject, predicate, object)`
//!   triples with MERGE semantics and atomic subgraph propagation
//! - **Temporal**: bitemporal fact versions with spatial attributes,
//!   answerable as of any historical transaction time
//! - **Procedural**: reusable skills retrievable by similarity or metadata
//! - **Evaluator**: critiques keyed by deterministic query fingerprints
//!
//! Everything network-facing (embedder, vector store, graph store) sits
//! behind a trait with a cancellable exponential retry envelope; in-memory
//! reference adapters make the engine fully testable without external
//! services.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engram_core::{LtmConfig, LtmService};
//! use engram_core::types::{EpisodicDraft, Provenance, QueryInput};
//!
//! let service = LtmService::from_config(LtmConfig::from_env())?;
//!
//! let id = service.episodic.consolidate(draft, Provenance::now("agent-1", None)).await?;
//! let hits = service.episodic.retrieve(&QueryInput::Text { text: "...".into() }, 5).await?;
//! ```

pub mod config;
pub mod embedder;
pub mod error;
pub mod forgetting;
pub mod memory;
pub mod metrics;
pub mod provenance;
pub mod retry;
pub mod service;
pub mod store;
pub mod types;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use config::LtmConfig;
pub use embedder::{cosine_similarity, CachedEmbedder, Embedder, HashingEmbedder};
pub use error::{ErrorCode, FieldError, MemoryError, Result};
pub use forgetting::{ForgettingEngine, ForgettingPolicy, ForgettingReport};
pub use memory::{
    fingerprint, ConsolidateFormat, EpisodicMemory, EvaluatorMemory, ProceduralMemory,
    SemanticMemory, TemporalMemory,
};
pub use metrics::{MetricsSnapshot, RetrievalMetrics};
pub use provenance::ProvenanceStore;
pub use retry::RetryPolicy;
pub use service::LtmService;
pub use store::{
    GraphStore, InMemoryGraphStore, InMemoryKeyValueStore, InMemoryVectorStore, KeyValueStore,
    ScoredPoint, SqliteKeyValueStore, VectorRecord, VectorStore,
};
pub use types::{
    BoundingBox, Critique, EntitySpec, EpisodicDraft, EpisodicRecord, ForgetPredicate,
    ForgetRequest, GeoPoint, MemoryType, Provenance, QueryInput, SemanticTriple, Skill,
    SkillDraft, SkillRepresentation, TemporalFact, TemporalFactDraft, TimeWindow, TriplePattern,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
