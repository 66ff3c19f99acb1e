//! Service assembly
//!
//! Wires adapters, embedder, modules, provenance, metrics, and the
//! forgetting engine into one [`LtmService`]. Everything is an explicit
//! dependency injected here; there is no module-level state.

use std::sync::Arc;

use tracing::info;

use crate::config::LtmConfig;
use crate::embedder::{CachedEmbedder, Embedder, HashingEmbedder};
use crate::error::Result;
use crate::forgetting::{ForgettingEngine, ForgettingPolicy};
use crate::memory::{
    EpisodicMemory, EvaluatorMemory, ProceduralMemory, SemanticMemory, TemporalMemory,
};
use crate::metrics::RetrievalMetrics;
use crate::provenance::ProvenanceStore;
use crate::retry::RetryPolicy;
use crate::store::{
    GraphStore, InMemoryGraphStore, InMemoryKeyValueStore, InMemoryVectorStore, KeyValueStore,
    SqliteKeyValueStore, VectorStore,
};

/// The assembled long-term memory service
pub struct LtmService {
    pub episodic: Arc<EpisodicMemory>,
    pub semantic: Arc<SemanticMemory>,
    pub temporal: Arc<TemporalMemory>,
    pub procedural: Arc<ProceduralMemory>,
    pub evaluator: Arc<EvaluatorMemory>,
    pub forgetting: Arc<ForgettingEngine>,
    pub provenance: Arc<ProvenanceStore>,
    pub metrics: Arc<RetrievalMetrics>,
    pub config: LtmConfig,
}

impl LtmService {
    /// Assemble the service from explicit adapters
    pub fn new(
        config: LtmConfig,
        vectors: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        kv: Arc<dyn KeyValueStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let retry =
            RetryPolicy::default().with_per_call_timeout(config.backend_timeout);
        let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
            embedder,
            config.embed_cache_size.max(1),
            retry,
        ));
        let metrics = Arc::new(RetrievalMetrics::new());
        let provenance = Arc::new(ProvenanceStore::new(kv.clone()));

        let episodic = Arc::new(EpisodicMemory::new(
            vectors.clone(),
            embedder.clone(),
            provenance.clone(),
            metrics.clone(),
            retry,
        ));
        let semantic = Arc::new(SemanticMemory::new(
            graph.clone(),
            provenance.clone(),
            metrics.clone(),
            retry,
        ));
        let temporal = Arc::new(TemporalMemory::new(
            graph,
            provenance.clone(),
            metrics.clone(),
            retry,
        ));
        let procedural = Arc::new(ProceduralMemory::new(
            vectors,
            kv.clone(),
            embedder,
            provenance.clone(),
            metrics.clone(),
            retry,
        ));
        let evaluator = Arc::new(EvaluatorMemory::new(
            kv,
            provenance.clone(),
            metrics.clone(),
        ));
        let forgetting = Arc::new(ForgettingEngine::new(
            episodic.clone(),
            ForgettingPolicy::from_config(&config),
        ));

        Self {
            episodic,
            semantic,
            temporal,
            procedural,
            evaluator,
            forgetting,
            provenance,
            metrics,
            config,
        }
    }

    /// Assemble from configuration: embedded adapters, with the sqlite
    /// key-value store when a data directory is configured. Configured
    /// external store URLs are logged; their adapters live with the
    /// deployment that provides them.
    pub fn from_config(config: LtmConfig) -> Result<Self> {
        if let Some(url) = &config.vector_store_url {
            info!(url, "external vector store configured; deployment provides its adapter");
        }
        if let Some(uri) = &config.graph_store_uri {
            info!(uri, "external graph store configured; deployment provides its adapter");
        } else {
            info!("no graph store configured, using in-memory fallback");
        }

        let kv: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "opening sqlite key-value store");
                Arc::new(SqliteKeyValueStore::open(dir.clone())?)
            }
            None => Arc::new(InMemoryKeyValueStore::new()),
        };
        let embedder = Arc::new(HashingEmbedder::new(config.embed_dimensions));

        Ok(Self::new(
            config,
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryGraphStore::new()),
            kv,
            embedder,
        ))
    }
}
