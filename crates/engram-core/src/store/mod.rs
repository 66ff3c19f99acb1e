//! Storage adapters
//!
//! Abstract seams over the three stores the service coordinates: a vector
//! store for similarity lookup, a graph store for triples and bitemporal
//! facts, and a key-value store for policies, critiques, and provenance.
//! Components own adapters through these traits only; adapters never call
//! back into components.
//!
//! The in-memory implementations are the embedded deployment and the test
//! reference. External Weaviate/Neo4j adapters implement the same traits in
//! the deployment that needs them.

mod graph;
mod kv;
mod sqlite;
mod vector;

pub use graph::InMemoryGraphStore;
pub use kv::InMemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
pub use vector::InMemoryVectorStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{BoundingBox, EntitySpec, SemanticTriple, TemporalFact, TimeWindow, TriplePattern};

/// Vector collection names, one per module needing similarity lookup
pub const EPISODIC_COLLECTION: &str = "episodic_records";
pub const SKILLS_COLLECTION: &str = "skills";

/// Key-value namespaces
pub const SKILL_POLICY_NAMESPACE: &str = "skill_policies";
pub const CRITIQUE_NAMESPACE: &str = "critiques";
pub const PROVENANCE_NAMESPACE: &str = "provenance";

/// One stored point: id, vector, and a payload carrying everything needed to
/// reconstruct the record without a second hop
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// Query hit with its cosine similarity
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Upsert/query-by-vector storage
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a record; publication is atomic per record
    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<()>;

    /// Fetch one record by id
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<VectorRecord>>;

    /// Top-`limit` records by descending cosine similarity
    async fn query(&self, collection: &str, vector: &[f32], limit: usize)
        -> Result<Vec<ScoredPoint>>;

    /// Every record in the collection, in insertion order
    async fn scan(&self, collection: &str) -> Result<Vec<VectorRecord>>;

    /// Remove records by id; returns how many existed
    async fn remove(&self, collection: &str, ids: &[String]) -> Result<usize>;
}

/// Graph storage with MERGE semantics and a bitemporal fact log
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// MERGE an entity node keyed by `name`; returns the node key
    async fn merge_entity(&self, name: &str) -> Result<String>;

    /// MERGE a relation keyed by `(subject, predicate, object)`; entity
    /// endpoints are MERGEd implicitly. Returns the relation key.
    async fn merge_relation(&self, triple: &SemanticTriple) -> Result<String>;

    /// Relations matching the pattern, in insertion order
    async fn find_relations(&self, pattern: &TriplePattern) -> Result<Vec<SemanticTriple>>;

    /// MERGE a whole subgraph in one transaction: observers see all of its
    /// relations or none. Returns the relation keys.
    async fn merge_subgraph(
        &self,
        entities: &[EntitySpec],
        relations: &[SemanticTriple],
    ) -> Result<Vec<String>>;

    /// Execute a raw statement and return its rows. Backends without a query
    /// language reject this unambiguously (no retry).
    async fn run_statement(&self, statement: &str) -> Result<Vec<Value>>;

    /// Append one bitemporal fact; never overwrites
    async fn append_fact(&self, fact: &TemporalFact) -> Result<()>;

    /// All versions recorded for `(subject, predicate)`, in append order
    async fn facts_for_pair(&self, subject: &str, predicate: &str) -> Result<Vec<TemporalFact>>;

    /// Facts with a location inside the closed bbox whose validity interval
    /// intersects the window
    async fn facts_in_region(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
    ) -> Result<Vec<TemporalFact>>;
}

/// Binary-safe key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()>;

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Returns whether the key existed
    async fn remove(&self, namespace: &str, key: &str) -> Result<bool>;

    /// Every `(key, value)` pair in the namespace
    async fn scan(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>>;
}
