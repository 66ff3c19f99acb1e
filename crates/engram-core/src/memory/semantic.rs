//! Semantic memory
//!
//! A knowledge graph of `(subject, predicate, object)` triples with MERGE
//! semantics: node identity is `name`, relation identity is the triple, and
//! re-consolidating a fact never duplicates it.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{FieldError, MemoryError, Result};
use crate::metrics::RetrievalMetrics;
use crate::provenance::ProvenanceStore;
use crate::retry::{with_backoff, RetryPolicy};
use crate::store::GraphStore;
use crate::types::{EntitySpec, MemoryType, Provenance, SemanticTriple, TriplePattern};

/// Accepted consolidation payload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidateFormat {
    Jsonld,
    Cypher,
}

/// Wire shape of a jsonld consolidation payload
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TripleDraft {
    subject: String,
    predicate: String,
    object: String,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct SemanticMemory {
    graph: Arc<dyn GraphStore>,
    provenance: Arc<ProvenanceStore>,
    metrics: Arc<RetrievalMetrics>,
    retry: RetryPolicy,
}

impl SemanticMemory {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        provenance: Arc<ProvenanceStore>,
        metrics: Arc<RetrievalMetrics>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            graph,
            provenance,
            metrics,
            retry,
        }
    }

    /// Consolidate one payload; returns the produced identifiers (jsonld) or
    /// the statement's rows (cypher)
    pub async fn consolidate(
        &self,
        payload: Value,
        format: ConsolidateFormat,
        provenance: Provenance,
    ) -> Result<Vec<Value>> {
        match format {
            ConsolidateFormat::Jsonld => {
                let draft: TripleDraft = serde_json::from_value(payload).map_err(|e| {
                    MemoryError::validation_fields(
                        "invalid jsonld payload",
                        vec![FieldError::new("payload", e.to_string())],
                    )
                })?;
                let triple = SemanticTriple {
                    subject: draft.subject,
                    predicate: draft.predicate,
                    object: draft.object,
                    confidence: draft.confidence,
                    provenance: Some(provenance.clone()),
                };
                triple.validate()?;

                let triple_ref = &triple;
                let relation_key = with_backoff(self.retry, "graph.merge", || async move {
                    self.graph.merge_entity(&triple_ref.subject).await?;
                    self.graph.merge_entity(&triple_ref.object).await?;
                    self.graph.merge_relation(triple_ref).await
                })
                .await?;

                self.provenance
                    .record(MemoryType::Semantic, &relation_key, &provenance)
                    .await?;
                debug!(relation = %relation_key, "semantic triple consolidated");
                Ok(vec![
                    Value::String(triple.subject.clone()),
                    Value::String(triple.object.clone()),
                    Value::String(relation_key),
                ])
            }
            ConsolidateFormat::Cypher => {
                let Value::String(statement) = payload else {
                    return Err(MemoryError::validation_fields(
                        "invalid cypher payload",
                        vec![FieldError::new("payload", "must be a statement string")],
                    ));
                };
                // A store without a query language rejects unambiguously;
                // that rejection passes through the envelope unretried.
                let statement = statement.as_str();
                with_backoff(self.retry, "graph.statement", || async move {
                    self.graph.run_statement(statement).await
                })
                .await
            }
        }
    }

    /// MERGE a whole subgraph atomically; returns the relation keys
    pub async fn propagate_subgraph(
        &self,
        entities: &[EntitySpec],
        relations: &[SemanticTriple],
        provenance: Provenance,
    ) -> Result<Vec<String>> {
        for triple in relations {
            triple.validate()?;
        }

        let keys = with_backoff(self.retry, "graph.subgraph", || async move {
            self.graph.merge_subgraph(entities, relations).await
        })
        .await?;

        for key in &keys {
            self.provenance
                .record(MemoryType::Semantic, key, &provenance)
                .await?;
        }
        debug!(relations = keys.len(), "subgraph propagated");
        Ok(keys)
    }

    /// Relations matching the pattern, ordered by confidence (absent = 0)
    /// descending, then insertion order
    pub async fn retrieve(
        &self,
        pattern: &TriplePattern,
        limit: usize,
    ) -> Result<Vec<SemanticTriple>> {
        let mut relations = with_backoff(self.retry, "graph.find", || async move {
            self.graph.find_relations(pattern).await
        })
        .await?;

        // Stable sort keeps insertion order within equal confidence
        relations.sort_by(|a, b| {
            b.confidence
                .unwrap_or(0.0)
                .total_cmp(&a.confidence.unwrap_or(0.0))
        });
        relations.truncate(limit);

        self.metrics
            .record_retrieval(MemoryType::Semantic, !relations.is_empty());
        Ok(relations)
    }
}
