//! Evaluator memory
//!
//! Persisted critiques keyed by a deterministic fingerprint of their query
//! context, so later runs of the same query surface earlier critiques.
//! Fingerprinting canonicalizes the context first: object keys are sorted,
//! strings are trimmed and lowercased, arrays keep their order.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::metrics::RetrievalMetrics;
use crate::provenance::ProvenanceStore;
use crate::store::{KeyValueStore, CRITIQUE_NAMESPACE};
use crate::types::{
    fresh_id, metadata_matches, now_ts, Critique, ForgetPredicate, MemoryType, Provenance,
};

/// Deterministic fingerprint of a normalized query context
pub fn fingerprint(query: &Value) -> String {
    let mut canonical = String::new();
    canonicalize(query, &mut canonical);
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

fn canonicalize(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(&s.trim().to_lowercase());
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonicalize(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                canonicalize(&map[*key], out);
            }
            out.push('}');
        }
    }
}

pub struct EvaluatorMemory {
    kv: Arc<dyn KeyValueStore>,
    provenance: Arc<ProvenanceStore>,
    metrics: Arc<RetrievalMetrics>,
}

impl EvaluatorMemory {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        provenance: Arc<ProvenanceStore>,
        metrics: Arc<RetrievalMetrics>,
    ) -> Self {
        Self {
            kv,
            provenance,
            metrics,
        }
    }

    /// Persist one critique for the given query context; returns its id
    pub async fn store(
        &self,
        critique_payload: Value,
        query_context: &Value,
        provenance: Provenance,
    ) -> Result<String> {
        let id = fresh_id();
        let critique = Critique {
            id: id.clone(),
            critique_payload,
            query_fingerprint: fingerprint(query_context),
            created_at: now_ts(),
            provenance: provenance.clone(),
        };

        self.kv
            .put(CRITIQUE_NAMESPACE, &id, serde_json::to_vec(&critique)?)
            .await?;
        self.provenance
            .record(MemoryType::Evaluator, &id, &provenance)
            .await?;
        debug!(id, fingerprint = %critique.query_fingerprint, "critique stored");
        Ok(id)
    }

    /// Up to `limit` critiques whose fingerprint matches the query context,
    /// newest first
    pub async fn retrieve(&self, query_context: &Value, limit: usize) -> Result<Vec<Critique>> {
        let wanted = fingerprint(query_context);
        let mut matches: Vec<Critique> = self
            .scan()
            .await?
            .into_iter()
            .filter(|c| c.query_fingerprint == wanted)
            .collect();
        matches.sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
        matches.truncate(limit);

        self.metrics
            .record_retrieval(MemoryType::Evaluator, !matches.is_empty());
        Ok(matches)
    }

    /// Remove critiques matching the predicate; returns how many
    pub async fn forget(&self, predicate: &ForgetPredicate) -> Result<usize> {
        let ids: Vec<String> = match predicate {
            ForgetPredicate::Ids(ids) => {
                let known: std::collections::HashSet<String> =
                    self.scan().await?.into_iter().map(|c| c.id).collect();
                ids.iter().filter(|id| known.contains(*id)).cloned().collect()
            }
            ForgetPredicate::OlderThanDays(days) => {
                let cutoff = now_ts() - days * 86_400.0;
                self.scan()
                    .await?
                    .into_iter()
                    .filter(|c| c.created_at < cutoff)
                    .map(|c| c.id)
                    .collect()
            }
            ForgetPredicate::Metadata(filter) => self
                .scan()
                .await?
                .into_iter()
                .filter(|c| {
                    serde_json::to_value(c)
                        .map(|v| metadata_matches(filter, &v))
                        .unwrap_or(false)
                })
                .map(|c| c.id)
                .collect(),
        };

        let mut removed = 0;
        for id in &ids {
            if self.kv.remove(CRITIQUE_NAMESPACE, id).await? {
                removed += 1;
                self.provenance.forget(MemoryType::Evaluator, id).await?;
            }
        }
        debug!(removed, "critiques forgotten");
        Ok(removed)
    }

    async fn scan(&self) -> Result<Vec<Critique>> {
        self.kv
            .scan(CRITIQUE_NAMESPACE)
            .await?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(Into::into))
            .collect()
    }
}
