//! Episodic memory
//!
//! An insertion log of past task experiences, vector-indexed by an embedding
//! of the task query. The full record travels as the vector payload, so
//! retrieval never needs a second hop.
//!
//! Access-stat updates go through a per-id lock table and replace the stored
//! record wholesale; callers always receive immutable snapshots taken after
//! the update.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::embedder::Embedder;
use crate::error::{FieldError, MemoryError, Result};
use crate::metrics::RetrievalMetrics;
use crate::provenance::ProvenanceStore;
use crate::retry::{with_backoff, RetryPolicy};
use crate::store::{VectorRecord, VectorStore, EPISODIC_COLLECTION};
use crate::types::{
    fresh_id, metadata_matches, now_ts, EpisodicDraft, EpisodicRecord, ForgetPredicate,
    MemoryType, Provenance, QueryInput,
};

/// Extra records fetched beyond `limit` so score/created_at tie-breaks at the
/// cutoff are resolved against the real contenders
const TIE_HEADROOM: usize = 16;

pub struct EpisodicMemory {
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    provenance: Arc<ProvenanceStore>,
    metrics: Arc<RetrievalMetrics>,
    retry: RetryPolicy,
    id_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EpisodicMemory {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        provenance: Arc<ProvenanceStore>,
        metrics: Arc<RetrievalMetrics>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            vectors,
            embedder,
            provenance,
            metrics,
            retry,
            id_locks: DashMap::new(),
        }
    }

    /// Persist one experience; returns its fresh id
    pub async fn consolidate(&self, draft: EpisodicDraft, provenance: Provenance) -> Result<String> {
        draft.validate()?;

        let embedding = self.embedder.embed(&draft.task_query).await?;
        let id = fresh_id();
        let now = now_ts();

        let record = EpisodicRecord {
            id: id.clone(),
            task_query: draft.task_query,
            outcome: draft.outcome,
            plan: draft.plan,
            score: draft.score,
            embedding: embedding.clone(),
            created_at: draft.created_at.unwrap_or(now),
            last_accessed_at: draft.last_accessed_at.unwrap_or(now),
            access_count: 0,
            provenance: provenance.clone(),
        };

        let stored = VectorRecord {
            id: id.clone(),
            vector: embedding,
            payload: serde_json::to_value(&record)?,
        };
        with_backoff(self.retry, "episodic.upsert", || {
            let stored = stored.clone();
            async move { self.vectors.upsert(EPISODIC_COLLECTION, stored).await }
        })
        .await?;

        self.provenance
            .record(MemoryType::Episodic, &id, &provenance)
            .await?;
        debug!(id, "episodic record consolidated");
        Ok(id)
    }

    /// Retrieve up to `limit` records for the query, updating access stats on
    /// every record returned
    pub async fn retrieve(&self, query: &QueryInput, limit: usize) -> Result<Vec<EpisodicRecord>> {
        let ranked = match query {
            QueryInput::Text { text } => {
                let vector = self.embedder.embed(text).await?;
                self.ranked_by_vector(&vector, limit).await?
            }
            QueryInput::Vector { vector } => {
                if vector.len() != self.embedder.dimensions() {
                    return Err(MemoryError::validation_fields(
                        "invalid query vector",
                        vec![FieldError::new(
                            "query.vector",
                            format!(
                                "dimension {} does not match deployment dimension {}",
                                vector.len(),
                                self.embedder.dimensions()
                            ),
                        )],
                    ));
                }
                self.ranked_by_vector(vector, limit).await?
            }
            QueryInput::Metadata(filter) => {
                let mut records = self.matching_metadata(filter).await?;
                records.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then(a.created_at.total_cmp(&b.created_at))
                });
                records.truncate(limit);
                records
            }
        };

        let mut results = Vec::with_capacity(ranked.len());
        for record in ranked {
            if let Some(touched) = self.touch(&record.id).await? {
                results.push(touched);
            }
        }

        self.metrics
            .record_retrieval(MemoryType::Episodic, !results.is_empty());
        Ok(results)
    }

    /// Remove every record matching the predicate; returns how many
    pub async fn forget(&self, predicate: &ForgetPredicate) -> Result<usize> {
        let ids: Vec<String> = match predicate {
            ForgetPredicate::Ids(ids) => ids.clone(),
            ForgetPredicate::OlderThanDays(days) => {
                let cutoff = now_ts() - days * 86_400.0;
                self.scan_records()
                    .await?
                    .into_iter()
                    .filter(|r| r.created_at < cutoff)
                    .map(|r| r.id)
                    .collect()
            }
            ForgetPredicate::Metadata(filter) => {
                let records = with_backoff(self.retry, "episodic.scan", || async move {
                    self.vectors.scan(EPISODIC_COLLECTION).await
                })
                .await?;
                records
                    .into_iter()
                    .filter(|r| metadata_matches(filter, &r.payload))
                    .map(|r| r.id)
                    .collect()
            }
        };

        let removed = with_backoff(self.retry, "episodic.remove", || {
            let ids = ids.clone();
            async move { self.vectors.remove(EPISODIC_COLLECTION, &ids).await }
        })
        .await?;
        for id in &ids {
            self.provenance.forget(MemoryType::Episodic, id).await?;
            self.id_locks.remove(id);
        }
        debug!(removed, "episodic records forgotten");
        Ok(removed)
    }

    /// Every live record; the forgetting engine recomputes candidates from
    /// this on each tick
    pub async fn scan_records(&self) -> Result<Vec<EpisodicRecord>> {
        let records = with_backoff(self.retry, "episodic.scan", || async move {
            self.vectors.scan(EPISODIC_COLLECTION).await
        })
        .await?;
        records
            .into_iter()
            .map(|r| serde_json::from_value(r.payload).map_err(Into::into))
            .collect()
    }

    async fn ranked_by_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<EpisodicRecord>> {
        let hits = with_backoff(self.retry, "episodic.query", || async move {
            self.vectors
                .query(EPISODIC_COLLECTION, vector, limit.saturating_add(TIE_HEADROOM))
                .await
        })
        .await?;

        let mut scored: Vec<(f32, EpisodicRecord)> = hits
            .into_iter()
            .map(|hit| {
                let record: EpisodicRecord = serde_json::from_value(hit.payload)?;
                Ok((hit.score, record))
            })
            .collect::<Result<_>>()?;

        // Cosine desc, then score desc, then created_at asc
        scored.sort_by(|(sim_a, a), (sim_b, b)| {
            sim_b
                .total_cmp(sim_a)
                .then(b.score.total_cmp(&a.score))
                .then(a.created_at.total_cmp(&b.created_at))
        });
        Ok(scored.into_iter().take(limit).map(|(_, r)| r).collect())
    }

    async fn matching_metadata(
        &self,
        filter: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<EpisodicRecord>> {
        let records = with_backoff(self.retry, "episodic.scan", || async move {
            self.vectors.scan(EPISODIC_COLLECTION).await
        })
        .await?;
        records
            .into_iter()
            .filter(|r| metadata_matches(filter, &r.payload))
            .map(|r| serde_json::from_value(r.payload).map_err(Into::into))
            .collect()
    }

    /// Bump access stats under the record's write lock and return the
    /// post-update snapshot. `None` when the record vanished concurrently.
    async fn touch(&self, id: &str) -> Result<Option<EpisodicRecord>> {
        let lock = self
            .id_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let Some(stored) = self.vectors.fetch(EPISODIC_COLLECTION, id).await? else {
            return Ok(None);
        };
        let mut record: EpisodicRecord = serde_json::from_value(stored.payload)?;
        record.last_accessed_at = now_ts();
        record.access_count += 1;

        let updated = VectorRecord {
            id: record.id.clone(),
            vector: stored.vector,
            payload: serde_json::to_value(&record)?,
        };
        self.vectors.upsert(EPISODIC_COLLECTION, updated).await?;
        Ok(Some(record))
    }
}
