//! Temporal memory
//!
//! Bitemporal facts: every consolidation appends a new version with its own
//! server-assigned `tx_time`; history is never rewritten. Writes to the same
//! `(subject, predicate)` are serialized under a per-pair lock so assigned
//! `tx_time` values are strictly increasing even when the wall clock stalls.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::metrics::RetrievalMetrics;
use crate::provenance::ProvenanceStore;
use crate::retry::{with_backoff, RetryPolicy};
use crate::store::GraphStore;
use crate::types::{
    fresh_id, now_ts, BoundingBox, MemoryType, Provenance, TemporalFact, TemporalFactDraft,
    TimeWindow,
};

/// Minimum spacing between tx_times assigned to the same pair when the
/// clock does not advance
const TX_EPSILON: f64 = 1e-6;

type PairKey = (String, String);

pub struct TemporalMemory {
    graph: Arc<dyn GraphStore>,
    provenance: Arc<ProvenanceStore>,
    metrics: Arc<RetrievalMetrics>,
    retry: RetryPolicy,
    /// Last assigned tx_time per pair; `None` until the store is consulted
    pair_locks: DashMap<PairKey, Arc<Mutex<Option<f64>>>>,
}

impl TemporalMemory {
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
            pair_locks: DashMap::new(),
        }
    }

    /// Append one fact version; returns its fresh id
    pub async fn consolidate(
        &self,
        draft: TemporalFactDraft,
        provenance: Provenance,
    ) -> Result<String> {
        draft.validate()?;

        // tx_time is assigned under the pair lock, so it stays open until
        // the version is persisted
        let mut fact = TemporalFact {
            id: fresh_id(),
            subject: draft.subject,
            predicate: draft.predicate,
            object: draft.object,
            value: draft.value,
            location: draft.location,
            valid_from: draft.valid_from,
            valid_to: draft.valid_to,
            tx_time: 0.0,
            provenance: provenance.clone(),
        };

        let key: PairKey = (fact.subject.clone(), fact.predicate.clone());
        let lock = self
            .pair_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        let mut last_tx = lock.lock().await;

        // First touch after startup: resume strictly above what is persisted
        if last_tx.is_none() {
            let fact_ref = &fact;
            let existing = with_backoff(self.retry, "graph.facts_for_pair", || async move {
                self.graph
                    .facts_for_pair(&fact_ref.subject, &fact_ref.predicate)
                    .await
            })
            .await?;
            *last_tx = Some(
                existing
                    .iter()
                    .map(|f| f.tx_time)
                    .fold(f64::NEG_INFINITY, f64::max),
            );
        }

        let floor = last_tx.expect("initialized above");
        let mut tx_time = now_ts();
        if tx_time <= floor {
            tx_time = floor + TX_EPSILON;
        }
        fact.tx_time = tx_time;

        let fact_ref = &fact;
        with_backoff(self.retry, "graph.append_fact", || async move {
            self.graph.append_fact(fact_ref).await
        })
        .await?;
        *last_tx = Some(tx_time);
        drop(last_tx);

        self.provenance
            .record(MemoryType::Temporal, &fact.id, &provenance)
            .await?;
        debug!(id = %fact.id, tx_time, "temporal fact appended");
        Ok(fact.id)
    }

    /// Facts located inside the closed bbox whose validity intersects the
    /// window, ordered by `valid_from` then `tx_time` ascending
    pub async fn spatial_query(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
    ) -> Result<Vec<TemporalFact>> {
        bbox.validate()?;

        let mut facts = with_backoff(self.retry, "graph.facts_in_region", || async move {
            self.graph.facts_in_region(bbox, window).await
        })
        .await?;
        facts.sort_by(|a, b| {
            a.valid_from
                .total_cmp(&b.valid_from)
                .then(a.tx_time.total_cmp(&b.tx_time))
        });

        self.metrics
            .record_retrieval(MemoryType::Temporal, !facts.is_empty());
        Ok(facts)
    }

    /// For each pair, the single version with the largest `tx_time <= tx_at`
    /// whose validity interval contains `valid_at`. Pairs with no such
    /// version contribute nothing.
    pub async fn snapshot(
        &self,
        valid_at: f64,
        tx_at: f64,
        pairs: &[(String, String)],
    ) -> Result<Vec<TemporalFact>> {
        let mut results = Vec::new();
        for (subject, predicate) in pairs {
            let versions = with_backoff(self.retry, "graph.facts_for_pair", || async move {
                self.graph.facts_for_pair(subject, predicate).await
            })
            .await?;
            let best = versions
                .into_iter()
                .filter(|f| f.tx_time <= tx_at && f.validity().contains(valid_at))
                .max_by(|a, b| a.tx_time.total_cmp(&b.tx_time));
            if let Some(fact) = best {
                results.push(fact);
            }
        }

        self.metrics
            .record_retrieval(MemoryType::Temporal, !results.is_empty());
        Ok(results)
    }
}
