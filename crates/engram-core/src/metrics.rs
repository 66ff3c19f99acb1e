//! Retrieval hit/miss counters
//!
//! Atomic counters per memory type, mirrored onto the `metrics` facade
//! (`ltm.hits` / `ltm.misses`, labeled by `memory_type`). The facade is a
//! no-op unless the deployment installs a recorder, so the service degrades
//! gracefully when no observability sink is present.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use serde::Serialize;

use crate::types::MemoryType;

#[derive(Debug, Default)]
struct HitMiss {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Per-module retrieval counters
#[derive(Debug, Default)]
pub struct RetrievalMetrics {
    episodic: HitMiss,
    semantic: HitMiss,
    temporal: HitMiss,
    procedural: HitMiss,
    evaluator: HitMiss,
}

/// Point-in-time counter values for one memory type
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HitMissSnapshot {
    pub hits: u64,
    pub misses: u64,
}

/// Counters across all memory types
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub episodic: HitMissSnapshot,
    pub semantic: HitMissSnapshot,
    pub temporal: HitMissSnapshot,
    pub procedural: HitMissSnapshot,
    pub evaluator: HitMissSnapshot,
}

impl RetrievalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, memory_type: MemoryType) -> &HitMiss {
        match memory_type {
            MemoryType::Episodic => &self.episodic,
            MemoryType::Semantic => &self.semantic,
            MemoryType::Temporal => &self.temporal,
            MemoryType::Procedural => &self.procedural,
            MemoryType::Evaluator => &self.evaluator,
        }
    }

    /// Record a retrieval outcome: at least one result is a hit
    pub fn record_retrieval(&self, memory_type: MemoryType, found_any: bool) {
        let slot = self.slot(memory_type);
        if found_any {
            slot.hits.fetch_add(1, Ordering::Relaxed);
            counter!("ltm.hits", "memory_type" => memory_type.as_str()).increment(1);
        } else {
            slot.misses.fetch_add(1, Ordering::Relaxed);
            counter!("ltm.misses", "memory_type" => memory_type.as_str()).increment(1);
        }
    }

    pub fn snapshot_of(&self, memory_type: MemoryType) -> HitMissSnapshot {
        let slot = self.slot(memory_type);
        HitMissSnapshot {
            hits: slot.hits.load(Ordering::Relaxed),
            misses: slot.misses.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            episodic: self.snapshot_of(MemoryType::Episodic),
            semantic: self.snapshot_of(MemoryType::Semantic),
            temporal: self.snapshot_of(MemoryType::Temporal),
            procedural: self.snapshot_of(MemoryType::Procedural),
            evaluator: self.snapshot_of(MemoryType::Evaluator),
        }
    }
}
