//! Forgetting engine
//!
//! Bounds episodic memory with a hybrid decay policy: records untouched for
//! longer than the TTL become candidates, and candidates whose utility
//! `alpha*score + beta*ln(1 + access_count) - gamma*age_days` falls below the
//! threshold are removed. Semantic, temporal, and procedural memory are
//! never touched.
//!
//! Each tick is one pass over the live store, so a pass that fails midway is
//! idempotent on retry: the next tick recomputes candidates from scratch.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::LtmConfig;
use crate::error::Result;
use crate::memory::EpisodicMemory;
use crate::types::{now_ts, EpisodicRecord, ForgetPredicate};

/// Tunable decay policy
#[derive(Debug, Clone)]
pub struct ForgettingPolicy {
    pub ttl_days: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub threshold: f64,
}

impl Default for ForgettingPolicy {
    fn default() -> Self {
        Self {
            ttl_days: crate::config::DEFAULT_TTL_DAYS,
            alpha: crate::config::DEFAULT_FORGET_ALPHA,
            beta: crate::config::DEFAULT_FORGET_BETA,
            gamma: crate::config::DEFAULT_FORGET_GAMMA,
            threshold: crate::config::DEFAULT_FORGET_THRESHOLD,
        }
    }
}

impl ForgettingPolicy {
    pub fn from_config(config: &LtmConfig) -> Self {
        Self {
            ttl_days: config.ttl_days,
            alpha: config.forget_alpha,
            beta: config.forget_beta,
            gamma: config.forget_gamma,
            threshold: config.forget_threshold,
        }
    }

    /// A record untouched past the TTL is up for removal
    pub fn is_candidate(&self, record: &EpisodicRecord, now: f64) -> bool {
        now - record.last_accessed_at > self.ttl_days * 86_400.0
    }

    /// Survival value of a candidate
    pub fn utility(&self, record: &EpisodicRecord, now: f64) -> f64 {
        let age_days = (now - record.created_at).max(0.0) / 86_400.0;
        self.alpha * record.score + self.beta * (1.0 + record.access_count as f64).ln()
            - self.gamma * age_days
    }
}

/// Outcome of one forgetting pass
#[derive(Debug, Clone, Serialize)]
pub struct ForgettingReport {
    pub examined: usize,
    pub candidates: usize,
    pub removed: usize,
    pub duration_ms: u64,
}

pub struct ForgettingEngine {
    episodic: Arc<EpisodicMemory>,
    policy: ForgettingPolicy,
    /// At most one pass at a time; an overlapping tick is skipped
    tick_lock: Mutex<()>,
}

impl ForgettingEngine {
    pub fn new(episodic: Arc<EpisodicMemory>, policy: ForgettingPolicy) -> Self {
        Self {
            episodic,
            policy,
            tick_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &ForgettingPolicy {
        &self.policy
    }

    /// Run one pass; returns `None` when a pass is already running
    pub async fn run_tick(&self) -> Result<Option<ForgettingReport>> {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            debug!("forgetting pass already running, skipping tick");
            return Ok(None);
        };
        let started = Instant::now();
        let now = now_ts();

        let records = self.episodic.scan_records().await?;
        let examined = records.len();

        let candidates: Vec<&EpisodicRecord> = records
            .iter()
            .filter(|r| self.policy.is_candidate(r, now))
            .collect();
        let doomed: Vec<String> = candidates
            .iter()
            .filter(|r| self.policy.utility(r, now) < self.policy.threshold)
            .map(|r| r.id.clone())
            .collect();

        let removed = if doomed.is_empty() {
            0
        } else {
            self.episodic.forget(&ForgetPredicate::Ids(doomed)).await?
        };

        let report = ForgettingReport {
            examined,
            candidates: candidates.len(),
            removed,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            examined = report.examined,
            candidates = report.candidates,
            removed = report.removed,
            duration_ms = report.duration_ms,
            "forgetting pass complete"
        );
        Ok(Some(report))
    }
}
