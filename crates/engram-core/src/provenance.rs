//! Per-record lineage tracking
//!
//! Every consolidation writes one provenance record keyed by memory type and
//! record id; `/provenance/{memory_type}/{record_id}` reads it back.

use std::sync::Arc;

use crate::error::{MemoryError, Result};
use crate::store::{KeyValueStore, PROVENANCE_NAMESPACE};
use crate::types::{MemoryType, Provenance};

pub struct ProvenanceStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProvenanceStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(memory_type: MemoryType, record_id: &str) -> String {
        format!("{}/{}", memory_type.as_str(), record_id)
    }

    /// Record lineage for a freshly consolidated record
    pub async fn record(
        &self,
        memory_type: MemoryType,
        record_id: &str,
        provenance: &Provenance,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(provenance)?;
        self.kv
            .put(PROVENANCE_NAMESPACE, &Self::key(memory_type, record_id), bytes)
            .await
    }

    /// Lineage of a record, or `NotFound`
    pub async fn get(&self, memory_type: MemoryType, record_id: &str) -> Result<Provenance> {
        let bytes = self
            .kv
            .get(PROVENANCE_NAMESPACE, &Self::key(memory_type, record_id))
            .await?
            .ok_or_else(|| {
                MemoryError::NotFound(format!(
                    "no provenance for {} record {record_id}",
                    memory_type.as_str()
                ))
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Drop lineage alongside a forgotten record
    pub async fn forget(&self, memory_type: MemoryType, record_id: &str) -> Result<bool> {
        self.kv
            .remove(PROVENANCE_NAMESPACE, &Self::key(memory_type, record_id))
            .await
    }
}
