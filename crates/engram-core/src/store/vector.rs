//! In-memory vector store
//!
//! Reference implementation of [`VectorStore`]: collections of records behind
//! one `RwLock`, brute-force cosine scoring. Records are replaced wholesale on
//! upsert, so readers never observe a half-written record.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ScoredPoint, VectorRecord, VectorStore};
use crate::embedder::cosine_similarity;
use crate::error::Result;

#[derive(Default)]
struct Collection {
    /// id -> position in `order`
    index: HashMap<String, usize>,
    /// insertion-ordered records; tombstones are None
    order: Vec<Option<VectorRecord>>,
}

impl Collection {
    fn upsert(&mut self, record: VectorRecord) {
        match self.index.get(&record.id) {
            Some(&pos) => self.order[pos] = Some(record),
            None => {
                self.index.insert(record.id.clone(), self.order.len());
                self.order.push(Some(record));
            }
        }
    }

    fn live(&self) -> impl Iterator<Item = &VectorRecord> {
        self.order.iter().flatten()
    }
}

#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.index.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<()> {
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .upsert(record);
        Ok(())
    }

    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<VectorRecord>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).and_then(|c| {
            c.index
                .get(id)
                .and_then(|&pos| c.order[pos].clone())
        }))
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(vec![]);
        };
        let mut scored: Vec<ScoredPoint> = coll
            .live()
            .map(|r| ScoredPoint {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.vector),
                payload: r.payload.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<VectorRecord>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|c| c.live().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let mut collections = self.collections.write();
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in ids {
            if let Some(pos) = coll.index.remove(id) {
                coll.order[pos] = None;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
