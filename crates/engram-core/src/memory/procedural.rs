//! Procedural memory
//!
//! Reusable skills: a policy blob, a representation (text embedded on
//! ingest, or a ready vector of the deployment dimension), and free-form
//! metadata. Lookup is by vector similarity or exact-match metadata
//! conjunction.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::embedder::Embedder;
use crate::error::{FieldError, MemoryError, Result};
use crate::metrics::RetrievalMetrics;
use crate::provenance::ProvenanceStore;
use crate::retry::{with_backoff, RetryPolicy};
use crate::store::{
    KeyValueStore, VectorRecord, VectorStore, SKILLS_COLLECTION, SKILL_POLICY_NAMESPACE,
};
use crate::types::{
    fresh_id, metadata_matches, now_ts, MemoryType, Provenance, QueryInput, Skill, SkillDraft,
    SkillRepresentation,
};

pub struct ProceduralMemory {
    vectors: Arc<dyn VectorStore>,
    kv: Arc<dyn KeyValueStore>,
    embedder: Arc<dyn Embedder>,
    provenance: Arc<ProvenanceStore>,
    metrics: Arc<RetrievalMetrics>,
    retry: RetryPolicy,
}

impl ProceduralMemory {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        kv: Arc<dyn KeyValueStore>,
        embedder: Arc<dyn Embedder>,
        provenance: Arc<ProvenanceStore>,
        metrics: Arc<RetrievalMetrics>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            vectors,
            kv,
            embedder,
            provenance,
            metrics,
            retry,
        }
    }

    /// Persist one skill; returns its fresh id
    pub async fn store(&self, draft: SkillDraft, provenance: Provenance) -> Result<String> {
        let embedding = match &draft.skill_representation {
            SkillRepresentation::Text(text) => {
                if text.trim().is_empty() {
                    return Err(MemoryError::validation_fields(
                        "invalid skill",
                        vec![FieldError::new("skill_representation", "must not be empty")],
                    ));
                }
                self.embedder.embed(text).await?
            }
            SkillRepresentation::Vector(vector) => {
                if vector.len() != self.embedder.dimensions() {
                    return Err(MemoryError::validation_fields(
                        "invalid skill",
                        vec![FieldError::new(
                            "skill_representation",
                            format!(
                                "dimension {} does not match deployment dimension {}",
                                vector.len(),
                                self.embedder.dimensions()
                            ),
                        )],
                    ));
                }
                vector.clone()
            }
        };

        let id = fresh_id();
        let skill = Skill {
            id: id.clone(),
            skill_policy: draft.skill_policy,
            skill_representation: draft.skill_representation,
            skill_metadata: draft.skill_metadata,
            embedding: embedding.clone(),
            created_at: now_ts(),
            provenance: provenance.clone(),
        };

        // Policies are kept binary-safe in the key-value store; the vector
        // payload carries the full skill so queries need no second hop.
        self.kv
            .put(
                SKILL_POLICY_NAMESPACE,
                &id,
                serde_json::to_vec(&skill.skill_policy)?,
            )
            .await?;

        let stored = VectorRecord {
            id: id.clone(),
            vector: embedding,
            payload: serde_json::to_value(&skill)?,
        };
        with_backoff(self.retry, "skills.upsert", || {
            let stored = stored.clone();
            async move { self.vectors.upsert(SKILLS_COLLECTION, stored).await }
        })
        .await?;

        self.provenance
            .record(MemoryType::Procedural, &id, &provenance)
            .await?;
        debug!(id, "skill stored");
        Ok(id)
    }

    /// Skills by similarity to a text or vector query; a metadata mapping
    /// routes to [`Self::metadata_query`]
    pub async fn vector_query(&self, query: &QueryInput, limit: usize) -> Result<Vec<Skill>> {
        let vector = match query {
            QueryInput::Text { text } => self.embedder.embed(text).await?,
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
                vector.clone()
            }
            QueryInput::Metadata(filter) => return self.metadata_query(filter, limit).await,
        };

        let vector = vector.as_slice();
        let hits = with_backoff(self.retry, "skills.query", || async move {
            self.vectors.query(SKILLS_COLLECTION, vector, limit).await
        })
        .await?;

        let mut skills: Vec<(f32, Skill)> = hits
            .into_iter()
            .map(|hit| {
                let skill: Skill = serde_json::from_value(hit.payload)?;
                Ok((hit.score, skill))
            })
            .collect::<Result<_>>()?;
        // Cosine desc, ties by newest creation
        skills.sort_by(|(sim_a, a), (sim_b, b)| {
            sim_b
                .total_cmp(sim_a)
                .then(b.created_at.total_cmp(&a.created_at))
        });

        let results: Vec<Skill> = skills.into_iter().take(limit).map(|(_, s)| s).collect();
        self.metrics
            .record_retrieval(MemoryType::Procedural, !results.is_empty());
        Ok(results)
    }

    /// Skills whose metadata satisfies every `key = value` pair; unknown or
    /// missing keys match nothing
    pub async fn metadata_query(
        &self,
        filter: &Map<String, Value>,
        limit: usize,
    ) -> Result<Vec<Skill>> {
        let records = with_backoff(self.retry, "skills.scan", || async move {
            self.vectors.scan(SKILLS_COLLECTION).await
        })
        .await?;

        let mut skills: Vec<Skill> = records
            .into_iter()
            .map(|r| serde_json::from_value::<Skill>(r.payload).map_err(Into::into))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|s| metadata_matches(filter, &Value::Object(s.skill_metadata.clone())))
            .collect();
        skills.sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
        skills.truncate(limit);

        self.metrics
            .record_retrieval(MemoryType::Procedural, !skills.is_empty());
        Ok(skills)
    }
}
