//! In-memory graph store
//!
//! Reference implementation of [`GraphStore`] with the same MERGE semantics
//! an external graph database provides: entity identity is `name`, relation
//! identity is the full triple, and `merge_subgraph` commits under a single
//! write guard so partial subgraphs are never observable.
//!
//! Raw statements have no interpreter here; they are an unambiguous backend
//! rejection, not a transient failure.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::GraphStore;
use crate::error::{MemoryError, Result};
use crate::types::{
    BoundingBox, EntitySpec, SemanticTriple, TemporalFact, TimeWindow, TriplePattern,
};

#[derive(Default)]
struct GraphState {
    /// name -> properties
    entities: HashMap<String, Map<String, Value>>,
    /// relation key -> position in `relations`
    relation_index: HashMap<String, usize>,
    /// insertion-ordered relations
    relations: Vec<SemanticTriple>,
    /// append-only bitemporal fact log
    facts: Vec<TemporalFact>,
}

impl GraphState {
    fn merge_entity(&mut self, name: &str, properties: Option<&Map<String, Value>>) {
        let entry = self.entities.entry(name.to_string()).or_default();
        if let Some(props) = properties {
            for (k, v) in props {
                entry.insert(k.clone(), v.clone());
            }
        }
    }

    fn merge_relation(&mut self, triple: &SemanticTriple) -> String {
        self.merge_entity(&triple.subject, None);
        self.merge_entity(&triple.object, None);
        let key = triple.relation_key();
        match self.relation_index.get(&key) {
            Some(&pos) => {
                // MERGE: identity wins; refresh confidence/provenance when supplied
                let existing = &mut self.relations[pos];
                if triple.confidence.is_some() {
                    existing.confidence = triple.confidence;
                }
                if triple.provenance.is_some() {
                    existing.provenance = triple.provenance.clone();
                }
            }
            None => {
                self.relation_index.insert(key.clone(), self.relations.len());
                self.relations.push(triple.clone());
            }
        }
        key
    }
}

#[derive(Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.state.read().relations.len()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn merge_entity(&self, name: &str) -> Result<String> {
        self.state.write().merge_entity(name, None);
        Ok(name.to_string())
    }

    async fn merge_relation(&self, triple: &SemanticTriple) -> Result<String> {
        Ok(self.state.write().merge_relation(triple))
    }

    async fn find_relations(&self, pattern: &TriplePattern) -> Result<Vec<SemanticTriple>> {
        let state = self.state.read();
        Ok(state
            .relations
            .iter()
            .filter(|t| pattern.matches(t))
            .cloned()
            .collect())
    }

    async fn merge_subgraph(
        &self,
        entities: &[EntitySpec],
        relations: &[SemanticTriple],
    ) -> Result<Vec<String>> {
        // Validate everything before touching state so a failure rolls the
        // whole call back trivially.
        for entity in entities {
            if entity.name.trim().is_empty() {
                return Err(MemoryError::validation("entity name must not be empty"));
            }
        }
        for triple in relations {
            triple.validate()?;
        }

        let mut state = self.state.write();
        for entity in entities {
            state.merge_entity(&entity.name, Some(&entity.properties));
        }
        let keys = relations
            .iter()
            .map(|t| state.merge_relation(t))
            .collect();
        Ok(keys)
    }

    async fn run_statement(&self, _statement: &str) -> Result<Vec<Value>> {
        Err(MemoryError::BackendRejected(
            "raw graph statements require an external graph store".into(),
        ))
    }

    async fn append_fact(&self, fact: &TemporalFact) -> Result<()> {
        self.state.write().facts.push(fact.clone());
        Ok(())
    }

    async fn facts_for_pair(&self, subject: &str, predicate: &str) -> Result<Vec<TemporalFact>> {
        let state = self.state.read();
        Ok(state
            .facts
            .iter()
            .filter(|f| f.subject == subject && f.predicate == predicate)
            .cloned()
            .collect())
    }

    async fn facts_in_region(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
    ) -> Result<Vec<TemporalFact>> {
        let state = self.state.read();
        Ok(state
            .facts
            .iter()
            .filter(|f| {
                f.location
                    .as_ref()
                    .is_some_and(|loc| bbox.contains(loc))
                    && f.validity().intersects(window)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provenance;

    fn triple(s: &str, p: &str, o: &str, confidence: Option<f64>) -> SemanticTriple {
        SemanticTriple {
            subject: s.into(),
            predicate: p.into(),
            object: o.into(),
            confidence,
            provenance: None,
        }
    }

    fn fact(subject: &str, location: Option<(f64, f64)>, valid: (f64, Option<f64>)) -> TemporalFact {
        TemporalFact {
            id: crate::types::fresh_id(),
            subject: subject.into(),
            predicate: "is".into(),
            object: "x".into(),
            value: None,
            location: location.map(|(lon, lat)| crate::types::GeoPoint { lon, lat }),
            valid_from: valid.0,
            valid_to: valid.1,
            tx_time: 1.0,
            provenance: Provenance::now("test", None),
        }
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let t = triple("Transformer", "IS_A", "Model", None);

        let k1 = store.merge_relation(&t).await.unwrap();
        let k2 = store.merge_relation(&t).await.unwrap();
        assert_eq!(k1, k2);
        assert_eq!(store.relation_count(), 1);
        assert_eq!(store.entity_count(), 2);

        let found = store
            .find_relations(&TriplePattern {
                subject: Some("Transformer".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_refreshes_confidence() {
        let store = InMemoryGraphStore::new();
        store
            .merge_relation(&triple("a", "b", "c", Some(0.4)))
            .await
            .unwrap();
        store
            .merge_relation(&triple("a", "b", "c", Some(0.9)))
            .await
            .unwrap();

        let found = store.find_relations(&TriplePattern::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_wildcard_pattern_matches_all() {
        let store = InMemoryGraphStore::new();
        store.merge_relation(&triple("a", "p", "b", None)).await.unwrap();
        store.merge_relation(&triple("c", "p", "d", None)).await.unwrap();

        let all = store.find_relations(&TriplePattern::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // Insertion order preserved
        assert_eq!(all[0].subject, "a");
    }

    #[tokio::test]
    async fn test_subgraph_rolls_back_on_invalid_relation() {
        let store = InMemoryGraphStore::new();
        let entities = vec![EntitySpec {
            name: "node".into(),
            properties: Map::new(),
        }];
        let relations = vec![
            triple("node", "links", "other", None),
            triple("", "broken", "x", None),
        ];

        let err = store.merge_subgraph(&entities, &relations).await;
        assert!(err.is_err());
        // Nothing was committed
        assert_eq!(store.entity_count(), 0);
        assert_eq!(store.relation_count(), 0);
    }

    #[tokio::test]
    async fn test_raw_statement_rejected_fatally() {
        let store = InMemoryGraphStore::new();
        let err = store.run_statement("MATCH (n) RETURN n").await.unwrap_err();
        assert!(matches!(err, MemoryError::BackendRejected(_)));
    }

    #[tokio::test]
    async fn test_facts_in_region_filters_location_and_window() {
        let store = InMemoryGraphStore::new();
        store
            .append_fact(&fact("paris", Some((2.35, 48.85)), (2010.0, Some(2020.0))))
            .await
            .unwrap();
        store
            .append_fact(&fact("tokyo", Some((139.69, 35.69)), (2015.0, Some(2016.0))))
            .await
            .unwrap();
        store
            .append_fact(&fact("nowhere", None, (2010.0, Some(2020.0))))
            .await
            .unwrap();

        let bbox = BoundingBox {
            min_lon: -10.0,
            min_lat: 35.0,
            max_lon: 30.0,
            max_lat: 60.0,
        };
        let window = TimeWindow {
            valid_from: 2012.0,
            valid_to: Some(2018.0),
        };
        let hits = store.facts_in_region(&bbox, &window).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject, "paris");
    }
}
