//! In-memory key-value store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::KeyValueStore;
use crate::error::Result;

type Namespace = Vec<(String, Vec<u8>)>;

/// Reference [`KeyValueStore`]: namespaced insertion-ordered pairs behind one
/// `RwLock`. The durable alternative is [`super::SqliteKeyValueStore`].
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        match ns.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => ns.push((key.to_string(), value)),
        }
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let namespaces = self.namespaces.read();
        Ok(namespaces
            .get(namespace)
            .and_then(|ns| ns.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())))
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool> {
        let mut namespaces = self.namespaces.write();
        let Some(ns) = namespaces.get_mut(namespace) else {
            return Ok(false);
        };
        let before = ns.len();
        ns.retain(|(k, _)| k != key);
        Ok(ns.len() < before)
    }

    async fn scan(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let namespaces = self.namespaces.read();
        Ok(namespaces.get(namespace).cloned().unwrap_or_default())
    }
}
