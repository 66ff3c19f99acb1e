//! Cached embedding wrapper
//!
//! Wraps any [`Embedder`] with a bounded LRU keyed by sha-256 content hash,
//! so identical text embeds exactly once. Misses go to the provider under the
//! shared retry envelope; exhaustion surfaces as `EMBED_UNAVAILABLE`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::Embedder;
use crate::error::{MemoryError, Result};
use crate::retry::{with_backoff, RetryPolicy};

/// Embedding cache hit/miss counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    stats: Mutex<CacheStats>,
    retry: RetryPolicy,
}

impl CachedEmbedder {
    /// Wrap `inner` with an LRU of `capacity` entries
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize, retry: RetryPolicy) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("embed cache capacity must be non-zero"),
            )),
            stats: Mutex::new(CacheStats::default()),
            retry,
        }
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    fn cache_key(text: &str) -> String {
        format!("{:x}", Sha256::digest(text.as_bytes()))
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::cache_key(text);

        {
            let mut cache = self.cache.lock();
            if let Some(vector) = cache.get(&key) {
                self.stats.lock().hits += 1;
                return Ok(vector.clone());
            }
        }
        self.stats.lock().misses += 1;
        debug!(provider = self.inner.name(), chars = text.len(), "embedding cache miss");

        let inner = self.inner.clone();
        let vector = with_backoff(self.retry, "embed", || {
            let inner = inner.clone();
            let text = text.to_string();
            async move { inner.embed(&text).await }
        })
        .await
        .map_err(|e| match e {
            MemoryError::BackendUnavailable(msg) => MemoryError::EmbedUnavailable(msg),
            other => other,
        })?;

        self.cache.lock().put(key, vector.clone());
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            per_call_timeout: Duration::from_millis(100),
        }
    }

    /// Fails a configurable number of times before succeeding
    struct FlakyEmbedder {
        failures: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                Err(MemoryError::Transient("connection reset".into()))
            } else {
                Ok(vec![1.0, 0.0, 0.0, 0.0])
            }
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let inner = Arc::new(FlakyEmbedder {
            failures: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 16, fast_policy());

        cached.embed("same text").await.unwrap();
        cached.embed("same text").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        let stats = cached.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let inner = Arc::new(FlakyEmbedder {
            failures: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 16, fast_policy());

        let vector = cached.embed("retry me").await.unwrap();
        assert_eq!(vector.len(), 4);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_embed_unavailable() {
        let inner = Arc::new(FlakyEmbedder {
            failures: AtomicU32::new(10),
            calls: AtomicU32::new(0),
        });
        let cached = CachedEmbedder::new(inner, 16, fast_policy());

        let err = cached.embed("hopeless").await.unwrap_err();
        assert!(matches!(err, MemoryError::EmbedUnavailable(_)));
    }

    #[tokio::test]
    async fn test_lru_eviction_is_bounded() {
        let inner = Arc::new(HashingEmbedder::new(8));
        let cached = CachedEmbedder::new(inner, 2, fast_policy());

        cached.embed("one").await.unwrap();
        cached.embed("two").await.unwrap();
        cached.embed("three").await.unwrap(); // evicts "one"
        cached.embed("one").await.unwrap();

        // 4 misses (one was evicted), 0 hits
        let stats = cached.stats();
        assert_eq!(stats.misses, 4);
        assert_eq!(stats.hits, 0);
    }
}
