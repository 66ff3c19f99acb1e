//! Cancellable exponential backoff for backend calls
//!
//! One envelope for every network-facing interaction: up to `attempts`
//! tries, sleeping `base_delay * 2^i` between them, each try bounded by
//! `per_call_timeout`. Only [`MemoryError::Transient`] failures are retried;
//! unambiguous rejections propagate immediately. Dropping the future cancels
//! any in-flight sleep or call, which is how request cancellation reaches
//! the backends.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{MemoryError, Result};

/// Retry envelope shared by the embedder and the storage adapters
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the first retry; doubles each retry
    pub base_delay: Duration,
    /// Budget for each individual attempt
    pub per_call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            per_call_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }
}

/// Run `op` under the policy; exhaustion yields `BackendUnavailable`
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_failure = String::from("no attempts made");
    for attempt in 0..policy.attempts.max(1) {
        if attempt > 0 {
            tokio::time::sleep(policy.base_delay * 2u32.pow(attempt - 1)).await;
        }
        match tokio::time::timeout(policy.per_call_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_transient() => {
                warn!(op = op_name, attempt, error = %e, "transient backend failure, retrying");
                last_failure = e.to_string();
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(
                    op = op_name,
                    attempt,
                    timeout_s = policy.per_call_timeout.as_secs_f64(),
                    "backend call timed out, retrying"
                );
                last_failure = format!(
                    "call exceeded {:.1}s",
                    policy.per_call_timeout.as_secs_f64()
                );
            }
        }
    }
    Err(MemoryError::BackendUnavailable(format!(
        "{op_name} failed after {} attempts: {last_failure}",
        policy.attempts.max(1)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            per_call_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let out = with_backoff(fast_policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, MemoryError>(7) }
        })
        .await
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let out = with_backoff(fast_policy(), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(MemoryError::Transient("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_becomes_backend_unavailable() {
        let calls = AtomicU32::new(0);
        let err = with_backoff(fast_policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u8, _>(MemoryError::Transient("down".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, MemoryError::BackendUnavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_rejection_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = with_backoff(fast_policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u8, _>(MemoryError::BackendRejected("no".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, MemoryError::BackendRejected(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_per_call_timeout_counts_as_transient() {
        let policy = RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1),
            per_call_timeout: Duration::from_millis(5),
        };
        let err = with_backoff(policy, "op", || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<u8, MemoryError>(0)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, MemoryError::BackendUnavailable(_)));
    }
}
