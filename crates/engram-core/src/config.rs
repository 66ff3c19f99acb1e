//! Service configuration
//!
//! Everything is environment-driven with sane defaults, so the binary runs
//! with zero configuration against the embedded adapters. Malformed numeric
//! values fall back to the default with a warning rather than aborting.

use std::time::Duration;

use tracing::warn;

/// Default TTL before an episodic record becomes a forgetting candidate
pub const DEFAULT_TTL_DAYS: f64 = 30.0;
/// Default utility weights for the forgetting engine
pub const DEFAULT_FORGET_ALPHA: f64 = 0.5;
pub const DEFAULT_FORGET_BETA: f64 = 0.3;
pub const DEFAULT_FORGET_GAMMA: f64 = 0.2;
/// Records below this utility are removed
pub const DEFAULT_FORGET_THRESHOLD: f64 = 0.0;
/// Default embedding cache capacity (entries)
pub const DEFAULT_EMBED_CACHE_SIZE: usize = 1024;
/// Server-wide request deadline
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: f64 = 30.0;
/// Per-call timeout for each backend interaction
pub const DEFAULT_BACKEND_TIMEOUT_SECONDS: f64 = 5.0;
/// Interval between forgetting ticks
pub const DEFAULT_FORGET_INTERVAL_SECONDS: u64 = 86_400;
/// Embedding dimension; constant for the life of a deployment
pub const DEFAULT_EMBED_DIMENSIONS: usize = 256;

/// Runtime configuration for the memory service
#[derive(Debug, Clone)]
pub struct LtmConfig {
    /// Forgetting TTL in days (`LTM_TTL_DAYS`)
    pub ttl_days: f64,
    /// Utility weight on score (`LTM_FORGET_ALPHA`)
    pub forget_alpha: f64,
    /// Utility weight on access frequency (`LTM_FORGET_BETA`)
    pub forget_beta: f64,
    /// Utility penalty on age (`LTM_FORGET_GAMMA`)
    pub forget_gamma: f64,
    /// Utility threshold below which candidates are removed (`LTM_FORGET_THRESHOLD`)
    pub forget_threshold: f64,
    /// Embedding LRU capacity (`EMBED_CACHE_SIZE`)
    pub embed_cache_size: usize,
    /// Server-wide request deadline (`LTM_REQUEST_TIMEOUT_SECONDS`)
    pub request_timeout: Duration,
    /// Per-backend-call timeout (`LTM_BACKEND_TIMEOUT_SECONDS`)
    pub backend_timeout: Duration,
    /// Seconds between forgetting ticks (`LTM_FORGET_INTERVAL_SECONDS`)
    pub forget_interval: Duration,
    /// Embedding dimension D (`LTM_EMBED_DIMENSIONS`)
    pub embed_dimensions: usize,
    /// External vector store (`WEAVIATE_URL` / `WEAVIATE_API_KEY`);
    /// absence selects the embedded adapter
    pub vector_store_url: Option<String>,
    pub vector_store_api_key: Option<String>,
    /// External graph store (`NEO4J_URI` / `NEO4J_USER` / `NEO4J_PASSWORD`);
    /// absence activates the in-memory fallback
    pub graph_store_uri: Option<String>,
    pub graph_store_user: Option<String>,
    pub graph_store_password: Option<String>,
    /// Directory for the sqlite key-value store (`LTM_DATA_DIR`);
    /// absence keeps the key-value store in memory
    pub data_dir: Option<std::path::PathBuf>,
}

impl Default for LtmConfig {
    fn default() -> Self {
        Self {
            ttl_days: DEFAULT_TTL_DAYS,
            forget_alpha: DEFAULT_FORGET_ALPHA,
            forget_beta: DEFAULT_FORGET_BETA,
            forget_gamma: DEFAULT_FORGET_GAMMA,
            forget_threshold: DEFAULT_FORGET_THRESHOLD,
            embed_cache_size: DEFAULT_EMBED_CACHE_SIZE,
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            backend_timeout: Duration::from_secs_f64(DEFAULT_BACKEND_TIMEOUT_SECONDS),
            forget_interval: Duration::from_secs(DEFAULT_FORGET_INTERVAL_SECONDS),
            embed_dimensions: DEFAULT_EMBED_DIMENSIONS,
            vector_store_url: None,
            vector_store_api_key: None,
            graph_store_uri: None,
            graph_store_user: None,
            graph_store_password: None,
            data_dir: None,
        }
    }
}

impl LtmConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_days: env_f64("LTM_TTL_DAYS", defaults.ttl_days),
            forget_alpha: env_f64("LTM_FORGET_ALPHA", defaults.forget_alpha),
            forget_beta: env_f64("LTM_FORGET_BETA", defaults.forget_beta),
            forget_gamma: env_f64("LTM_FORGET_GAMMA", defaults.forget_gamma),
            forget_threshold: env_f64("LTM_FORGET_THRESHOLD", defaults.forget_threshold),
            embed_cache_size: env_usize("EMBED_CACHE_SIZE", defaults.embed_cache_size),
            request_timeout: Duration::from_secs_f64(
                env_f64("LTM_REQUEST_TIMEOUT_SECONDS", DEFAULT_REQUEST_TIMEOUT_SECONDS)
                    .max(0.001),
            ),
            backend_timeout: Duration::from_secs_f64(
                env_f64("LTM_BACKEND_TIMEOUT_SECONDS", DEFAULT_BACKEND_TIMEOUT_SECONDS)
                    .max(0.001),
            ),
            forget_interval: Duration::from_secs(env_u64(
                "LTM_FORGET_INTERVAL_SECONDS",
                DEFAULT_FORGET_INTERVAL_SECONDS,
            )),
            embed_dimensions: env_usize("LTM_EMBED_DIMENSIONS", defaults.embed_dimensions),
            vector_store_url: env_opt("WEAVIATE_URL"),
            vector_store_api_key: env_opt("WEAVIATE_API_KEY"),
            graph_store_uri: env_opt("NEO4J_URI"),
            graph_store_user: env_opt("NEO4J_USER"),
            graph_store_password: env_opt("NEO4J_PASSWORD"),
            data_dir: env_opt("LTM_DATA_DIR").map(std::path::PathBuf::from),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_f64(key: &str, default: f64) -> f64 {
    match env_opt(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default, "ignoring malformed numeric env var");
            default
        }),
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env_opt(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default, "ignoring malformed numeric env var");
            default
        }),
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match env_opt(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default, "ignoring malformed numeric env var");
            default
        }),
    }
}
