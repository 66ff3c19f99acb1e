//! Deterministic token-hashing embedder
//!
//! Reference implementation: tokens are hashed into D buckets with a signed
//! contribution, then L2-normalized. Identical text always yields an
//! identical vector, and texts sharing vocabulary land near each other, which
//! is all the embedded deployment and the test suite need.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{l2_normalize, Embedder};
use crate::error::Result;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        assert!(dimensions > 0, "embedding dimension must be positive");
        Self { dimensions }
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in Self::tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket =
                u64::from_le_bytes(digest[..8].try_into().expect("digest is 32 bytes")) as usize
                    % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }
}
