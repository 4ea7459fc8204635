//! Feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed (FNV-1a, 64 bit) into one of
//! `dimension` buckets with a sign taken from the top hash bit, then the
//! bucket vector is normalized. Texts sharing words get positive similarity;
//! texts with disjoint vocabularies score zero unless buckets collide.
//!
//! A text with no tokens, or whose token signs cancel in every bucket, maps
//! to the fixed unit vector along bucket 0, so every output has unit norm.
//!
//! Pure Rust, no model files, identical output on every platform.

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder.
pub struct HashingEmbedder {
    info: ModelInfo,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "hashing dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            info: ModelInfo {
                name: format!("feature-hashing-{}", dimension),
                dimension,
                max_sequence_length: usize::MAX,
            },
        })
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let dim = self.info.dimension;
        let mut values = vec![0.0f32; dim];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % dim as u64) as usize;
            if hash >> 63 == 1 {
                values[bucket] -= 1.0;
            } else {
                values[bucket] += 1.0;
            }
        }

        if values.iter().all(|v| *v == 0.0) {
            values[0] = 1.0;
        }

        Ok(Embedding::new(values))
    }
}

/// Split on anything that is not alphanumeric, lowercased.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}
