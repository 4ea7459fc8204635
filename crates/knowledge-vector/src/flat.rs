//! Flat (brute-force) inner-product index.
//!
//! Vectors live in one contiguous row-major buffer. Search scores every row
//! against the query, giving exact top-k results.

use std::cmp::Ordering;

use knowledge_embeddings::model::dot;
use knowledge_embeddings::Embedding;
use tracing::debug;

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult, VectorIndex};

/// Exact inner-product index with insertion-ordered positions.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Pre-allocate room for `capacity` vectors.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Self {
        Self {
            dimension,
            data: Vec::with_capacity(dimension * capacity),
        }
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), VectorError> {
        if embedding.dimension() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.dimension.max(1))
    }
}

/// Best score first, earlier position first on ties. NaN ranks last.
fn rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
    key(b.score)
        .partial_cmp(&key(a.score))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.position.cmp(&b.position))
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn append(&mut self, embedding: &Embedding) -> Result<usize, VectorError> {
        self.check_dimension(embedding)?;
        let position = self.len();
        self.data.extend_from_slice(&embedding.values);
        Ok(position)
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.check_dimension(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<SearchResult> = self
            .rows()
            .enumerate()
            .map(|(position, row)| SearchResult::new(position, dot(&query.values, row)))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);

        debug!(k = k, scanned = self.len(), found = scored.len(), "Search complete");
        Ok(scored)
    }

    fn vector(&self, position: usize) -> Result<&[f32], VectorError> {
        let len = self.len();
        if position >= len {
            return Err(VectorError::PositionOutOfRange { position, len });
        }
        let start = position * self.dimension;
        Ok(&self.data[start..start + self.dimension])
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.len(),
            dimension: self.dimension,
            size_bytes: (self.data.len() * std::mem::size_of::<f32>()) as u64,
        }
    }

    fn reset(&mut self) {
        self.data.clear();
    }
}
