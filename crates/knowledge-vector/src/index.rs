//! Vector index trait and types.
//!
//! Defines the interface for append-only vector similarity search.

use crate::error::VectorError;
use knowledge_embeddings::Embedding;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Insertion position of the matched vector
    pub position: usize,
    /// Inner product with the query (higher = more similar)
    pub score: f32,
}

impl SearchResult {
    pub fn new(position: usize, score: f32) -> Self {
        Self { position, score }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Bytes held by vector storage
    pub size_bytes: u64,
}

/// Trait for append-only vector indexes.
///
/// Positions are assigned in insertion order starting at 0 and are stable
/// until `reset`. There is no update or delete; compaction means a reset
/// followed by re-appending the surviving vectors.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector, returning its position.
    fn append(&mut self, embedding: &Embedding) -> Result<usize, VectorError>;

    /// Search for the k highest inner products.
    /// Returns results sorted best first; ties keep insertion order.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Stored vector at `position`.
    fn vector(&self, position: usize) -> Result<&[f32], VectorError>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;

    /// Remove every vector.
    fn reset(&mut self);
}
