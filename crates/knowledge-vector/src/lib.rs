//! # knowledge-vector
//!
//! In-memory vector index for the knowledge index.
//!
//! Vectors are appended in insertion order and addressed by position; the
//! caller keeps the mapping from positions to record ids. Search is an exact
//! brute-force inner-product scan, which equals cosine similarity for the
//! normalized vectors the embedding adapters produce.
//!
//! ## Complexity
//! - `append`: O(d) amortized
//! - `search`: O(n·d + n log k)
//! - `reset`: O(1), keeps the allocation

pub mod error;
pub mod flat;
pub mod index;

pub use error::VectorError;
pub use flat::FlatIndex;
pub use index::{IndexStats, SearchResult, VectorIndex};
