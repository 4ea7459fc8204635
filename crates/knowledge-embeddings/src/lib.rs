//! # knowledge-embeddings
//!
//! Embedding adapters for the knowledge index.
//!
//! Every adapter turns text into a fixed-length, L2-normalized vector, so the
//! inner product of two embeddings is their cosine similarity.
//!
//! ## Adapters
//! - [`CandleEmbedder`]: local all-MiniLM-L6-v2 inference via Candle
//!   (384 dimensions, model files cached after the first download)
//! - [`HashingEmbedder`]: signed feature hashing of word tokens, no model
//!   files, fully deterministic across platforms

pub mod cache;
pub mod candle;
pub mod error;
pub mod hashing;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use cache::{get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use hashing::HashingEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
