//! Candle-based embedding implementation.
//!
//! Runs a BERT sentence model (all-MiniLM-L6-v2 by default) on CPU with
//! mean pooling over non-padding tokens.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Token limit applied before the forward pass
pub const MAX_SEQ_LENGTH: usize = 256;

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Candle-based sentence embedder.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
    batch_size: usize,
}

impl CandleEmbedder {
    /// Load the embedding model from cache (downloading if needed).
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache)?;
        let name = cache
            .repo_id
            .rsplit('/')
            .next()
            .unwrap_or(cache.repo_id.as_str())
            .to_string();
        Self::load_from_paths(name, &paths.config, &paths.tokenizer, &paths.weights)
    }

    /// Load all-MiniLM-L6-v2 with default cache settings
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    /// Load from explicit file paths
    pub fn load_from_paths(
        name: String,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
    ) -> Result<Self, EmbeddingError> {
        info!(model = %name, "Loading embedding model");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("{:?}: {}", config_path, e)))?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        if !weights_path.exists() {
            return Err(EmbeddingError::ModelNotFound(format!("{:?}", weights_path)));
        }
        // SAFETY: the weights file is owned by the model cache and not modified while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        let dimension = config.hidden_size;
        let max_sequence_length = config.max_position_embeddings.min(MAX_SEQ_LENGTH);

        info!(
            model = %name,
            dim = dimension,
            max_seq = max_sequence_length,
            "Model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name,
                dimension,
                max_sequence_length,
            },
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Number of texts per forward pass in `embed_batch`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Mean pooling over token embeddings (excluding padding)
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?
            .to_dtype(DType::F32)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum.broadcast_div(&counts)?)
    }

    /// One forward pass over at most `batch_size` texts.
    fn forward_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.info.max_sequence_length);

        let mut input_ids: Vec<u32> = Vec::with_capacity(texts.len() * max_len);
        let mut attention: Vec<u32> = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            input_ids.extend_from_slice(&ids[..len]);
            attention.extend_from_slice(&mask[..len]);
            // Right-pad to max_len
            input_ids.extend(std::iter::repeat(0).take(max_len - len));
            attention.extend(std::iter::repeat(0).take(max_len - len));
        }

        let shape = (texts.len(), max_len);
        let input_ids = Tensor::from_vec(input_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(attention, shape, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled: Vec<Vec<f32>> = self.mean_pooling(&output, &attention_mask)?.to_vec2()?;

        Ok(pooled.into_iter().map(Embedding::new).collect())
    }
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.forward_chunk(&[text])?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidInput("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            embeddings.extend(self.forward_chunk(chunk)?);
        }

        debug!(
            count = embeddings.len(),
            dim = self.info.dimension,
            "Batch embedded"
        );
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_model_not_found() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let result =
            CandleEmbedder::load_from_paths("test".to_string(), &missing, &missing, &missing);
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_load_model() {
        let embedder = CandleEmbedder::load_default().unwrap();
        assert_eq!(embedder.info().dimension, 384);
        assert_eq!(embedder.info().name, "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_is_normalized_and_deterministic() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let first = embedder.embed("Hello, world!").unwrap();
        let second = embedder.embed("Hello, world!").unwrap();
        assert_eq!(first.dimension(), 384);
        assert!((first.norm() - 1.0).abs() < 1e-5);
        for (a, b) in first.values.iter().zip(second.values.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_batch_chunks_match_single() {
        let embedder = CandleEmbedder::load_default().unwrap().with_batch_size(2);
        let texts = vec!["apple pie", "car truck", "apple banana"];
        let batch = embedder.embed_batch(&texts).unwrap();
        assert_eq!(batch.len(), 3);
        let single = embedder.embed("car truck").unwrap();
        assert!(batch[1].cosine_similarity(&single) > 0.999);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_similar_texts_high_similarity() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let emb1 = embedder.embed("The cat sat on the mat").unwrap();
        let emb2 = embedder.embed("A cat is sitting on a mat").unwrap();
        let emb3 = embedder.embed("Python programming language").unwrap();

        assert!(emb1.cosine_similarity(&emb2) > emb1.cosine_similarity(&emb3));
    }
}
