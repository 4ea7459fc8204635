//! Embedding adapter selection from settings.

use std::path::PathBuf;
use std::sync::Arc;

use knowledge_embeddings::{CandleEmbedder, EmbeddingModel, HashingEmbedder, ModelCache};
use knowledge_types::{EmbeddingProvider, EmbeddingSettings};
use tracing::info;

use crate::error::IndexError;

/// Build the configured embedding adapter.
///
/// Any load failure, including a failed model download, is reported as
/// [`IndexError::AdapterUnavailable`].
pub fn load_embedder(
    settings: &EmbeddingSettings,
    cache_dir: Option<PathBuf>,
) -> Result<Arc<dyn EmbeddingModel>, IndexError> {
    match settings.provider {
        EmbeddingProvider::Candle => {
            let cache = match cache_dir {
                Some(dir) => ModelCache::new(dir, settings.model_repo.clone()),
                None => ModelCache::for_repo(settings.model_repo.clone()),
            };
            info!(repo = %cache.repo_id, dir = ?cache.cache_dir, "Loading Candle embedder");
            let embedder = CandleEmbedder::load(&cache)
                .map_err(|e| IndexError::AdapterUnavailable(e.to_string()))?
                .with_batch_size(settings.batch_size);
            Ok(Arc::new(embedder))
        }
        EmbeddingProvider::Hashing => {
            let embedder = HashingEmbedder::new(settings.dimension)
                .map_err(|e| IndexError::AdapterUnavailable(e.to_string()))?;
            Ok(Arc::new(embedder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_provider() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::Hashing,
            dimension: 32,
            ..Default::default()
        };
        let embedder = load_embedder(&settings, None).unwrap();
        assert_eq!(embedder.dimension(), 32);
    }

    #[test]
    fn test_hashing_zero_dimension_unavailable() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::Hashing,
            dimension: 0,
            ..Default::default()
        };
        assert!(matches!(
            load_embedder(&settings, None),
            Err(IndexError::AdapterUnavailable(_))
        ));
    }
}
