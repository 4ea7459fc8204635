//! Configuration loading for the knowledge index.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/knowledge-index/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::KnowledgeError;

const APP_NAME: &str = "knowledge-index";

/// Which embedding adapter backs the index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Local BERT model through Candle (default)
    #[default]
    Candle,
    /// Offline feature hashing, no model download
    Hashing,
}

/// Embedding adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// HuggingFace repository of the Candle model
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model cache directory (platform cache dir when unset)
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Output dimension of the hashing provider.
    /// The Candle provider reads its dimension from the model config.
    #[serde(default = "default_hashing_dimension")]
    pub dimension: usize,

    /// Texts per forward pass when embedding in bulk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_hashing_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model_repo: default_model_repo(),
            cache_dir: None,
            dimension: default_hashing_dimension(),
            batch_size: default_batch_size(),
        }
    }
}

/// Knowledge index behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Rebuild the in-memory index from storage when the index is opened.
    #[serde(default = "default_rebuild_on_start")]
    pub rebuild_on_start: bool,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Window used for the `recent_additions` statistic.
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,
}

fn default_rebuild_on_start() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

fn default_recent_window_days() -> i64 {
    7
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            rebuild_on_start: default_rebuild_on_start(),
            default_top_k: default_top_k(),
            recent_window_days: default_recent_window_days(),
        }
    }
}

impl IndexSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_top_k == 0 {
            return Err("default_top_k must be > 0".to_string());
        }
        if self.recent_window_days <= 0 {
            return Err(format!(
                "recent_window_days must be > 0, got {}",
                self.recent_window_days
            ));
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub index: IndexSettings,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/knowledge-index/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (KNOWLEDGE_DB_PATH, KNOWLEDGE_EMBEDDING__PROVIDER, ...)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, KnowledgeError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("embedding.model_repo", default_model_repo())
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("embedding.dimension", default_hashing_dimension() as i64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("index.default_top_k", default_top_k() as i64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Nested keys use a double underscore: KNOWLEDGE_INDEX__DEFAULT_TOP_K
        builder = builder.add_source(
            Environment::with_prefix("KNOWLEDGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| KnowledgeError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| KnowledgeError::Config(e.to_string()))?;

        settings.index.validate().map_err(KnowledgeError::Config)?;
        Ok(settings)
    }

    /// Expand ~ in db_path to the home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    /// Model cache directory, if one was configured
    pub fn expanded_cache_dir(&self) -> Option<PathBuf> {
        self.embedding.cache_dir.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Candle);
        assert_eq!(settings.embedding.dimension, 384);
        assert_eq!(settings.index.default_top_k, 5);
        assert_eq!(settings.index.recent_window_days, 7);
        assert!(settings.index.rebuild_on_start);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("knowledge.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "db_path = \"/tmp/knowledge-db\"\n\n[embedding]\nprovider = \"hashing\"\ndimension = 128\n\n[index]\nrecent_window_days = 14"
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.db_path, "/tmp/knowledge-db");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(settings.embedding.dimension, 128);
        assert_eq!(settings.index.recent_window_days, 14);
        assert_eq!(settings.index.default_top_k, 5);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[index]\ndefault_top_k = 0\n").unwrap();

        let result = Settings::load(Some(path.to_str().unwrap()));
        assert!(matches!(result, Err(KnowledgeError::Config(_))));
    }

    #[test]
    fn test_index_settings_validation() {
        let mut index = IndexSettings::default();
        assert!(index.validate().is_ok());

        index.recent_window_days = 0;
        assert!(index.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        let settings = Settings {
            db_path: "/var/lib/knowledge".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.expanded_db_path(), PathBuf::from("/var/lib/knowledge"));
        assert!(settings.expanded_cache_dir().is_none());
    }
}
