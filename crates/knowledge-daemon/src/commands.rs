//! Command implementations for the knowledge daemon.
//!
//! Every command opens the index from settings, runs on tokio's blocking
//! pool and renders its output as a string. Stats, health and rebuild
//! results are JSON; search results are one line per hit.

use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use knowledge_index::{KnowledgeIndex, LoggingProgressCallback};
use knowledge_types::{KnowledgeRecord, Settings};

use crate::cli::{Cli, Commands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Parse-to-output entry point used by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(
        cli.config.as_deref(),
        cli.db_path.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    let output = execute(settings, cli.command).await?;
    println!("{}", output);
    Ok(())
}

/// Run one command against the index described by `settings`.
pub async fn execute(mut settings: Settings, command: Commands) -> Result<String> {
    // The rebuild command does its own pass with progress logging
    if matches!(command, Commands::Rebuild) {
        settings.index.rebuild_on_start = false;
    }

    tokio::task::spawn_blocking(move || {
        let index = open_index(&settings)?;
        run_command(&index, &settings, command)
    })
    .await
    .context("Index task failed")?
}

fn open_index(settings: &Settings) -> Result<KnowledgeIndex> {
    let db_path = settings.expanded_db_path();
    info!("Opening knowledge index at {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    KnowledgeIndex::from_settings(settings).context("Failed to open knowledge index")
}

fn run_command(index: &KnowledgeIndex, settings: &Settings, command: Commands) -> Result<String> {
    match command {
        Commands::Add {
            title,
            content,
            content_type,
            tags,
            source,
        } => {
            let tags = if tags.is_empty() { None } else { Some(tags) };
            let record = index
                .add_knowledge(&title, &content, &content_type, tags, source.as_deref())
                .context("Failed to add knowledge")?;
            Ok(format!("Added knowledge {}: {}", record.id, record.title))
        }
        Commands::Search {
            query,
            top_k,
            content_type,
        } => {
            let top_k = top_k.unwrap_or(settings.index.default_top_k);
            let results = index
                .search_knowledge(&query, top_k, content_type.as_deref())
                .context("Search failed")?;
            Ok(format_results(&results))
        }
        Commands::Related { id, top_k } => {
            let results = index
                .get_related_knowledge(id, top_k)
                .context("Related search failed")?;
            Ok(format_results(&results))
        }
        Commands::Rebuild => {
            let result = index
                .rebuild_index_with_progress(&LoggingProgressCallback)
                .context("Rebuild failed")?;
            Ok(serde_json::to_string_pretty(&result)?)
        }
        Commands::Stats => {
            let stats = index.get_knowledge_stats().context("Failed to read stats")?;
            Ok(serde_json::to_string_pretty(&stats)?)
        }
        Commands::Health => {
            let health = index.health().context("Failed to read health")?;
            Ok(serde_json::to_string_pretty(&health)?)
        }
    }
}

/// One line per hit: rank, score, id, title and content type.
pub fn format_results(results: &[(KnowledgeRecord, f32)]) -> String {
    if results.is_empty() {
        return "No results".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(rank, (record, score))| {
            format!(
                "{}. [{:.4}] #{} {} ({})",
                rank + 1,
                score,
                record.id,
                record.title,
                record.content_type
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_types::{EmbeddingProvider, NewKnowledge};
    use tempfile::TempDir;

    fn test_settings(temp: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.db_path = temp.path().join("db").to_string_lossy().to_string();
        settings.embedding.provider = EmbeddingProvider::Hashing;
        settings
    }

    fn add(title: &str, content: &str, content_type: &str) -> Commands {
        Commands::Add {
            title: title.to_string(),
            content: content.to_string(),
            content_type: content_type.to_string(),
            tags: Vec::new(),
            source: None,
        }
    }

    #[test]
    fn test_load_settings_overrides() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            "db_path = \"/from/file\"\nlog_level = \"warn\"\n\n[embedding]\nprovider = \"hashing\"\n",
        )
        .unwrap();
        let path = config_path.to_string_lossy().to_string();

        let from_file = load_settings(Some(&path), None, None).unwrap();
        assert_eq!(from_file.db_path, "/from/file");
        assert_eq!(from_file.log_level, "warn");

        let overridden = load_settings(Some(&path), Some("/from/cli"), Some("debug")).unwrap();
        assert_eq!(overridden.db_path, "/from/cli");
        assert_eq!(overridden.log_level, "debug");
    }

    #[test]
    fn test_format_results() {
        assert_eq!(format_results(&[]), "No results");

        let record = KnowledgeRecord::from_new(
            4,
            NewKnowledge::new("Cache", "Evict on write", "decision"),
            chrono::Utc::now(),
        );
        assert_eq!(
            format_results(&[(record, 0.5)]),
            "1. [0.5000] #4 Cache (decision)"
        );
    }

    #[tokio::test]
    async fn test_add_then_search() {
        let temp = TempDir::new().unwrap();
        let settings = test_settings(&temp);

        let out = execute(settings.clone(), add("A", "apple banana", "fruit"))
            .await
            .unwrap();
        assert_eq!(out, "Added knowledge 1: A");
        execute(settings.clone(), add("B", "car truck", "vehicle"))
            .await
            .unwrap();

        let search = Commands::Search {
            query: "apple".to_string(),
            top_k: Some(1),
            content_type: None,
        };
        let out = execute(settings.clone(), search).await.unwrap();
        assert!(out.starts_with("1. ["));
        assert!(out.contains("#1 A (fruit)"));

        let stats = execute(settings.clone(), Commands::Stats).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&stats).unwrap();
        assert_eq!(json["total_entries"], 2);
        assert_eq!(json["index_size"], 2);
        assert_eq!(json["content_types"]["vehicle"], 1);
    }

    #[tokio::test]
    async fn test_rebuild_and_health_output() {
        let temp = TempDir::new().unwrap();
        let settings = test_settings(&temp);
        execute(settings.clone(), add("A", "apple banana", "fruit"))
            .await
            .unwrap();

        let rebuild = execute(settings.clone(), Commands::Rebuild).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&rebuild).unwrap();
        assert_eq!(json["progress"]["total_processed"], 1);
        assert_eq!(json["progress"]["reused"], 1);
        assert_eq!(json["progress"]["completed"], true);

        let health = execute(settings, Commands::Health).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&health).unwrap();
        assert_eq!(json["in_sync"], true);
        assert_eq!(json["drift"], 0);
    }
}
