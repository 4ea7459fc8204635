//! CLI argument parsing for the knowledge daemon.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Knowledge Index CLI
///
/// Semantic search over journal entries, decisions and analysis results.
#[derive(Parser, Debug)]
#[command(name = "knowledge-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/knowledge-index/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Index commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a knowledge record
    Add {
        title: String,

        content: String,

        /// Classification tag
        #[arg(short = 't', long, default_value = "thought")]
        content_type: String,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Provenance (default: manual)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Search by semantic similarity
    Search {
        query: String,

        /// Maximum results (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only return records of this type (applied after the top-k cut)
        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// Records similar to an existing record
    Related {
        id: u64,

        /// Maximum results
        #[arg(short = 'k', long, default_value = "3")]
        top_k: usize,
    },

    /// Rebuild the in-memory index from storage
    Rebuild,

    /// Show store and index statistics (JSON)
    Stats,

    /// Show drift between store and index (JSON)
    Health,
}
