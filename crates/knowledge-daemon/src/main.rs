//! Knowledge Index CLI
//!
//! Add, search and maintain the semantic knowledge index from the shell.
//!
//! # Usage
//!
//! ```bash
//! knowledge-daemon add "Cache eviction" "Evict on write, not on read" --content-type decision
//! knowledge-daemon search "cache policy" --top-k 3
//! knowledge-daemon related 42
//! knowledge-daemon rebuild
//! knowledge-daemon stats
//! knowledge-daemon health
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/knowledge-index/config.toml)
//! 3. `--config` file
//! 4. Environment variables (KNOWLEDGE_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use knowledge_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
