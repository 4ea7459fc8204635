//! Knowledge daemon library exports.
//!
//! This crate provides the operator CLI for the knowledge index.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (add, search, related, rebuild, stats, health)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{execute, format_results, init_logging, load_settings, run};
