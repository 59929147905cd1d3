//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stream every document matching a query out of a search backend
#[derive(Parser, Debug)]
#[command(name = "scrollkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream matching records as JSON lines
    Scroll {
        /// Index to scan (defaults to backend.index)
        index: Option<String>,

        /// Inline query JSON (defaults to match_all)
        #[arg(short, long, conflicts_with = "query_file")]
        query: Option<String>,

        /// File containing the query JSON
        #[arg(long)]
        query_file: Option<PathBuf>,

        /// Records per backend round trip
        #[arg(long)]
        page_size: Option<u32>,

        /// Scan keep-alive, e.g. 30s or 2m
        #[arg(long)]
        ttl: Option<String>,

        /// Stop after this many records
        #[arg(long)]
        max_records: Option<u64>,
    },

    /// Validate the configuration and print resolved settings
    Validate,

    /// Test connection to the backend
    Check,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
