//! CLI module
//!
//! Command-line interface for streaming records out of a search backend.
//!
//! # Commands
//!
//! - `scroll` - Stream every record matching a query
//! - `validate` - Validate the configuration file
//! - `check` - Test connection to the backend

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
