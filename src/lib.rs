// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # scrollkit
//!
//! Streams every document matching a query out of a search backend, one
//! bounded page at a time, without ever holding the full result set in
//! memory.
//!
//! ## Features
//!
//! - **Cursor scans**: open a scan, then follow cursor tokens page by page
//! - **Backpressure**: records flow through a bounded channel, so a slow
//!   consumer pauses the backend requests
//! - **Cancellation**: stop a scan from the consumer side at any time
//! - **Graceful end-of-data**: allow-listed backend errors end the stream
//!   without failing it
//! - **Tolerant decoding**: malformed hits are skipped, not fatal
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scrollkit::backend::HttpSearchBackend;
//! use scrollkit::scroll::{stream, ScrollRequest};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> scrollkit::Result<()> {
//!     let backend = HttpSearchBackend::new(
//!         "http://localhost:9200",
//!         Default::default(),
//!         Default::default(),
//!     )?;
//!
//!     let request = ScrollRequest::match_all("pages").with_page_size(500);
//!     let mut handle = stream(Arc::new(backend), request, CancellationToken::new());
//!
//!     while let Some(record) = handle.recv().await {
//!         // Process record
//!     }
//!
//!     let summary = handle.finish().await?;
//!     println!("{} records", summary.records_emitted);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ScrollHandle                           │
//! │        recv() / Stream<Item = Record>    finish() → Summary     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │ bounded channel
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 ScrollSession (lifecycle task)                  │
//! │   Initiator ──▶ Advancer ──▶ Advancer ──▶ ... ──▶ Terminated    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬─────────────────────────┐
//! │   Auth   │   HTTP    │   Backend     │   Decode                │
//! ├──────────┼───────────┼───────────────┼─────────────────────────┤
//! │ API Key  │ POST/GET  │ open scroll   │ hits.hits[*]._source    │
//! │ Basic    │ Retry     │ continue      │ skip malformed hits     │
//! │ Bearer   │ Rate Limit│ classify errs │                         │
//! └──────────┴───────────┴───────────────┴─────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Document error variant fields before 1.0

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication for backend requests
pub mod auth;

/// HTTP client with rate limiting and optional retries
pub mod http;

/// Search backend transport
pub mod backend;

/// Page decoders
pub mod decode;

/// Cursor scan engine
pub mod scroll;

/// YAML configuration with environment overrides
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use backend::{HttpSearchBackend, SearchBackend};
pub use config::{load_config, Config};
pub use scroll::{stream, ScrollHandle, ScrollRequest, ScrollSession, ScrollSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
