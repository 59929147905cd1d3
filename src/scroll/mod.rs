//! Scroll engine
//!
//! Streams every record matching a query out of a search backend, one
//! bounded page at a time, through a bounded channel.
//!
//! # Overview
//!
//! - [`Initiator`] issues the first query and returns the first page
//! - [`Advancer`] fetches the page after a cursor token
//! - [`ScrollSession`] drives both on its own task and owns the lifecycle
//! - [`ScrollHandle`] is the consumer's end: records, cancellation, outcome
//!
//! ```rust,ignore
//! use scrollkit::scroll::{stream, ScrollRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let request = ScrollRequest::match_all("logs-*").with_page_size(500);
//! let mut handle = stream(backend, request, CancellationToken::new());
//! while let Some(record) = handle.recv().await {
//!     println!("{}", serde_json::Value::Object(record));
//! }
//! let summary = handle.finish().await?;
//! ```

mod advancer;
mod handle;
mod initiator;
mod observer;
mod session;
mod terminal;
mod types;

pub use advancer::Advancer;
pub use handle::ScrollHandle;
pub use initiator::{build_search_body, Initiator};
pub use observer::{NoopObserver, ScrollObserver, TracingObserver};
pub use session::ScrollSession;
pub use terminal::TerminalConditions;
pub use types::{
    Advance, Page, ScrollRequest, ScrollSummary, SessionState, CURSOR_FIELD, DEFAULT_PAGE_SIZE,
};

use crate::backend::SearchBackend;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Start streaming `request` from `backend` with default settings.
///
/// Shorthand for `ScrollSession::new(backend).spawn(request, cancel)`.
pub fn stream(
    backend: Arc<dyn SearchBackend>,
    request: ScrollRequest,
    cancel: CancellationToken,
) -> ScrollHandle {
    ScrollSession::new(backend).spawn(request, cancel)
}

#[cfg(test)]
mod tests;
