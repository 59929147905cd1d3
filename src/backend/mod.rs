//! Search backend transport
//!
//! The [`SearchBackend`] trait is the seam between the scroll engine and the
//! remote search service. Implementations issue exactly one request per call
//! and return the raw response body; transport failures and non-2xx
//! responses come back already classified as [`crate::Error`] values.
//!
//! Backend-side scan state is only ever released by TTL expiry. There is no
//! explicit "clear cursor" call.

mod elastic;

pub use elastic::HttpSearchBackend;

use crate::error::Result;
use crate::types::{CursorToken, JsonValue, ScrollTtl};
use async_trait::async_trait;

/// Transport capable of opening and continuing a cursor-based scan
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run the first query against `index`, asking the backend to keep scan
    /// state alive for `ttl`.
    async fn open_scroll(&self, index: &str, body: &JsonValue, ttl: ScrollTtl)
        -> Result<JsonValue>;

    /// Fetch the page after `cursor`, refreshing its TTL.
    async fn continue_scroll(&self, cursor: &CursorToken, ttl: ScrollTtl) -> Result<JsonValue>;
}
