//! Cursor Initiator: issues the first bounded query

use super::types::Page;
use crate::backend::SearchBackend;
use crate::decode::PageDecoder;
use crate::error::{Error, Result};
use crate::types::ScrollTtl;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Opens a scan and returns its first page plus cursor token
#[derive(Clone)]
pub struct Initiator {
    backend: Arc<dyn SearchBackend>,
    decoder: Arc<dyn PageDecoder>,
    ttl: ScrollTtl,
}

impl Initiator {
    /// Create an initiator
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        decoder: Arc<dyn PageDecoder>,
        ttl: ScrollTtl,
    ) -> Self {
        Self {
            backend,
            decoder,
            ttl,
        }
    }

    /// Issue the first query.
    ///
    /// Fails with [`Error::Encoding`] when the query cannot be serialized and
    /// with a config error when `page_size` is zero; transport and backend
    /// errors are passed through unchanged.
    pub async fn open<Q: Serialize + ?Sized>(
        &self,
        index: &str,
        query: &Q,
        page_size: u32,
    ) -> Result<Page> {
        if page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }

        let body = build_search_body(query, page_size)?;
        let response = self.backend.open_scroll(index, &body, self.ttl).await?;
        let page = Page::from_response(&response, self.decoder.as_ref())?;

        debug!(
            "Opened scroll on '{}': {} hits, cursor {}",
            index,
            page.hit_count,
            page.next_cursor
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string)
        );

        Ok(page)
    }
}

impl std::fmt::Debug for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Build the `{"query": ..., "size": n}` body for the first request
pub fn build_search_body<Q: Serialize + ?Sized>(
    query: &Q,
    page_size: u32,
) -> Result<serde_json::Value> {
    let query = serde_json::to_value(query)
        .map_err(|e| Error::encoding(format!("query cannot be serialized: {e}")))?;
    Ok(json!({ "query": query, "size": page_size }))
}
