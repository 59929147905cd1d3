//! Cursor Advancer: fetches the page after a cursor token

use super::terminal::TerminalConditions;
use super::types::{Advance, Page};
use crate::backend::SearchBackend;
use crate::decode::PageDecoder;
use crate::error::Result;
use crate::types::{CursorToken, ScrollTtl};
use std::sync::Arc;
use tracing::debug;

/// Advances an open scan one page at a time.
///
/// Backend errors whose category is on the terminal allow-list come back as
/// [`Advance::Terminal`]; every other error is returned as-is.
#[derive(Clone)]
pub struct Advancer {
    backend: Arc<dyn SearchBackend>,
    decoder: Arc<dyn PageDecoder>,
    terminal: TerminalConditions,
    ttl: ScrollTtl,
}

impl Advancer {
    /// Create an advancer
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        decoder: Arc<dyn PageDecoder>,
        terminal: TerminalConditions,
        ttl: ScrollTtl,
    ) -> Self {
        Self {
            backend,
            decoder,
            terminal,
            ttl,
        }
    }

    /// Fetch the next page, refreshing the cursor's TTL
    pub async fn advance(&self, cursor: &CursorToken) -> Result<Advance> {
        let response = match self.backend.continue_scroll(cursor, self.ttl).await {
            Ok(response) => response,
            Err(e) => {
                if let Some(kind) = self.terminal.classify(&e) {
                    debug!("Scroll {} reached terminal condition: {}", cursor, kind);
                    return Ok(Advance::Terminal(kind));
                }
                return Err(e);
            }
        };

        let page = Page::from_response(&response, self.decoder.as_ref())?;
        Ok(Advance::Page(page))
    }
}

impl std::fmt::Debug for Advancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advancer")
            .field("terminal", &self.terminal)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
