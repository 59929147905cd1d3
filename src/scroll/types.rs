//! Scroll types
//!
//! Pages, session states, requests, and summaries for the scroll engine.

use crate::decode::{lookup_path, PageDecoder};
use crate::error::{BackendErrorKind, Error, Result};
use crate::types::{CursorToken, JsonValue, Record, ScrollTtl};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Top-level response field carrying the cursor token
pub const CURSOR_FIELD: &str = "_scroll_id";

/// Default number of records per backend round trip
pub const DEFAULT_PAGE_SIZE: u32 = 100;

// ============================================================================
// Page
// ============================================================================

/// One bounded batch of records returned by a single Initiate/Advance call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Decoded records, in backend order
    pub records: Vec<Record>,
    /// Number of malformed hits dropped while decoding
    pub skipped: usize,
    /// Number of raw hits, including skipped ones
    pub hit_count: usize,
    /// Token for the next page, if the backend issued one
    pub next_cursor: Option<CursorToken>,
    /// Total matching documents, when the backend reports it
    pub total_hits: Option<u64>,
}

impl Page {
    /// Decode a raw response into a page
    pub fn from_response(body: &JsonValue, decoder: &dyn PageDecoder) -> Result<Self> {
        let decoded = decoder.decode(body)?;

        let next_cursor = match body.get(CURSOR_FIELD) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(raw)) if raw.is_empty() => None,
            Some(JsonValue::String(raw)) => Some(CursorToken::new(raw.as_str())),
            Some(other) => {
                return Err(Error::response_shape(format!(
                    "'{CURSOR_FIELD}' must be a string, got {other}"
                )))
            }
        };

        // Newer backends report `{"value": n}`, older ones a bare number.
        let total_hits = lookup_path(body, "hits.total").and_then(|total| {
            total
                .as_u64()
                .or_else(|| total.get("value").and_then(JsonValue::as_u64))
        });

        Ok(Self {
            records: decoded.records,
            skipped: decoded.skipped.len(),
            hit_count: decoded.hit_count,
            next_cursor,
            total_hits,
        })
    }

    /// True when the backend returned no hits, meaning the scan is exhausted
    pub fn is_exhausted(&self) -> bool {
        self.hit_count == 0
    }

    /// True when no further page can follow this one
    pub fn is_last(&self) -> bool {
        self.is_exhausted() || self.next_cursor.is_none()
    }
}

/// Result of one Advance call
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The next page (possibly empty)
    Page(Page),
    /// The backend reported a terminal condition: no more pages
    Terminal(BackendErrorKind),
}

impl Advance {
    /// Check if this is a terminal signal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle state of a stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Issuing the first query
    Initializing,
    /// Emitting records and advancing the cursor
    Streaming,
    /// Emitting the final page; no more backend calls
    Draining,
    /// Finished without error (completion or cancellation)
    Terminated,
    /// Finished with an error
    Failed,
}

impl SessionState {
    /// Check if the session can no longer change state
    pub fn is_final(self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }

    /// Check if `next` is a legal successor of this state
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{Draining, Failed, Initializing, Streaming, Terminated};
        matches!(
            (self, next),
            (Initializing, Streaming | Draining | Terminated | Failed)
                | (Streaming, Draining | Terminated | Failed)
                | (Draining, Terminated | Failed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Scroll Request
// ============================================================================

/// What to stream: index, query, and paging parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    /// Index (or comma-separated indices / pattern) to search
    pub index: String,
    /// Structured filter, sent as the `query` field
    pub query: JsonValue,
    /// Records per backend round trip
    pub page_size: u32,
    /// How long the backend keeps scan state between calls
    pub ttl: ScrollTtl,
    /// Capacity of the record channel (minimum 1)
    pub channel_capacity: usize,
}

impl ScrollRequest {
    /// Create a request for an already-built query
    pub fn new(index: impl Into<String>, query: JsonValue) -> Self {
        Self {
            index: index.into(),
            query,
            page_size: DEFAULT_PAGE_SIZE,
            ttl: ScrollTtl::default(),
            channel_capacity: 1,
        }
    }

    /// Create a request from any serializable query
    pub fn for_query<Q: Serialize + ?Sized>(index: impl Into<String>, query: &Q) -> Result<Self> {
        let query = serde_json::to_value(query)
            .map_err(|e| Error::encoding(format!("query cannot be serialized: {e}")))?;
        Ok(Self::new(index, query))
    }

    /// Match every document in the index
    pub fn match_all(index: impl Into<String>) -> Self {
        Self::new(index, serde_json::json!({ "match_all": {} }))
    }

    /// Set records per round trip
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set scan TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: ScrollTtl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set channel capacity
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

// ============================================================================
// Scroll Summary
// ============================================================================

/// Outcome of a session that ended without error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollSummary {
    /// Final lifecycle state
    pub final_state: SessionState,
    /// Backend round trips issued (Initiate + Advance calls)
    pub round_trips: u64,
    /// Pages that carried at least one hit
    pub pages: u64,
    /// Records delivered to the consumer
    pub records_emitted: u64,
    /// Malformed hits dropped
    pub records_skipped: u64,
    /// Total matching documents reported by the backend
    pub total_hits: Option<u64>,
    /// Session ended because of cancellation or an abandoned consumer
    pub cancelled: bool,
    /// Terminal condition that ended the scan, if any
    pub terminal: Option<BackendErrorKind>,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session ended
    pub finished_at: DateTime<Utc>,
}

impl ScrollSummary {
    /// Wall-clock duration of the session
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// True when every matching record was delivered
    pub fn is_complete(&self) -> bool {
        self.final_state == SessionState::Terminated && !self.cancelled
    }
}
