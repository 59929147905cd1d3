//! Decoder types and traits
//!
//! Defines the core page-decoding abstractions.

use crate::error::Result;
use crate::types::{JsonValue, Record};
use std::fmt;

/// Why a single hit was dropped from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The hit entry is not a JSON object
    NotAnObject,
    /// The hit has no document-source field
    MissingSource,
    /// The document-source field is present but not an object
    SourceNotObject,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("hit is not an object"),
            Self::MissingSource => f.write_str("hit has no source document"),
            Self::SourceNotObject => f.write_str("source document is not an object"),
        }
    }
}

/// A hit that was skipped during decoding (non-fatal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSkip {
    /// Position of the hit within the page
    pub position: usize,
    /// Document id, when the hit carried one
    pub id: Option<String>,
    /// Why it was skipped
    pub reason: SkipReason,
}

impl fmt::Display for DecodeSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "hit #{} (id {id}): {}", self.position, self.reason),
            None => write!(f, "hit #{}: {}", self.position, self.reason),
        }
    }
}

/// Records extracted from one page, in backend order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    /// Well-formed records
    pub records: Vec<Record>,
    /// Hits that were dropped
    pub skipped: Vec<DecodeSkip>,
    /// Number of raw hits in the page, including skipped ones
    pub hit_count: usize,
}

impl DecodedPage {
    /// True when the backend returned no hits at all
    pub fn is_empty(&self) -> bool {
        self.hit_count == 0
    }
}

/// Trait for decoding one raw page of search results into records.
///
/// Malformed individual entries are reported in [`DecodedPage::skipped`];
/// only a page whose overall shape is wrong returns an error.
pub trait PageDecoder: Send + Sync {
    /// Decode a raw page
    fn decode(&self, page: &JsonValue) -> Result<DecodedPage>;
}
