//! Decoder implementations

use super::types::{DecodeSkip, DecodedPage, PageDecoder, SkipReason};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use tracing::warn;

const DEFAULT_HITS_PATH: &str = "hits.hits";
const DEFAULT_SOURCE_FIELD: &str = "_source";

// ============================================================================
// Hits Decoder
// ============================================================================

/// Decoder for the `{"hits": {"hits": [{"_source": {...}}, ...]}}` shape.
///
/// Each well-formed hit yields its source object as a record. Hits without
/// a source object are skipped and logged; their siblings are still emitted.
#[derive(Debug, Clone)]
pub struct HitsDecoder {
    /// Dot path to the hits array
    hits_path: String,
    /// Field holding the document inside each hit
    source_field: String,
    /// Copy `_id` and `_index` into each record
    include_metadata: bool,
}

impl Default for HitsDecoder {
    fn default() -> Self {
        Self {
            hits_path: DEFAULT_HITS_PATH.to_string(),
            source_field: DEFAULT_SOURCE_FIELD.to_string(),
            include_metadata: false,
        }
    }
}

impl HitsDecoder {
    /// Create a decoder for the standard response shape
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different path to the hits array
    #[must_use]
    pub fn with_hits_path(mut self, path: impl Into<String>) -> Self {
        self.hits_path = path.into();
        self
    }

    /// Use a different document-source field
    #[must_use]
    pub fn with_source_field(mut self, field: impl Into<String>) -> Self {
        self.source_field = field.into();
        self
    }

    /// Copy hit metadata (`_id`, `_index`) into each record.
    ///
    /// Fields already present in the source document win.
    #[must_use]
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    fn decode_hit(&self, hit: &JsonValue) -> std::result::Result<Record, SkipReason> {
        let hit = hit.as_object().ok_or(SkipReason::NotAnObject)?;
        let source = hit.get(&self.source_field).ok_or(SkipReason::MissingSource)?;
        let mut record = source
            .as_object()
            .cloned()
            .ok_or(SkipReason::SourceNotObject)?;

        if self.include_metadata {
            for key in ["_id", "_index"] {
                if let Some(value) = hit.get(key) {
                    record
                        .entry(key.to_string())
                        .or_insert_with(|| value.clone());
                }
            }
        }

        Ok(record)
    }
}

impl PageDecoder for HitsDecoder {
    fn decode(&self, page: &JsonValue) -> Result<DecodedPage> {
        let hits = lookup_path(page, &self.hits_path).ok_or_else(|| {
            Error::response_shape(format!("response has no '{}' field", self.hits_path))
        })?;

        let hits = hits.as_array().ok_or_else(|| {
            Error::response_shape(format!("'{}' is not an array", self.hits_path))
        })?;

        let mut decoded = DecodedPage {
            records: Vec::with_capacity(hits.len()),
            skipped: Vec::new(),
            hit_count: hits.len(),
        };

        for (position, hit) in hits.iter().enumerate() {
            match self.decode_hit(hit) {
                Ok(record) => decoded.records.push(record),
                Err(reason) => {
                    let skip = DecodeSkip {
                        position,
                        id: hit.get("_id").and_then(JsonValue::as_str).map(String::from),
                        reason,
                    };
                    warn!("Skipping malformed {skip}");
                    decoded.skipped.push(skip);
                }
            }
        }

        Ok(decoded)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Follow a dot-separated path through nested objects
pub(crate) fn lookup_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(value, |current, part| current.get(part))
}
