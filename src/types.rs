//! Common types used throughout scrollkit
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A decoded document: the `_source` object of one hit
pub type Record = JsonObject;

// ============================================================================
// Cursor Token
// ============================================================================

/// Opaque handle identifying server-side scan state between page requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorToken(String);

impl CursorToken {
    /// Wrap a raw token issued by the backend
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are long base64 blobs; keep log lines readable.
        if self.0.chars().count() > 16 {
            let head: String = self.0.chars().take(16).collect();
            write!(f, "{head}…")
        } else {
            f.write_str(&self.0)
        }
    }
}

// ============================================================================
// Scroll TTL
// ============================================================================

static TTL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s|m|h|d)\s*$").expect("TTL pattern is a valid regex")
});

/// How long the backend keeps scan state alive between page requests.
///
/// Rendered in the backend's time-unit notation (`30s`, `1m`, `2h`, ...),
/// using the largest unit that represents the duration exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScrollTtl(Duration);

impl ScrollTtl {
    /// Default keep-alive: one minute
    pub const DEFAULT: Self = Self(Duration::from_secs(60));

    /// Shortest keep-alive the backend notation can express
    pub const MIN: Self = Self(Duration::from_millis(1));

    /// Create a TTL from a duration, raised to [`ScrollTtl::MIN`] if shorter
    pub fn new(duration: Duration) -> Self {
        Self(duration.max(Self::MIN.0))
    }

    /// Create a TTL from whole seconds
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// The underlying duration
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Render in backend time-unit notation
    pub fn to_param(&self) -> String {
        self.to_string()
    }
}

impl Default for ScrollTtl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ScrollTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1000 != 0 {
            return write!(f, "{millis}ms");
        }
        let secs = self.0.as_secs();
        if secs != 0 && secs % 3600 == 0 {
            write!(f, "{}h", secs / 3600)
        } else if secs != 0 && secs % 60 == 0 {
            write!(f, "{}m", secs / 60)
        } else {
            write!(f, "{secs}s")
        }
    }
}

impl FromStr for ScrollTtl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = TTL_PATTERN
            .captures(s)
            .ok_or_else(|| Error::invalid_value("ttl", format!("'{s}' is not a duration")))?;

        let amount: u64 = caps[1]
            .parse()
            .map_err(|e| Error::invalid_value("ttl", format!("'{s}': {e}")))?;

        let duration = match &caps[2] {
            "ms" => Some(Duration::from_millis(amount)),
            "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(3600).map(Duration::from_secs),
            "d" => amount.checked_mul(86_400).map(Duration::from_secs),
            unit => {
                return Err(Error::invalid_value(
                    "ttl",
                    format!("unsupported unit '{unit}'"),
                ))
            }
        }
        .ok_or_else(|| Error::invalid_value("ttl", format!("'{s}' is out of range")))?;

        if duration.is_zero() {
            return Err(Error::invalid_value("ttl", "must be greater than zero"));
        }

        Ok(Self(duration))
    }
}

impl Serialize for ScrollTtl {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScrollTtl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
