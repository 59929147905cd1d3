//! Error types for scrollkit
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Backend error payloads carry a raw `error.type` string. It is mapped into
//! [`BackendErrorKind`] exactly once, when the response is classified, so the
//! rest of the crate matches on variants instead of comparing strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for scrollkit
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Backend Errors
    // ============================================================================
    #[error("Backend error {status} ({kind}): {reason}")]
    Backend {
        status: u16,
        kind: BackendErrorKind,
        reason: String,
    },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Unexpected response shape: {message}")]
    ResponseShape { message: String },

    // ============================================================================
    // Session Errors
    // ============================================================================
    #[error("Scroll session aborted: {message}")]
    Session { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a backend error from a raw `error.type` string
    pub fn backend(status: u16, raw_type: &str, reason: impl Into<String>) -> Self {
        Self::Backend {
            status,
            kind: BackendErrorKind::from_type(raw_type),
            reason: reason.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a response shape error
    pub fn response_shape(message: impl Into<String>) -> Self {
        Self::ResponseShape {
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Backend error category, if this is a backend error
    pub fn backend_kind(&self) -> Option<&BackendErrorKind> {
        match self {
            Error::Backend { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Check if this error is worth retrying at the transport level
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection(_) | Error::Timeout { .. } => true,
            Error::Backend { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for scrollkit
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Backend Error Categories
// ============================================================================

/// Closed set of backend error categories.
///
/// Built from the `error.type` field of a backend error payload. Anything
/// not recognized lands in `Unknown` with the raw string preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum BackendErrorKind {
    /// `search_phase_execution_exception`
    SearchPhaseExecution,
    /// `search_context_missing_exception` (cursor expired or already freed)
    SearchContextMissing,
    /// `index_not_found_exception`
    IndexNotFound,
    /// `parsing_exception`
    Parsing,
    /// `illegal_argument_exception`
    IllegalArgument,
    /// `security_exception`
    Security,
    /// Any other type string, or none at all
    Unknown(String),
}

impl BackendErrorKind {
    /// Map a raw `error.type` string to a category
    pub fn from_type(raw: &str) -> Self {
        match raw {
            "search_phase_execution_exception" => Self::SearchPhaseExecution,
            "search_context_missing_exception" => Self::SearchContextMissing,
            "index_not_found_exception" => Self::IndexNotFound,
            "parsing_exception" => Self::Parsing,
            "illegal_argument_exception" => Self::IllegalArgument,
            "security_exception" => Self::Security,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The raw wire string for this category
    pub fn as_str(&self) -> &str {
        match self {
            Self::SearchPhaseExecution => "search_phase_execution_exception",
            Self::SearchContextMissing => "search_context_missing_exception",
            Self::IndexNotFound => "index_not_found_exception",
            Self::Parsing => "parsing_exception",
            Self::IllegalArgument => "illegal_argument_exception",
            Self::Security => "security_exception",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) if raw.is_empty() => f.write_str("unknown"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<String> for BackendErrorKind {
    fn from(raw: String) -> Self {
        Self::from_type(&raw)
    }
}

impl From<BackendErrorKind> for String {
    fn from(kind: BackendErrorKind) -> Self {
        kind.as_str().to_string()
    }
}

// ============================================================================
// Context helpers
// ============================================================================

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("backend.index");
        assert_eq!(
            err.to_string(),
            "Missing required config field: backend.index"
        );

        let err = Error::backend(404, "index_not_found_exception", "no such index [pages]");
        assert_eq!(
            err.to_string(),
            "Backend error 404 (index_not_found_exception): no such index [pages]"
        );
    }

    #[test_case("search_phase_execution_exception", BackendErrorKind::SearchPhaseExecution)]
    #[test_case("search_context_missing_exception", BackendErrorKind::SearchContextMissing)]
    #[test_case("index_not_found_exception", BackendErrorKind::IndexNotFound)]
    #[test_case("parsing_exception", BackendErrorKind::Parsing)]
    #[test_case("illegal_argument_exception", BackendErrorKind::IllegalArgument)]
    #[test_case("security_exception", BackendErrorKind::Security)]
    fn test_backend_kind_round_trips_known_types(raw: &str, expected: BackendErrorKind) {
        let kind = BackendErrorKind::from_type(raw);
        assert_eq!(kind, expected);
        assert_eq!(kind.as_str(), raw);
    }

    #[test]
    fn test_backend_kind_unknown_keeps_raw() {
        let kind = BackendErrorKind::from_type("circuit_breaking_exception");
        assert_eq!(
            kind,
            BackendErrorKind::Unknown("circuit_breaking_exception".to_string())
        );
        assert_eq!(kind.to_string(), "circuit_breaking_exception");
        assert_eq!(BackendErrorKind::from_type("").to_string(), "unknown");
    }

    #[test]
    fn test_backend_kind_serde_uses_wire_string() {
        let kind: BackendErrorKind =
            serde_json::from_str("\"search_phase_execution_exception\"").unwrap();
        assert_eq!(kind, BackendErrorKind::SearchPhaseExecution);
        assert_eq!(
            serde_json::to_string(&BackendErrorKind::Parsing).unwrap(),
            "\"parsing_exception\""
        );
    }

    #[test]
    fn test_backend_kind_accessor() {
        let err = Error::backend(500, "search_phase_execution_exception", "all shards failed");
        assert_eq!(
            err.backend_kind(),
            Some(&BackendErrorKind::SearchPhaseExecution)
        );
        assert!(Error::config("x").backend_kind().is_none());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::backend(429, "", "").is_retryable());
        assert!(Error::backend(503, "", "").is_retryable());

        assert!(!Error::backend(400, "parsing_exception", "").is_retryable());
        assert!(!Error::backend(404, "", "").is_retryable());
        assert!(!Error::encoding("bad query").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
