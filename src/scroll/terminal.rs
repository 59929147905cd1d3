//! Terminal-condition allow-list
//!
//! Some backends signal "the scan ran out" with an error payload instead of
//! an empty page. The allow-list names the backend error categories that
//! mean end-of-data; every other backend error is fatal.

use crate::error::{BackendErrorKind, Error};
use std::collections::HashSet;

/// Backend error categories treated as graceful end-of-scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConditions {
    kinds: HashSet<BackendErrorKind>,
}

impl Default for TerminalConditions {
    fn default() -> Self {
        Self::from_kinds([BackendErrorKind::SearchPhaseExecution])
    }
}

impl TerminalConditions {
    /// No backend error is terminal
    pub fn none() -> Self {
        Self {
            kinds: HashSet::new(),
        }
    }

    /// Build from error categories
    pub fn from_kinds(kinds: impl IntoIterator<Item = BackendErrorKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Build from raw `error.type` strings (e.g. from configuration)
    pub fn from_types<S: AsRef<str>>(types: impl IntoIterator<Item = S>) -> Self {
        Self::from_kinds(
            types
                .into_iter()
                .map(|raw| BackendErrorKind::from_type(raw.as_ref())),
        )
    }

    /// Check if a category is on the allow-list
    pub fn contains(&self, kind: &BackendErrorKind) -> bool {
        self.kinds.contains(kind)
    }

    /// Return the terminal category if `error` is an allow-listed backend error
    pub fn classify(&self, error: &Error) -> Option<BackendErrorKind> {
        error
            .backend_kind()
            .filter(|kind| self.contains(kind))
            .cloned()
    }

    /// Number of categories on the list
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
