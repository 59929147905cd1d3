//! Session observer
//!
//! The lifecycle manager reports progress to an explicitly supplied
//! observer. Observers only watch; nothing they do affects control flow.

use super::types::{ScrollSummary, SessionState};
use crate::error::{BackendErrorKind, Error};
use tracing::{debug, info, warn};

/// Receives lifecycle events from a stream session.
///
/// All methods default to no-ops.
pub trait ScrollObserver: Send + Sync {
    /// The session moved between lifecycle states
    fn on_transition(&self, _index: &str, _from: SessionState, _to: SessionState) {}

    /// A page arrived from the backend
    fn on_page(&self, _index: &str, _round_trip: u64, _records: usize, _skipped: usize) {}

    /// The backend reported an allow-listed terminal condition
    fn on_terminal(&self, _index: &str, _kind: &BackendErrorKind) {}

    /// The session ended without error
    fn on_finish(&self, _index: &str, _summary: &ScrollSummary) {}

    /// The session ended with an error
    fn on_failure(&self, _index: &str, _error: &Error) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScrollObserver for NoopObserver {}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScrollObserver for TracingObserver {
    fn on_transition(&self, index: &str, from: SessionState, to: SessionState) {
        debug!(index, %from, %to, "scroll state change");
    }

    fn on_page(&self, index: &str, round_trip: u64, records: usize, skipped: usize) {
        debug!(index, round_trip, records, skipped, "scroll page");
        if skipped > 0 {
            warn!(index, round_trip, skipped, "dropped malformed hits");
        }
    }

    fn on_terminal(&self, index: &str, kind: &BackendErrorKind) {
        debug!(index, %kind, "scroll exhausted");
    }

    fn on_finish(&self, index: &str, summary: &ScrollSummary) {
        info!(
            index,
            records = summary.records_emitted,
            skipped = summary.records_skipped,
            round_trips = summary.round_trips,
            cancelled = summary.cancelled,
            elapsed_ms = summary.duration().num_milliseconds(),
            "scroll finished"
        );
    }

    fn on_failure(&self, index: &str, error: &Error) {
        warn!(index, %error, "scroll failed");
    }
}
