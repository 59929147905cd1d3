//! Cursor Lifecycle Manager
//!
//! Runs one stream session as an independent task:
//!
//! ```text
//! Initializing ──first page──▶ Streaming ──page──▶ Streaming
//!      │                          │
//!      │ error                    ├─ terminal signal / last page ─▶ Draining ─▶ Terminated
//!      ▼                          ├─ error ─────────────────────────────────▶ Failed
//!    Failed                       └─ cancelled ─────────────────────────────▶ Terminated
//! ```
//!
//! The record sender is owned by the task and dropped on every exit path,
//! so the consumer always sees the channel close exactly once. Every send
//! and every backend call races the cancellation token.

use super::advancer::Advancer;
use super::handle::ScrollHandle;
use super::initiator::Initiator;
use super::observer::{ScrollObserver, TracingObserver};
use super::terminal::TerminalConditions;
use super::types::{Advance, Page, ScrollRequest, ScrollSummary, SessionState};
use crate::backend::SearchBackend;
use crate::decode::{HitsDecoder, PageDecoder};
use crate::error::{BackendErrorKind, Result};
use crate::types::Record;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Builder and driver for stream sessions
#[derive(Clone)]
pub struct ScrollSession {
    backend: Arc<dyn SearchBackend>,
    decoder: Arc<dyn PageDecoder>,
    observer: Arc<dyn ScrollObserver>,
    terminal: TerminalConditions,
}

impl ScrollSession {
    /// Create a session factory with default decoder, observer, and allow-list
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            decoder: Arc::new(HitsDecoder::new()),
            observer: Arc::new(TracingObserver),
            terminal: TerminalConditions::default(),
        }
    }

    /// Use a different page decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn PageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Report lifecycle events to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ScrollObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the terminal-condition allow-list
    #[must_use]
    pub fn with_terminal_conditions(mut self, terminal: TerminalConditions) -> Self {
        self.terminal = terminal;
        self
    }

    /// Start streaming `request` on a new task.
    ///
    /// Must be called from within a tokio runtime. The session watches a
    /// child of `cancel`: cancelling `cancel` stops it, while
    /// [`ScrollHandle::cancel`] stops only this session.
    pub fn spawn(self, request: ScrollRequest, cancel: CancellationToken) -> ScrollHandle {
        let token = cancel.child_token();
        let (tx, rx) = mpsc::channel(request.channel_capacity.max(1));
        let task = tokio::spawn(self.run(request, tx, token.clone()));
        ScrollHandle::new(rx, task, token)
    }

    async fn run(
        self,
        request: ScrollRequest,
        tx: mpsc::Sender<Record>,
        cancel: CancellationToken,
    ) -> Result<ScrollSummary> {
        let mut progress = Progress::new(self.observer.as_ref(), &request.index);

        let outcome = self.drive(&request, &tx, &cancel, &mut progress).await;
        drop(tx);

        match outcome {
            Ok(()) => {
                progress.transition(SessionState::Terminated);
                let summary = progress.summary();
                self.observer.on_finish(&request.index, &summary);
                Ok(summary)
            }
            Err(e) => {
                progress.transition(SessionState::Failed);
                self.observer.on_failure(&request.index, &e);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        request: &ScrollRequest,
        tx: &mpsc::Sender<Record>,
        cancel: &CancellationToken,
        progress: &mut Progress<'_>,
    ) -> Result<()> {
        let initiator = Initiator::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.decoder),
            request.ttl,
        );
        let advancer = Advancer::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.decoder),
            self.terminal.clone(),
            request.ttl,
        );

        progress.round_trips += 1;
        let first = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                progress.cancelled = true;
                return Ok(());
            }
            page = initiator.open(&request.index, &request.query, request.page_size) => page?,
        };
        progress.record_page(&first);
        progress.total_hits = first.total_hits;
        progress.transition(SessionState::Streaming);

        let mut page = first;
        loop {
            let last = page.is_last();
            if last {
                if !page.is_exhausted() {
                    debug!("Page carried no cursor; treating it as the last page");
                }
                progress.transition(SessionState::Draining);
            }

            let cursor = page.next_cursor.take();
            for record in std::mem::take(&mut page.records) {
                match emit(tx, cancel, record).await {
                    Emit::Sent => progress.records_emitted += 1,
                    Emit::Cancelled => {
                        progress.cancelled = true;
                        return Ok(());
                    }
                    Emit::Abandoned => {
                        debug!("Consumer dropped the record channel");
                        progress.cancelled = true;
                        return Ok(());
                    }
                }
            }

            if last {
                return Ok(());
            }

            if cancel.is_cancelled() {
                progress.cancelled = true;
                return Ok(());
            }

            let Some(cursor) = cursor else {
                return Ok(());
            };

            progress.round_trips += 1;
            let advance = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    progress.cancelled = true;
                    return Ok(());
                }
                advance = advancer.advance(&cursor) => advance?,
            };

            match advance {
                Advance::Page(next) => {
                    progress.record_page(&next);
                    page = next;
                }
                Advance::Terminal(kind) => {
                    progress.reach_terminal(kind);
                    progress.transition(SessionState::Draining);
                    return Ok(());
                }
            }
        }
    }
}

impl std::fmt::Debug for ScrollSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollSession")
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Emission
// ============================================================================

enum Emit {
    Sent,
    Cancelled,
    Abandoned,
}

/// Send one record, giving up if the session is cancelled while blocked
async fn emit(tx: &mpsc::Sender<Record>, cancel: &CancellationToken, record: Record) -> Emit {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Emit::Cancelled,
        sent = tx.send(record) => match sent {
            Ok(()) => Emit::Sent,
            Err(_) => Emit::Abandoned,
        },
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Per-session counters and state, reported through the observer
struct Progress<'a> {
    observer: &'a dyn ScrollObserver,
    index: &'a str,
    state: SessionState,
    round_trips: u64,
    pages: u64,
    records_emitted: u64,
    records_skipped: u64,
    total_hits: Option<u64>,
    cancelled: bool,
    terminal: Option<BackendErrorKind>,
    started_at: DateTime<Utc>,
}

impl<'a> Progress<'a> {
    fn new(observer: &'a dyn ScrollObserver, index: &'a str) -> Self {
        Self {
            observer,
            index,
            state: SessionState::Initializing,
            round_trips: 0,
            pages: 0,
            records_emitted: 0,
            records_skipped: 0,
            total_hits: None,
            cancelled: false,
            terminal: None,
            started_at: Utc::now(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal scroll transition {} -> {}",
            self.state,
            next
        );
        self.observer.on_transition(self.index, self.state, next);
        self.state = next;
    }

    fn record_page(&mut self, page: &Page) {
        if !page.is_exhausted() {
            self.pages += 1;
        }
        self.records_skipped += page.skipped as u64;
        self.observer
            .on_page(self.index, self.round_trips, page.records.len(), page.skipped);
    }

    fn reach_terminal(&mut self, kind: BackendErrorKind) {
        self.observer.on_terminal(self.index, &kind);
        self.terminal = Some(kind);
    }

    fn summary(&self) -> ScrollSummary {
        ScrollSummary {
            final_state: self.state,
            round_trips: self.round_trips,
            pages: self.pages,
            records_emitted: self.records_emitted,
            records_skipped: self.records_skipped,
            total_hits: self.total_hits,
            cancelled: self.cancelled,
            terminal: self.terminal.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
