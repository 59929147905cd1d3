//! Consumer side of a stream session

use super::types::ScrollSummary;
use crate::error::{Error, Result};
use crate::types::Record;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Receives records from a running session.
///
/// Records arrive in backend order. Once the session is cancelled no further
/// records are handed out, even if some were already buffered. Dropping the
/// handle cancels the session.
#[derive(Debug)]
pub struct ScrollHandle {
    records: mpsc::Receiver<Record>,
    task: JoinHandle<Result<ScrollSummary>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl ScrollHandle {
    pub(crate) fn new(
        records: mpsc::Receiver<Record>,
        task: JoinHandle<Result<ScrollSummary>>,
        cancel: CancellationToken,
    ) -> Self {
        let guard = cancel.clone().drop_guard();
        Self {
            records,
            task,
            cancel,
            _guard: guard,
        }
    }

    /// Receive the next record, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<Record> {
        if self.cancel.is_cancelled() {
            self.records.close();
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                self.records.close();
                None
            }
            record = self.records.recv() => record,
        }
    }

    /// Ask the session to stop; already-running requests are abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by this session
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check if the producer task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop consuming and wait for the session's outcome.
    ///
    /// A session that is still producing is cancelled first. Returns the
    /// summary on graceful termination and the session's error otherwise.
    pub async fn finish(self) -> Result<ScrollSummary> {
        let Self {
            records,
            task,
            cancel: _,
            _guard: guard,
        } = self;
        drop(records);
        drop(guard);

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(Error::session(format!("scroll task panicked: {e}"))),
            Err(e) => Err(Error::session(format!("scroll task aborted: {e}"))),
        }
    }

    /// Drain every record, then return them with the session's summary
    pub async fn collect_all(mut self) -> Result<(Vec<Record>, ScrollSummary)> {
        let mut records = Vec::new();
        while let Some(record) = self.recv().await {
            records.push(record);
        }
        let summary = self.finish().await?;
        Ok((records, summary))
    }
}

impl Stream for ScrollHandle {
    type Item = Record;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            this.records.close();
            return Poll::Ready(None);
        }
        this.records.poll_recv(cx)
    }
}
