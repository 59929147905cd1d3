//! Tests for the scroll engine

use super::*;
use crate::error::{BackendErrorKind, Error, Result};
use crate::types::{CursorToken, JsonValue, Record, ScrollTtl};
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted backend
// ============================================================================

/// In-memory backend that replays canned responses and counts calls
#[derive(Default)]
struct ScriptedBackend {
    open: Mutex<Option<Result<JsonValue>>>,
    advances: Mutex<VecDeque<Result<JsonValue>>>,
    hang_on_open: bool,
    open_calls: AtomicUsize,
    advance_calls: AtomicUsize,
    open_bodies: Mutex<Vec<JsonValue>>,
    cursors_seen: Mutex<Vec<String>>,
    ttls_seen: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(open: Result<JsonValue>) -> Self {
        Self {
            open: Mutex::new(Some(open)),
            ..Self::default()
        }
    }

    fn hanging() -> Self {
        Self {
            hang_on_open: true,
            ..Self::default()
        }
    }

    fn then(self, advance: Result<JsonValue>) -> Self {
        self.advances.lock().unwrap().push_back(advance);
        self
    }

    fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    fn advance_calls(&self) -> usize {
        self.advance_calls.load(Ordering::SeqCst)
    }

    fn cursors_seen(&self) -> Vec<String> {
        self.cursors_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn open_scroll(
        &self,
        _index: &str,
        body: &JsonValue,
        ttl: ScrollTtl,
    ) -> Result<JsonValue> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.open_bodies.lock().unwrap().push(body.clone());
        self.ttls_seen.lock().unwrap().push(ttl.to_param());
        if self.hang_on_open {
            std::future::pending::<()>().await;
        }
        self.open
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(Error::session("open called twice")))
    }

    async fn continue_scroll(&self, cursor: &CursorToken, ttl: ScrollTtl) -> Result<JsonValue> {
        self.advance_calls.fetch_add(1, Ordering::SeqCst);
        self.cursors_seen
            .lock()
            .unwrap()
            .push(cursor.as_str().to_string());
        self.ttls_seen.lock().unwrap().push(ttl.to_param());
        self.advances
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::session("unexpected advance")))
    }
}

/// Observer that records transitions and signals when the session ends
#[derive(Default)]
struct RecordingObserver {
    transitions: Mutex<Vec<(SessionState, SessionState)>>,
    terminals: Mutex<Vec<BackendErrorKind>>,
    summaries: Mutex<Vec<ScrollSummary>>,
    failures: AtomicUsize,
    done: Notify,
}

impl RecordingObserver {
    fn transitions(&self) -> Vec<(SessionState, SessionState)> {
        self.transitions.lock().unwrap().clone()
    }
}

impl ScrollObserver for RecordingObserver {
    fn on_transition(&self, _index: &str, from: SessionState, to: SessionState) {
        self.transitions.lock().unwrap().push((from, to));
    }

    fn on_terminal(&self, _index: &str, kind: &BackendErrorKind) {
        self.terminals.lock().unwrap().push(kind.clone());
    }

    fn on_finish(&self, _index: &str, summary: &ScrollSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
        self.done.notify_one();
    }

    fn on_failure(&self, _index: &str, _error: &Error) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.done.notify_one();
    }
}

fn page(cursor: Option<&str>, sources: &[JsonValue]) -> JsonValue {
    let hits: Vec<JsonValue> = sources
        .iter()
        .enumerate()
        .map(|(i, source)| json!({"_id": i.to_string(), "_source": source}))
        .collect();
    let mut body = json!({ "hits": { "hits": hits } });
    if let Some(cursor) = cursor {
        body["_scroll_id"] = json!(cursor);
    }
    body
}

fn r(n: u32) -> JsonValue {
    json!({ "name": format!("r{n}") })
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| record["name"].as_str().unwrap().to_string())
        .collect()
}

fn exhausted() -> Error {
    Error::backend(404, "search_phase_execution_exception", "all shards failed")
}

/// r1..r5 with page size 2, then a terminal signal on the third cursor
fn five_records() -> ScriptedBackend {
    ScriptedBackend::new(Ok(page(Some("c1"), &[r(1), r(2)])))
        .then(Ok(page(Some("c2"), &[r(3), r(4)])))
        .then(Ok(page(Some("c3"), &[r(5)])))
        .then(Err(exhausted()))
}

fn request() -> ScrollRequest {
    ScrollRequest::match_all("pages").with_page_size(2)
}

// ============================================================================
// End-to-end sessions
// ============================================================================

#[tokio::test]
async fn test_streams_every_record_in_order_until_terminal() {
    let backend = Arc::new(five_records());
    let handle = stream(backend.clone(), request(), CancellationToken::new());

    let (records, summary) = handle.collect_all().await.unwrap();

    assert_eq!(names(&records), vec!["r1", "r2", "r3", "r4", "r5"]);
    assert_eq!(backend.open_calls(), 1);
    assert_eq!(backend.cursors_seen(), vec!["c1", "c2", "c3"]);
    assert_eq!(summary.final_state, SessionState::Terminated);
    assert_eq!(summary.round_trips, 4);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.records_emitted, 5);
    assert_eq!(
        summary.terminal,
        Some(BackendErrorKind::SearchPhaseExecution)
    );
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_first_request_shape_and_ttl() {
    let backend = Arc::new(five_records());
    let request = ScrollRequest::new("pages", json!({"term": {"lang": "en"}}))
        .with_page_size(2)
        .with_ttl(ScrollTtl::from_secs(120));

    stream(backend.clone(), request, CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(
        backend.open_bodies.lock().unwrap().clone(),
        vec![json!({"query": {"term": {"lang": "en"}}, "size": 2})]
    );
    let ttls = backend.ttls_seen.lock().unwrap().clone();
    assert_eq!(ttls.len(), 4);
    assert!(ttls.iter().all(|ttl| ttl == "2m"));
}

#[tokio::test]
async fn test_sub_millisecond_ttl_is_sent_as_one_millisecond() {
    let backend = Arc::new(five_records());
    let request = ScrollRequest::match_all("pages")
        .with_page_size(2)
        .with_ttl(ScrollTtl::new(Duration::from_micros(500)));

    stream(backend.clone(), request, CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    let ttls = backend.ttls_seen.lock().unwrap().clone();
    assert!(!ttls.is_empty());
    assert!(ttls.iter().all(|ttl| ttl == "1ms"), "got {ttls:?}");
}

#[tokio::test]
async fn test_zero_hits_ends_without_advancing() {
    let backend = Arc::new(ScriptedBackend::new(Ok(page(Some("c1"), &[]))));

    let (records, summary) = stream(backend.clone(), request(), CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(backend.advance_calls(), 0);
    assert_eq!(summary.round_trips, 1);
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.terminal, None);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_empty_page_ends_stream() {
    let backend = Arc::new(
        ScriptedBackend::new(Ok(page(Some("c1"), &[r(1), r(2)])))
            .then(Ok(page(Some("c2"), &[]))),
    );

    let (records, summary) = stream(backend.clone(), request(), CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(names(&records), vec!["r1", "r2"]);
    assert_eq!(backend.advance_calls(), 1);
    assert_eq!(summary.terminal, None);
}

#[tokio::test]
async fn test_missing_cursor_ends_after_emitting_page() {
    let backend = Arc::new(ScriptedBackend::new(Ok(page(None, &[r(1), r(2)]))));

    let (records, _) = stream(backend.clone(), request(), CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(names(&records), vec!["r1", "r2"]);
    assert_eq!(backend.advance_calls(), 0);
}

#[tokio::test]
async fn test_short_page_still_advances() {
    // A page smaller than page_size is not treated as the end.
    let backend = Arc::new(
        ScriptedBackend::new(Ok(page(Some("c1"), &[r(1)])))
            .then(Ok(page(Some("c2"), &[r(2)])))
            .then(Err(exhausted())),
    );

    let (records, _) = stream(backend.clone(), request(), CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(names(&records), vec!["r1", "r2"]);
    assert_eq!(backend.advance_calls(), 2);
}

#[tokio::test]
async fn test_malformed_hits_are_skipped() {
    let body = json!({
        "_scroll_id": "c1",
        "hits": {"hits": [
            {"_id": "1", "_source": r(1)},
            {"_id": "2"},
            "garbage",
            {"_id": "4", "_source": r(2)}
        ]}
    });
    let backend = Arc::new(ScriptedBackend::new(Ok(body)).then(Err(exhausted())));

    let (records, summary) = stream(backend, request(), CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(names(&records), vec!["r1", "r2"]);
    assert_eq!(summary.records_skipped, 2);
    assert_eq!(summary.records_emitted, 2);
}

#[tokio::test]
async fn test_stream_trait() {
    let backend = Arc::new(five_records());
    let handle = stream(backend, request(), CancellationToken::new());

    let records: Vec<Record> = handle.collect().await;

    assert_eq!(names(&records), vec!["r1", "r2", "r3", "r4", "r5"]);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_non_terminal_error_fails_after_delivering_earlier_records() {
    let backend = Arc::new(
        ScriptedBackend::new(Ok(page(Some("c1"), &[r(1), r(2)]))).then(Err(Error::backend(
            404,
            "search_context_missing_exception",
            "No search context found for id [7]",
        ))),
    );
    let mut handle = stream(backend.clone(), request(), CancellationToken::new());

    let mut records = Vec::new();
    while let Some(record) = handle.recv().await {
        records.push(record);
    }
    let err = handle.finish().await.unwrap_err();

    assert_eq!(names(&records), vec!["r1", "r2"]);
    assert_eq!(
        err.backend_kind(),
        Some(&BackendErrorKind::SearchContextMissing)
    );
    assert_eq!(backend.advance_calls(), 1);
}

#[tokio::test]
async fn test_open_failure_emits_nothing() {
    let backend = Arc::new(ScriptedBackend::new(Err(Error::backend(
        404,
        "index_not_found_exception",
        "no such index [pages]",
    ))));
    let observer = Arc::new(RecordingObserver::default());

    let mut handle = ScrollSession::new(backend.clone())
        .with_observer(observer.clone())
        .spawn(request(), CancellationToken::new());

    assert!(handle.recv().await.is_none());
    let err = handle.finish().await.unwrap_err();

    assert_eq!(err.backend_kind(), Some(&BackendErrorKind::IndexNotFound));
    assert_eq!(backend.advance_calls(), 0);
    assert_eq!(
        observer.transitions(),
        vec![(SessionState::Initializing, SessionState::Failed)]
    );
    assert_eq!(observer.failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_terminal_error_on_open_is_fatal() {
    // Only Advance consults the allow-list.
    let backend = Arc::new(ScriptedBackend::new(Err(exhausted())));

    let err = stream(backend, request(), CancellationToken::new())
        .finish()
        .await
        .unwrap_err();

    assert_eq!(
        err.backend_kind(),
        Some(&BackendErrorKind::SearchPhaseExecution)
    );
}

#[tokio::test]
async fn test_empty_allow_list_makes_every_backend_error_fatal() {
    let backend = Arc::new(five_records());

    let handle = ScrollSession::new(backend)
        .with_terminal_conditions(TerminalConditions::none())
        .spawn(request(), CancellationToken::new());
    let result = handle.collect_all().await;

    assert!(matches!(result, Err(Error::Backend { status: 404, .. })));
}

#[tokio::test]
async fn test_zero_page_size_is_rejected_before_any_request() {
    let backend = Arc::new(five_records());
    let request = ScrollRequest::match_all("pages").with_page_size(0);

    let err = tokio_test::assert_err!(
        stream(backend.clone(), request, CancellationToken::new())
            .finish()
            .await
    );

    assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "page_size"));
    assert_eq!(backend.open_calls(), 0);
}

#[test]
fn test_unserializable_query_is_an_encoding_error() {
    // JSON object keys must be strings.
    let mut query = HashMap::new();
    query.insert((1, 2), "x");

    let err = ScrollRequest::for_query("pages", &query).unwrap_err();

    assert!(matches!(err, Error::Encoding { .. }));
}

#[tokio::test]
async fn test_initiator_rejects_unserializable_query() {
    let backend = Arc::new(five_records());
    let initiator = Initiator::new(
        backend.clone(),
        Arc::new(crate::decode::HitsDecoder::new()),
        ScrollTtl::default(),
    );
    let mut query = HashMap::new();
    query.insert((1, 2), "x");

    let err = initiator.open("pages", &query, 10).await.unwrap_err();

    assert!(matches!(err, Error::Encoding { .. }));
    assert_eq!(backend.open_calls(), 0);
}

// ============================================================================
// Cancellation and backpressure
// ============================================================================

#[tokio::test]
async fn test_cancel_before_consuming_yields_nothing() {
    let backend = Arc::new(five_records());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut handle = stream(backend.clone(), request(), cancel);

    assert!(handle.recv().await.is_none());
    let summary = handle.finish().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.records_emitted, 0);
    assert_eq!(summary.final_state, SessionState::Terminated);
    assert_eq!(backend.open_calls(), 0);
    assert!(!summary.is_complete());
}

#[tokio::test]
async fn test_cancel_mid_stream_stops_producer() {
    let backend = Arc::new(five_records());
    let mut handle = stream(backend.clone(), request(), CancellationToken::new());

    let first = handle.recv().await.unwrap();
    handle.cancel();

    assert_eq!(first["name"], "r1");
    assert!(handle.recv().await.is_none());

    let summary = handle.finish().await.unwrap();
    assert!(summary.cancelled);
    assert!(summary.terminal.is_none());
    assert!(backend.advance_calls() < 3);
}

#[tokio::test]
async fn test_cancel_interrupts_pending_request() {
    let backend = Arc::new(ScriptedBackend::hanging());
    let handle = stream(backend.clone(), request(), CancellationToken::new());

    while backend.open_calls() == 0 {
        tokio::task::yield_now().await;
    }
    handle.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle.finish())
        .await
        .expect("session did not stop")
        .unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.records_emitted, 0);
}

#[tokio::test]
async fn test_parent_token_stops_session_but_handle_cancel_does_not_propagate_up() {
    let parent = CancellationToken::new();

    let handle = stream(Arc::new(five_records()), request(), parent.clone());
    handle.cancel();
    assert!(!parent.is_cancelled());
    handle.finish().await.unwrap();

    let handle = stream(Arc::new(five_records()), request(), parent.clone());
    parent.cancel();
    assert!(handle.cancellation_token().is_cancelled());
    assert!(handle.finish().await.unwrap().cancelled);
}

#[tokio::test]
async fn test_backpressure_blocks_advance_until_consumed() {
    let backend = Arc::new(five_records());
    let mut handle = stream(backend.clone(), request(), CancellationToken::new());

    // Capacity 1: r1 is buffered, r2 waits, so c1 is never advanced.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.open_calls(), 1);
    assert_eq!(backend.advance_calls(), 0);

    let mut count = 0;
    while handle.recv().await.is_some() {
        count += 1;
    }
    assert_eq!(count, 5);
    assert_eq!(backend.advance_calls(), 3);
}

#[tokio::test]
async fn test_dropped_consumer_ends_session() {
    let backend = Arc::new(five_records());
    let observer = Arc::new(RecordingObserver::default());

    let mut handle = ScrollSession::new(backend.clone())
        .with_observer(observer.clone())
        .spawn(request(), CancellationToken::new());
    handle.recv().await.unwrap();
    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), observer.done.notified())
        .await
        .expect("session did not end");

    let summaries = observer.summaries.lock().unwrap().clone();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].cancelled);
    assert_eq!(observer.failures.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_transitions_for_terminal_run() {
    let observer = Arc::new(RecordingObserver::default());

    ScrollSession::new(Arc::new(five_records()))
        .with_observer(observer.clone())
        .spawn(request(), CancellationToken::new())
        .collect_all()
        .await
        .unwrap();

    assert_eq!(
        observer.transitions(),
        vec![
            (SessionState::Initializing, SessionState::Streaming),
            (SessionState::Streaming, SessionState::Draining),
            (SessionState::Draining, SessionState::Terminated),
        ]
    );
    assert_eq!(
        observer.terminals.lock().unwrap().clone(),
        vec![BackendErrorKind::SearchPhaseExecution]
    );
}

#[tokio::test]
async fn test_transitions_for_cancelled_run() {
    let observer = Arc::new(RecordingObserver::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    ScrollSession::new(Arc::new(five_records()))
        .with_observer(observer.clone())
        .spawn(request(), cancel)
        .finish()
        .await
        .unwrap();

    assert_eq!(
        observer.transitions(),
        vec![(SessionState::Initializing, SessionState::Terminated)]
    );
}

#[test_case(SessionState::Initializing, SessionState::Streaming, true)]
#[test_case(SessionState::Initializing, SessionState::Failed, true)]
#[test_case(SessionState::Streaming, SessionState::Draining, true)]
#[test_case(SessionState::Streaming, SessionState::Initializing, false)]
#[test_case(SessionState::Draining, SessionState::Streaming, false)]
#[test_case(SessionState::Draining, SessionState::Terminated, true)]
#[test_case(SessionState::Terminated, SessionState::Streaming, false)]
#[test_case(SessionState::Failed, SessionState::Terminated, false)]
fn test_state_transitions(from: SessionState, to: SessionState, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn test_final_states() {
    assert!(SessionState::Terminated.is_final());
    assert!(SessionState::Failed.is_final());
    assert!(!SessionState::Draining.is_final());
}

// ============================================================================
// Advancer and Page
// ============================================================================

#[tokio::test]
async fn test_advancer_classifies_errors() {
    let backend = Arc::new(
        ScriptedBackend::new(Ok(json!({})))
            .then(Err(exhausted()))
            .then(Err(Error::backend(400, "parsing_exception", "bad"))),
    );
    let advancer = Advancer::new(
        backend,
        Arc::new(crate::decode::HitsDecoder::new()),
        TerminalConditions::default(),
        ScrollTtl::default(),
    );
    let cursor = CursorToken::new("c1");

    let first = advancer.advance(&cursor).await.unwrap();
    assert!(first.is_terminal());

    let second = advancer.advance(&cursor).await.unwrap_err();
    assert_eq!(second.backend_kind(), Some(&BackendErrorKind::Parsing));
}

#[test]
fn test_page_reads_cursor_and_total() {
    let decoder = crate::decode::HitsDecoder::new();
    let body = json!({
        "_scroll_id": "c9",
        "hits": {"total": {"value": 42, "relation": "eq"}, "hits": [{"_source": r(1)}]}
    });

    let page = Page::from_response(&body, &decoder).unwrap();

    assert_eq!(page.next_cursor, Some(CursorToken::new("c9")));
    assert_eq!(page.total_hits, Some(42));
    assert!(!page.is_last());

    let legacy = json!({"hits": {"total": 7, "hits": []}});
    let page = Page::from_response(&legacy, &decoder).unwrap();
    assert_eq!(page.total_hits, Some(7));
    assert!(page.is_exhausted());
    assert!(page.is_last());
}

#[test]
fn test_page_rejects_non_string_cursor() {
    let decoder = crate::decode::HitsDecoder::new();
    let body = json!({"_scroll_id": 12, "hits": {"hits": []}});

    let err = Page::from_response(&body, &decoder).unwrap_err();

    assert!(matches!(err, Error::ResponseShape { .. }));
}

#[test]
fn test_empty_cursor_means_none() {
    let decoder = crate::decode::HitsDecoder::new();
    let body = json!({"_scroll_id": "", "hits": {"hits": [{"_source": r(1)}]}});

    let page = Page::from_response(&body, &decoder).unwrap();

    assert!(page.next_cursor.is_none());
    assert!(page.is_last());
}

#[test]
fn test_request_builders() {
    let request = ScrollRequest::match_all("logs-*")
        .with_page_size(500)
        .with_ttl(ScrollTtl::from_secs(30))
        .with_channel_capacity(8);

    assert_eq!(request.index, "logs-*");
    assert_eq!(request.query, json!({"match_all": {}}));
    assert_eq!(request.page_size, 500);
    assert_eq!(request.ttl.to_param(), "30s");
    assert_eq!(request.channel_capacity, 8);
    assert_eq!(ScrollRequest::match_all("x").page_size, DEFAULT_PAGE_SIZE);
}
