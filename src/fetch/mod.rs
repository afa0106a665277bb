//! Cancellation-safe wrapper around the caller's search backend.
//!
//! Every request supersedes the previous one: its token is cancelled inside
//! the same critical section that installs the new token, and a completion
//! whose token is already cancelled is dropped without touching state. This
//! is what keeps a slow, stale response from overwriting a fresher one.

mod fetcher;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;

pub use fetcher::{FetchFuture, Fetcher};

/// Shortest trimmed query that is sent to the backend by default.
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;

/// Lifecycle of a search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    Closed,
    Idle,
    Loading,
    Success,
    Error,
}

/// Point-in-time copy of the orchestrator state.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSnapshot<T> {
    pub phase: FetchPhase,
    /// Query of the request that is loading or produced `data`/`error`.
    pub query: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> FetchSnapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.phase == FetchPhase::Loading
    }
}

struct FetchState<T> {
    phase: FetchPhase,
    query: Option<String>,
    data: Option<T>,
    error: Option<String>,
    inflight: Option<CancellationToken>,
}

impl<T> FetchState<T> {
    fn reset(&mut self, phase: FetchPhase) {
        if let Some(token) = self.inflight.take() {
            token.cancel();
        }
        self.phase = phase;
        self.query = None;
        self.data = None;
        self.error = None;
    }
}

/// Issues at most one live request at a time against a [`Fetcher`].
pub struct FetchOrchestrator<F: Fetcher> {
    fetcher: Arc<F>,
    handle: Handle,
    min_query_len: usize,
    state: Arc<Mutex<FetchState<F::Output>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<F: Fetcher> Clone for FetchOrchestrator<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            handle: self.handle.clone(),
            min_query_len: self.min_query_len,
            state: Arc::clone(&self.state),
            revision: Arc::clone(&self.revision),
        }
    }
}

impl<F: Fetcher> FetchOrchestrator<F> {
    /// Create a closed orchestrator that spawns fetches on `handle`.
    pub fn new(fetcher: F, handle: Handle) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            fetcher: Arc::new(fetcher),
            handle,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            state: Arc::new(Mutex::new(FetchState {
                phase: FetchPhase::Closed,
                query: None,
                data: None,
                error: None,
                inflight: None,
            })),
            revision: Arc::new(revision),
        }
    }

    pub fn with_min_query_len(mut self, min_query_len: usize) -> Self {
        self.min_query_len = min_query_len;
        self
    }

    pub fn min_query_len(&self) -> usize {
        self.min_query_len
    }

    /// Start a session. No-op when already open.
    pub fn open(&self) {
        let mut state = self.state.lock();
        if state.phase == FetchPhase::Closed {
            state.phase = FetchPhase::Idle;
            drop(state);
            self.bump();
        }
    }

    /// End the session: cancel whatever is in flight and clear all data.
    pub fn close(&self) {
        self.state.lock().reset(FetchPhase::Closed);
        debug!("search session closed");
        self.bump();
    }

    /// Search for `query`, superseding any request still in flight.
    ///
    /// Closed sessions and queries shorter than the configured minimum only
    /// cancel the previous request and clear the results.
    pub fn request(&self, query: &str) {
        let query = query.trim().to_string();
        let token = {
            let mut state = self.state.lock();
            if let Some(previous) = state.inflight.take() {
                previous.cancel();
            }

            if state.phase == FetchPhase::Closed {
                drop(state);
                self.bump();
                return;
            }
            if query.chars().count() < self.min_query_len {
                state.reset(FetchPhase::Idle);
                drop(state);
                self.bump();
                return;
            }

            let token = CancellationToken::new();
            state.inflight = Some(token.clone());
            state.phase = FetchPhase::Loading;
            state.query = Some(query.clone());
            state.error = None;
            token
        };
        self.bump();

        debug!(query = %query, "issuing search request");
        let future = self.fetcher.fetch(query.clone(), token.clone());
        let state = Arc::clone(&self.state);
        let revision = Arc::clone(&self.revision);
        self.handle.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = future => Some(result),
            };
            if complete(&state, &token, &query, outcome) {
                revision.send_modify(|value| *value = value.wrapping_add(1));
            }
        });
    }

    pub fn snapshot(&self) -> FetchSnapshot<F::Output> {
        let state = self.state.lock();
        FetchSnapshot {
            phase: state.phase,
            query: state.query.clone(),
            data: state.data.clone(),
            error: state.error.clone(),
        }
    }

    /// Receiver that observes a new value after every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Wake subscribers without changing state.
    pub(crate) fn bump(&self) {
        self.revision
            .send_modify(|value| *value = value.wrapping_add(1));
    }
}

/// Apply a finished request. Returns whether state changed.
fn complete<T>(
    state: &Mutex<FetchState<T>>,
    token: &CancellationToken,
    query: &str,
    outcome: Option<Result<T, FetchError>>,
) -> bool {
    let mut state = state.lock();
    if token.is_cancelled() {
        debug!(query, "discarding superseded response");
        return false;
    }

    match outcome {
        None => false,
        Some(Err(FetchError::Cancelled)) => {
            debug!(query, "backend cancelled the request");
            state.inflight = None;
            state.phase = FetchPhase::Idle;
            state.error = None;
            true
        }
        Some(Ok(data)) => {
            debug!(query, "search request succeeded");
            state.inflight = None;
            state.phase = FetchPhase::Success;
            state.data = Some(data);
            state.error = None;
            true
        }
        Some(Err(FetchError::Backend(message))) => {
            debug!(query, error = %message, "search request failed");
            state.inflight = None;
            state.phase = FetchPhase::Error;
            state.data = None;
            state.error = Some(message);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn echo_after(delay_ms: u64) -> impl Fetcher<Output = String> {
        move |query: String, _cancel: CancellationToken| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<_, FetchError>(format!("results for {query}"))
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn starts_closed_and_ignores_requests() {
        let orchestrator = FetchOrchestrator::new(echo_after(10), Handle::current());
        orchestrator.request("nike");
        settle().await;

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, FetchPhase::Closed);
        assert!(snapshot.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_request_exposes_data() {
        let orchestrator = FetchOrchestrator::new(echo_after(10), Handle::current());
        orchestrator.open();
        orchestrator.request(" nike ");
        assert!(orchestrator.snapshot().is_loading());

        settle().await;
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, FetchPhase::Success);
        assert_eq!(snapshot.query.as_deref(), Some("nike"));
        assert_eq!(snapshot.data.as_deref(), Some("results for nike"));
        assert!(snapshot.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn short_queries_reset_to_idle() {
        let orchestrator = FetchOrchestrator::new(echo_after(10), Handle::current());
        orchestrator.open();
        orchestrator.request("nike");
        settle().await;

        orchestrator.request("n");
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, FetchPhase::Idle);
        assert!(snapshot.data.is_none());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_never_overwrites_newer_one() {
        let fetcher = |query: String, _cancel: CancellationToken| async move {
            let delay = if query == "slow" { 500 } else { 50 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, FetchError>(query)
        };
        let orchestrator = FetchOrchestrator::new(fetcher, Handle::current());
        orchestrator.open();

        orchestrator.request("slow");
        orchestrator.request("fast");
        settle().await;

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, FetchPhase::Success);
        assert_eq!(snapshot.data.as_deref(), Some("fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_errors_surface_and_cancellation_does_not() {
        let fetcher = |query: String, _cancel: CancellationToken| async move {
            if query == "boom" {
                Err(FetchError::backend("backend unavailable"))
            } else {
                Err::<String, _>(FetchError::Cancelled)
            }
        };
        let orchestrator = FetchOrchestrator::new(fetcher, Handle::current());
        orchestrator.open();

        orchestrator.request("boom");
        settle().await;
        let failed = orchestrator.snapshot();
        assert_eq!(failed.phase, FetchPhase::Error);
        assert_eq!(failed.error.as_deref(), Some("backend unavailable"));

        orchestrator.request("quiet");
        settle().await;
        let cancelled = orchestrator.snapshot();
        assert_eq!(cancelled.phase, FetchPhase::Idle);
        assert!(cancelled.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn close_discards_inflight_response() {
        let orchestrator = FetchOrchestrator::new(echo_after(100), Handle::current());
        orchestrator.open();
        orchestrator.request("nike");
        orchestrator.close();
        settle().await;

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, FetchPhase::Closed);
        assert!(snapshot.data.is_none());
        assert!(snapshot.query.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fetcher_sees_cancellation_when_superseded() {
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
        let fetcher = move |query: String, cancel: CancellationToken| {
            let seen_tx = seen_tx.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let _ = seen_tx.send((query.clone(), cancel.is_cancelled()));
                Ok::<_, FetchError>(query)
            }
        };
        let orchestrator = FetchOrchestrator::new(fetcher, Handle::current());
        orchestrator.open();
        orchestrator.request("first");
        orchestrator.request("second");
        settle().await;

        // The superseded future is dropped before it reports.
        assert_eq!(seen_rx.recv().await, Some(("second".to_string(), false)));
        assert!(seen_rx.try_recv().is_err());
    }
}
