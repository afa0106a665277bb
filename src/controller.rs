//! The predictive search session as an explicit state machine.
//!
//! A presentation layer drives [`SearchController`] through
//! [`SearchController::on_query_change`], [`SearchController::on_submit`],
//! [`SearchController::on_pick`] and [`SearchController::on_close`], and reads
//! everything it needs to render from [`SearchController::snapshot`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::debounce::{DebounceTuning, Scheduler, TokioScheduler, compute_delay};
use crate::error::ControllerError;
use crate::fetch::{DEFAULT_MIN_QUERY_LEN, FetchOrchestrator, FetchPhase, Fetcher};
use crate::patterns::{PatternMemory, PatternStats};
use crate::rank::{CandidateSources, PredictiveItem, gather, rank};
use crate::store::{MemoryStore, PersistentStore};
use crate::velocity::TypingVelocityTracker;

/// Default number of ranked items exposed in a snapshot.
pub const DEFAULT_MAX_ITEMS: usize = 12;

/// Behavioural settings of a [`SearchController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub tuning: DebounceTuning,
    pub min_query_len: usize,
    pub max_items: usize,
    /// Curated shortcuts offered alongside live results.
    pub quick_links: Vec<PredictiveItem>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tuning: DebounceTuning::default(),
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            max_items: DEFAULT_MAX_ITEMS,
            quick_links: Vec::new(),
        }
    }
}

/// Everything a search box needs to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSnapshot {
    pub open: bool,
    /// Latest value typed into the field.
    pub query: String,
    /// Value that last made it through the debounce.
    pub debounced_query: String,
    /// Delay computed for the latest keystroke.
    pub delay_ms: u64,
    /// Whether a debounce timer is armed.
    pub pending: bool,
    pub phase: FetchPhase,
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<Vec<PredictiveItem>>,
    /// Ranked suggestions for `query`.
    pub items: Vec<PredictiveItem>,
}

struct Session {
    open: bool,
    query: String,
    debounced_query: String,
    delay_ms: u64,
    tracker: TypingVelocityTracker,
    timer: Option<CancellationToken>,
    generation: u64,
}

/// Coordinates typing speed, debounce, fetching, ranking and learning.
pub struct SearchController<F>
where
    F: Fetcher<Output = Vec<PredictiveItem>>,
{
    session: Arc<Mutex<Session>>,
    memory: Mutex<PatternMemory>,
    orchestrator: FetchOrchestrator<F>,
    scheduler: Arc<dyn Scheduler>,
    options: ControllerOptions,
}

impl<F> SearchController<F>
where
    F: Fetcher<Output = Vec<PredictiveItem>>,
{
    pub fn builder(fetcher: F) -> SearchControllerBuilder<F> {
        SearchControllerBuilder {
            fetcher,
            store: None,
            scheduler: None,
            handle: None,
            options: ControllerOptions::default(),
        }
    }

    /// Handle a new value of the search field typed at `now`.
    ///
    /// Updates the typing estimate, cancels the pending debounce timer and
    /// arms a new one. An empty query is applied immediately.
    pub fn on_query_change(&self, query: &str, now: Instant) {
        let mut session = self.session.lock();
        if !session.open {
            session.open = true;
            self.orchestrator.open();
        }

        session.tracker.record(now);
        session.query = query.to_string();
        if let Some(timer) = session.timer.take() {
            timer.cancel();
        }
        session.generation = session.generation.wrapping_add(1);

        let interval = session.tracker.ema_ms();
        let delay_ms = {
            let memory = self.memory.lock();
            compute_delay(query, Some(interval), memory.stats(), &self.options.tuning)
        };
        session.delay_ms = delay_ms;
        trace!(query, delay_ms, interval, "debounce computed");

        if delay_ms == 0 {
            settle(&mut session, &self.orchestrator, query.trim().to_string());
            return;
        }

        let generation = session.generation;
        let shared = Arc::clone(&self.session);
        let orchestrator = self.orchestrator.clone();
        let settled = query.trim().to_string();
        let timer = self.scheduler.after(
            Duration::from_millis(delay_ms),
            Box::new(move || {
                let mut session = shared.lock();
                if session.generation != generation || !session.open {
                    return;
                }
                session.timer = None;
                settle(&mut session, &orchestrator, settled);
            }),
        );
        session.timer = Some(timer);
    }

    /// Explicit search (Enter or the search button).
    pub fn on_submit(&self, query: &str) {
        let interval = self.session.lock().tracker.ema_ms();
        self.memory.lock().record_submit(query, Some(interval));
    }

    /// Selection of a suggestion.
    pub fn on_pick(&self, item: &PredictiveItem) {
        let interval = self.session.lock().tracker.ema_ms();
        self.memory.lock().record_pick(&item.label, Some(interval));
    }

    /// Close the dropdown: cancel the timer and any request, clear results.
    pub fn on_close(&self) {
        let mut session = self.session.lock();
        if let Some(timer) = session.timer.take() {
            timer.cancel();
        }
        session.generation = session.generation.wrapping_add(1);
        session.open = false;
        session.query.clear();
        session.debounced_query.clear();
        session.delay_ms = 0;
        session.tracker.end_session();
        self.orchestrator.close();
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let session = self.session.lock();
        let memory = self.memory.lock();
        let fetch = self.orchestrator.snapshot();

        let products = fetch.data.as_deref().unwrap_or_default();
        let candidates = gather(
            &session.query,
            CandidateSources {
                recents: memory.recents(),
                last_queries: &memory.stats().last_queries,
                quick: &self.options.quick_links,
                products,
            },
        );
        let mut items = rank(&session.query, candidates, memory.recents(), memory.stats());
        items.truncate(self.options.max_items);

        SearchSnapshot {
            open: session.open,
            query: session.query.clone(),
            debounced_query: session.debounced_query.clone(),
            delay_ms: session.delay_ms,
            pending: session.timer.is_some(),
            phase: fetch.phase,
            loading: fetch.is_loading(),
            error: fetch.error,
            data: fetch.data,
            items,
        }
    }

    /// Wait until no debounce timer is armed and no request is loading.
    pub async fn settled(&self) {
        loop {
            let mut changes = self.orchestrator.subscribe();
            let busy = {
                let session = self.session.lock();
                session.timer.is_some() || self.orchestrator.snapshot().is_loading()
            };
            if !busy || changes.changed().await.is_err() {
                return;
            }
        }
    }

    /// Copy of the learned statistics.
    pub fn stats(&self) -> PatternStats {
        self.memory.lock().stats().clone()
    }

    pub fn recents(&self) -> Vec<String> {
        self.memory.lock().recents().to_vec()
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }
}

/// Promote `query` to the debounced value and fetch it if it changed.
fn settle<F>(session: &mut Session, orchestrator: &FetchOrchestrator<F>, query: String)
where
    F: Fetcher<Output = Vec<PredictiveItem>>,
{
    let phase = orchestrator.snapshot().phase;
    let unchanged = session.debounced_query == query
        && matches!(phase, FetchPhase::Loading | FetchPhase::Success);
    session.debounced_query = query;
    if unchanged {
        debug!(query = %session.debounced_query, "debounced query unchanged");
        orchestrator.bump();
        return;
    }
    orchestrator.request(&session.debounced_query);
}

/// Assembles a [`SearchController`] from its collaborators.
pub struct SearchControllerBuilder<F> {
    fetcher: F,
    store: Option<Arc<dyn PersistentStore>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    handle: Option<Handle>,
    options: ControllerOptions,
}

impl<F> SearchControllerBuilder<F>
where
    F: Fetcher<Output = Vec<PredictiveItem>>,
{
    /// Durable storage for learned patterns. Defaults to a process-local store.
    pub fn store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Timer source. Defaults to tokio timers on the runtime.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Runtime used for fetches. Defaults to the current runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<SearchController<F>, ControllerError> {
        self.options.tuning.validate()?;
        let handle = match self.handle {
            Some(handle) => handle,
            None => Handle::try_current()?,
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new(handle.clone())));

        let memory = PatternMemory::load(store);
        let tracker = TypingVelocityTracker::new(memory.stats().key_interval_ms());
        let orchestrator = FetchOrchestrator::new(self.fetcher, handle)
            .with_min_query_len(self.options.min_query_len);

        Ok(SearchController {
            session: Arc::new(Mutex::new(Session {
                open: false,
                query: String::new(),
                debounced_query: String::new(),
                delay_ms: 0,
                tracker,
                timer: None,
                generation: 0,
            })),
            memory: Mutex::new(memory),
            orchestrator,
            scheduler,
            options: self.options,
        })
    }
}
