//! Predictive search controller for storefront search boxes.
//!
//! The crate learns from what a visitor types and picks, adapts the debounce
//! to their typing speed, fetches results without letting stale responses
//! win, and ranks a merged suggestion list. [`SearchController`] ties the
//! pieces together; the individual modules are usable on their own.

pub mod app_dirs;
pub mod catalog;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod patterns;
pub mod rank;
pub mod store;
pub mod velocity;

pub use catalog::{Catalog, CatalogFetcher};
pub use controller::{ControllerOptions, SearchController, SearchControllerBuilder, SearchSnapshot};
pub use debounce::{DebounceTuning, ManualScheduler, Scheduler, TokioScheduler, compute_delay};
pub use error::{ControllerError, FetchError, StoreError, TuningError};
pub use fetch::{FetchOrchestrator, FetchPhase, FetchSnapshot, Fetcher};
pub use patterns::{PatternMemory, PatternStats};
pub use rank::{ItemKind, PredictiveItem, rank};
pub use store::{FileStore, MemoryStore, PersistentStore};
pub use velocity::TypingVelocityTracker;
