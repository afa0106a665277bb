//! Error types shared across the predictive search subsystem.
//!
//! None of these are fatal: store errors are logged and swallowed by the
//! persistence helpers, fetch errors surface as the orchestrator's error
//! state, and cancellation is dropped silently.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`crate::store::PersistentStore`] adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request was superseded or the session closed.
    #[error("request cancelled")]
    Cancelled,
    /// The backend reported a failure.
    #[error("{0}")]
    Backend(String),
}

impl FetchError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// A [`crate::DebounceTuning`] value that cannot produce sensible delays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("debounce.{field} {problem}")]
pub struct TuningError {
    pub field: &'static str,
    pub problem: &'static str,
}

/// Errors raised while assembling a [`crate::SearchController`].
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid debounce tuning: {0}")]
    Tuning(#[from] TuningError),
    #[error("a tokio runtime is required to run fetches: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
