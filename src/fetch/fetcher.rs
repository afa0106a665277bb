use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Boxed future returned by a [`Fetcher`].
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'static>>;

/// The search backend supplied by the embedding application.
///
/// Implementations should check `cancel` at their own suspension points;
/// the orchestrator also drops the future once the token is cancelled.
pub trait Fetcher: Send + Sync + 'static {
    type Output: Clone + Send + 'static;

    fn fetch(&self, query: String, cancel: CancellationToken) -> FetchFuture<Self::Output>;
}

impl<F, Fut, T> Fetcher for F
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    T: Clone + Send + 'static,
{
    type Output = T;

    fn fetch(&self, query: String, cancel: CancellationToken) -> FetchFuture<T> {
        Box::pin(self(query, cancel))
    }
}
