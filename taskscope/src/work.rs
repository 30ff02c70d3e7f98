//! Interface types for caller-supplied batch logic.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// A unit of caller logic run against the shared state.
///
/// A work item receives the derived cancellation scope and a handle to the
/// batch state. Cancellation is cooperative: the engine never preempts a
/// running item, it only cancels the scope and waits.
pub type Work<S> =
    Box<dyn FnOnce(CancellationToken, Arc<S>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A hook that observes the final state of a batch.
///
/// Runs exactly once per orchestrator call, after the outcome has been
/// dispatched to the error callback, whether the batch succeeded or not.
pub type CleanUp<S> = Box<dyn FnOnce(CancellationToken, Arc<S>) -> BoxFuture<'static, ()> + Send>;

/// Wraps an async closure into a boxed [`Work`] item.
pub fn work<S, F, Fut>(f: F) -> Work<S>
where
    F: FnOnce(CancellationToken, Arc<S>) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |scope, state| Box::pin(f(scope, state)))
}

/// Wraps an async closure into a boxed [`CleanUp`] hook.
pub fn cleanup<S, F, Fut>(f: F) -> CleanUp<S>
where
    F: FnOnce(CancellationToken, Arc<S>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |scope, state| Box::pin(f(scope, state)))
}
