//! Orchestrators: runner × scope policy × error callback × cleanup hook.
//!
//! Twelve entry points, the product of {sequence, all, any} execution
//! semantics and {plain, cancel, timeout, deadline} scope policies. Every
//! call follows the same contract: run the batch, dispatch a reportable
//! outcome to the error callback at most once, then run the cleanup hook
//! exactly once if one was supplied.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::ScopePolicy;
use crate::cancel::derive_scope;
use crate::error::BatchError;
use crate::runner::run_parallel;
use crate::runner::run_sequence;
use crate::work::CleanUp;
use crate::work::Work;

/// Runs `works` in order, stopping at the first failure.
///
/// A failure (or recovered panic) is passed to `on_error`; `cleanup` runs
/// afterwards either way.
pub async fn sequence<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_sequence_scoped(ScopePolicy::Inherit, scope, state, on_error, cleanup, works).await;
}

/// [`sequence`] under a child scope that is cancelled when the call returns.
pub async fn sequence_with_cancel<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_sequence_scoped(ScopePolicy::Scoped, scope, state, on_error, cleanup, works).await;
}

/// [`sequence`] under a child scope that auto-cancels after `timeout`.
pub async fn sequence_with_timeout<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    timeout: Duration,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_sequence_scoped(
        ScopePolicy::Timeout(timeout),
        scope,
        state,
        on_error,
        cleanup,
        works,
    )
    .await;
}

/// [`sequence`] under a child scope that auto-cancels at `deadline`.
pub async fn sequence_with_deadline<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    deadline: Instant,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_sequence_scoped(
        ScopePolicy::Deadline(deadline),
        scope,
        state,
        on_error,
        cleanup,
        works,
    )
    .await;
}

/// Runs `works` concurrently and reports if any of them failed.
///
/// The batch is joined in full before reporting; one failure does not cut
/// siblings short. `cleanup` runs afterwards either way.
pub async fn all<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_all_scoped(ScopePolicy::Inherit, scope, state, on_error, cleanup, works).await;
}

/// [`all`] under a child scope that is cancelled when the call returns.
pub async fn all_with_cancel<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_all_scoped(ScopePolicy::Scoped, scope, state, on_error, cleanup, works).await;
}

/// [`all`] under a child scope that auto-cancels after `timeout`.
pub async fn all_with_timeout<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    timeout: Duration,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_all_scoped(
        ScopePolicy::Timeout(timeout),
        scope,
        state,
        on_error,
        cleanup,
        works,
    )
    .await;
}

/// [`all`] under a child scope that auto-cancels at `deadline`.
pub async fn all_with_deadline<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    deadline: Instant,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_all_scoped(
        ScopePolicy::Deadline(deadline),
        scope,
        state,
        on_error,
        cleanup,
        works,
    )
    .await;
}

/// Runs `works` concurrently and reports only if every item failed.
///
/// A single success suppresses the error callback even when siblings
/// failed. An empty batch reports nothing: with no items there is no
/// failure value to hand to the callback. `cleanup` runs afterwards either
/// way.
pub async fn any<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_any_scoped(ScopePolicy::Inherit, scope, state, on_error, cleanup, works).await;
}

/// [`any`] under a child scope that is cancelled when the call returns.
pub async fn any_with_cancel<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_any_scoped(ScopePolicy::Scoped, scope, state, on_error, cleanup, works).await;
}

/// [`any`] under a child scope that auto-cancels after `timeout`.
pub async fn any_with_timeout<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    timeout: Duration,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_any_scoped(
        ScopePolicy::Timeout(timeout),
        scope,
        state,
        on_error,
        cleanup,
        works,
    )
    .await;
}

/// [`any`] under a child scope that auto-cancels at `deadline`.
pub async fn any_with_deadline<S, C>(
    scope: &CancellationToken,
    state: Arc<S>,
    deadline: Instant,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    run_any_scoped(
        ScopePolicy::Deadline(deadline),
        scope,
        state,
        on_error,
        cleanup,
        works,
    )
    .await;
}

async fn run_sequence_scoped<S, C>(
    policy: ScopePolicy,
    parent: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    let (scope, _guard) = derive_scope(parent, policy);

    if let Err(failure) = run_sequence(scope.clone(), Arc::clone(&state), works).await {
        on_error(BatchError::from(failure));
    }

    run_cleanup(cleanup, scope, state).await;
}

async fn run_all_scoped<S, C>(
    policy: ScopePolicy,
    parent: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    let (scope, _guard) = derive_scope(parent, policy);

    let report = run_parallel(scope.clone(), Arc::clone(&state), works).await;
    if let Some(err) = report.error {
        on_error(err);
    }

    run_cleanup(cleanup, scope, state).await;
}

async fn run_any_scoped<S, C>(
    policy: ScopePolicy,
    parent: &CancellationToken,
    state: Arc<S>,
    on_error: C,
    cleanup: Option<CleanUp<S>>,
    works: Vec<Work<S>>,
) where
    S: Send + Sync + 'static,
    C: FnOnce(BatchError),
{
    let (scope, _guard) = derive_scope(parent, policy);

    let report = run_parallel(scope.clone(), Arc::clone(&state), works).await;
    match report.error {
        Some(err) if report.succeeded == 0 => on_error(err),
        Some(err) => debug!(
            succeeded = report.succeeded,
            suppressed = err.len(),
            "batch partially failed; a success satisfies any-semantics"
        ),
        None => {}
    }

    run_cleanup(cleanup, scope, state).await;
}

async fn run_cleanup<S>(cleanup: Option<CleanUp<S>>, scope: CancellationToken, state: Arc<S>)
where
    S: Send + Sync + 'static,
{
    if let Some(cleanup) = cleanup {
        cleanup(scope, state).await;
    }
}
