//! Leaf runners: sequential and parallel batch execution with panic
//! containment.
//!
//! Failures never unwind past a runner. A panicking work item is converted
//! into [`WorkError::Panicked`] at the point of invocation, so one item's
//! fault can neither crash the process nor disturb sibling items in a
//! parallel batch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::error::BatchError;
use crate::error::WorkError;
use crate::work::Work;

/// Result of a parallel batch: how many items succeeded, and the aggregated
/// failure (in input order) if any item did not.
pub(crate) struct BatchReport {
    pub(crate) succeeded: usize,
    pub(crate) error: Option<BatchError>,
}

/// Runs `works` one at a time, in order, on the calling task.
///
/// Stops at the first failure and returns it; items past the failing one are
/// never invoked, and effects of earlier items are not rolled back.
pub(crate) async fn run_sequence<S>(
    scope: CancellationToken,
    state: Arc<S>,
    works: Vec<Work<S>>,
) -> Result<(), WorkError>
where
    S: Send + Sync + 'static,
{
    for work in works {
        run_contained(work, scope.clone(), Arc::clone(&state)).await?;
    }
    Ok(())
}

/// Launches every item in `works` as its own task, waits for all of them,
/// and reports the batch outcome.
///
/// The join is total: a failure (or scope expiry) never cuts siblings short.
/// Handles are awaited in input order, which also fixes the order failures
/// appear in the aggregate.
pub(crate) async fn run_parallel<S>(
    scope: CancellationToken,
    state: Arc<S>,
    works: Vec<Work<S>>,
) -> BatchReport
where
    S: Send + Sync + 'static,
{
    let total = works.len();
    debug!(items = total, "launching parallel batch");

    let handles: Vec<_> = works
        .into_iter()
        .map(|work| {
            let scope = scope.clone();
            let state = Arc::clone(&state);
            tokio::spawn(run_contained(work, scope, state))
        })
        .collect();

    let mut failures = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => failures.push(failure),
            // run_contained catches panics itself, so a join error means the
            // task was torn down underneath us (runtime shutdown or abort).
            Err(join_err) => {
                warn!("parallel work task did not run to completion: {join_err}");
                failures.push(if join_err.is_panic() {
                    WorkError::Panicked(panic_message(join_err.into_panic()))
                } else {
                    WorkError::Failed(anyhow::anyhow!("work task failed to join: {join_err}"))
                });
            }
        }
    }

    BatchReport {
        succeeded: total - failures.len(),
        error: BatchError::from_failures(failures),
    }
}

/// Invokes one work item and converts an escaping panic into a failure
/// value before it can cross the runner boundary.
async fn run_contained<S>(
    work: Work<S>,
    scope: CancellationToken,
    state: Arc<S>,
) -> Result<(), WorkError>
where
    S: Send + Sync + 'static,
{
    match AssertUnwindSafe(async move { work(scope, state).await })
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(WorkError::Failed(err)),
        Err(payload) => Err(WorkError::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::work;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct Trace {
        seen: Mutex<Vec<u32>>,
    }

    impl Trace {
        fn record(&self, id: u32) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(id);
            }
        }

        fn snapshot(&self) -> Vec<u32> {
            self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
        }
    }

    fn record(id: u32) -> Work<Trace> {
        work(move |_scope, state: Arc<Trace>| async move {
            state.record(id);
            Ok(())
        })
    }

    fn fail(message: &'static str) -> Work<Trace> {
        work(move |_scope, _state: Arc<Trace>| async move { Err(anyhow!(message)) })
    }

    fn explode(message: &'static str) -> Work<Trace> {
        work(move |_scope, _state: Arc<Trace>| async move { panic!("{message}") })
    }

    #[tokio::test]
    async fn sequence_runs_in_order() -> anyhow::Result<()> {
        let state = Arc::new(Trace::default());
        run_sequence(
            CancellationToken::new(),
            Arc::clone(&state),
            vec![record(1), record(2), record(3)],
        )
        .await
        .map_err(|err| anyhow!("unexpected failure: {err}"))?;

        assert_eq!(state.snapshot(), vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn sequence_stops_at_first_failure() {
        let state = Arc::new(Trace::default());
        let outcome = run_sequence(
            CancellationToken::new(),
            Arc::clone(&state),
            vec![record(1), fail("second blew up"), record(3)],
        )
        .await;

        match outcome {
            Err(WorkError::Failed(err)) => assert_eq!(err.to_string(), "second blew up"),
            other => panic!("expected item failure, got {other:?}"),
        }
        // Item 3 never ran; item 1's effect is not rolled back.
        assert_eq!(state.snapshot(), vec![1]);
    }

    #[tokio::test]
    async fn sequence_converts_panic_and_stops() {
        let state = Arc::new(Trace::default());
        let outcome = run_sequence(
            CancellationToken::new(),
            Arc::clone(&state),
            vec![record(1), explode("bad arithmetic"), record(3)],
        )
        .await;

        match outcome {
            Err(WorkError::Panicked(message)) => assert_eq!(message, "bad arithmetic"),
            other => panic!("expected recovered panic, got {other:?}"),
        }
        assert_eq!(state.snapshot(), vec![1]);
    }

    #[tokio::test]
    async fn empty_sequence_succeeds() {
        let state = Arc::new(Trace::default());
        let outcome = run_sequence(CancellationToken::new(), state, Vec::new()).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn parallel_counts_successes_and_keeps_input_order() {
        let state = Arc::new(Trace::default());
        let report = run_parallel(
            CancellationToken::new(),
            state,
            vec![fail("first"), record(2), fail("third"), record(4)],
        )
        .await;

        assert_eq!(report.succeeded, 2);
        let Some(err) = report.error else {
            panic!("two failures must aggregate");
        };
        assert_eq!(err.to_string(), "first\nthird");
    }

    #[tokio::test]
    async fn parallel_contains_panic_to_its_item() {
        let state = Arc::new(Trace::default());
        let report = run_parallel(
            CancellationToken::new(),
            Arc::clone(&state),
            vec![record(1), explode("one bad apple"), record(3)],
        )
        .await;

        assert_eq!(report.succeeded, 2);
        let Some(err) = report.error else {
            panic!("panic must surface as a failure");
        };
        assert_eq!(err.failures().len(), 1);
        assert!(err.failures()[0].is_panic());

        let mut seen = state.snapshot();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3]);
    }

    #[tokio::test]
    async fn empty_parallel_batch_reports_nothing() {
        let state = Arc::new(Trace::default());
        let report = run_parallel(CancellationToken::new(), state, Vec::new()).await;
        assert_eq!(report.succeeded, 0);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn parallel_waits_for_every_item() {
        let state = Arc::new(AtomicUsize::new(0));
        let works: Vec<Work<AtomicUsize>> = (0..8)
            .map(|i| {
                work(move |_scope, state: Arc<AtomicUsize>| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(i * 2)).await;
                    state.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let report = run_parallel(CancellationToken::new(), Arc::clone(&state), works).await;
        assert_eq!(report.succeeded, 8);
        assert_eq!(state.load(Ordering::SeqCst), 8);
    }
}
