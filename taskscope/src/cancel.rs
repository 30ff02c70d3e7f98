//! Scope derivation policies for batch execution.
//!
//! Every orchestrator derives the scope its runner sees from the caller's
//! token through one of these policies. Derived scopes are released
//! unconditionally when the orchestrator call returns, normal return and
//! unwind alike, via [`DropGuard`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::sync::DropGuard;

/// How an orchestrator derives the scope passed to its runner.
pub(crate) enum ScopePolicy {
    /// Use the caller's token as-is.
    Inherit,
    /// Child token, cancelled when the call returns.
    Scoped,
    /// Child token that auto-cancels once the duration elapses.
    Timeout(Duration),
    /// Child token that auto-cancels at the given instant.
    Deadline(Instant),
}

/// Derives the runner's scope from `parent` under `policy`.
///
/// The returned guard, when present, pins the derived scope's lifetime to
/// the orchestrator call. Timer-driven policies park a task on the child's
/// own `cancelled()` so the timer never outlives the call it belongs to.
pub(crate) fn derive_scope(
    parent: &CancellationToken,
    policy: ScopePolicy,
) -> (CancellationToken, Option<DropGuard>) {
    match policy {
        ScopePolicy::Inherit => (parent.clone(), None),
        ScopePolicy::Scoped => {
            let scope = parent.child_token();
            let guard = scope.clone().drop_guard();
            (scope, Some(guard))
        }
        ScopePolicy::Timeout(timeout) => {
            expiring_scope(parent, Instant::now().checked_add(timeout))
        }
        ScopePolicy::Deadline(deadline) => expiring_scope(parent, Some(deadline)),
    }
}

fn expiring_scope(
    parent: &CancellationToken,
    deadline: Option<Instant>,
) -> (CancellationToken, Option<DropGuard>) {
    let scope = parent.child_token();
    let guard = scope.clone().drop_guard();

    let timer = scope.clone();
    tokio::spawn(async move {
        let Some(deadline) = deadline else {
            // Duration overflowed the clock; treat as "never expires".
            timer.cancelled().await;
            return;
        };
        tokio::select! {
            _ = timer.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => timer.cancel(),
        }
    });

    (scope, Some(guard))
}
