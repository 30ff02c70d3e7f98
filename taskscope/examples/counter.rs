//! Runs three sequential batches against one shared counter.
//!
//! The cleanup hook only prints, so the counter carries over between calls
//! and the three batches report 2, 4 and 6.

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use taskscope::CancellationToken;
use taskscope::Work;
use taskscope::cleanup;
use taskscope::work;
use tracing::error;
use tracing::info;

#[derive(Default)]
struct Counter {
    value: AtomicI64,
}

fn add(n: i64) -> Work<Counter> {
    work(move |_scope, state: Arc<Counter>| async move {
        state.value.fetch_add(n, Ordering::SeqCst);
        Ok(())
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let scope = CancellationToken::new();
    let state = Arc::new(Counter::default());

    for _ in 0..3 {
        taskscope::sequence(
            &scope,
            Arc::clone(&state),
            |err| error!("sequence failed: {err}"),
            Some(cleanup(|_scope, state: Arc<Counter>| async move {
                info!("counter: {}", state.value.load(Ordering::SeqCst));
            })),
            vec![add(1), add(2), add(-1)],
        )
        .await;
    }
}
