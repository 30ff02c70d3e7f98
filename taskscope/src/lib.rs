//! Scoped batch execution over shared, caller-owned state.
//!
//! A batch is a list of [`Work`] items run against one `Arc<S>` under a
//! cooperative cancellation scope. Three execution semantics are provided:
//!
//! - [`sequence`] — items run one at a time, in order, stopping at the
//!   first failure.
//! - [`all`] — items run concurrently; any failure is reportable.
//! - [`any`] — items run concurrently; only a fully failed batch is
//!   reportable.
//!
//! Each comes in four scope flavors (`*`, `*_with_cancel`, `*_with_timeout`,
//! `*_with_deadline`) that derive the scope the work items observe from the
//! caller's [`CancellationToken`] and release it before the call returns.
//!
//! Failures never unwind out of a batch: a panicking item is caught at the
//! runner boundary and reported as [`WorkError::Panicked`] alongside
//! ordinary failures in a [`BatchError`]. The only other observable effects
//! of a call are the at-most-once error callback and the exactly-once
//! cleanup hook.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use taskscope::{CancellationToken, cleanup, sequence, work};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: AtomicI64,
//! }
//!
//! let state = Arc::new(Counter::default());
//! sequence(
//!     &CancellationToken::new(),
//!     Arc::clone(&state),
//!     |err| eprintln!("batch failed: {err}"),
//!     Some(cleanup(|_scope, state: Arc<Counter>| async move {
//!         println!("counter: {}", state.value.load(Ordering::SeqCst));
//!     })),
//!     vec![work(|_scope, state: Arc<Counter>| async move {
//!         state.value.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     })],
//! )
//! .await;
//! ```

mod cancel;
mod error;
mod runner;
mod scope;
mod work;

pub use error::BatchError;
pub use error::WorkError;
pub use scope::all;
pub use scope::all_with_cancel;
pub use scope::all_with_deadline;
pub use scope::all_with_timeout;
pub use scope::any;
pub use scope::any_with_cancel;
pub use scope::any_with_deadline;
pub use scope::any_with_timeout;
pub use scope::sequence;
pub use scope::sequence_with_cancel;
pub use scope::sequence_with_deadline;
pub use scope::sequence_with_timeout;
pub use work::CleanUp;
pub use work::Work;
pub use work::cleanup;
pub use work::work;

pub use tokio_util::sync::CancellationToken;
