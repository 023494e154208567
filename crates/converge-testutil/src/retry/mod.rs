//! Retry harness for eventually-consistent test conditions
//!
//! A check that cannot be asserted synchronously ("the cluster has elected a
//! leader") is written as an attempt closure and handed to [`run`] or
//! [`run_with`]. The harness re-runs it until one attempt finishes without
//! failing, or the retry policy is exhausted and the test is failed with a
//! deduplicated report of everything the attempts recorded.
//!
//! # Features
//!
//! - Count and deadline policies behind the `RetryPolicy` trait
//! - Soft (`error`) and aborting (`fatal`) failures on the `Recorder`
//! - Every attempt runs on its own worker thread, so aborts and panics stay
//!   confined to that attempt
//! - Observable runs via the `RetryObserver` trait, with a built-in
//!   `TracingObserver`
//!
//! # Example
//!
//! ```rust
//! use converge_testutil::retry::{run_with, CountPolicy};
//! use converge_testutil::LibTest;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! let applied = AtomicU32::new(0);
//! run_with(CountPolicy::new(5, Duration::from_millis(1)), &LibTest, |r| {
//!     let index = applied.fetch_add(1, Ordering::SeqCst) + 1;
//!     if index < 3 {
//!         r.error(format_args!("commit index {index} below 3"));
//!     }
//! });
//! assert_eq!(applied.load(Ordering::SeqCst), 3);
//! ```

mod dedup;
mod executor;
mod observer;
mod policy;
mod recorder;

pub use dedup::dedup;
pub use executor::{run, run_configured, run_with, Harness, HarnessBuilder};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{
    one_sec, three_times, CountPolicy, DeadlinePolicy, RetryPolicy, DEFAULT_ATTEMPTS,
    DEFAULT_TIMEOUT, DEFAULT_WAIT,
};
pub use recorder::{AttemptAborted, Recorder};
