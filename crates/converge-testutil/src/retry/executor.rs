//! Retry run orchestration
//!
//! Each attempt runs on its own scoped worker thread. The driving thread
//! blocks on the join, so an attempt that aborts (or panics) unwinds only its
//! worker. The recorder is lent to exactly one worker at a time and is read
//! only after that worker has been joined.

use std::io;
use std::thread;
use std::time::Instant;

use crate::config::HarnessConfig;
use crate::host::TestHandle;

use super::dedup::dedup;
use super::observer::{RetryObserver, TracingObserver};
use super::policy::{DeadlinePolicy, RetryPolicy};
use super::recorder::Recorder;

/// Retry `attempt` for one second, waiting 25ms between attempts
///
/// # Example
///
/// ```rust,no_run
/// use converge_testutil::{run, LibTest};
///
/// # fn members() -> usize { 3 }
/// run(&LibTest, |r| {
///     let n = members();
///     if n != 3 {
///         r.fatal(format_args!("expected 3 members, got {n}"));
///     }
/// });
/// ```
pub fn run<T, F>(t: &T, attempt: F)
where
    T: TestHandle + ?Sized,
    F: FnMut(&mut Recorder) + Send,
{
    run_with(DeadlinePolicy::default(), t, attempt)
}

/// Retry `attempt` until it succeeds or `policy` is exhausted
pub fn run_with<P, T, F>(policy: P, t: &T, attempt: F)
where
    P: RetryPolicy,
    T: TestHandle + ?Sized,
    F: FnMut(&mut Recorder) + Send,
{
    HarnessBuilder::new()
        .with_policy(policy)
        .build()
        .run(t, attempt)
}

/// Retry `attempt` with the policy from [`HarnessConfig::load`]
///
/// A configuration error fails the test before the first attempt.
pub fn run_configured<T, F>(t: &T, attempt: F)
where
    T: TestHandle + ?Sized,
    F: FnMut(&mut Recorder) + Send,
{
    match HarnessConfig::load() {
        Ok(config) => run_with(config.policy(), t, attempt),
        Err(err) => {
            t.log(&format!("retry configuration: {err}\n"));
            t.fail_now()
        }
    }
}

/// Builder for configuring a `Harness`
///
/// # Example
///
/// ```rust
/// use converge_testutil::retry::{CountPolicy, HarnessBuilder, TracingObserver};
/// use std::time::Duration;
///
/// let harness = HarnessBuilder::new()
///     .with_policy(CountPolicy::new(5, Duration::from_millis(10)))
///     .with_observer(TracingObserver::new("raft leader"))
///     .build();
/// ```
pub struct HarnessBuilder<P = DeadlinePolicy, O = TracingObserver> {
    policy: P,
    observer: O,
}

impl Default for HarnessBuilder<DeadlinePolicy, TracingObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessBuilder<DeadlinePolicy, TracingObserver> {
    /// Create a new builder with the default deadline policy
    pub fn new() -> Self {
        Self {
            policy: DeadlinePolicy::default(),
            observer: TracingObserver::default(),
        }
    }
}

impl<P, O> HarnessBuilder<P, O> {
    /// Set the retry policy
    pub fn with_policy<P2>(self, policy: P2) -> HarnessBuilder<P2, O> {
        HarnessBuilder {
            policy,
            observer: self.observer,
        }
    }

    /// Set the observer
    ///
    /// The observer receives callbacks on the driving thread.
    pub fn with_observer<O2>(self, observer: O2) -> HarnessBuilder<P, O2> {
        HarnessBuilder {
            policy: self.policy,
            observer,
        }
    }

    /// Build the harness
    pub fn build(self) -> Harness<P, O> {
        Harness {
            policy: self.policy,
            observer: self.observer,
        }
    }
}

/// A single-use retry run
///
/// Use `HarnessBuilder` to create an instance.
pub struct Harness<P, O> {
    policy: P,
    observer: O,
}

impl<P, O> Harness<P, O>
where
    P: RetryPolicy,
    O: RetryObserver,
{
    /// Run `attempt` until it finishes without failing
    ///
    /// If the policy runs out first, the deduplicated lines of every attempt
    /// are written to `t` and `t` is failed; this call then never returns.
    pub fn run<T, F>(mut self, t: &T, mut attempt: F)
    where
        T: TestHandle + ?Sized,
        F: FnMut(&mut Recorder) + Send,
    {
        let start = Instant::now();
        let mut recorder = Recorder::new();
        let mut attempts = 0u32;

        loop {
            let permitted = self.policy.next_or(&mut || {
                self.observer.on_exhausted(attempts, start.elapsed());
                report_exhausted(t, &recorder);
            });
            if !permitted {
                return;
            }

            attempts += 1;
            self.observer.on_attempt_start(attempts);
            run_isolated(attempts, &mut recorder, &mut attempt);

            if recorder.take_failed() {
                let last_line = recorder.lines().last().map(String::as_str);
                self.observer.on_attempt_failed(attempts, last_line);
                continue;
            }

            self.observer.on_success(attempts, start.elapsed());
            return;
        }
    }
}

/// Run one attempt on a fresh worker thread and wait for it to finish
fn run_isolated<F>(number: u32, recorder: &mut Recorder, attempt: &mut F)
where
    F: FnMut(&mut Recorder) + Send,
{
    let joined = thread::scope(|scope| {
        thread::Builder::new()
            .name(format!("retry-attempt-{number}"))
            .spawn_scoped(scope, || attempt(recorder))
            .map(|worker| worker.join())
    });

    match joined {
        Ok(Ok(())) => {}
        Ok(Err(payload)) => recorder.absorb_panic(payload),
        Err(err) => record_spawn_failure(recorder, &err),
    }
}

fn record_spawn_failure(recorder: &mut Recorder, err: &io::Error) {
    tracing::warn!(error = %err, "could not spawn attempt worker");
    recorder.fail_unlocated(format_args!("could not spawn attempt worker: {err}"));
}

fn report_exhausted<T: TestHandle + ?Sized>(t: &T, recorder: &Recorder) -> ! {
    let report = dedup(recorder.lines());
    if !report.is_empty() {
        t.log(&report);
    }
    t.fail_now()
}
