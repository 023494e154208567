//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for watching a retry run
//! and a `TracingObserver` implementation that logs using the `tracing` crate.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Observer trait for retry run events
///
/// All callbacks run on the thread that drives the run, never on an attempt
/// worker.
pub trait RetryObserver {
    /// Called when an attempt is about to start
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed)
    fn on_attempt_start(&self, attempt: u32);

    /// Called when an attempt finished with the fail flag set
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that failed (1-indexed)
    /// * `last_line` - The most recent line on the recorder, if any
    fn on_attempt_failed(&self, attempt: u32, last_line: Option<&str>);

    /// Called when an attempt finished without failing
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that succeeded (1-indexed)
    /// * `total_duration` - Time spent since the first attempt was permitted
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when the policy refuses another attempt
    ///
    /// # Arguments
    ///
    /// * `attempts` - Total number of attempts made
    /// * `total_duration` - Time spent across all attempts
    fn on_exhausted(&self, attempts: u32, total_duration: Duration);
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _last_line: Option<&str>) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _total_duration: Duration) {}
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_attempt_failed`: WARN
/// - `on_success`: INFO (if > 1 attempt) or DEBUG (first attempt)
/// - `on_exhausted`: ERROR
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the condition being polled (for log context)
    check: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    ///
    /// # Arguments
    ///
    /// * `check` - A descriptive name for the condition being polled
    pub fn new(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
        }
    }

    /// Get the check name
    pub fn check(&self) -> &str {
        &self.check
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32) {
        tracing::debug!(check = %self.check, attempt = attempt, "starting attempt");
    }

    fn on_attempt_failed(&self, attempt: u32, last_line: Option<&str>) {
        tracing::warn!(
            check = %self.check,
            attempt = attempt,
            last_line = last_line.unwrap_or_default(),
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                check = %self.check,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                check = %self.check,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        tracing::error!(
            check = %self.check,
            attempts = attempts,
            total_duration_ms = total_duration.as_millis() as u64,
            "retry budget exhausted"
        );
    }
}

/// An observer that counts retry events
///
/// Useful for testing.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    failures: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of attempt starts
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Get the number of failed attempts
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Get the number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Get the number of exhaustions
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _last_line: Option<&str>) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _total_duration: Duration) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32) {
        (**self).on_attempt_start(attempt)
    }

    fn on_attempt_failed(&self, attempt: u32, last_line: Option<&str>) {
        (**self).on_attempt_failed(attempt, last_line)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        (**self).on_exhausted(attempts, total_duration)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32) {
        (**self).on_attempt_start(attempt)
    }

    fn on_attempt_failed(&self, attempt: u32, last_line: Option<&str>) {
        (**self).on_attempt_failed(attempt, last_line)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        (**self).on_exhausted(attempts, total_duration)
    }
}
