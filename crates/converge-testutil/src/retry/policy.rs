//! Retry policies
//!
//! A policy decides before every attempt whether another one may run, and
//! sleeps between attempts. Policies are single-use: once exhausted they stay
//! exhausted, so build a fresh one for every run.

use std::thread;
use std::time::{Duration, Instant};

/// Default pause between attempts for both built-in policies
pub const DEFAULT_WAIT: Duration = Duration::from_millis(25);

/// Default number of attempts for [`CountPolicy`]
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default time budget for [`DeadlinePolicy`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Decides whether another attempt may run
///
/// Policies can also drive a hand-written polling loop:
///
/// ```rust
/// use converge_testutil::retry::{one_sec, RetryPolicy};
///
/// let mut policy = one_sec();
/// let mut polls = 0;
/// while policy.next_or(&mut || panic!("condition never held")) {
///     polls += 1;
///     if polls == 3 {
///         break;
///     }
/// }
/// assert_eq!(polls, 3);
/// ```
pub trait RetryPolicy {
    /// Return true if another attempt may run
    ///
    /// Every call except the first sleeps for the inter-attempt delay before
    /// returning true. When the policy is exhausted it calls `on_exhausted`
    /// and returns false.
    fn next_or(&mut self, on_exhausted: &mut dyn FnMut()) -> bool;
}

impl<P: RetryPolicy + ?Sized> RetryPolicy for Box<P> {
    fn next_or(&mut self, on_exhausted: &mut dyn FnMut()) -> bool {
        (**self).next_or(on_exhausted)
    }
}

impl<P: RetryPolicy + ?Sized> RetryPolicy for &mut P {
    fn next_or(&mut self, on_exhausted: &mut dyn FnMut()) -> bool {
        (**self).next_or(on_exhausted)
    }
}

/// Allows a fixed number of attempts
#[derive(Debug)]
pub struct CountPolicy {
    count: u32,
    wait: Duration,
    taken: u32,
}

impl CountPolicy {
    /// Allow `count` attempts, sleeping `wait` between them
    pub fn new(count: u32, wait: Duration) -> Self {
        Self {
            count,
            wait,
            taken: 0,
        }
    }

    /// Maximum number of attempts
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Pause between attempts
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Attempts permitted so far
    pub fn attempts_taken(&self) -> u32 {
        self.taken
    }
}

impl Default for CountPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_WAIT)
    }
}

impl RetryPolicy for CountPolicy {
    fn next_or(&mut self, on_exhausted: &mut dyn FnMut()) -> bool {
        if self.taken == self.count {
            on_exhausted();
            return false;
        }
        if self.taken > 0 {
            thread::sleep(self.wait);
        }
        self.taken += 1;
        true
    }
}

/// Allows attempts until a time budget has elapsed
///
/// The clock starts on the first call to [`next_or`](RetryPolicy::next_or),
/// so the first attempt always runs without delay.
#[derive(Debug)]
pub struct DeadlinePolicy {
    timeout: Duration,
    wait: Duration,
    started: Option<Instant>,
}

impl DeadlinePolicy {
    /// Keep trying for `timeout`, sleeping `wait` between attempts
    pub fn new(timeout: Duration, wait: Duration) -> Self {
        Self {
            timeout,
            wait,
            started: None,
        }
    }

    /// Total time budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pause between attempts
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Time left before the deadline, or `None` before the first call
    pub fn remaining(&self) -> Option<Duration> {
        self.started
            .map(|started| self.timeout.saturating_sub(started.elapsed()))
    }
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_WAIT)
    }
}

impl RetryPolicy for DeadlinePolicy {
    fn next_or(&mut self, on_exhausted: &mut dyn FnMut()) -> bool {
        let Some(started) = self.started else {
            self.started = Some(Instant::now());
            return true;
        };
        if started.elapsed() > self.timeout {
            on_exhausted();
            return false;
        }
        thread::sleep(self.wait);
        true
    }
}

/// Retry for one second, waiting 25ms between attempts
pub fn one_sec() -> DeadlinePolicy {
    DeadlinePolicy::default()
}

/// Retry three times, waiting 25ms between attempts
pub fn three_times() -> CountPolicy {
    CountPolicy::default()
}
