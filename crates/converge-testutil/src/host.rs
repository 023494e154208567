//! Host test framework adapters
//!
//! The harness needs two things from the test framework that runs it: a place
//! to write the failure report and a way to fail the test and stop it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// The enclosing test, as seen by the harness
pub trait TestHandle {
    /// Write a block of text to the test log
    fn log(&self, text: &str);

    /// Mark the test failed and stop it
    fn fail_now(&self) -> !;
}

impl<T: TestHandle + ?Sized> TestHandle for &T {
    fn log(&self, text: &str) {
        (**self).log(text)
    }

    fn fail_now(&self) -> ! {
        (**self).fail_now()
    }
}

/// Adapter for the built-in Rust test harness
///
/// The report goes to stderr, which the test harness captures and prints
/// for failing tests. Failing the test is a panic on the test thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibTest;

impl TestHandle for LibTest {
    fn log(&self, text: &str) {
        tracing::error!(report = %text, "retry failure report");
        eprint!("{text}");
    }

    fn fail_now(&self) -> ! {
        panic!("retry budget exhausted")
    }
}

/// Unwind payload raised by [`CapturingHost::fail_now`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFailNow;

/// In-memory host for testing code built on the harness
#[derive(Debug, Default)]
pub struct CapturingHost {
    logs: Mutex<Vec<String>>,
    failures: AtomicU32,
}

impl CapturingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every block passed to [`TestHandle::log`], in order
    pub fn logs(&self) -> Vec<String> {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times the test was failed
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl TestHandle for CapturingHost {
    fn log(&self, text: &str) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }

    fn fail_now(&self) -> ! {
        self.failures.fetch_add(1, Ordering::SeqCst);
        panic::resume_unwind(Box::new(HostFailNow))
    }
}

/// Run `f`, turning a [`CapturingHost`] failure into `Err(HostFailNow)`
///
/// Any other panic keeps unwinding.
pub fn catch_fail_now<R>(f: impl FnOnce() -> R) -> Result<R, HostFailNow> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) if payload.is::<HostFailNow>() => Err(HostFailNow),
        Err(payload) => panic::resume_unwind(payload),
    }
}
