//! Failure recorder handed to every attempt
//!
//! A single [`Recorder`] lives for one whole retry run. Each attempt borrows
//! it exclusively while it runs on its worker thread; the harness reads the
//! fail flag only after the worker has been joined.

use std::any::Any;
use std::fmt;
use std::panic::{self, Location};

/// File name used when no caller location is available
const UNKNOWN_FILE: &str = "???";

/// Unwind payload raised by [`Recorder::fail_now`]
///
/// The harness recognises this payload when joining an attempt worker and
/// treats it as an intentional abort rather than a stray panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptAborted;

/// Collects failure output and the fail flag for a retry run
///
/// # Example
///
/// ```rust
/// use converge_testutil::retry::{run_with, CountPolicy};
/// use converge_testutil::LibTest;
/// use std::time::Duration;
///
/// let mut polls = 0;
/// run_with(CountPolicy::new(3, Duration::ZERO), &LibTest, |r| {
///     polls += 1;
///     if polls < 2 {
///         r.error("service not ready yet");
///     }
/// });
/// assert_eq!(polls, 2);
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    failed: bool,
    output: Vec<String>,
}

impl Recorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and keep running the attempt
    #[track_caller]
    pub fn error(&mut self, message: impl fmt::Display) {
        self.push(decorate(Some(Location::caller()), message));
        self.failed = true;
    }

    /// Formatted variant of [`error`](Self::error), for use with `format_args!`
    #[track_caller]
    pub fn errorf(&mut self, args: fmt::Arguments<'_>) {
        self.error(args);
    }

    /// Record a line of context without failing the attempt
    ///
    /// The line only shows up in the final report if the run is exhausted.
    #[track_caller]
    pub fn log(&mut self, message: impl fmt::Display) {
        self.push(decorate(Some(Location::caller()), message));
    }

    /// Record a failure and abort the current attempt immediately
    #[track_caller]
    pub fn fatal(&mut self, message: impl fmt::Display) -> ! {
        self.push(decorate(Some(Location::caller()), message));
        self.fail_now()
    }

    /// Formatted variant of [`fatal`](Self::fatal), for use with `format_args!`
    #[track_caller]
    pub fn fatalf(&mut self, args: fmt::Arguments<'_>) -> ! {
        self.fatal(args)
    }

    /// Mark the attempt failed and unwind out of it
    ///
    /// Only the attempt worker unwinds. The harness observes the abort when it
    /// joins the worker and moves on to the next attempt.
    pub fn fail_now(&mut self) -> ! {
        self.failed = true;
        panic::resume_unwind(Box::new(AttemptAborted))
    }

    /// Whether the current attempt has failed so far
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// All lines recorded during the run, across every attempt
    pub fn lines(&self) -> &[String] {
        &self.output
    }

    /// Clear the fail flag, returning its previous value
    pub(crate) fn take_failed(&mut self) -> bool {
        std::mem::take(&mut self.failed)
    }

    /// Record a failure that has no caller location
    pub(crate) fn fail_unlocated(&mut self, message: impl fmt::Display) {
        self.push(decorate(None, message));
        self.failed = true;
    }

    /// Fold the unwind payload of a joined attempt worker into the record
    pub(crate) fn absorb_panic(&mut self, payload: Box<dyn Any + Send>) {
        if payload.downcast_ref::<AttemptAborted>().is_some() {
            self.failed = true;
            return;
        }
        let message = panic_message(payload.as_ref());
        self.fail_unlocated(format_args!("attempt panicked: {message}"));
    }

    fn push(&mut self, line: String) {
        self.output.push(line);
    }
}

fn decorate(location: Option<&Location<'_>>, message: impl fmt::Display) -> String {
    match location {
        Some(location) => {
            let path = location.file();
            let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
            format!("{}:{}: {}", file, location.line(), message)
        }
        None => format!("{}:1: {}", UNKNOWN_FILE, message),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;

    #[test]
    fn test_error_sets_flag_and_annotates() {
        let mut r = Recorder::new();
        let expected = format!("recorder.rs:{}: boom", line!() + 1);
        r.error("boom");

        assert!(r.failed());
        assert_eq!(r.lines(), [expected]);
    }

    #[test]
    fn test_errorf_formats_arguments() {
        let mut r = Recorder::new();
        r.errorf(format_args!("got {} want {}", 1, 2));

        assert!(r.failed());
        assert!(r.lines()[0].ends_with(": got 1 want 2"));
    }

    #[test]
    fn test_log_does_not_fail() {
        let mut r = Recorder::new();
        r.log("still waiting");

        assert!(!r.failed());
        assert_eq!(r.lines().len(), 1);
        assert!(r.lines()[0].starts_with("recorder.rs:"));
    }

    #[test]
    fn test_fail_now_unwinds_with_marker() {
        let mut r = Recorder::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| r.fail_now()));

        let payload = result.unwrap_err();
        assert!(payload.downcast_ref::<AttemptAborted>().is_some());
        assert!(r.failed());
        assert!(r.lines().is_empty());
    }

    #[test]
    fn test_fatal_records_then_aborts() {
        let mut r = Recorder::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| r.fatalf(format_args!("code {}", 7))));

        assert!(result.is_err());
        assert!(r.failed());
        assert!(r.lines()[0].ends_with(": code 7"));
    }

    #[test]
    fn test_take_failed_resets_but_keeps_output() {
        let mut r = Recorder::new();
        r.error("first");

        assert!(r.take_failed());
        assert!(!r.failed());
        assert!(!r.take_failed());
        assert_eq!(r.lines().len(), 1);
    }

    #[test]
    fn test_absorb_foreign_panic() {
        let mut r = Recorder::new();
        r.absorb_panic(Box::new("index out of bounds"));

        assert!(r.failed());
        assert_eq!(r.lines(), ["???:1: attempt panicked: index out of bounds"]);

        r.take_failed();
        r.absorb_panic(Box::new(String::from("owned message")));
        assert_eq!(r.lines()[1], "???:1: attempt panicked: owned message");

        r.absorb_panic(Box::new(42_u32));
        assert_eq!(r.lines()[2], "???:1: attempt panicked: non-string panic payload");
    }

    #[test]
    fn test_absorb_abort_adds_no_line() {
        let mut r = Recorder::new();
        r.absorb_panic(Box::new(AttemptAborted));

        assert!(r.failed());
        assert!(r.lines().is_empty());
    }

    #[test]
    fn test_decorate_without_location() {
        assert_eq!(decorate(None, "x"), "???:1: x");
    }
}
