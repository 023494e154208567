//! # converge-testutil
//!
//! Test support for conditions that only become true eventually:
//! - Retry harness that re-runs a check until it passes or a budget runs out
//! - Attempt isolation so an aborted attempt never takes down the test thread
//! - Count and deadline retry policies behind one trait
//! - Deduplicated failure report handed to the host test framework
//! - YAML and environment configuration for CI-specific budgets

pub mod config;
pub mod error;
pub mod host;
pub mod retry;

pub use config::{HarnessConfig, PolicyKind};
pub use error::{Error, Result};
pub use host::{LibTest, TestHandle};
pub use retry::{run, run_configured, run_with, Recorder};
