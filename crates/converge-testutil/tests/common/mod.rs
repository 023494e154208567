//! Shared helpers for converge-testutil integration tests

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use converge_testutil::retry::CountPolicy;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING: Once = Once::new();

/// Route harness logs to the captured test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer().with_target(false))
            .with(EnvFilter::from_default_env())
            .try_init();
    });
}

/// Count policy without inter-attempt delay
pub fn no_wait(count: u32) -> CountPolicy {
    CountPolicy::new(count, Duration::ZERO)
}

/// Names of all `CONVERGE_RETRY_*` variables the configuration reads
pub const RETRY_ENV_VARS: [&str; 6] = [
    "CONVERGE_RETRY_CONFIG",
    "CONVERGE_RETRY_POLICY",
    "CONVERGE_RETRY_ATTEMPTS",
    "CONVERGE_RETRY_COUNT_WAIT_MS",
    "CONVERGE_RETRY_TIMEOUT_MS",
    "CONVERGE_RETRY_DEADLINE_WAIT_MS",
];

pub fn clear_retry_env() {
    for var in RETRY_ENV_VARS {
        std::env::remove_var(var);
    }
}
