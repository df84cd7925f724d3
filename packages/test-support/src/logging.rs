//! Tracing for test binaries.
//!
//! Each integration test file calls [`init`] from a `#[ctor::ctor]` hook, so
//! the subscriber exists before the first test runs.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Used when neither `TEST_LOG` nor `RUST_LOG` is set. Migration progress
/// and connection chatter stay quiet unless asked for.
const DEFAULT_FILTER: &str = "warn";

static SUBSCRIBER: OnceCell<()> = OnceCell::new();

/// Install the test subscriber once per process.
///
/// `TEST_LOG` wins over `RUST_LOG`, so `TEST_LOG=migration=debug` shows the
/// runner's plan and per-file steps without touching the CLI's filter.
/// Output goes through the test writer and is only shown for failing tests.
pub fn init() {
    SUBSCRIBER.get_or_init(|| {
        let directives = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());

        // another harness may have installed a global subscriber already
        let _ = fmt()
            .with_env_filter(EnvFilter::new(directives))
            .with_test_writer()
            .without_time()
            .with_target(true)
            .try_init();
    });
}
