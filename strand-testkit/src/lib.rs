//! Test helpers for Strand event log tests.
//!
//! Provides batch builders, stream seeding and test logging setup.

mod helpers;

pub use helpers::{batch_from, json_event, seed_single_events, seed_stream, SeedOptions};

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Output is captured by the test harness; set `RUST_LOG` to see it.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
