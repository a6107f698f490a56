//! Tracing subscriber setup for binaries and tests that embed the engine.
//!
//! The library itself only emits events; nothing here runs unless a caller
//! asks for it.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Directive used when neither `RUST_LOG` nor a caller filter is given.
pub const DEFAULT_FILTER: &str = "bar_analytics=info";

/// Install a fmt subscriber once per process.
///
/// `RUST_LOG` wins when set; otherwise `filter` (or [`DEFAULT_FILTER`]) is
/// used. Later calls, and calls after another global subscriber was set, are
/// no-ops.
pub fn init_tracing(filter: Option<&str>) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(filter.unwrap_or(DEFAULT_FILTER)))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(env_filter)
            .try_init();
    });
}
