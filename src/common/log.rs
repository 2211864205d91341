//! Tracing subscriber setup.
//!
//! Every event carries a `code` field taken from [`ErrorCode`](super::ErrorCode)
//! where an error is involved, so log lines can be grepped by failure class.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
