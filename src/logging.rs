//! Log setup shared by all of the archive programs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info";

/// Install the global tracing subscriber.
///
/// The filter is read from `RUST_LOG` and falls back to `info`. Calling this more than once is
/// harmless, later calls leave the first subscriber in place.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// Log the start of a program run.
pub fn begin(script: &str) {
    tracing::info!("BEGIN: {} at {}", script, chrono::Local::now());
}

/// Log the end of a program run.
pub fn end(script: &str) {
    tracing::info!("END: {} at {}", script, chrono::Local::now());
}
