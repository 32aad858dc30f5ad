//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging. The effective
//! filter is resolved in priority order: `RUST_LOG` env var, then the
//! level handed in from CLI/config, then "info". Debug builds get
//! pretty-printed terminal output; release builds emit JSON with span
//! context so the logs of long review runs stay machine-readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the env filter for the given base level.
fn filter_for(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},argus_engine={level}", level = log_level)))
}

/// Initialize the tracing subscriber with the given log level.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_telemetry_with_level(log_level: &str) {
    let registry = tracing_subscriber::registry().with(filter_for(log_level));

    if cfg!(debug_assertions) {
        registry
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

/// Initialize with the default "info" level, for callers that run before
/// configuration is loaded.
pub fn init_telemetry() {
    init_telemetry_with_level("info");
}
