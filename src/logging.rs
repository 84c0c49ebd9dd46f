//! Structured logging setup.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once; `RELQ_LOG` overrides the configured filter.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Environment variable holding a filter directive such as `relq=debug`.
pub const LOG_ENV: &str = "RELQ_LOG";

/// The filter directive in effect: `RELQ_LOG` when set, else `default_level`.
pub fn log_filter(default_level: &str) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_level.to_string())
}

/// Install a stderr subscriber. Later calls are no-ops.
pub fn init_logging(default_level: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = log_filter(default_level);
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(EnvFilter::new(&filter)),
        );

        // Another subscriber may already be installed by the host.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
        tracing::debug!(filter = %filter, "logging initialized");
    });
}
