//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output with an `EnvFilter`: `RUST_LOG` wins when set, otherwise
//! the level passed on the command line. Audit-relevant events carry
//! `target = "audit"` so an external sink can route them; file and rotated
//! sinks are an external collaborator's concern.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Call once at program start.
pub fn init_logging(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}
