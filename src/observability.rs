//! Tracing initialization.
//!
//! Logs always go to stderr: stdout carries progress text and the `OUTPUT:` marker line.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::Config;

/// Initialize tracing. Call once at process startup.
/// `RUST_LOG` wins over `LOG_LEVEL` from the config.
pub fn init_tracing(cfg: &Config) {
    let level = cfg.get("LOG_LEVEL").unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.get_bool("LOG_JSON") {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    };
}
