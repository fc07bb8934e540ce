//! Tracing initialization.
//!
//! Structured, async-aware logging via `tracing` and `tracing-subscriber`.
//! The filter honors `RUST_LOG` when set and otherwise falls back to the
//! configured level, so operators can raise verbosity per target without
//! touching the config file.

use crate::config::WirelabConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber from configuration.
///
/// Safe to call more than once; only the first call wins, which keeps
/// test binaries that initialize eagerly from panicking.
pub fn init_from_config(config: &WirelabConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.application.log_level.clone()));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}
