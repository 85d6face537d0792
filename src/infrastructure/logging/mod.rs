//! Tracing-based structured logging setup.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::infrastructure::config::LoggingConfig;

/// Initialize the global `tracing` subscriber. `RUST_LOG` overrides
/// `config.level` when set; `config.format` selects pretty (human-readable,
/// for local runs) or JSON (for log aggregation) output.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = fmt().with_env_filter(filter);

    if config.format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
