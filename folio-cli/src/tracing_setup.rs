//! Tracing setup for folioctl
//!
//! Usage:
//!   folioctl --debug ...                # Debug logging to stderr
//!   RUST_LOG=folio_db=debug folioctl    # Fine-grained log control
//!
//! Without RUST_LOG the filter comes from `--debug` or the `[logging] level`
//! config value.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Enable debug logging (ignored when RUST_LOG is set)
    pub debug: bool,
    /// Filter used when RUST_LOG is unset and `debug` is off
    pub default_level: String,
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        let fallback = if self.debug { "debug" } else { self.default_level.as_str() };
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize console tracing on stderr so stdout stays machine-readable
pub fn init(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.debug) // Show targets in debug mode
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
