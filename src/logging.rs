//! Diagnostics setup for the `presearch` binary.
//!
//! The library only emits `tracing` events; embedders install their own
//! subscriber. The binary routes events to stderr so stdout stays reserved
//! for search output.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "PRESEARCH_LOG";

/// Default level when neither the environment nor the config names one.
pub const DEFAULT_LEVEL: &str = "warn";

/// Build the filter from [`LOG_ENV`], falling back to `default_level`.
pub fn filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => parse_level(default_level),
    }
}

fn parse_level(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|err| anyhow!("invalid log level '{level}': {err}"))
}

/// Install the global subscriber. Calling it twice is an error.
pub fn initialize(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
