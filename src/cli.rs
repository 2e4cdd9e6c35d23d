//! Command-line interface parsing for tickerwire
//!
//! Flags override values read from the environment. Parsing is kept separate
//! from applying so both halves can be unit tested.

use clap::Parser;
use thiserror::Error;

use crate::config::Config;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A TTL of zero would make every cache write dead on arrival
    #[error("Invalid TTL: {0}. The cache TTL must be at least 1 second")]
    InvalidTtl(u64),
}

/// tickerwire - caching edge for news feeds and market quotes
#[derive(Parser, Debug)]
#[command(name = "tickerwire")]
#[command(about = "Caching edge for news feeds and crypto/stock quotes")]
#[command(version)]
pub struct Cli {
    /// Address to bind (overrides TICKERWIRE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides TICKERWIRE_PORT)
    #[arg(long, short)]
    pub port: Option<u16>,

    /// TTL in seconds for crypto and stock quotes (overrides TICKERWIRE_CACHE_TTL_SECS)
    #[arg(long, value_name = "SECONDS")]
    pub ttl: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Disable the periodic cache sweep
    #[arg(long)]
    pub no_sweep: bool,
}

impl Cli {
    /// Applies the flags on top of `config`.
    ///
    /// # Returns
    /// * `Ok(Config)` with overrides applied
    /// * `Err(CliError::InvalidTtl)` if `--ttl 0` was given
    pub fn apply(&self, mut config: Config) -> Result<Config, CliError> {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ttl) = self.ttl {
            if ttl == 0 {
                return Err(CliError::InvalidTtl(ttl));
            }
            config.cache_ttl_secs = ttl;
        }
        if self.no_sweep {
            config.sweep_enabled = false;
        }
        Ok(config)
    }
}
