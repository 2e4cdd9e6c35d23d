//! Runtime configuration
//!
//! Settings come from environment variables (optionally loaded from a `.env`
//! file by `main`) and may then be overridden by command-line flags.

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::data::crypto::COINGECKO_BASE_URL;
use crate::data::stock::ALPHA_VANTAGE_BASE_URL;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// TTL for crypto and stock quotes, in seconds
    pub cache_ttl_secs: u64,
    /// Entry cap for the shared store; 0 means unbounded
    pub cache_max_entries: usize,
    pub sweep_enabled: bool,
    pub sweep_interval: Duration,
    pub sweep_max_age: Duration,
    /// News backend origin; pass-through routes answer 503 without it
    pub upstream_url: Option<String>,
    pub upstream_api_key: Option<String>,
    /// Bearer token required on admin routes, if set
    pub admin_token: Option<String>,
    pub coingecko_base_url: String,
    pub alpha_vantage_base_url: String,
    pub alpha_vantage_api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            cache_ttl_secs: Self::DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: Self::DEFAULT_CACHE_MAX_ENTRIES,
            sweep_enabled: true,
            sweep_interval: Duration::from_secs(Self::DEFAULT_SWEEP_SECS),
            sweep_max_age: Duration::from_secs(Self::DEFAULT_SWEEP_SECS),
            upstream_url: None,
            upstream_api_key: None,
            admin_token: None,
            coingecko_base_url: COINGECKO_BASE_URL.to_string(),
            alpha_vantage_base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
            alpha_vantage_api_key: Self::DEFAULT_ALPHA_VANTAGE_API_KEY.to_string(),
        }
    }
}

impl Config {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const DEFAULT_CACHE_TTL_SECS: u64 = 300;
    const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
    const DEFAULT_SWEEP_SECS: u64 = 24 * 60 * 60;
    const DEFAULT_ALPHA_VANTAGE_API_KEY: &'static str = "demo";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let alpha_vantage_api_key = text("ALPHA_VANTAGE_API_KEY").unwrap_or_else(|| {
            warn!("ALPHA_VANTAGE_API_KEY not set, using the rate-limited 'demo' key");
            defaults.alpha_vantage_api_key.clone()
        });

        Self {
            host: text("TICKERWIRE_HOST").unwrap_or(defaults.host),
            port: parse_or("TICKERWIRE_PORT", text("TICKERWIRE_PORT"), defaults.port),
            cache_ttl_secs: match parse_or(
                "TICKERWIRE_CACHE_TTL_SECS",
                text("TICKERWIRE_CACHE_TTL_SECS"),
                defaults.cache_ttl_secs,
            ) {
                0 => {
                    warn!(
                        "TICKERWIRE_CACHE_TTL_SECS must be at least 1, using default {}",
                        defaults.cache_ttl_secs
                    );
                    defaults.cache_ttl_secs
                }
                ttl => ttl,
            },
            cache_max_entries: parse_or(
                "TICKERWIRE_CACHE_MAX_ENTRIES",
                text("TICKERWIRE_CACHE_MAX_ENTRIES"),
                defaults.cache_max_entries,
            ),
            sweep_enabled: defaults.sweep_enabled,
            sweep_interval: Duration::from_secs(parse_or(
                "TICKERWIRE_SWEEP_INTERVAL_SECS",
                text("TICKERWIRE_SWEEP_INTERVAL_SECS"),
                defaults.sweep_interval.as_secs(),
            )),
            sweep_max_age: Duration::from_secs(parse_or(
                "TICKERWIRE_SWEEP_MAX_AGE_SECS",
                text("TICKERWIRE_SWEEP_MAX_AGE_SECS"),
                defaults.sweep_max_age.as_secs(),
            )),
            upstream_url: text("TICKERWIRE_UPSTREAM_URL"),
            upstream_api_key: text("TICKERWIRE_UPSTREAM_API_KEY"),
            admin_token: text("TICKERWIRE_ADMIN_TOKEN"),
            coingecko_base_url: text("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            alpha_vantage_base_url: text("ALPHA_VANTAGE_BASE_URL").unwrap_or(defaults.alpha_vantage_base_url),
            alpha_vantage_api_key,
        }
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
    }
}
