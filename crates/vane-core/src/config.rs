//! Environment-driven configuration.
//!
//! Every knob has a default suitable for local development; production
//! deployments override via environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com";
const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Base URL of the Open-Meteo forecast API.
    pub forecast_base_url: String,

    /// Base URL of the Open-Meteo geocoding API.
    pub geocoding_base_url: String,

    /// How long a fetched snapshot stays in the cache.
    pub cache_ttl: Duration,

    /// Consecutive upstream failures before a breaker opens.
    pub circuit_breaker_fail_max: u32,

    /// How long an open breaker rejects calls before probing again.
    pub circuit_breaker_reset_timeout: Duration,

    /// Per-attempt timeout for upstream requests.
    pub request_timeout: Duration,

    /// Retries after the first failed attempt (total attempts = 1 + this).
    pub retry_max_attempts: u32,

    /// First retry delay; doubles each subsequent attempt.
    pub retry_backoff_base: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            forecast_base_url: DEFAULT_FORECAST_URL.to_string(),
            geocoding_base_url: DEFAULT_GEOCODING_URL.to_string(),
            cache_ttl: Duration::from_secs(300),
            circuit_breaker_fail_max: 5,
            circuit_breaker_reset_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            retry_max_attempts: 3,
            retry_backoff_base: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            bind_addr: env_parsed("VANE_BIND_ADDR", defaults.bind_addr)?,
            forecast_base_url: env_or("OPEN_METEO_BASE_URL", &defaults.forecast_base_url),
            geocoding_base_url: env_or("OPEN_METEO_GEOCODING_URL", &defaults.geocoding_base_url),
            cache_ttl: Duration::from_secs(env_parsed("CACHE_TTL_SECONDS", 300u64)?),
            circuit_breaker_fail_max: env_parsed(
                "CIRCUIT_BREAKER_FAIL_MAX",
                defaults.circuit_breaker_fail_max,
            )?,
            circuit_breaker_reset_timeout: Duration::from_secs(env_parsed(
                "CIRCUIT_BREAKER_RESET_TIMEOUT",
                60u64,
            )?),
            request_timeout: Duration::from_secs(env_parsed("REQUEST_TIMEOUT_SECONDS", 10u64)?),
            retry_max_attempts: env_parsed("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts)?,
            retry_backoff_base: Duration::from_millis(env_parsed(
                "RETRY_BACKOFF_BASE_MS",
                500u64,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("forecast base URL", &self.forecast_base_url),
            ("geocoding base URL", &self.geocoding_base_url),
        ] {
            Url::parse(value).with_context(|| format!("invalid {name}: {value}"))?;
        }

        anyhow::ensure!(!self.cache_ttl.is_zero(), "CACHE_TTL_SECONDS must be positive");
        anyhow::ensure!(
            self.circuit_breaker_fail_max > 0,
            "CIRCUIT_BREAKER_FAIL_MAX must be positive"
        );
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "REQUEST_TIMEOUT_SECONDS must be positive"
        );

        Ok(())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw}")),
        Err(_) => Ok(default),
    }
}
