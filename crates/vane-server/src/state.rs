//! Shared application state: the orchestrator and process metadata.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use vane_cache::MemoryCache;
use vane_core::Config;
use vane_resilience::CallerConfig;
use vane_weather::{ForecastFetcher, Resolver, WeatherOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<WeatherOrchestrator>,
    pub started_at: Instant,
}

/// Wire the pipeline from configuration.
pub fn build(config: &Config) -> Result<AppState> {
    // The client timeout is a backstop; the envelope enforces the real
    // per-attempt deadline.
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout + Duration::from_secs(1))
        .build()
        .context("failed to build HTTP client")?;

    let caller_config = CallerConfig {
        max_retries: config.retry_max_attempts,
        backoff_base: config.retry_backoff_base,
        backoff_multiplier: 2,
        per_attempt_timeout: config.request_timeout,
        failure_threshold: config.circuit_breaker_fail_max,
        open_duration: config.circuit_breaker_reset_timeout,
    };

    let resolver = Resolver::new(
        http.clone(),
        config.geocoding_base_url.clone(),
        caller_config.clone(),
    );
    let fetcher = ForecastFetcher::new(
        http,
        config.forecast_base_url.clone(),
        caller_config,
    );
    let orchestrator = WeatherOrchestrator::new(
        resolver,
        fetcher,
        Arc::new(MemoryCache::new()),
        config.cache_ttl,
    );

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        started_at: Instant::now(),
    })
}
