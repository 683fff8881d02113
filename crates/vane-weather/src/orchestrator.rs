//! Cache-aside pipeline: cache read, geocode, forecast, cache write.
//!
//! Ordering is deliberate: the cache check precedes any network call, the
//! geocode precedes the forecast (which needs coordinates), and the cache
//! write happens only after a fully successful fetch so partial results
//! are never cached.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use vane_cache::Cache;
use vane_core::{Upstream, WeatherError};
use vane_resilience::{CallError, CircuitState};

use crate::forecast::ForecastFetcher;
use crate::geocoding::Resolver;
use crate::types::{normalize_city, WeatherSnapshot};

const MAX_CITY_LEN: usize = 100;

/// Result of a weather lookup, with cache provenance.
#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub snapshot: WeatherSnapshot,
    pub cache_hit: bool,
    pub cache_ttl: Option<Duration>,
}

pub struct WeatherOrchestrator {
    resolver: Resolver,
    fetcher: ForecastFetcher,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl WeatherOrchestrator {
    pub fn new(
        resolver: Resolver,
        fetcher: ForecastFetcher,
        cache: Arc<dyn Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            cache,
            cache_ttl,
        }
    }

    /// The single entry point for the HTTP layer.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let Some(normalized) = normalize_city(city) else {
            return Err(WeatherError::InvalidInput(
                "city must not be empty".to_string(),
            ));
        };
        // Character count, not bytes: multibyte city names are common.
        if normalized.chars().count() > MAX_CITY_LEN {
            return Err(WeatherError::InvalidInput(format!(
                "city name too long (max {MAX_CITY_LEN} characters)"
            )));
        }

        if let Some(payload) = self.cache.get(&normalized).await {
            match serde_json::from_value::<WeatherSnapshot>(payload) {
                Ok(snapshot) => {
                    let remaining = self.cache.remaining_ttl(&normalized).await;
                    debug!(city = %normalized, "serving cached snapshot");
                    return Ok(WeatherReport {
                        snapshot,
                        cache_hit: true,
                        cache_ttl: remaining,
                    });
                }
                Err(e) => {
                    // A corrupted entry behaves like a miss.
                    warn!(city = %normalized, error = %e, "discarding undecodable cache entry");
                }
            }
        }

        let place = self
            .resolver
            .resolve(&normalized)
            .await
            .map_err(|e| terminal(e, Upstream::Geocoding))?;

        let snapshot = self
            .fetcher
            .fetch(&place)
            .await
            .map_err(|e| terminal(e, Upstream::Forecast))?;

        match serde_json::to_value(&snapshot) {
            Ok(payload) => {
                if !self.cache.set(&normalized, payload, self.cache_ttl).await {
                    warn!(city = %normalized, "cache write failed, serving uncached");
                }
            }
            Err(e) => warn!(city = %normalized, error = %e, "snapshot not serializable for cache"),
        }

        Ok(WeatherReport {
            snapshot,
            cache_hit: false,
            cache_ttl: Some(self.cache_ttl),
        })
    }

    /// Breaker state of the geocoding upstream, for health reporting.
    pub fn geocoding_circuit(&self) -> CircuitState {
        self.resolver.circuit_state()
    }

    /// Breaker state of the forecast upstream, for health reporting.
    pub fn forecast_circuit(&self) -> CircuitState {
        self.fetcher.circuit_state()
    }
}

/// Collapse a resilience-layer outcome into the terminal error taxonomy.
fn terminal(err: CallError<WeatherError>, target: Upstream) -> WeatherError {
    match err {
        CallError::Permanent(e) => e,
        CallError::Transient { .. } => {
            warn!(%target, error = %err, "upstream exhausted retries");
            WeatherError::UpstreamUnavailable(target)
        }
        CallError::CircuitOpen { .. } => WeatherError::CircuitOpen(target),
    }
}
