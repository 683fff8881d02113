//! City-name resolution via the Open-Meteo geocoding API.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use vane_core::{Upstream, WeatherError};
use vane_resilience::{
    is_retryable_status, AttemptError, CallOutcome, CallerConfig, CircuitState, ResilientCaller,
};

use crate::types::{Coordinates, ResolvedCity};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    latitude: f64,
    longitude: f64,
    name: Option<String>,
    country: Option<String>,
}

/// Turns a normalized city name into coordinates, resiliently.
pub struct Resolver {
    http: Client,
    base_url: String,
    caller: ResilientCaller,
}

impl Resolver {
    pub fn new(http: Client, base_url: impl Into<String>, config: CallerConfig) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            caller: ResilientCaller::new("geocoding", config),
        }
    }

    /// Resolve `city` to coordinates.
    ///
    /// Zero matches is a permanent `CityNotFound`. An ambiguous name
    /// resolves to the upstream's first-ranked match; that is deliberate
    /// and deterministic, not arbitrary.
    pub async fn resolve(&self, city: &str) -> CallOutcome<ResolvedCity, WeatherError> {
        self.caller.execute(|| self.search(city)).await
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.caller.circuit_state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.caller.consecutive_failures()
    }

    async fn search(&self, city: &str) -> Result<ResolvedCity, AttemptError<WeatherError>> {
        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("name", city),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            if is_retryable_status(status) {
                return Err(AttemptError::Transient(anyhow::anyhow!(
                    "geocoding API returned {status}"
                )));
            }
            // A definitive non-2xx answer on a well-formed query.
            return Err(AttemptError::Permanent(WeatherError::UpstreamUnavailable(
                Upstream::Geocoding,
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Transient(e.into()))?;

        let Some(first) = body.results.into_iter().next() else {
            return Err(AttemptError::Permanent(WeatherError::CityNotFound(
                city.to_string(),
            )));
        };

        debug!(
            city,
            latitude = first.latitude,
            longitude = first.longitude,
            "geocoded"
        );

        Ok(ResolvedCity {
            name: first.name.unwrap_or_else(|| city.to_string()),
            country: first.country,
            coordinates: Coordinates {
                latitude: first.latitude,
                longitude: first.longitude,
            },
        })
    }
}
