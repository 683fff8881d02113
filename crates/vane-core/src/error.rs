//! Error taxonomy surfaced to callers of the weather pipeline.
//!
//! Every terminal state of a request maps to exactly one variant here, so
//! the HTTP layer can always produce a deterministic, structured response.
//! Upstream/network faults are classified inside the resilience layer and
//! arrive here already collapsed into `UpstreamUnavailable` or
//! `CircuitOpen`; nothing propagates past the orchestrator unclassified.

use serde::Serialize;
use thiserror::Error;

/// The two external services the proxy talks to.
///
/// Each gets its own circuit breaker, so failure of one does not
/// shut off the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    Geocoding,
    Forecast,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Geocoding => "geocoding",
            Upstream::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error for a weather request.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid city parameter: {0}")]
    InvalidInput(String),

    #[error("could not find city: {0}")]
    CityNotFound(String),

    #[error("{0} service unavailable after retries")]
    UpstreamUnavailable(Upstream),

    #[error("{0} service circuit breaker is open")]
    CircuitOpen(Upstream),

    #[error("unrecognized weather code from upstream: {0}")]
    UnknownWeatherCode(u16),
}

impl WeatherError {
    /// Stable machine-readable code for the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            WeatherError::InvalidInput(_) => "INVALID_INPUT",
            WeatherError::CityNotFound(_) => "CITY_NOT_FOUND",
            WeatherError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            WeatherError::CircuitOpen(_) => "UPSTREAM_CIRCUIT_OPEN",
            WeatherError::UnknownWeatherCode(_) => "UNKNOWN_WEATHER_CODE",
        }
    }
}
