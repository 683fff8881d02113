//! Current-conditions fetch from the Open-Meteo forecast API.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use vane_core::{Upstream, WeatherError};
use vane_resilience::{
    is_retryable_status, AttemptError, CallOutcome, CallerConfig, CircuitState, ResilientCaller,
};

use crate::codes::describe_wmo;
use crate::types::{ResolvedCity, WeatherSnapshot};

const DEFAULT_TEMPERATURE_UNIT: &str = "°C";
const DEFAULT_WIND_SPEED_UNIT: &str = "km/h";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
    #[serde(default)]
    current_units: CurrentUnits,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    #[serde(default)]
    temperature_2m: f64,
    #[serde(default)]
    weather_code: u16,
    #[serde(default)]
    wind_speed_10m: f64,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    precipitation: Option<f64>,
    is_day: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentUnits {
    temperature_2m: Option<String>,
    wind_speed_10m: Option<String>,
}

/// Turns resolved coordinates into a weather snapshot, resiliently.
pub struct ForecastFetcher {
    http: Client,
    base_url: String,
    caller: ResilientCaller,
}

impl ForecastFetcher {
    pub fn new(http: Client, base_url: impl Into<String>, config: CallerConfig) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            caller: ResilientCaller::new("forecast", config),
        }
    }

    /// Fetch current conditions for an already-resolved city.
    pub async fn fetch(&self, place: &ResolvedCity) -> CallOutcome<WeatherSnapshot, WeatherError> {
        self.caller.execute(|| self.request(place)).await
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.caller.circuit_state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.caller.consecutive_failures()
    }

    async fn request(&self, place: &ResolvedCity) -> Result<WeatherSnapshot, AttemptError<WeatherError>> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("latitude", place.coordinates.latitude.to_string().as_str()),
                ("longitude", place.coordinates.longitude.to_string().as_str()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,\
                     wind_speed_10m,precipitation,is_day",
                ),
                ("temperature_unit", "celsius"),
                ("wind_speed_unit", "kmh"),
                ("precipitation_unit", "mm"),
            ])
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            if is_retryable_status(status) {
                return Err(AttemptError::Transient(anyhow::anyhow!(
                    "forecast API returned {status}"
                )));
            }
            return Err(AttemptError::Permanent(WeatherError::UpstreamUnavailable(
                Upstream::Forecast,
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Transient(e.into()))?;

        let Some(current) = body.current else {
            return Err(AttemptError::Transient(anyhow::anyhow!(
                "forecast response missing current conditions"
            )));
        };

        let Some(description) = describe_wmo(current.weather_code) else {
            return Err(AttemptError::Permanent(WeatherError::UnknownWeatherCode(
                current.weather_code,
            )));
        };

        Ok(WeatherSnapshot {
            city: place.name.clone(),
            country: place.country.clone(),
            coordinates: place.coordinates,
            temperature: current.temperature_2m,
            temperature_unit: body
                .current_units
                .temperature_2m
                .unwrap_or_else(|| DEFAULT_TEMPERATURE_UNIT.to_string()),
            weather_code: current.weather_code,
            weather_description: description.to_string(),
            wind_speed: current.wind_speed_10m,
            wind_speed_unit: body
                .current_units
                .wind_speed_10m
                .unwrap_or_else(|| DEFAULT_WIND_SPEED_UNIT.to_string()),
            humidity: current.relative_humidity_2m,
            apparent_temperature: current.apparent_temperature,
            precipitation: current.precipitation,
            is_day: current.is_day.map(|v| v != 0),
            observed_at: Utc::now(),
        })
    }
}
