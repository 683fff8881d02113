//! Route handlers and their wire types.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use vane_core::WeatherError;
use vane_resilience::CircuitState;
use vane_weather::{Coordinates, WeatherReport};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    city: Option<String>,
}

#[derive(Debug, Serialize)]
struct WeatherResponse {
    city: String,
    country: Option<String>,
    coordinates: Coordinates,
    current: CurrentConditions,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_expires_in: Option<u64>,
    request_id: String,
}

#[derive(Debug, Serialize)]
struct CurrentConditions {
    temperature: f64,
    temperature_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    apparent_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity: Option<f64>,
    weather_code: u16,
    weather_description: String,
    wind_speed: f64,
    wind_speed_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    precipitation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_day: Option<bool>,
    observed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    request_id: String,
}

/// `GET /weather?city=NAME`
pub async fn get_weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WeatherQuery>,
) -> Response {
    let request_id = request_id(&headers);

    let Some(city) = query.city else {
        let err = WeatherError::InvalidInput("missing required parameter: city".to_string());
        return error_response(&err, request_id);
    };

    match state.orchestrator.get_weather(&city).await {
        Ok(report) => {
            info!(%city, cached = report.cache_hit, %request_id, "weather served");
            (StatusCode::OK, Json(weather_response(report, request_id))).into_response()
        }
        Err(err) => error_response(&err, request_id),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    dependencies: Dependencies,
    uptime_seconds: f64,
}

#[derive(Debug, Serialize)]
struct Dependencies {
    geocoding: &'static str,
    forecast: &'static str,
}

/// `GET /health`. Degraded whenever any breaker is not closed.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let geocoding = state.orchestrator.geocoding_circuit();
    let forecast = state.orchestrator.forecast_circuit();
    let healthy = geocoding == CircuitState::Closed && forecast == CircuitState::Closed;

    let uptime = state.started_at.elapsed().as_secs_f64();
    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        dependencies: Dependencies {
            geocoding: geocoding.as_str(),
            forecast: forecast.as_str(),
        },
        uptime_seconds: (uptime * 100.0).round() / 100.0,
    })
}

fn weather_response(report: WeatherReport, request_id: String) -> WeatherResponse {
    let snapshot = report.snapshot;
    WeatherResponse {
        city: snapshot.city,
        country: snapshot.country,
        coordinates: snapshot.coordinates,
        current: CurrentConditions {
            temperature: snapshot.temperature,
            temperature_unit: snapshot.temperature_unit,
            apparent_temperature: snapshot.apparent_temperature,
            humidity: snapshot.humidity,
            weather_code: snapshot.weather_code,
            weather_description: snapshot.weather_description,
            wind_speed: snapshot.wind_speed,
            wind_speed_unit: snapshot.wind_speed_unit,
            precipitation: snapshot.precipitation,
            is_day: snapshot.is_day,
            observed_at: snapshot.observed_at,
        },
        cached: report.cache_hit,
        cache_expires_in: report.cache_ttl.map(|d| d.as_secs()),
        request_id,
    }
}

fn status_for(err: &WeatherError) -> StatusCode {
    match err {
        WeatherError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        WeatherError::CityNotFound(_) => StatusCode::NOT_FOUND,
        WeatherError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        WeatherError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
        WeatherError::UnknownWeatherCode(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &WeatherError, request_id: String) -> Response {
    let status = status_for(err);
    info!(code = err.code(), %status, %request_id, "request failed: {err}");
    let body = ErrorEnvelope {
        error: ErrorBody {
            code: err.code(),
            message: err.to_string(),
            request_id,
        },
    };
    (status, Json(body)).into_response()
}

/// Honor an upstream correlation header, otherwise mint one.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
