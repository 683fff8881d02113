//! End-to-end pipeline tests against mocked Open-Meteo upstreams.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vane_cache::{Cache, MemoryCache};
use vane_core::{Upstream, WeatherError};
use vane_resilience::{CallerConfig, CircuitState};
use vane_weather::{ForecastFetcher, Resolver, WeatherOrchestrator};

fn fast_config() -> CallerConfig {
    CallerConfig {
        max_retries: 3,
        backoff_base: Duration::from_millis(5),
        backoff_multiplier: 2,
        per_attempt_timeout: Duration::from_secs(2),
        failure_threshold: 5,
        open_duration: Duration::from_secs(60),
    }
}

fn orchestrator_with_cache(
    geocoding_url: &str,
    forecast_url: &str,
    config: CallerConfig,
    cache: Arc<dyn Cache>,
) -> WeatherOrchestrator {
    let http = reqwest::Client::new();
    let resolver = Resolver::new(http.clone(), geocoding_url, config.clone());
    let fetcher = ForecastFetcher::new(http, forecast_url, config);
    WeatherOrchestrator::new(resolver, fetcher, cache, Duration::from_secs(300))
}

fn orchestrator(
    geocoding_url: &str,
    forecast_url: &str,
    config: CallerConfig,
) -> WeatherOrchestrator {
    orchestrator_with_cache(
        geocoding_url,
        forecast_url,
        config,
        Arc::new(MemoryCache::new()),
    )
}

fn berlin_geocoding_body() -> serde_json::Value {
    json!({
        "results": [{
            "name": "Berlin",
            "country": "Germany",
            "latitude": 52.52,
            "longitude": 13.41
        }]
    })
}

fn berlin_forecast_body() -> serde_json::Value {
    json!({
        "current": {
            "temperature_2m": 15.2,
            "relative_humidity_2m": 60.0,
            "weather_code": 3,
            "wind_speed_10m": 12.5,
            "is_day": 1
        },
        "current_units": {
            "temperature_2m": "°C",
            "wind_speed_10m": "km/h"
        }
    })
}

async fn mount_berlin(geocoding: &MockServer, forecast: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_geocoding_body()))
        .expect(expected_calls)
        .mount(geocoding)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_forecast_body()))
        .expect(expected_calls)
        .mount(forecast)
        .await;
}

#[tokio::test]
async fn berlin_end_to_end_then_cache_hit() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    // One upstream round trip total: the second request must be a hit.
    mount_berlin(&geocoding, &forecast, 1).await;

    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    let first = orchestrator.get_weather("Berlin").await.unwrap();
    assert!(!first.cache_hit);
    assert_eq!(first.cache_ttl, Some(Duration::from_secs(300)));
    assert_eq!(first.snapshot.city, "Berlin");
    assert_eq!(first.snapshot.country.as_deref(), Some("Germany"));
    assert_eq!(first.snapshot.coordinates.latitude, 52.52);
    assert_eq!(first.snapshot.coordinates.longitude, 13.41);
    assert_eq!(first.snapshot.temperature, 15.2);
    assert_eq!(first.snapshot.weather_code, 3);
    assert_eq!(first.snapshot.weather_description, "Overcast");
    assert_eq!(first.snapshot.wind_speed, 12.5);
    assert_eq!(first.snapshot.is_day, Some(true));

    let second = orchestrator.get_weather("Berlin").await.unwrap();
    assert!(second.cache_hit);
    assert!(second.cache_ttl.is_some());
    assert_eq!(second.snapshot, first.snapshot);
}

#[tokio::test]
async fn equivalent_city_spellings_share_one_cache_entry() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    mount_berlin(&geocoding, &forecast, 1).await;

    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    let first = orchestrator.get_weather("  Berlin ").await.unwrap();
    assert!(!first.cache_hit);
    // Key is case-folded: a differently-cased spelling hits the same entry.
    let second = orchestrator.get_weather("BERLIN").await.unwrap();
    assert!(second.cache_hit);
}

#[tokio::test]
async fn empty_city_fails_without_any_upstream_call() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    // No mocks mounted: any request would 404 and fail the retry budget,
    // but no request should happen at all.

    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    for input in ["", "   ", "\t"] {
        let err = orchestrator.get_weather(input).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidInput(_)), "input {input:?}");
    }
    assert!(geocoding.received_requests().await.unwrap().is_empty());
    assert!(forecast.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_city_name_is_invalid_input() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    let err = orchestrator.get_weather(&"x".repeat(101)).await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidInput(_)));

    // The limit counts characters, not bytes.
    let err = orchestrator.get_weather(&"ü".repeat(101)).await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidInput(_)));
}

#[tokio::test]
async fn multibyte_city_under_the_character_limit_is_accepted() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    // 60 characters but 120 bytes; must reach the geocoder and come back
    // as not-found rather than being rejected as too long.
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&geocoding)
        .await;

    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    let err = orchestrator.get_weather(&"ü".repeat(60)).await.unwrap_err();
    assert!(matches!(err, WeatherError::CityNotFound(_)));
}

#[tokio::test]
async fn unknown_city_is_permanent_and_spares_the_breaker() {
    let geocoding = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&geocoding)
        .await;

    let http = reqwest::Client::new();
    let resolver = Resolver::new(http, geocoding.uri(), fast_config());

    let err = resolver.resolve("Nowhere123").await.unwrap_err();
    assert!(matches!(
        err,
        vane_resilience::CallError::Permanent(WeatherError::CityNotFound(_))
    ));
    // A valid negative answer is not an upstream health signal.
    assert_eq!(resolver.consecutive_failures(), 0);
    assert_eq!(resolver.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn forecast_5xx_exhausts_retries_after_four_attempts() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_geocoding_body()))
        .expect(1)
        .mount(&geocoding)
        .await;
    // 1 initial attempt + 3 retries.
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&forecast)
        .await;

    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    let err = orchestrator.get_weather("Berlin").await.unwrap_err();
    assert!(matches!(
        err,
        WeatherError::UpstreamUnavailable(Upstream::Forecast)
    ));
}

#[tokio::test]
async fn forecast_timeouts_exhaust_retries_after_four_attempts() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_geocoding_body()))
        .expect(1)
        .mount(&geocoding)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(berlin_forecast_body())
                .set_delay(Duration::from_millis(400)),
        )
        .expect(4)
        .mount(&forecast)
        .await;

    let config = CallerConfig {
        per_attempt_timeout: Duration::from_millis(50),
        ..fast_config()
    };
    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), config);

    let err = orchestrator.get_weather("Berlin").await.unwrap_err();
    assert!(matches!(
        err,
        WeatherError::UpstreamUnavailable(Upstream::Forecast)
    ));
}

#[tokio::test]
async fn breaker_opens_and_rejects_without_contacting_upstream() {
    let geocoding = MockServer::start().await;
    // Two failed calls trip the threshold; the third call must produce
    // no request at all.
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&geocoding)
        .await;

    let config = CallerConfig {
        max_retries: 0,
        failure_threshold: 2,
        ..fast_config()
    };
    let forecast = MockServer::start().await;
    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), config);

    for _ in 0..2 {
        let err = orchestrator.get_weather("Berlin").await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::UpstreamUnavailable(Upstream::Geocoding)
        ));
    }
    assert_eq!(orchestrator.geocoding_circuit(), CircuitState::Open);

    let err = orchestrator.get_weather("Berlin").await.unwrap_err();
    assert!(matches!(err, WeatherError::CircuitOpen(Upstream::Geocoding)));
    // The forecast breaker is independent and untouched.
    assert_eq!(orchestrator.forecast_circuit(), CircuitState::Closed);
}

#[tokio::test]
async fn unknown_weather_code_is_a_permanent_contract_violation() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_geocoding_body()))
        .expect(1)
        .mount(&geocoding)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": {
                "temperature_2m": 15.2,
                "weather_code": 142,
                "wind_speed_10m": 12.5
            }
        })))
        .expect(1)
        .mount(&forecast)
        .await;

    let orchestrator = orchestrator(&geocoding.uri(), &forecast.uri(), fast_config());

    let err = orchestrator.get_weather("Berlin").await.unwrap_err();
    assert!(matches!(err, WeatherError::UnknownWeatherCode(142)));
}

/// A cache whose backing store is down: reads miss, writes fail.
struct DownCache;

#[async_trait::async_trait]
impl Cache for DownCache {
    async fn get(&self, _key: &str) -> Option<serde_json::Value> {
        None
    }
    async fn set(&self, _key: &str, _value: serde_json::Value, _ttl: Duration) -> bool {
        false
    }
    async fn remaining_ttl(&self, _key: &str) -> Option<Duration> {
        None
    }
}

#[tokio::test]
async fn cache_unavailability_degrades_to_fresh_fetch() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    // Every request goes upstream because nothing can be cached.
    mount_berlin(&geocoding, &forecast, 2).await;

    let orchestrator = orchestrator_with_cache(
        &geocoding.uri(),
        &forecast.uri(),
        fast_config(),
        Arc::new(DownCache),
    );

    for _ in 0..2 {
        let report = orchestrator.get_weather("Berlin").await.unwrap();
        assert!(!report.cache_hit);
        assert_eq!(report.snapshot.temperature, 15.2);
    }
}

#[tokio::test]
async fn corrupted_cache_entry_is_treated_as_a_miss() {
    let geocoding = MockServer::start().await;
    let forecast = MockServer::start().await;
    mount_berlin(&geocoding, &forecast, 1).await;

    let cache = Arc::new(MemoryCache::new());
    cache
        .set("Berlin", json!({"garbage": true}), Duration::from_secs(300))
        .await;

    let orchestrator = orchestrator_with_cache(
        &geocoding.uri(),
        &forecast.uri(),
        fast_config(),
        cache,
    );

    let report = orchestrator.get_weather("Berlin").await.unwrap();
    assert!(!report.cache_hit);
    assert_eq!(report.snapshot.weather_description, "Overcast");
}
