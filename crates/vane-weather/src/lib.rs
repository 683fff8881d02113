//! Weather pipeline for Vane.
//!
//! Resolves a city to coordinates via the Open-Meteo geocoding API,
//! fetches current conditions via the forecast API, and runs the whole
//! thing cache-aside behind the resilience envelope.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod codes;
pub mod forecast;
pub mod geocoding;
pub mod orchestrator;
pub mod types;

pub use forecast::ForecastFetcher;
pub use geocoding::Resolver;
pub use orchestrator::{WeatherOrchestrator, WeatherReport};
pub use types::{normalize_city, Coordinates, ResolvedCity, WeatherSnapshot};
