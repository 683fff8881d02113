use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinates, immutable once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A geocoded city: the upstream's canonical name plus coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCity {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinates,
}

/// Current conditions for one city; the unit of caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: Option<String>,
    pub coordinates: Coordinates,
    pub temperature: f64,
    pub temperature_unit: String,
    pub weather_code: u16,
    pub weather_description: String,
    pub wind_speed: f64,
    pub wind_speed_unit: String,
    pub humidity: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub is_day: Option<bool>,
    pub observed_at: DateTime<Utc>,
}

/// Canonical form of a user-supplied city name: trimmed, inner whitespace
/// collapsed. `None` when nothing remains.
pub fn normalize_city(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
