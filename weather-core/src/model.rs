use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// A city name as typed by the user. Only emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery(String);

impl LocationQuery {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Validation);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One successful current-weather response, in provider units (metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub name: String,
    pub coord: Coordinates,
    /// Shift from UTC in seconds.
    pub utc_offset_secs: i32,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub pressure_hpa: u32,
    pub description: String,
    pub icon_code: String,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Air-quality bucket for the coordinates of a [`WeatherSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQualitySnapshot {
    /// 1 (good) ..= 5 (very poor). Anything else renders blank.
    pub aqi: u8,
}
