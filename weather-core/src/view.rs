use std::sync::Arc;

use crate::{
    config::SunTimes,
    format,
    icons::Bitmap,
    model::{AirQualitySnapshot, WeatherSnapshot},
};
use chrono::{DateTime, Utc};

/// Where the update pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Populating,
    Recommending,
    Done,
    Error,
}

impl Phase {
    /// A query is in flight; the shell keeps the submit control disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Fetching | Phase::Populating | Phase::Recommending)
    }
}

/// Everything the shell draws. Written only by the update pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    /// Bumped every time the displayed fields are replaced.
    pub revision: u64,
    pub city: String,
    pub local_time: String,
    pub temperature: String,
    pub feels_like: String,
    pub description: String,
    pub humidity: String,
    pub wind_speed: String,
    pub pressure: String,
    pub air_quality: String,
    pub sunrise: String,
    pub sunset: String,
    pub condition_icon: Option<Arc<Bitmap>>,
    pub recommendation: String,
    /// Message from the last rejected or failed query.
    pub notice: Option<String>,
}

impl ViewState {
    /// Fresh display fields for a snapshot pair. The recommendation starts empty.
    pub fn from_snapshots(
        weather: &WeatherSnapshot,
        air: &AirQualitySnapshot,
        now: DateTime<Utc>,
        sun_times: SunTimes,
    ) -> Self {
        Self {
            phase: Phase::Populating,
            revision: 0,
            city: weather.name.clone(),
            local_time: format::local_time(now, weather.utc_offset_secs),
            temperature: format::temperature(weather.temperature_c),
            feels_like: format::feels_like(weather.feels_like_c),
            description: format::capitalize(&weather.description),
            humidity: format::humidity(weather.humidity_pct),
            wind_speed: format::wind_speed(weather.wind_speed_mps),
            pressure: format::pressure(weather.pressure_hpa),
            air_quality: format::aqi_label(air.aqi).to_string(),
            sunrise: format::sun_time(weather.sunrise, weather.utc_offset_secs, sun_times),
            sunset: format::sun_time(weather.sunset, weather.utc_offset_secs, sun_times),
            condition_icon: None,
            recommendation: String::new(),
            notice: None,
        }
    }

    /// True once a query has populated the display.
    pub fn has_data(&self) -> bool {
        self.revision > 0
    }
}
