use crate::{
    Credentials, OpenWeatherConfig,
    error::ProviderError,
    model::{AirQualitySnapshot, Coordinates, LocationQuery, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for a city. A provider-side "no such city" is `NotFound`.
    async fn fetch_weather(&self, city: &LocationQuery) -> Result<WeatherSnapshot, ProviderError>;

    /// Air-quality bucket for coordinates taken from a prior `fetch_weather`.
    async fn fetch_air_quality(
        &self,
        coord: Coordinates,
    ) -> Result<AirQualitySnapshot, ProviderError>;

    /// Raw image bytes for a condition icon code such as `"01d"`.
    async fn fetch_condition_icon(&self, code: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Construct the OpenWeather provider from validated credentials.
pub fn provider_from_config(
    credentials: &Credentials,
    config: &OpenWeatherConfig,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let mut provider = OpenWeatherProvider::new(
        credentials.weather_key.clone(),
        credentials.air_quality_key.clone(),
    )?;

    if let Some(base) = &config.base_url {
        provider = provider.with_api_base(base.clone());
    }
    if let Some(base) = &config.icon_base_url {
        provider = provider.with_icon_base(base.clone());
    }

    Ok(Box::new(provider))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
