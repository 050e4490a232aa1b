use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::ProviderError,
    model::{AirQualitySnapshot, Coordinates, LocationQuery, WeatherSnapshot},
    provider::truncate_body,
};

use super::WeatherProvider;

pub const DEFAULT_API_BASE: &str = "https://api.openweathermap.org";
pub const DEFAULT_ICON_BASE: &str = "https://openweathermap.org";

#[derive(Clone)]
pub struct OpenWeatherProvider {
    weather_key: String,
    air_quality_key: String,
    api_base: String,
    icon_base: String,
    http: Client,
}

// Keys stay out of logs.
impl std::fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("api_base", &self.api_base)
            .field("icon_base", &self.icon_base)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherProvider {
    pub fn new(weather_key: String, air_quality_key: String) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            weather_key,
            air_quality_key,
            api_base: DEFAULT_API_BASE.to_string(),
            icon_base: DEFAULT_ICON_BASE.to_string(),
            http,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_icon_base(mut self, base: impl Into<String>) -> Self {
        self.icon_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

/// `cod` is a number on success and a string on errors (`"404"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OwCode {
    Num(i64),
    Text(String),
}

impl OwCode {
    fn is_ok(&self) -> bool {
        match self {
            OwCode::Num(n) => *n == 200,
            OwCode::Text(s) => s.trim() == "200",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwStatus {
    cod: Option<OwCode>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    timezone: i32,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwAirMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAirMain,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    list: Vec<OwAirEntry>,
}

fn parse_current(body: &str) -> Result<WeatherSnapshot, ProviderError> {
    let status: OwStatus = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("OpenWeather current JSON: {e}")))?;

    if status.cod.as_ref().is_some_and(|cod| !cod.is_ok()) {
        return Err(ProviderError::NotFound {
            message: status.message.unwrap_or_else(|| "city not found".to_string()),
        });
    }

    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("OpenWeather current JSON: {e}")))?;

    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Decode("OpenWeather response has no weather entry".into()))?;

    Ok(WeatherSnapshot {
        name: parsed.name,
        coord: Coordinates { lat: parsed.coord.lat, lon: parsed.coord.lon },
        utc_offset_secs: parsed.timezone,
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
        pressure_hpa: parsed.main.pressure,
        description: condition.description,
        icon_code: condition.icon,
        sunrise: parsed.sys.sunrise,
        sunset: parsed.sys.sunset,
    })
}

fn parse_air_quality(body: &str) -> Result<AirQualitySnapshot, ProviderError> {
    let parsed: OwAirResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("OpenWeather air pollution JSON: {e}")))?;

    let entry = parsed.list.first().ok_or_else(|| {
        ProviderError::Decode("OpenWeather air pollution response contained no data".into())
    })?;

    Ok(AirQualitySnapshot { aqi: entry.main.aqi })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_weather(&self, city: &LocationQuery) -> Result<WeatherSnapshot, ProviderError> {
        let url = format!("{}/data/2.5/weather", self.api_base);
        debug!(%city, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city.as_str()),
                ("appid", self.weather_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OwStatus>(&body)
                .ok()
                .and_then(|s| s.message)
                .unwrap_or_else(|| truncate_body(&body));
            debug!(%status, %message, "OpenWeather rejected query");
            return Err(ProviderError::NotFound { message });
        }

        parse_current(&body)
    }

    async fn fetch_air_quality(
        &self,
        coord: Coordinates,
    ) -> Result<AirQualitySnapshot, ProviderError> {
        let url = format!("{}/data/2.5/air_pollution", self.api_base);
        debug!(lat = coord.lat, lon = coord.lon, "requesting air quality");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", coord.lat.to_string()),
                ("lon", coord.lon.to_string()),
                ("appid", self.air_quality_key.clone()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        parse_air_quality(&body)
    }

    async fn fetch_condition_icon(&self, code: &str) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/img/wn/{code}@2x.png", self.icon_base);
        debug!(code, "requesting condition icon");

        let res = self.http.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        Ok(res.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELHI: &str = r#"{
        "coord": {"lon": 77.2167, "lat": 28.6667},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {"temp": 29.4, "feels_like": 31.2, "humidity": 60, "pressure": 1008},
        "wind": {"speed": 3.1, "deg": 270},
        "sys": {"sunrise": 1700000000, "sunset": 1700040000},
        "timezone": 19800,
        "name": "Delhi",
        "cod": 200
    }"#;

    #[test]
    fn parses_current_response() {
        let snap = parse_current(DELHI).expect("valid response");

        assert_eq!(snap.name, "Delhi");
        assert_eq!(snap.coord, Coordinates { lat: 28.6667, lon: 77.2167 });
        assert_eq!(snap.utc_offset_secs, 19800);
        assert_eq!(snap.pressure_hpa, 1008);
        assert_eq!(snap.humidity_pct, 60);
        assert_eq!(snap.icon_code, "01d");
        assert_eq!(snap.description, "clear sky");
    }

    #[test]
    fn string_cod_is_not_found() {
        let err = parse_current(r#"{"cod": "404", "message": "city not found"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { ref message } if message == "city not found"));
    }

    #[test]
    fn numeric_non_200_cod_is_not_found() {
        let err = parse_current(r#"{"cod": 401}"#).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn missing_weather_entry_is_decode_error() {
        let body = DELHI.replace(
            r#"[{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}]"#,
            "[]",
        );
        let err = parse_current(&body).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn parses_air_quality() {
        let aq = parse_air_quality(r#"{"coord": {"lon": 77.2, "lat": 28.6}, "list": [{"main": {"aqi": 2}, "components": {}, "dt": 1}]}"#)
            .expect("valid response");
        assert_eq!(aq.aqi, 2);
    }

    #[test]
    fn empty_air_quality_list_is_decode_error() {
        let err = parse_air_quality(r#"{"list": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn debug_hides_keys() {
        let provider =
            OpenWeatherProvider::new("SECRET".into(), "ALSO".into()).expect("client builds");
        let debug = format!("{provider:?}");
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("ALSO"));
    }
}
