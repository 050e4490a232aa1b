use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_CITY: &str = "Delhi";

/// OpenWeather credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    /// Separate key for the air-pollution endpoint; falls back to `api_key`.
    pub air_quality_api_key: Option<String>,
    pub base_url: Option<String>,
    pub icon_base_url: Option<String>,
}

/// Text-generation service used for the one-line recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { api_key: None, model: default_model(), base_url: None }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssetsConfig {
    pub icons_dir: Option<PathBuf>,
}

/// Which clock sunrise/sunset are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SunTimes {
    /// The queried city's UTC offset.
    #[default]
    City,
    /// The machine's local time zone.
    Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_city")]
    pub default_city: String,
    #[serde(default)]
    pub sun_times: SunTimes,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { default_city: default_city(), sun_times: SunTimes::default() }
    }
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [openweather]
/// api_key = "..."
///
/// [recommendation]
/// api_key = "..."
/// model = "gemini-2.0-flash"
///
/// [assets]
/// icons_dir = "/home/me/.local/share/weather-dashboard/icons"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub openweather: OpenWeatherConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// API keys that must be present before the dashboard can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub weather_key: String,
    pub air_quality_key: String,
    pub recommendation_key: String,
}

impl Config {
    /// Load config from disk (or defaults on first run), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load config from disk only, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-dashboard", "weather-dashboard")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Overlay values taken from the environment. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENWEATHER_API_KEY") {
            self.openweather.api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENWEATHER_AQI_API_KEY") {
            self.openweather.air_quality_api_key = Some(key);
        }
        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            self.recommendation.api_key = Some(key);
        }
        if let Some(dir) = non_empty("WEATHER_DASHBOARD_ICONS_DIR") {
            self.assets.icons_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate that every required key is configured.
    pub fn credentials(&self) -> Result<Credentials> {
        let weather_key = self.openweather.api_key.clone().ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `weather-dashboard configure` or set OPENWEATHER_API_KEY."
            )
        })?;
        let recommendation_key = self.recommendation.api_key.clone().ok_or_else(|| {
            anyhow!(
                "No recommendation API key configured.\n\
                 Hint: run `weather-dashboard configure` or set GOOGLE_API_KEY."
            )
        })?;
        let air_quality_key = self
            .openweather
            .air_quality_api_key
            .clone()
            .unwrap_or_else(|| weather_key.clone());

        Ok(Credentials { weather_key, air_quality_key, recommendation_key })
    }

    /// Directory holding the local UI icons.
    pub fn icons_dir(&self) -> Result<PathBuf> {
        match &self.assets.icons_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("icons")),
        }
    }
}
