//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the weather / air-quality provider and the recommendation service
//! - Icon loading into GUI-independent bitmaps
//! - The view state and the update pipeline that fills it
//!
//! Nothing here depends on a display, so the whole query cycle is testable headless.

pub mod config;
pub mod error;
pub mod format;
pub mod icons;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod recommend;
pub mod view;

pub use config::{
    AssetsConfig, Config, Credentials, DisplayConfig, OpenWeatherConfig, RecommendationConfig,
    SunTimes,
};
pub use error::{AssetLoadError, ProviderError, QueryError, RecommendationError};
pub use icons::{Bitmap, DirIconSource, IconSet, IconSource, UiIcon};
pub use model::{AirQualitySnapshot, Coordinates, LocationQuery, WeatherSnapshot};
pub use pipeline::UpdatePipeline;
pub use provider::{WeatherProvider, provider_from_config};
pub use recommend::{Recommender, recommender_from_config};
pub use view::{Phase, ViewState};
