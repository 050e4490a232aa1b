use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Credentials, RecommendationConfig,
    error::RecommendationError,
    model::{AirQualitySnapshot, WeatherSnapshot},
    recommend::gemini::GeminiRecommender,
};

pub mod gemini;

/// Shown when the text-generation service is unavailable.
pub const FALLBACK_RECOMMENDATION: &str =
    "Recommendation unavailable right now. Check conditions before heading out.";

#[async_trait]
pub trait Recommender: Send + Sync + Debug {
    /// Send `prompt` and return the model's reply, trimmed. Length is not enforced.
    async fn complete(&self, prompt: &str) -> Result<String, RecommendationError>;
}

/// Fixed prompt template. Uses the unrounded provider values.
pub fn build_prompt(weather: &WeatherSnapshot, air: &AirQualitySnapshot) -> String {
    format!(
        "Given the following weather conditions:\n\
         - Temperature: {temp}°C\n\
         - Feels Like: {feels}°C\n\
         - Humidity: {humidity}%\n\
         - Wind Speed: {wind} m/s\n\
         - Weather Description: {description}\n\
         - Air Quality Index: {aqi}\n\
         Provide a one line recommendation (no more than 13 words) for activities or precautions \
         based on these weather conditions. The recommendation should be concise, and directly \
         related to the current weather.",
        temp = weather.temperature_c,
        feels = weather.feels_like_c,
        humidity = weather.humidity_pct,
        wind = weather.wind_speed_mps,
        description = weather.description,
        aqi = air.aqi,
    )
}

/// Build a recommendation for one snapshot pair.
pub async fn recommend(
    recommender: &dyn Recommender,
    weather: &WeatherSnapshot,
    air: &AirQualitySnapshot,
) -> Result<String, RecommendationError> {
    let prompt = build_prompt(weather, air);
    recommender.complete(&prompt).await
}

pub fn recommender_from_config(
    credentials: &Credentials,
    config: &RecommendationConfig,
) -> anyhow::Result<Box<dyn Recommender>> {
    let mut recommender =
        GeminiRecommender::new(credentials.recommendation_key.clone(), config.model.clone())?;
    if let Some(base) = &config.base_url {
        recommender = recommender.with_base(base.clone());
    }
    Ok(Box::new(recommender))
}
