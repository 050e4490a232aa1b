use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{error::RecommendationError, provider::truncate_body};

use super::Recommender;

pub const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiRecommender {
    api_key: String,
    model: String,
    base: String,
    http: Client,
}

impl std::fmt::Debug for GeminiRecommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiRecommender")
            .field("model", &self.model)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl GeminiRecommender {
    pub fn new(api_key: String, model: String) -> Result<Self, RecommendationError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { api_key, model, base: DEFAULT_BASE.to_string(), http })
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn first_text(response: GenerateResponse) -> Result<String, RecommendationError> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
        .ok_or(RecommendationError::Empty)
}

#[async_trait]
impl Recommender for GeminiRecommender {
    async fn complete(&self, prompt: &str) -> Result<String, RecommendationError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base, self.model);
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: Some(prompt.to_string()) }] }],
        };
        debug!(model = %self.model, "requesting recommendation");

        let res = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RecommendationError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let parsed: GenerateResponse = res.json().await?;
        first_text(parsed)
    }
}
