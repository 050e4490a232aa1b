//! Error taxonomy for a single query cycle.
//!
//! Client-level errors (`ProviderError`, `RecommendationError`, `AssetLoadError`) stay close to
//! the transport; `QueryError` is what the shell sees.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("City not found: {message}")]
    NotFound { message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Provider request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse provider response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Recommendation request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Recommendation service returned no text")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    #[error("Failed to read icon {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode icon {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to fetch condition icon: {0}")]
    Fetch(#[from] ProviderError),
}

/// Outcome of a rejected or failed query, as reported to the shell.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Please enter a city name")]
    Validation,
    #[error("City Not Found")]
    NotFound,
    #[error("Failed to fetch weather data")]
    Network(String),
    #[error("A query is already in progress")]
    Busy,
}

impl QueryError {
    /// Whether the shell should open a modal dialog for this error.
    pub fn is_dialog(&self) -> bool {
        matches!(self, QueryError::NotFound | QueryError::Network(_))
    }

    /// Whether the shell should clear the query input.
    pub fn clears_input(&self) -> bool {
        matches!(self, QueryError::NotFound | QueryError::Network(_))
    }
}

impl From<ProviderError> for QueryError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound { .. } => QueryError::NotFound,
            other => QueryError::Network(other.to_string()),
        }
    }
}
