use crate::types::{BackendHealth, SummaryRequest};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Service under maintenance: {message}")]
    Maintenance { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    Authentication,

    #[error("Stream error: {message}")]
    Stream { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl ModelError {
    /// Maps a non-success HTTP status and its body onto an error variant.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::SERVICE_UNAVAILABLE || flags_maintenance(body) {
            return ModelError::Maintenance {
                message: format!("backend returned {}: {}", status, body),
            };
        }
        match status.as_u16() {
            401 | 403 => ModelError::Authentication,
            429 => ModelError::RateLimit,
            502 | 504 => ModelError::ServiceUnavailable {
                message: format!("backend returned {}: {}", status, body),
            },
            _ => ModelError::Unknown {
                message: format!("backend returned {}: {}", status, body),
            },
        }
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            ModelError::ServiceUnavailable {
                message: "Cannot connect to summarization backend".to_string(),
            }
        } else {
            ModelError::Network(err)
        }
    }

    /// Transient transport or gateway trouble.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, ModelError::ServiceUnavailable { .. })
    }

    /// The summarization service is in maintenance rather than broken.
    pub fn is_maintenance(&self) -> bool {
        matches!(self, ModelError::Maintenance { .. })
    }
}

/// An error body of the form `{"maintenance": true, ...}`.
fn flags_maintenance(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("maintenance").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

pub type ModelResult<T> = Result<T, ModelError>;

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn summarize(&self, request: SummaryRequest) -> ModelResult<String>;

    async fn health_check(&self) -> ModelResult<BackendHealth>;

    fn provider_name(&self) -> &'static str;
}
