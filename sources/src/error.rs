use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid repository identifier: {value}")]
    InvalidRepository { value: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    Authentication,

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl SourceError {
    pub fn from_status(status: StatusCode, resource: &str, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => SourceError::Authentication,
            404 => SourceError::NotFound {
                resource: resource.to_string(),
            },
            429 => SourceError::RateLimit,
            503 => SourceError::ServiceUnavailable {
                message: body.to_string(),
            },
            code => SourceError::Api {
                status: code,
                message: body.to_string(),
            },
        }
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            SourceError::ServiceUnavailable {
                message: "Cannot connect to API".to_string(),
            }
        } else {
            SourceError::Network(err)
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
