use model::ModelError;
use sources::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Chat stream error: {message}")]
    Stream { message: String },
}

pub type DashboardResult<T> = Result<T, DashboardError>;
