//! Error types for the pipeline

use thiserror::Error;

/// Errors raised while configuring or running a pipeline stage
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    EtlError(#[from] margin_etl::EtlError),

    #[error(transparent)]
    ForecastError(#[from] margin_forecast::ForecastError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}
