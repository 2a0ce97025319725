//! Configuration error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}
