//! Error handling for the Huddle CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Huddle error: {0}")]
    Huddle(#[from] huddle_core::HuddleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Runtime(err.to_string())
    }
}
