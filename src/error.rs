// src/error.rs
use thiserror::Error;

/// Failures the producer core can surface to its caller.
#[derive(Error, Debug)]
pub enum ProducerError {
    /// Missing or unusable connection settings. Raised before any network activity.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Batch creation or submission failed (network fault, auth rejection, broker rejection).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProducerError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProducerError::Configuration(_))
    }
}

impl From<reqwest::Error> for ProducerError {
    fn from(err: reqwest::Error) -> Self {
        ProducerError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProducerError>;
