//! Error types for token-saver.

use thiserror::Error;

/// Main error type for token-saver.
#[derive(Debug, Error)]
pub enum SaverError {
    /// Configuration error (registry validation, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Regex error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl SaverError {
    /// Shorthand for building a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SaverError::Config(message.into())
    }
}
