//! Configuration error types.

use std::path::PathBuf;

use tern_core::ValidationError;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension has no enabled format.
    #[error("unsupported or disabled configuration format: .{0}")]
    UnsupportedFormat(String),

    /// A source could not be read or merged.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// The settings tree is not valid.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    /// The `logging` section is not valid.
    #[error("invalid logging configuration: {message}")]
    Logging {
        /// What is wrong.
        message: String,
    },
}

impl ConfigError {
    /// Creates a logging validation error.
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
