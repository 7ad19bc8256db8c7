//! Runtime error types.

use std::path::PathBuf;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;
use tracing_appender::rolling::InitError;
use tracing_subscriber::util::TryInitError;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin failed to load.
    #[error("failed to load plugin '{name}': {source}")]
    Plugin {
        /// Plugin name.
        name: String,
        /// Cause reported by the plugin.
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors of a single network connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// No configured server could be connected to.
    #[error("could not connect to any server of network '{network}'")]
    Exhausted {
        /// Network name.
        network: String,
    },

    /// Socket I/O failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LinesCodecError> for ConnectionError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::Io(err) => Self::Io(err),
            LinesCodecError::MaxLineLengthExceeded => {
                Self::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            }
        }
    }
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors from installing the global subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("cannot open log file '{}': {source}", path.display())]
    Appender {
        /// Configured log file path.
        path: PathBuf,
        /// Cause reported by the appender.
        #[source]
        source: InitError,
    },

    /// A global subscriber is already installed.
    #[error(transparent)]
    Init(#[from] TryInitError),
}

/// Result type for logging setup.
pub type LoggingResult<T> = Result<T, LoggingError>;
