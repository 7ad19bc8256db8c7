//! Configuration module for the Tern runtime.
//!
//! This module provides figment-based loading of the YAML settings tree,
//! the `logging` section schema and its validation. Network settings are
//! validated by [`tern_core::TernConfig`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RuntimeConfig, SpanEventConfig,
};
pub use validation::validate_logging;
