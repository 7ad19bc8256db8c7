//! Configuration schema definitions.
//!
//! The settings file is a single tree. Network settings (`networks`, plus
//! root keys acting as per-network fallbacks) are validated into a
//! [`TernConfig`]; the `logging` section maps onto [`LoggingConfig`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tern_core::TernConfig;

use super::error::{ConfigError, ConfigResult};

/// Root configuration of a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Validated network settings.
    pub settings: TernConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Validates a settings tree.
    pub fn from_value(root: Value) -> ConfigResult<Self> {
        let logging = match root.get("logging") {
            None | Some(Value::Null) => LoggingConfig::default(),
            Some(section) => LoggingConfig::deserialize(section)
                .map_err(|err| ConfigError::logging(err.to_string()))?,
        };
        let settings = TernConfig::from_value(root)?;
        Ok(Self { settings, logging })
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Output destination.
    pub output: LogOutput,
    /// Log file, required for [`LogOutput::File`].
    pub file_path: Option<PathBuf>,
    /// Log file rotation.
    pub rotation: LogRotation,
    /// Span lifecycle events to log.
    pub span_events: SpanEventConfig,
    /// Include thread IDs.
    pub thread_ids: bool,
    /// Include source file and line.
    pub file_location: bool,
    /// Per-target levels, e.g. `tern_core: debug`.
    pub filters: BTreeMap<String, LogLevel>,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    #[default]
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl LogLevel {
    /// Returns the filter directive form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a tracing level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line output.
    #[default]
    Compact,
    /// Default tracing-subscriber output.
    Full,
    /// Multi-line human-oriented output.
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// The configured file.
    File,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// A single file.
    #[default]
    Never,
    /// One file per hour.
    Hourly,
    /// One file per day.
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpanEventConfig {
    /// Span creation.
    pub new: bool,
    /// Span entry.
    pub enter: bool,
    /// Span exit.
    pub exit: bool,
    /// Span close.
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logging_defaults() {
        let config = RuntimeConfig::from_value(json!({
            "nick": "tern",
            "user": "tern",
            "realname": "Tern",
            "networks": { "libera": { "servers": ["irc.libera.chat"] } },
        }))
        .unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert_eq!(config.settings.networks().len(), 1);
    }

    #[test]
    fn test_logging_section() {
        let logging: LoggingConfig = serde_json::from_value(json!({
            "level": "debug",
            "format": "pretty",
            "filters": { "tern_core": "trace" },
            "span_events": { "close": true },
        }))
        .unwrap();

        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Pretty);
        assert_eq!(logging.filters["tern_core"], LogLevel::Trace);
        assert!(logging.span_events.close && !logging.span_events.new);
    }

    #[test]
    fn test_bad_logging_section() {
        let err = RuntimeConfig::from_value(json!({
            "logging": { "level": "loud" },
            "networks": {},
        }))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Logging { .. }));
    }
}
