//! Logging configuration validation.
//!
//! Network settings are checked by [`tern_core::TernConfig`] while they are
//! built; this covers the cross-field rules of the `logging` section.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogFormat, LogOutput, LoggingConfig};

/// Validates the logging configuration.
pub fn validate_logging(config: &LoggingConfig) -> ConfigResult<()> {
    if config.output == LogOutput::File {
        match &config.file_path {
            None => return Err(ConfigError::logging("file output requires `file_path`")),
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::logging(format!(
                    "`file_path` has no file name: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    if config.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::logging(
            "json format requires the `json-log` feature",
        ));
    }

    if let Some(target) = config
        .filters
        .keys()
        .find(|target| target.trim().is_empty() || target.contains(['=', ',']))
    {
        return Err(ConfigError::logging(format!(
            "invalid filter target: {target:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_logging() {
        assert!(validate_logging(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_file_output() {
        let mut config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        assert!(matches!(
            validate_logging(&config),
            Err(ConfigError::Logging { .. })
        ));

        config.file_path = Some(PathBuf::from("logs/tern.log"));
        assert!(validate_logging(&config).is_ok());
    }

    #[test]
    fn test_validate_filter_targets() {
        let mut config = LoggingConfig::default();
        config.filters.insert("tern_core".into(), LogLevel::Debug);
        assert!(validate_logging(&config).is_ok());

        config.filters.insert("a=b".into(), LogLevel::Debug);
        assert!(validate_logging(&config).is_err());
    }
}
