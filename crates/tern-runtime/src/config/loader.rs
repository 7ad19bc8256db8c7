//! Configuration loader using figment.
//!
//! Settings are one tree, merged from several sources:
//!
//! 1. Programmatic defaults ([`ConfigLoader::merge`])
//! 2. Profile-specific file (`tern.{profile}.yaml`)
//! 3. Main file (`tern.yaml`, `tern.yml`, `config.yaml`)
//! 4. Environment variables (`TERN_*`)
//!
//! Later sources override earlier ones, key by key.
//!
//! # Feature Flags
//!
//! - `yaml-config` *(default)*: YAML files (`tern.yaml`, `tern.yml`, ...)
//! - `toml-config`: TOML files (`tern.toml`, `config.toml`)
//!
//! # Environment Variable Mapping
//!
//! Variables use the `TERN_` prefix with `__` as the nesting separator:
//!
//! - `TERN_NICK=tern` → `nick = "tern"`
//! - `TERN_NETWORKS__LIBERA__PASSWORD=hunter2` → `networks.libera.password`
//! - `TERN_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! `TERN_PROFILE` selects the profile and is not merged into the tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use tern_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./tern.yaml")
//!     .without_env()
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::RuntimeConfig;
use super::validation::validate_logging;

const ENV_PREFIX: &str = "TERN_";
const PROFILE_VAR: &str = "TERN_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Custom(name.to_owned()),
        }
    }

    /// Reads `TERN_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-source configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with the profile from the environment.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds the user config directory (`~/.config/tern` on Linux).
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("tern")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables `TERN_*` environment variables (default).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a settings tree below files and environment.
    ///
    /// ```rust,ignore
    /// let config = ConfigLoader::new()
    ///     .merge(json!({ "nick": "tern", "user": "tern", "realname": "Tern" }))
    ///     .load()?;
    /// ```
    pub fn merge(mut self, defaults: Value) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(defaults));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<RuntimeConfig> {
        let profile = self.profile.clone();
        let root = self.load_value()?;
        let config = RuntimeConfig::from_value(root)?;
        validate_logging(&config.logging)?;

        debug!(
            %profile,
            networks = config.settings.networks().len(),
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads the merged settings tree without validating it.
    pub fn load_value(self) -> ConfigResult<Value> {
        let figment = self.build_figment()?;
        let root: Value = figment.extract()?;
        Ok(match root {
            Value::Null => Value::Object(Default::default()),
            other => other,
        })
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = std::mem::take(&mut self.figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment)
    }

    /// Merges one file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_owned())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tern"));
        }
        paths
    }

    /// Searches `search_paths × base_names`, merging the profile variant
    /// before the base file. Stops at the first base file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path = search_path.join(format!("{stem}.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        #[allow(unused_variables)]
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "yaml-config")]
        {
            let (merged, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tern.yaml", "tern.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = merged;
            found |= ok;
        }

        #[cfg(feature = "toml-config")]
        {
            let (merged, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tern.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = merged;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found");
        }
        figment
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<RuntimeConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<RuntimeConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> Value {
        json!({
            "nick": "tern",
            "user": "tern",
            "realname": "Tern",
            "networks": {
                "libera": { "servers": ["irc.libera.chat:+6697", "irc.libera.chat"] },
            },
        })
    }

    fn empty_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tern-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_merged_defaults() {
        let config = ConfigLoader::new()
            .search_path(empty_dir("defaults"))
            .without_env()
            .merge(defaults())
            .load()
            .unwrap();

        let libera = &config.settings.networks()[0];
        assert_eq!(libera.name(), "libera");
        assert_eq!(libera.nick(), "tern");
        assert_eq!(libera.servers().len(), 2);
        assert_eq!(config.logging.level.as_str(), "info");
    }

    #[test]
    fn test_missing_networks() {
        let err = ConfigLoader::new()
            .search_path(empty_dir("empty"))
            .without_env()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/tern.yaml")
            .without_env()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = empty_dir("format");
        let path = dir.join("tern.ini");
        std::fs::write(&path, "nick = tern").unwrap();

        let err = ConfigLoader::new()
            .file(&path)
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_file_overrides_defaults() {
        let dir = empty_dir("yaml");
        std::fs::write(
            dir.join("tern.yaml"),
            "nick: yamlbot\nlogging:\n  level: debug\nnetworks:\n  oftc:\n    servers: [irc.oftc.net]\n    channels:\n      tern: ~\n",
        )
        .unwrap();
        std::fs::write(dir.join("tern.production.yaml"), "realname: Production Tern\n").unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .profile("prod")
            .without_env()
            .merge(defaults())
            .load()
            .unwrap();

        let names: Vec<_> = config.settings.networks().iter().map(|n| n.name()).collect();
        assert_eq!(names, ["libera", "oftc"]);

        let oftc = &config.settings.networks()[1];
        assert_eq!(oftc.nick(), "yamlbot");
        assert_eq!(oftc.realname(), "Production Tern");
        assert!(oftc.channels().contains_key("#tern"));
        assert_eq!(config.logging.level.as_str(), "debug");
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
