//! Settings model.
//!
//! Settings are a tree of JSON-like values addressed by dot-separated keys
//! (`logging.level` is `root["logging"]["level"]`). Every network sees its
//! own section first and falls back to the root for keys it does not set.
//!
//! ```yaml
//! nick: tern
//! user: tern
//! realname: Tern IRC client
//! networks:
//!   libera:
//!     servers: ["irc.libera.chat:+6697", "irc.eu.libera.chat"]
//!     channels:
//!       tern:
//!       private: { key: hunter2 }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KeyError, KeyResult, ValidationError, ValidationResult};

// =============================================================================
// Configuration
// =============================================================================

/// A settings tree with dot-path lookup and optional fallbacks.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    root: Value,
    fallbacks: Vec<Arc<Configuration>>,
}

impl Configuration {
    /// Wraps a settings tree.
    pub fn new(root: Value) -> Self {
        Self {
            root,
            fallbacks: Vec::new(),
        }
    }

    /// Adds a configuration consulted when a key is not found here.
    pub fn with_fallback(mut self, fallback: Arc<Configuration>) -> Self {
        self.fallbacks.push(fallback);
        self
    }

    /// Returns the underlying tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Looks up a dot-separated key, consulting fallbacks in order when it
    /// is not found.
    ///
    /// Only [`KeyError::NotFound`] triggers the fallback; malformed paths
    /// fail immediately.
    pub fn get(&self, key: &str) -> KeyResult<&Value> {
        match lookup(&self.root, key) {
            Err(err) if err.is_not_found() => {}
            other => return other,
        }

        for fallback in &self.fallbacks {
            match fallback.get(key) {
                Err(err) if err.is_not_found() => {}
                other => return other,
            }
        }

        Err(KeyError::NotFound { key: key.to_owned() })
    }

    /// Like [`get`](Self::get), mapping absence to `None`.
    pub fn get_opt(&self, key: &str) -> KeyResult<Option<&Value>> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Looks up a key and deserializes it. Absent keys yield `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> ValidationResult<Option<T>> {
        self.get_opt(key)?
            .map(|value| {
                T::deserialize(value).map_err(|_| ValidationError::InvalidValue {
                    key: key.to_owned(),
                    expected: std::any::type_name::<T>(),
                })
            })
            .transpose()
    }

    /// Returns `true` if `key` resolves to a value, here or in a fallback.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }
}

fn lookup<'a>(root: &'a Value, key: &str) -> KeyResult<&'a Value> {
    let mut node = root;
    let mut path = String::new();

    for leaf in key.split('.') {
        let Value::Object(map) = node else {
            return Err(KeyError::NotAMapping { path });
        };
        if leaf.is_empty() {
            return Err(KeyError::EmptyKey { path });
        }
        node = map
            .get(leaf)
            .ok_or_else(|| KeyError::NotFound { key: key.to_owned() })?;

        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(leaf);
    }

    Ok(node)
}

// =============================================================================
// Server
// =============================================================================

/// Address of one IRC server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Server {
    /// Hostname or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Whether the server expects TLS.
    pub ssl: bool,
}

impl Server {
    /// Default plaintext port.
    pub const DEFAULT_PORT: u16 = 6667;
    /// Default TLS port.
    pub const DEFAULT_TLS_PORT: u16 = 6697;

    /// Creates a server, picking the default port for `ssl` if none is given.
    pub fn new(host: impl Into<String>, port: Option<u16>, ssl: bool) -> Self {
        let port = port.unwrap_or(if ssl {
            Self::DEFAULT_TLS_PORT
        } else {
            Self::DEFAULT_PORT
        });
        Self {
            host: host.into(),
            port,
            ssl,
        }
    }
}

/// Parses `host`, `host:port`, `host:+port` or `host:+` (`+` marks TLS).
impl FromStr for Server {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidServer {
            value: s.to_owned(),
            reason: reason.to_owned(),
        };

        let (host, port) = s.split_once(':').unwrap_or((s, ""));
        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let (ssl, port) = match port.rsplit_once('+') {
            Some((_, port)) => (true, port),
            None => (false, port),
        };
        let port = match port {
            "" => None,
            port => Some(port.parse().map_err(|_| invalid("port is not a number"))?),
        };

        Ok(Self::new(host, port, ssl))
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ssl = if self.ssl { "+" } else { "" };
        write!(f, "{}:{ssl}{}", self.host, self.port)
    }
}

/// Server entries accept both the string and the mapping form.
#[derive(Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Text(String),
    Fields {
        host: String,
        port: Option<u16>,
        #[serde(default)]
        ssl: bool,
    },
}

impl<'de> Deserialize<'de> for Server {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ServerEntry::deserialize(deserializer)? {
            ServerEntry::Text(text) => text.parse().map_err(serde::de::Error::custom),
            ServerEntry::Fields { host, port, ssl } => Ok(Self::new(host, port, ssl)),
        }
    }
}

// =============================================================================
// Network Configuration
// =============================================================================

/// Channel name to per-channel settings.
pub type Channels = BTreeMap<String, Map<String, Value>>;

const REQUIRED_KEYS: [&str; 3] = ["nick", "user", "realname"];
const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// Validated settings of one network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    name: String,
    settings: Configuration,
    servers: Vec<Server>,
    channels: Channels,
}

impl NetworkConfig {
    /// Validates the section of network `name`.
    ///
    /// `nick`, `user` and `realname` must be strings, found in the section
    /// or in a fallback. At least one server is required.
    pub fn new(
        name: impl Into<String>,
        section: Value,
        fallback: Option<Arc<Configuration>>,
    ) -> ValidationResult<Self> {
        let name = name.into();
        let section = match section {
            Value::Object(map) => Value::Object(map),
            Value::Null => Value::Object(Map::new()),
            _ => {
                return Err(ValidationError::InvalidValue {
                    key: format!("networks.{name}"),
                    expected: "a mapping",
                });
            }
        };

        let mut settings = Configuration::new(section);
        if let Some(fallback) = fallback {
            settings = settings.with_fallback(fallback);
        }

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !settings.contains(key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingKeys {
                network: name,
                keys: missing,
            });
        }
        for key in REQUIRED_KEYS {
            if !settings.get(key)?.is_string() {
                return Err(ValidationError::InvalidValue {
                    key: key.to_owned(),
                    expected: "a string",
                });
            }
        }

        let channels = parse_channels(&settings)?;
        let servers = parse_servers(&name, &settings)?;

        Ok(Self {
            name,
            settings,
            servers,
            channels,
        })
    }

    /// Returns the network name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the servers, in connection order.
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Returns the channels to join, with normalized names.
    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    /// Returns the nickname.
    pub fn nick(&self) -> &str {
        self.required_str("nick")
    }

    /// Returns the username.
    pub fn user(&self) -> &str {
        self.required_str("user")
    }

    /// Returns the real name.
    pub fn realname(&self) -> &str {
        self.required_str("realname")
    }

    /// Returns the settings, falling back to the root.
    pub fn settings(&self) -> &Configuration {
        &self.settings
    }

    fn required_str(&self, key: &str) -> &str {
        // Presence and type were checked on construction.
        self.settings
            .get(key)
            .ok()
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Channel sections come from the network section only, never the root.
fn parse_channels(settings: &Configuration) -> ValidationResult<Channels> {
    let raw = match settings.root().get("channels") {
        None | Some(Value::Null) => return Ok(Channels::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ValidationError::InvalidValue {
                key: "channels".into(),
                expected: "a mapping",
            });
        }
    };

    let mut channels = Channels::new();
    for (channel, conf) in raw {
        let conf = match conf {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => {
                return Err(ValidationError::InvalidValue {
                    key: format!("channels.{channel}"),
                    expected: "a mapping",
                });
            }
        };
        channels.insert(normalize_channel(channel), conf);
    }
    Ok(channels)
}

fn parse_servers(network: &str, settings: &Configuration) -> ValidationResult<Vec<Server>> {
    let entries = match settings.root().get("servers") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries.clone(),
        Some(single) => vec![single.clone()],
    };

    let servers = entries
        .iter()
        .map(|entry| match entry {
            Value::String(text) => text.parse(),
            fields => Server::deserialize(fields).map_err(|err| ValidationError::InvalidServer {
                value: fields.to_string(),
                reason: err.to_string(),
            }),
        })
        .collect::<ValidationResult<Vec<_>>>()?;

    if servers.is_empty() {
        return Err(ValidationError::NoServers {
            network: network.to_owned(),
        });
    }
    Ok(servers)
}

/// Prepends `#` to channel names without a channel-type prefix.
pub fn normalize_channel(name: &str) -> String {
    if name.starts_with(CHANNEL_PREFIXES) {
        name.to_owned()
    } else {
        format!("#{name}")
    }
}

// =============================================================================
// Root Configuration
// =============================================================================

/// Validated settings of the whole process.
#[derive(Debug, Clone)]
pub struct TernConfig {
    root: Arc<Configuration>,
    networks: Vec<NetworkConfig>,
}

impl TernConfig {
    /// Validates a settings tree: every entry of `networks` becomes a
    /// [`NetworkConfig`] falling back to the root.
    pub fn from_value(root: Value) -> ValidationResult<Self> {
        let root = Arc::new(Configuration::new(root));
        let sections = match root.get_opt("networks")? {
            None | Some(Value::Null) => return Err(ValidationError::NoNetworks),
            Some(Value::Object(sections)) => sections.clone(),
            Some(_) => {
                return Err(ValidationError::InvalidValue {
                    key: "networks".into(),
                    expected: "a mapping",
                });
            }
        };

        let networks = sections
            .into_iter()
            .map(|(name, section)| NetworkConfig::new(name, section, Some(Arc::clone(&root))))
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(Self { root, networks })
    }

    /// Returns the root settings.
    pub fn root(&self) -> &Arc<Configuration> {
        &self.root
    }

    /// Returns the networks, ordered by name.
    pub fn networks(&self) -> &[NetworkConfig] {
        &self.networks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dot_path_lookup() {
        let config = Configuration::new(json!({
            "logging": { "level": "debug" },
            "nick": "tern",
        }));

        assert_eq!(*config.get("logging.level").unwrap(), "debug");
        assert_eq!(
            config.get("logging.file").unwrap_err(),
            KeyError::NotFound {
                key: "logging.file".into()
            }
        );
        assert_eq!(
            config.get("nick.first").unwrap_err(),
            KeyError::NotAMapping { path: "nick".into() }
        );
        assert_eq!(
            config.get("logging..level").unwrap_err(),
            KeyError::EmptyKey {
                path: "logging".into()
            }
        );
        assert_eq!(config.get_opt("missing").unwrap(), None);
        assert!(config.contains("logging"));
    }

    #[test]
    fn test_fallback_chain() {
        let root = Arc::new(Configuration::new(json!({ "nick": "global", "a": { "b": 1 } })));
        let middle = Arc::new(Configuration::new(json!({ "user": "middle" })).with_fallback(root));
        let config = Configuration::new(json!({ "nick": "local" })).with_fallback(middle);

        assert_eq!(*config.get("nick").unwrap(), "local");
        assert_eq!(*config.get("user").unwrap(), "middle");
        assert_eq!(*config.get("a.b").unwrap(), 1);
        assert!(config.get("a.c").unwrap_err().is_not_found());
        assert_eq!(config.get_as::<u32>("a.b").unwrap(), Some(1));
    }

    #[test]
    fn test_malformed_key_does_not_fall_back() {
        let root = Arc::new(Configuration::new(json!({ "nick": { "first": "x" } })));
        let config = Configuration::new(json!({ "nick": "local" })).with_fallback(root);

        assert!(matches!(
            config.get("nick.first"),
            Err(KeyError::NotAMapping { .. })
        ));
    }

    #[test]
    fn test_server_strings() {
        let server: Server = "irc.example.org".parse().unwrap();
        assert_eq!(server, Server::new("irc.example.org", Some(6667), false));

        let server: Server = "irc.example.org:+".parse().unwrap();
        assert_eq!((server.port, server.ssl), (6697, true));

        let server: Server = "irc.example.org:+7000".parse().unwrap();
        assert_eq!((server.port, server.ssl), (7000, true));
        assert_eq!(server.to_string(), "irc.example.org:+7000");

        let server: Server = "irc.example.org:6668".parse().unwrap();
        assert_eq!(server.to_string(), "irc.example.org:6668");

        assert!("irc.example.org:abc".parse::<Server>().is_err());
        assert!(":6667".parse::<Server>().is_err());
    }

    #[test]
    fn test_network_config() {
        let root = Arc::new(Configuration::new(json!({
            "nick": "tern",
            "user": "tern",
            "realname": "Tern",
        })));
        let network = NetworkConfig::new(
            "libera",
            json!({
                "nick": "tern_l",
                "servers": [
                    "irc.libera.chat:+",
                    { "host": "irc.eu.libera.chat", "port": 6665 },
                ],
                "channels": {
                    "tern": null,
                    "&local": { "key": "secret" },
                },
            }),
            Some(root),
        )
        .unwrap();

        assert_eq!(network.name(), "libera");
        assert_eq!(network.nick(), "tern_l");
        assert_eq!(network.user(), "tern");
        assert_eq!(
            network.servers(),
            [
                Server::new("irc.libera.chat", Some(6697), true),
                Server::new("irc.eu.libera.chat", Some(6665), false),
            ]
        );

        let channels: Vec<_> = network.channels().keys().map(String::as_str).collect();
        assert_eq!(channels, ["#tern", "&local"]);
        assert!(network.channels()["#tern"].is_empty());
        assert_eq!(network.channels()["&local"]["key"], "secret");
    }

    #[test]
    fn test_network_validation() {
        let err = NetworkConfig::new("n", json!({ "nick": "x", "servers": ["h"] }), None)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingKeys {
                network: "n".into(),
                keys: vec!["user".into(), "realname".into()],
            }
        );

        let section = json!({ "nick": "x", "user": "x", "realname": "x" });
        let err = NetworkConfig::new("n", section, None).unwrap_err();
        assert_eq!(err, ValidationError::NoServers { network: "n".into() });

        let section = json!({ "nick": "x", "user": "x", "realname": "x", "servers": ["h:nope"] });
        let err = NetworkConfig::new("n", section, None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidServer { value, .. } if value == "h:nope"));
    }

    #[test]
    fn test_root_config() {
        assert_eq!(
            TernConfig::from_value(json!({ "nick": "x" })).unwrap_err(),
            ValidationError::NoNetworks
        );

        let config = TernConfig::from_value(json!({
            "nick": "x",
            "user": "x",
            "realname": "x",
            "networks": {
                "b": { "servers": "irc.b.net" },
                "a": { "servers": ["irc.a.net"] },
            },
        }))
        .unwrap();

        let names: Vec<_> = config.networks().iter().map(NetworkConfig::name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(config.networks()[1].servers()[0].host, "irc.b.net");
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("rust"), "#rust");
        assert_eq!(normalize_channel("#rust"), "#rust");
        assert_eq!(normalize_channel("!abcderust"), "!abcderust");
        assert_eq!(normalize_channel("+modeless"), "+modeless");
    }
}
