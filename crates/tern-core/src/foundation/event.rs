//! Event taxonomy.
//!
//! Two disjoint namespaces exist:
//!
//! - [`GlobalEventName`]: process-wide events, not tied to a network.
//! - [`NetworkEventName`]: per-connection lifecycle and traffic events.
//!
//! A dispatcher is restricted to exactly one namespace. Typed names make the
//! restriction a compile-time property; textual names go through
//! [`EventNamespace::parse_name`] and are rejected when unknown.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::foundation::message::Message;
use crate::integration::context::NetworkContext;

/// An enumerated event namespace.
pub trait EventNamespace: FromStr + Copy + fmt::Display {
    /// Namespace label used in errors and logs.
    const NAMESPACE: &'static str;

    /// Parses a textual event name, failing for names outside the namespace.
    fn parse_name(name: &str) -> Result<Self, DispatchError> {
        name.parse().map_err(|_| DispatchError::UnknownEvent {
            namespace: Self::NAMESPACE,
            name: name.to_owned(),
        })
    }
}

macro_rules! event_names {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident in $namespace:literal {
            $($(#[$doc:meta])* $variant:ident => $text:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$doc])* $variant,)*
        }

        impl $name {
            /// All names in this namespace.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Returns the textual event name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)*
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl EventNamespace for $name {
            const NAMESPACE: &'static str = $namespace;
        }
    };
}

event_names! {
    /// Per-network events.
    pub enum NetworkEventName in "network" {
        /// The connection to a server was established.
        Connected => "connected",
        /// The connection was lost or closed.
        Disconnected => "disconnected",
        /// Closing the connection was requested.
        CloseRequest => "close_request",
        /// A raw line was received, before decoding.
        RawLine => "raw_line",
        /// A decoded message was received.
        Message => "message",
    }
}

event_names! {
    /// Process-wide events.
    pub enum GlobalEventName in "global" {
        /// A network context was created; plugins attach their handlers here.
        InitNetworkContext => "init_network_context",
    }
}

// =============================================================================
// Network Events
// =============================================================================

/// Payload of a network event.
#[derive(Debug, Clone)]
pub enum NetworkEventValue {
    /// No payload.
    None,
    /// The error that caused a disconnect.
    Error(Arc<anyhow::Error>),
    /// A raw, undecoded line.
    RawLine(Arc<str>),
    /// A decoded message.
    Message(Arc<Message>),
}

impl NetworkEventValue {
    /// Returns the decoded message, if this is one.
    pub fn as_message(&self) -> Option<&Arc<Message>> {
        match self {
            Self::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the raw line, if this is one.
    pub fn as_raw_line(&self) -> Option<&str> {
        match self {
            Self::RawLine(line) => Some(line),
            _ => None,
        }
    }

    /// Returns the error, if this is one.
    pub fn as_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Envelope carried by the per-network dispatcher: event name plus payload.
#[derive(Debug, Clone)]
pub struct NetworkEvent {
    /// The event name.
    pub name: NetworkEventName,
    /// The payload.
    pub value: NetworkEventValue,
}

impl NetworkEvent {
    /// Creates an event.
    pub fn new(name: NetworkEventName, value: NetworkEventValue) -> Self {
        Self { name, value }
    }

    /// `connected`, no payload.
    pub fn connected() -> Self {
        Self::new(NetworkEventName::Connected, NetworkEventValue::None)
    }

    /// `disconnected`, optionally carrying the cause.
    pub fn disconnected(error: Option<anyhow::Error>) -> Self {
        let value = match error {
            Some(err) => NetworkEventValue::Error(Arc::new(err)),
            None => NetworkEventValue::None,
        };
        Self::new(NetworkEventName::Disconnected, value)
    }

    /// `close_request`, no payload.
    pub fn close_request() -> Self {
        Self::new(NetworkEventName::CloseRequest, NetworkEventValue::None)
    }

    /// `raw_line` carrying the undecoded line.
    pub fn raw_line(line: impl Into<Arc<str>>) -> Self {
        Self::new(
            NetworkEventName::RawLine,
            NetworkEventValue::RawLine(line.into()),
        )
    }

    /// `message` carrying a decoded message.
    pub fn message(msg: Arc<Message>) -> Self {
        Self::new(NetworkEventName::Message, NetworkEventValue::Message(msg))
    }
}

// =============================================================================
// Global Events
// =============================================================================

/// A process-wide event with its payload.
#[derive(Debug, Clone)]
pub enum GlobalEvent {
    /// A network context was created.
    InitNetworkContext(Arc<NetworkContext>),
}

impl GlobalEvent {
    /// Returns the event name.
    pub fn name(&self) -> GlobalEventName {
        match self {
            Self::InitNetworkContext(_) => GlobalEventName::InitNetworkContext,
        }
    }

    /// Returns the network context, for network-scoped global events.
    pub fn network(&self) -> Option<&Arc<NetworkContext>> {
        match self {
            Self::InitNetworkContext(ctx) => Some(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for name in NetworkEventName::ALL {
            assert_eq!(NetworkEventName::parse_name(name.as_str()), Ok(*name));
        }
        assert_eq!(
            GlobalEventName::parse_name("init_network_context"),
            Ok(GlobalEventName::InitNetworkContext)
        );
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let err = NetworkEventName::parse_name("init_network_context").unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnknownEvent {
                namespace: "network",
                name: "init_network_context".into(),
            }
        );
        assert!(GlobalEventName::parse_name("message").is_err());
    }

    #[test]
    fn test_envelope_constructors() {
        let event = NetworkEvent::disconnected(Some(anyhow::anyhow!("reset by peer")));
        assert_eq!(event.name, NetworkEventName::Disconnected);
        assert_eq!(
            event.value.as_error().map(ToString::to_string).as_deref(),
            Some("reset by peer")
        );

        let event = NetworkEvent::raw_line("PING :x");
        assert_eq!(event.value.as_raw_line(), Some("PING :x"));
    }
}
