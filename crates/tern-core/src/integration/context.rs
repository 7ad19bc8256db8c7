//! Network context.
//!
//! One [`NetworkContext`] exists per configured network. It owns the
//! network's dispatchers and capability table and queues outbound lines for
//! the connection driver. Plugins receive it as the first argument of every
//! network and message handler.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use super::capability::{Capabilities, CapabilityValue, Extensible};
use super::config::NetworkConfig;
use crate::error::{ContextError, ContextResult};
use crate::foundation::message::{Command, Message, check_line_safe};
use crate::framework::network::{MessageEventDispatcher, NetworkEventDispatcher};

/// An item queued for the connection driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// A protocol line, without CRLF.
    Line(String),
    /// Close the connection, quitting with the optional reason.
    Close(Option<String>),
}

/// Receiving half of a context's outbound queue, owned by the driver.
pub type OutgoingReceiver = mpsc::UnboundedReceiver<Outgoing>;

/// Per-network connection context.
pub struct NetworkContext {
    name: String,
    config: NetworkConfig,
    events: NetworkEventDispatcher,
    messages: MessageEventDispatcher,
    capabilities: Capabilities,
    outbound: mpsc::UnboundedSender<Outgoing>,
}

impl NetworkContext {
    /// Creates the context of a configured network and its outbound queue.
    pub fn new(config: NetworkConfig) -> (Arc<Self>, OutgoingReceiver) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let context = Arc::new_cyclic(|weak| Self {
            name: config.name().to_owned(),
            config,
            events: NetworkEventDispatcher::new(weak.clone()),
            messages: MessageEventDispatcher::new(weak.clone()),
            capabilities: Capabilities::new(),
            outbound,
        });
        (context, receiver)
    }

    /// Returns the network name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the network settings.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Returns the network event dispatcher.
    pub fn events(&self) -> &NetworkEventDispatcher {
        &self.events
    }

    /// Returns the per-command message dispatcher.
    pub fn messages(&self) -> &MessageEventDispatcher {
        &self.messages
    }

    /// Queues a raw protocol line.
    ///
    /// Lines containing CR, LF or NUL are refused.
    pub fn send_line(&self, line: impl Into<String>) -> ContextResult<()> {
        let line = line.into();
        check_line_safe("line", &line)?;
        trace!(network = %self.name, %line, "Queueing line");
        self.push(Outgoing::Line(line))
    }

    /// Queues a message.
    pub fn send_message(&self, message: &Message) -> ContextResult<()> {
        self.send_line(message.to_line()?)
    }

    /// Queues a command with parameters.
    pub fn send_cmd<I, S>(&self, command: impl Into<Command>, params: I) -> ContextResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_message(&Message::new(command, params))
    }

    /// Sends a PRIVMSG.
    pub fn send_msg(&self, target: &str, text: &str) -> ContextResult<()> {
        self.send_cmd("PRIVMSG", [target, text])
    }

    /// Sends a NOTICE.
    pub fn send_notice(&self, target: &str, text: &str) -> ContextResult<()> {
        self.send_cmd("NOTICE", [target, text])
    }

    /// Asks the driver to quit and close the connection.
    pub fn request_close(&self, reason: Option<&str>) -> ContextResult<()> {
        self.push(Outgoing::Close(reason.map(str::to_owned)))
    }

    fn push(&self, item: Outgoing) -> ContextResult<()> {
        self.outbound
            .send(item)
            .map_err(|_| ContextError::ConnectionClosed {
                network: self.name.clone(),
            })
    }
}

impl Extensible for NetworkContext {
    const DECLARED: &'static [&'static str] = &[
        "name",
        "config",
        "events",
        "messages",
        "send_line",
        "send_message",
        "send_cmd",
        "send_msg",
        "send_notice",
        "request_close",
    ];

    fn identity(&self) -> String {
        format!("network '{}'", self.name)
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn declared_attribute(&self, name: &str) -> Option<CapabilityValue> {
        match name {
            "name" => Some(Arc::new(self.name.clone())),
            _ => None,
        }
    }
}

impl fmt::Debug for NetworkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkContext")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{CapabilityError, EncodeError};
    use serde_json::json;

    /// Builds a context with a minimal valid configuration.
    pub(crate) fn test_context(name: &str) -> (Arc<NetworkContext>, OutgoingReceiver) {
        let section = json!({
            "nick": "tern",
            "user": "tern",
            "realname": "Tern",
            "servers": ["irc.example.org"],
            "channels": { "tern": null },
        });
        let config = NetworkConfig::new(name, section, None).expect("valid test config");
        NetworkContext::new(config)
    }

    #[test]
    fn test_outbound_queue() {
        let (ctx, mut outbound) = test_context("libera");

        ctx.send_msg("#tern", "hello there").unwrap();
        ctx.send_cmd("PONG", ["irc.example.org"]).unwrap();
        ctx.request_close(Some("bye")).unwrap();

        assert_eq!(
            outbound.try_recv().unwrap(),
            Outgoing::Line("PRIVMSG #tern :hello there".into())
        );
        assert_eq!(
            outbound.try_recv().unwrap(),
            Outgoing::Line("PONG irc.example.org".into())
        );
        assert_eq!(
            outbound.try_recv().unwrap(),
            Outgoing::Close(Some("bye".into()))
        );
    }

    #[test]
    fn test_closed_queue() {
        let (ctx, outbound) = test_context("libera");
        drop(outbound);

        assert_eq!(
            ctx.send_line("PING x").unwrap_err(),
            ContextError::ConnectionClosed {
                network: "libera".into()
            }
        );
    }

    #[test]
    fn test_context_capabilities() {
        let (ctx, mut outbound) = test_context("libera");

        assert!(matches!(
            ctx.add_attribute("send_msg", 1),
            Err(CapabilityError::Conflict { .. })
        ));
        assert_eq!(*ctx.attribute::<String>("name").unwrap(), "libera");

        ctx.add_method("shout", |ctx: &NetworkContext, text: String| {
            ctx.send_msg("#tern", &text.to_uppercase())
        })
        .unwrap();
        let sent: ContextResult<()> = ctx.call_method("shout", "hi".to_owned()).unwrap();
        sent.unwrap();

        assert_eq!(
            outbound.try_recv().unwrap(),
            Outgoing::Line("PRIVMSG #tern HI".into())
        );
    }

    #[test]
    fn test_unencodable_lines_are_refused() {
        let (ctx, mut outbound) = test_context("libera");

        assert!(matches!(
            ctx.send_msg("#tern", "hi\r\nQUIT :gone"),
            Err(ContextError::Encode(EncodeError::ForbiddenCharacter { .. }))
        ));
        assert!(matches!(
            ctx.send_msg("#tern #other", "hi"),
            Err(ContextError::Encode(EncodeError::MiddleParam { index: 0, .. }))
        ));
        assert!(matches!(
            ctx.send_cmd("MODE", ["", "+o"]),
            Err(ContextError::Encode(EncodeError::MiddleParam { .. }))
        ));
        assert!(matches!(
            ctx.send_line("PING x\nQUIT"),
            Err(ContextError::Encode(_))
        ));
        assert!(outbound.try_recv().is_err());
    }
}
