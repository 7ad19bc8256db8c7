//! Built-in CTCP plugin.
//!
//! Decodes CTCP requests carried by PRIVMSG and re-dispatches them by CTCP
//! command on the plugin's own dispatcher. Every network context gains two
//! capabilities, reachable through [`CtcpExt`]:
//!
//! - `send_ctcp`: a request, sent as PRIVMSG;
//! - `send_ctcp_reply`: a reply, sent as NOTICE.
//!
//! `VERSION` and `PING` requests are answered out of the box. The VERSION
//! reply text is read from the `ctcp.version` setting.
//!
//! ```rust,ignore
//! let ctcp = CtcpPlugin::new();
//! ctcp.events().register("TIME".into(), handler_fn("time", |(ctx, req): CtcpArgs| async move {
//!     if let Some(nick) = req.source() {
//!         ctx.send_ctcp_reply(nick, "TIME", Some(&now()))?;
//!     }
//!     Ok::<_, CtcpError>(())
//! }), Priority::DEFAULT)?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use tern_core::foundation::ctcp;
use tern_core::{
    CapabilityError, ContextError, ContextResult, CtcpMessage, Dispatcher, Extensible,
    GlobalEvent, GlobalEventDispatcher, GlobalEventName, MessageArgs, NetworkContext, Outcome,
    Plugin, Priority, handler_fn,
};

const SEND_CTCP: &str = "send_ctcp";
const SEND_CTCP_REPLY: &str = "send_ctcp_reply";

/// Arguments of CTCP handlers.
pub type CtcpArgs = (Arc<NetworkContext>, Arc<CtcpMessage>);

// =============================================================================
// Errors
// =============================================================================

/// Errors from sending CTCP messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CtcpError {
    /// The CTCP capabilities are not installed on the context.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The connection is closed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Result type for CTCP operations.
pub type CtcpResult<T> = Result<T, CtcpError>;

// =============================================================================
// Capabilities
// =============================================================================

/// An outbound CTCP message, as passed to the installed capabilities.
#[derive(Debug, Clone)]
struct CtcpOut {
    target: String,
    command: String,
    text: Option<String>,
}

impl CtcpOut {
    fn new(target: &str, command: &str, text: Option<&str>) -> Self {
        Self {
            target: target.to_owned(),
            command: command.to_owned(),
            text: text.map(str::to_owned),
        }
    }

    fn wrapped(&self) -> String {
        ctcp::wrap(&self.command, self.text.as_deref())
    }
}

/// Typed access to the CTCP capabilities of a network context.
pub trait CtcpExt {
    /// Sends a CTCP request to `target`.
    fn send_ctcp(&self, target: &str, command: &str, text: Option<&str>) -> CtcpResult<()>;

    /// Sends a CTCP reply to `target`.
    fn send_ctcp_reply(&self, target: &str, command: &str, text: Option<&str>) -> CtcpResult<()>;
}

impl CtcpExt for NetworkContext {
    fn send_ctcp(&self, target: &str, command: &str, text: Option<&str>) -> CtcpResult<()> {
        let sent: ContextResult<()> =
            self.call_method(SEND_CTCP, CtcpOut::new(target, command, text))?;
        Ok(sent?)
    }

    fn send_ctcp_reply(&self, target: &str, command: &str, text: Option<&str>) -> CtcpResult<()> {
        let sent: ContextResult<()> =
            self.call_method(SEND_CTCP_REPLY, CtcpOut::new(target, command, text))?;
        Ok(sent?)
    }
}

fn install_capabilities(ctx: &NetworkContext) -> Result<(), CapabilityError> {
    ctx.add_method(SEND_CTCP, |ctx: &NetworkContext, out: CtcpOut| {
        ctx.send_msg(&out.target, &out.wrapped())
    })?;
    ctx.add_method(SEND_CTCP_REPLY, |ctx: &NetworkContext, out: CtcpOut| {
        ctx.send_notice(&out.target, &out.wrapped())
    })
}

// =============================================================================
// Plugin
// =============================================================================

/// CTCP decoding plugin.
pub struct CtcpPlugin {
    events: Arc<Dispatcher<String, CtcpArgs>>,
}

impl CtcpPlugin {
    /// Creates the plugin with the VERSION and PING responders registered.
    pub fn new() -> Self {
        let events = Dispatcher::new("ctcp");

        let version = handler_fn("ctcp.version", |(ctx, request): CtcpArgs| async move {
            let Some(source) = request.source() else {
                return Ok(());
            };
            let text = ctx
                .config()
                .settings()
                .get_as::<String>("ctcp.version")
                .ok()
                .flatten()
                .unwrap_or_else(|| format!("tern v{}", env!("CARGO_PKG_VERSION")));
            ctx.send_ctcp_reply(source, "VERSION", Some(&text))
        });
        let ping = handler_fn("ctcp.ping", |(ctx, request): CtcpArgs| async move {
            let Some(source) = request.source() else {
                return Ok(());
            };
            ctx.send_ctcp_reply(source, "PING", Some(&request.params.join(" ")))
        });

        for (command, handler) in [("VERSION", version), ("PING", ping)] {
            if let Err(err) = events.register(command.to_owned(), handler, Priority::DEFAULT) {
                error!(command, error = %err, "Failed to register CTCP responder");
            }
        }

        Self {
            events: Arc::new(events),
        }
    }

    /// Returns the CTCP dispatcher, keyed by upper-cased CTCP command.
    pub fn events(&self) -> &Dispatcher<String, CtcpArgs> {
        &self.events
    }
}

impl Default for CtcpPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for CtcpPlugin {
    fn name(&self) -> &str {
        "ctcp"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "CTCP message processing"
    }

    async fn load(&self, global: &GlobalEventDispatcher) -> anyhow::Result<()> {
        let events = Arc::clone(&self.events);
        let privmsg = handler_fn("ctcp.privmsg", move |(ctx, msg): MessageArgs| {
            let events = Arc::clone(&events);
            async move {
                let Some(request) = CtcpMessage::from_message(&msg) else {
                    return Outcome::Continue;
                };
                debug!(
                    network = ctx.name(),
                    command = %request.command,
                    source = ?request.source(),
                    "CTCP request"
                );
                let command = request.command.clone();
                events.dispatch(&command, (ctx, Arc::new(request))).await
            }
        });

        let init = handler_fn("ctcp.init", move |event: GlobalEvent| {
            let privmsg = Arc::clone(&privmsg);
            async move {
                let GlobalEvent::InitNetworkContext(ctx) = event;
                install_capabilities(&ctx)?;
                ctx.messages().register("PRIVMSG", privmsg, Priority::CORE)?;
                Ok::<_, anyhow::Error>(())
            }
        });

        global.register(GlobalEventName::InitNetworkContext, init, Priority::CORE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, drain};
    use tern_core::Message;

    async fn loaded() -> (CtcpPlugin, Arc<NetworkContext>, tern_core::OutgoingReceiver) {
        let plugin = CtcpPlugin::new();
        let global = GlobalEventDispatcher::new();
        plugin.load(&global).await.unwrap();

        let (ctx, outbound) = context();
        global
            .dispatch(GlobalEvent::InitNetworkContext(Arc::clone(&ctx)))
            .await;
        (plugin, ctx, outbound)
    }

    #[test]
    fn test_builtin_responders_registered() {
        let plugin = CtcpPlugin::new();

        for command in ["VERSION", "PING"] {
            assert_eq!(plugin.events().handler_count(&command.to_owned()), 1);
            assert_eq!(plugin.events().priorities(&command.to_owned()), [Priority::DEFAULT]);
        }
    }

    #[tokio::test]
    async fn test_version_reply() {
        let (_plugin, ctx, mut outbound) = loaded().await;

        let outcome = ctx
            .messages()
            .dispatch(Arc::new(Message::parse(
                ":alice!a@example.org PRIVMSG tern :\x01VERSION\x01",
            )))
            .await;

        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(
            drain(&mut outbound),
            [format!(
                "NOTICE alice :\x01VERSION tern v{}\x01",
                env!("CARGO_PKG_VERSION")
            )]
        );
    }

    #[tokio::test]
    async fn test_plain_privmsg_is_ignored() {
        let (_plugin, ctx, mut outbound) = loaded().await;

        ctx.messages()
            .dispatch(Arc::new(Message::parse(":alice!a@h PRIVMSG #tern :hello")))
            .await;

        assert!(drain(&mut outbound).is_empty());
    }

    #[tokio::test]
    async fn test_custom_ctcp_handler_can_eat() {
        let (plugin, ctx, mut outbound) = loaded().await;

        let time = handler_fn("time", |(ctx, request): CtcpArgs| async move {
            if let Some(nick) = request.source() {
                ctx.send_ctcp_reply(nick, "TIME", Some("noon"))?;
            }
            Ok::<_, CtcpError>(Outcome::Eat)
        });
        plugin
            .events()
            .register("TIME".to_owned(), time, Priority::DEFAULT)
            .unwrap();

        let outcome = ctx
            .messages()
            .dispatch(Arc::new(Message::parse(":bob!b@h PRIVMSG tern :\x01time\x01")))
            .await;

        assert_eq!(outcome, Outcome::Eat);
        assert_eq!(drain(&mut outbound), ["NOTICE bob :\x01TIME noon\x01"]);
    }

    #[tokio::test]
    async fn test_send_ctcp_capabilities() {
        let (_plugin, ctx, mut outbound) = loaded().await;

        ctx.send_ctcp("#tern", "ACTION", Some("waves")).unwrap();
        ctx.send_ctcp_reply("bob", "PING", None).unwrap();

        assert_eq!(
            drain(&mut outbound),
            ["PRIVMSG #tern :\x01ACTION waves\x01", "NOTICE bob \x01PING\x01"]
        );
    }

    #[test]
    fn test_missing_capability() {
        let (ctx, _outbound) = context();

        assert!(matches!(
            ctx.send_ctcp("#tern", "VERSION", None),
            Err(CtcpError::Capability(CapabilityError::NotFound { .. }))
        ));
    }
}
