//! Built-in protocol bookkeeping plugin.
//!
//! Keeps a connection alive and registered without any user plugin:
//!
//! | Trigger | Reaction |
//! |---------|----------|
//! | `connected` | `PASS` (if `password` is set), `NICK`, `USER` |
//! | `PING` | `PONG` with the same parameters |
//! | `001` (welcome) | `JOIN` every configured channel, with its `key` |
//! | `433` (nick in use) | retry with `_` appended |
//!
//! All handlers run at [`Priority::CORE`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tern_core::{
    BoxedHandler, GlobalEvent, GlobalEventDispatcher, GlobalEventName, MessageArgs, NetworkArgs,
    NetworkEventName, Plugin, Priority, Reply, handler_fn,
};

/// Protocol bookkeeping plugin.
pub struct CorePlugin {
    handlers: Arc<CoreHandlers>,
}

struct CoreHandlers {
    connected: BoxedHandler<NetworkArgs>,
    ping: BoxedHandler<MessageArgs>,
    welcome: BoxedHandler<MessageArgs>,
    nick_in_use: BoxedHandler<MessageArgs>,
}

impl CorePlugin {
    /// Creates the plugin.
    pub fn new() -> Self {
        let handlers = CoreHandlers {
            connected: handler_fn("core.register", |(ctx, _): NetworkArgs| async move {
                let config = ctx.config();
                if let Some(password) = config.settings().get_as::<String>("password")? {
                    ctx.send_cmd("PASS", [password])?;
                }
                ctx.send_cmd("NICK", [config.nick()])?;
                ctx.send_cmd("USER", [config.user(), "0", "*", config.realname()])?;
                Ok::<_, anyhow::Error>(())
            }),
            ping: handler_fn("core.pong", |(ctx, msg): MessageArgs| async move {
                ctx.send_cmd("PONG", msg.params.iter().map(String::as_str))
            }),
            welcome: handler_fn("core.join", |(ctx, msg): MessageArgs| async move {
                info!(network = ctx.name(), nick = ?msg.param(0), "Registered");
                for (channel, settings) in ctx.config().channels() {
                    match settings.get("key").and_then(|key| key.as_str()) {
                        Some(key) => ctx.send_cmd("JOIN", [channel.as_str(), key])?,
                        None => ctx.send_cmd("JOIN", [channel.as_str()])?,
                    }
                    debug!(network = ctx.name(), %channel, "Joining channel");
                }
                Ok::<_, anyhow::Error>(())
            }),
            nick_in_use: handler_fn("core.nick_in_use", |(ctx, msg): MessageArgs| async move {
                let attempted = msg.param(1).unwrap_or(ctx.config().nick());
                let next = format!("{attempted}_");
                warn!(network = ctx.name(), attempted, %next, "Nickname in use");
                ctx.send_cmd("NICK", [next])
            }),
        };
        Self {
            handlers: Arc::new(handlers),
        }
    }
}

impl Default for CorePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "core"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Connection registration and protocol bookkeeping"
    }

    async fn load(&self, global: &GlobalEventDispatcher) -> anyhow::Result<()> {
        let handlers = Arc::clone(&self.handlers);
        let init = handler_fn("core.init", move |event: GlobalEvent| {
            let handlers = Arc::clone(&handlers);
            async move {
                let GlobalEvent::InitNetworkContext(ctx) = event;
                ctx.events().register(
                    NetworkEventName::Connected,
                    Arc::clone(&handlers.connected),
                    Priority::CORE,
                )?;

                let messages = ctx.messages();
                messages.register("PING", Arc::clone(&handlers.ping), Priority::CORE)?;
                messages.register(
                    Reply::RPL_WELCOME,
                    Arc::clone(&handlers.welcome),
                    Priority::CORE,
                )?;
                messages.register(
                    Reply::ERR_NICKNAMEINUSE,
                    Arc::clone(&handlers.nick_in_use),
                    Priority::CORE,
                )?;
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
    use tern_core::{Message, NetworkEvent};

    #[tokio::test]
    async fn test_registration_on_connect() {
        let global = GlobalEventDispatcher::new();
        CorePlugin::new().load(&global).await.unwrap();

        let (ctx, mut outbound) = context();
        global
            .dispatch(GlobalEvent::InitNetworkContext(Arc::clone(&ctx)))
            .await;
        ctx.events().dispatch(NetworkEvent::connected()).await;

        assert_eq!(
            drain(&mut outbound),
            ["NICK tern", "USER tern_user 0 * :Tern Test"]
        );
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let global = GlobalEventDispatcher::new();
        CorePlugin::new().load(&global).await.unwrap();

        let (ctx, mut outbound) = context();
        global
            .dispatch(GlobalEvent::InitNetworkContext(Arc::clone(&ctx)))
            .await;
        ctx.messages()
            .dispatch(Arc::new(Message::parse("PING :irc.example.org")))
            .await;

        assert_eq!(drain(&mut outbound), ["PONG irc.example.org"]);
    }

    #[tokio::test]
    async fn test_join_and_nick_retry() {
        let global = GlobalEventDispatcher::new();
        CorePlugin::new().load(&global).await.unwrap();

        let (ctx, mut outbound) = context();
        global
            .dispatch(GlobalEvent::InitNetworkContext(Arc::clone(&ctx)))
            .await;

        ctx.messages()
            .dispatch(Arc::new(Message::parse(
                ":srv 433 * tern :Nickname is already in use",
            )))
            .await;
        ctx.messages()
            .dispatch(Arc::new(Message::parse(":srv 001 tern_ :Welcome")))
            .await;

        assert_eq!(
            drain(&mut outbound),
            ["NICK tern_", "JOIN #secret hunter2", "JOIN #tern"]
        );
    }
}
