//! # Tern
//!
//! An async multi-network IRC client framework.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  raw_line / message  ┌──────────────────┐  by command  ┌──────────────────┐
//! │ Connection │─────────────────────▶│ network events   │─────────────▶│ message events   │
//! │ (per net)  │◀─── outbound queue ──│ (NetworkContext) │              │ PING, 001, ...   │
//! └────────────┘                      └──────────────────┘              └──────────────────┘
//!                                              ▲
//!                       init_network_context   │  plugins attach handlers
//!                    ┌─────────────────────────┴──┐      and capabilities
//!                    │ GlobalEventDispatcher      │
//!                    └────────────────────────────┘
//! ```
//!
//! - **Dispatchers**: priority tiers, concurrent handlers within a tier,
//!   [`Outcome::Eat`](tern_core::Outcome::Eat) stops lower tiers
//! - **Codec**: IRC messages with IRCv3 tags, and CTCP inside PRIVMSG/NOTICE
//! - **Capabilities**: plugins add named attributes and methods to a
//!   network context without collisions
//! - **Runtime**: configuration, logging and one connection per network
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tern::prelude::*;
//!
//! struct Greeter;
//!
//! #[async_trait::async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     async fn load(&self, global: &GlobalEventDispatcher) -> anyhow::Result<()> {
//!         let join = handler_fn("greeter.join", |(ctx, msg): MessageArgs| async move {
//!             if let (Some(nick), Some(channel)) = (msg.source(), msg.param(0)) {
//!                 ctx.send_msg(channel, &format!("hello {nick}"))?;
//!             }
//!             Ok::<_, anyhow::Error>(())
//!         });
//!         let init = handler_fn("greeter.init", move |event: GlobalEvent| {
//!             let join = join.clone();
//!             async move {
//!                 let GlobalEvent::InitNetworkContext(ctx) = event;
//!                 ctx.messages().register("JOIN", join, Priority::DEFAULT)
//!             }
//!         });
//!         global.register(GlobalEventName::InitNetworkContext, init, Priority::DEFAULT)?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     TernRuntime::builder().plugin(Greeter).build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `yaml-config` *(default)*: YAML configuration files
//! - `toml-config`: TOML configuration files
//! - `json-log`: JSON log output

pub use tern_core as core;
pub use tern_plugins as plugins;
pub use tern_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tern::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tern_runtime::{RuntimeBuilder, TernRuntime};

    // Dispatch, codec and context types
    pub use tern_core::prelude::*;
    pub use tern_core::Dispatcher;

    // Built-in plugins and their extensions
    pub use tern_plugins::{CorePlugin, CtcpArgs, CtcpExt, CtcpPlugin};
}
