//! # Tern Core
//!
//! The core engine of the Tern IRC client framework.
//!
//! This crate provides the protocol codec, the priority event dispatcher and
//! the capability registry every plugin builds upon.
//!
//! ## Architecture Layers
//!
//! Tern Core is organized into three architectural layers:
//!
//! ### Foundation Layer
//!
//! Protocol data types:
//! - **Message Codec**: IRC lines with IRCv3 tags ([`Message`], [`Prefix`])
//! - **Numeric Replies**: Well-known server numerics ([`Reply`])
//! - **CTCP**: Commands nested in chat text ([`CtcpMessage`])
//! - **Events**: Namespaced event names and payloads ([`NetworkEvent`], [`GlobalEvent`])
//!
//! ### Framework Layer
//!
//! Event processing and routing:
//! - **Handler System**: Async handlers and their outcome ([`Handler`], [`Outcome`])
//! - **Dispatcher**: Priority tiers with consumption and fault isolation ([`Dispatcher`])
//! - **Network Surface**: Global, per-network and per-command dispatchers
//!
//! ### Integration Layer
//!
//! Objects plugins interact with:
//! - **Capability Registry**: Collision-checked runtime extension ([`Extensible`])
//! - **Settings**: Dot-path lookup with fallback ([`Configuration`], [`NetworkConfig`])
//! - **Network Context**: One connection and its outbound queue ([`NetworkContext`])
//! - **Plugins**: The loading contract ([`Plugin`])
//!
//! ## Event Flow
//!
//! ```text
//! ┌────────────┐  raw_line   ┌─────────────────┐  not eaten  ┌───────────────────┐
//! │ Connection │────────────▶│ Network events  │────────────▶│ Message dispatcher│
//! │   driver   │  message    │ (tiers by prio) │             │ (keyed by command)│
//! └────────────┘             └─────────────────┘             └───────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tern_core::prelude::*;
//!
//! let pong = handler_fn("pong", |(ctx, msg): MessageArgs| async move {
//!     ctx.send_cmd("PONG", msg.params.clone())
//! });
//! ctx.messages().register("PING", pong, Priority::CORE)?;
//! ```

// Architectural layers
pub mod error;
pub mod foundation;
pub mod framework;
pub mod integration;

// Re-export error types
pub use error::{
    CapabilityError, CapabilityResult, ContextError, ContextResult, DispatchError,
    DispatchResult, EncodeError, EncodeResult, KeyError, KeyResult, ValidationError,
    ValidationResult,
};

// Re-export foundation types
pub use foundation::{
    Command, CtcpMessage, EventNamespace, GlobalEvent, GlobalEventName, Message, NetworkEvent,
    NetworkEventName, NetworkEventValue, Prefix, Reply, TagValue, Tags, UnknownReply,
};

// Re-export framework types
pub use framework::{
    BoxFuture, BoxedHandler, Dispatcher, EventKey, GlobalEventDispatcher, Handler, HandlerFn,
    HandlerResult, IntoOutcome, MessageArgs, MessageEventDispatcher, NetworkArgs,
    NetworkEventDispatcher, Outcome, Priority, handler_fn,
};

// Re-export integration types
pub use integration::{
    BoxedPlugin, Capabilities, CapabilityValue, Channels, Configuration, Extensible, Method,
    NetworkConfig, NetworkContext, Outgoing, OutgoingReceiver, Plugin, Server, TernConfig,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{
        BoxedHandler, GlobalEventDispatcher, MessageArgs, NetworkArgs, Outcome, Priority,
        handler_fn,
    };
    pub use super::integration::{Extensible, NetworkContext, Plugin};
}
