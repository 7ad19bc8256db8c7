//! Namespaced dispatchers of the network event surface.
//!
//! - [`GlobalEventDispatcher`]: process-wide events, one shared instance.
//! - [`NetworkEventDispatcher`]: lifecycle and traffic events of one network;
//!   handlers receive the owning [`NetworkContext`] first.
//! - [`MessageEventDispatcher`]: decoded messages of one network, keyed by
//!   command.

use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use tracing::trace;

use super::dispatcher::Dispatcher;
use super::handler::{BoxedHandler, Outcome};
use super::priority::Priority;
use crate::error::DispatchResult;
use crate::foundation::event::{
    EventNamespace, GlobalEvent, GlobalEventName, NetworkEvent, NetworkEventName,
    NetworkEventValue,
};
use crate::foundation::message::{Command, Message};
use crate::integration::context::NetworkContext;

/// Arguments of network event handlers.
pub type NetworkArgs = (Arc<NetworkContext>, NetworkEventValue);

/// Arguments of message handlers.
pub type MessageArgs = (Arc<NetworkContext>, Arc<Message>);

// =============================================================================
// Global Events
// =============================================================================

static GLOBAL: LazyLock<GlobalEventDispatcher> = LazyLock::new(GlobalEventDispatcher::new);

/// Dispatcher restricted to [`GlobalEventName`]s.
pub struct GlobalEventDispatcher {
    inner: Dispatcher<GlobalEventName, GlobalEvent>,
}

impl GlobalEventDispatcher {
    /// Creates a standalone dispatcher, for tests and embedding.
    pub fn new() -> Self {
        Self {
            inner: Dispatcher::new("global"),
        }
    }

    /// Returns the process-wide dispatcher.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Registers a handler for a global event.
    pub fn register(
        &self,
        event: GlobalEventName,
        handler: BoxedHandler<GlobalEvent>,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.inner.register(event, handler, priority)
    }

    /// Registers a handler by textual event name.
    pub fn register_named(
        &self,
        event: &str,
        handler: BoxedHandler<GlobalEvent>,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.register(GlobalEventName::parse_name(event)?, handler, priority)
    }

    /// Unregisters a handler.
    pub fn unregister(
        &self,
        event: GlobalEventName,
        handler: &BoxedHandler<GlobalEvent>,
    ) -> DispatchResult<()> {
        self.inner.unregister(&event, handler)
    }

    /// Returns `true` if `handler` is registered for `event`.
    pub fn contains(&self, event: GlobalEventName, handler: &BoxedHandler<GlobalEvent>) -> bool {
        self.inner.contains(&event, handler)
    }

    /// Dispatches a global event.
    pub async fn dispatch(&self, event: GlobalEvent) -> Outcome {
        let name = event.name();
        self.inner.dispatch(&name, event).await
    }
}

impl Default for GlobalEventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GlobalEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

// =============================================================================
// Network Events
// =============================================================================

/// Dispatcher restricted to [`NetworkEventName`]s of one network.
pub struct NetworkEventDispatcher {
    context: Weak<NetworkContext>,
    inner: Dispatcher<NetworkEventName, NetworkArgs>,
}

impl NetworkEventDispatcher {
    /// Creates a dispatcher injecting `context` into every dispatch.
    pub fn new(context: Weak<NetworkContext>) -> Self {
        Self {
            context,
            inner: Dispatcher::new("network"),
        }
    }

    /// Registers a handler for a network event.
    pub fn register(
        &self,
        event: NetworkEventName,
        handler: BoxedHandler<NetworkArgs>,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.inner.register(event, handler, priority)
    }

    /// Registers a handler by textual event name.
    pub fn register_named(
        &self,
        event: &str,
        handler: BoxedHandler<NetworkArgs>,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.register(NetworkEventName::parse_name(event)?, handler, priority)
    }

    /// Unregisters a handler.
    pub fn unregister(
        &self,
        event: NetworkEventName,
        handler: &BoxedHandler<NetworkArgs>,
    ) -> DispatchResult<()> {
        self.inner.unregister(&event, handler)
    }

    /// Returns `true` if `handler` is registered for `event`.
    pub fn contains(&self, event: NetworkEventName, handler: &BoxedHandler<NetworkArgs>) -> bool {
        self.inner.contains(&event, handler)
    }

    /// Returns the number of handlers registered for `event`.
    pub fn handler_count(&self, event: NetworkEventName) -> usize {
        self.inner.handler_count(&event)
    }

    /// Dispatches an event envelope, passing the context first.
    pub async fn dispatch(&self, event: NetworkEvent) -> Outcome {
        let Some(context) = self.context.upgrade() else {
            trace!(event = %event.name, "Network context is gone");
            return Outcome::Continue;
        };
        self.inner.dispatch(&event.name, (context, event.value)).await
    }
}

impl fmt::Debug for NetworkEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

// =============================================================================
// Message Events
// =============================================================================

/// Dispatcher for decoded messages of one network, keyed by command.
pub struct MessageEventDispatcher {
    context: Weak<NetworkContext>,
    inner: Dispatcher<Command, MessageArgs>,
}

impl MessageEventDispatcher {
    /// Creates a dispatcher injecting `context` into every dispatch.
    pub fn new(context: Weak<NetworkContext>) -> Self {
        Self {
            context,
            inner: Dispatcher::new("message"),
        }
    }

    /// Registers a handler for messages with `command`.
    pub fn register(
        &self,
        command: impl Into<Command>,
        handler: BoxedHandler<MessageArgs>,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.inner.register(command.into(), handler, priority)
    }

    /// Unregisters a handler.
    pub fn unregister(
        &self,
        command: impl Into<Command>,
        handler: &BoxedHandler<MessageArgs>,
    ) -> DispatchResult<()> {
        self.inner.unregister(&command.into(), handler)
    }

    /// Returns `true` if `handler` is registered for `command`.
    pub fn contains(&self, command: impl Into<Command>, handler: &BoxedHandler<MessageArgs>) -> bool {
        self.inner.contains(&command.into(), handler)
    }

    /// Dispatches a message to the handlers of its command.
    pub async fn dispatch(&self, message: Arc<Message>) -> Outcome {
        let Some(context) = self.context.upgrade() else {
            trace!(command = %message.command, "Network context is gone");
            return Outcome::Continue;
        };
        let command = message.command.clone();
        self.inner.dispatch(&command, (context, message)).await
    }
}

impl fmt::Debug for MessageEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
