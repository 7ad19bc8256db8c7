//! Framework layer - Event processing and routing.
//!
//! This module contains the event processing pipeline:
//! - Handler trait and closure handlers
//! - Priority tiers
//! - Generic priority dispatcher
//! - Namespaced global, network and message dispatchers

pub mod dispatcher;
pub mod handler;
pub mod network;
pub mod priority;

pub use dispatcher::{Dispatcher, EventKey};
pub use handler::{
    BoxFuture, BoxedHandler, Handler, HandlerFn, HandlerResult, IntoOutcome, Outcome, handler_fn,
};
pub use network::{
    GlobalEventDispatcher, MessageArgs, MessageEventDispatcher, NetworkArgs,
    NetworkEventDispatcher,
};
pub use priority::Priority;
