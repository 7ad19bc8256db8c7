//! Integration layer - Objects plugins interact with.
//!
//! This module contains:
//! - Capability registry for runtime extension
//! - Settings model with fallback lookup
//! - Per-network context
//! - Plugin contract

pub mod capability;
pub mod config;
pub mod context;
pub mod plugin;

pub use capability::{Capabilities, CapabilityValue, Extensible, Method};
pub use config::{Channels, Configuration, NetworkConfig, Server, TernConfig, normalize_channel};
pub use context::{NetworkContext, Outgoing, OutgoingReceiver};
pub use plugin::{BoxedPlugin, Plugin};
