//! Foundation layer - Protocol data types.
//!
//! This module contains the wire-level building blocks of Tern:
//! - IRC message codec with IRCv3 tags
//! - Numeric reply taxonomy
//! - CTCP sub-codec
//! - Event names and payloads

pub mod ctcp;
pub mod event;
pub mod message;
pub mod reply;

pub use ctcp::CtcpMessage;
pub use event::{
    EventNamespace, GlobalEvent, GlobalEventName, NetworkEvent, NetworkEventName,
    NetworkEventValue,
};
pub use message::{Command, Message, Prefix, TagValue, Tags};
pub use reply::{Reply, UnknownReply};
