//! Built-in plugins shipped with the Tern framework.
//!
//! These plugins implement the protocol bookkeeping every client needs.
//!
//! | Plugin | Name | Description |
//! |--------|------|-------------|
//! | [`CorePlugin`] | `core` | Registration, PING replies, channel joins, nick collisions |
//! | [`CtcpPlugin`] | `ctcp` | CTCP decoding, `send_ctcp` capabilities, VERSION and PING replies |
//!
//! # Loading built-in plugins
//!
//! ```rust,ignore
//! use tern_plugins::builtin_plugins;
//!
//! let runtime = TernRuntime::builder()
//!     .config(config)
//!     .plugins(builtin_plugins())
//!     .build()?;
//! ```

pub mod ctcp;
pub mod protocol;

use std::sync::Arc;

use tern_core::BoxedPlugin;

pub use ctcp::{CtcpArgs, CtcpError, CtcpExt, CtcpPlugin, CtcpResult};
pub use protocol::CorePlugin;

/// Returns every built-in plugin.
pub fn builtin_plugins() -> Vec<BoxedPlugin> {
    vec![Arc::new(CorePlugin::new()), Arc::new(CtcpPlugin::new())]
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use serde_json::json;
    use tern_core::{NetworkConfig, NetworkContext, OutgoingReceiver};

    /// Builds a context for network `libera` with two channels.
    pub(crate) fn context() -> (Arc<NetworkContext>, OutgoingReceiver) {
        let section = json!({
            "nick": "tern",
            "user": "tern_user",
            "realname": "Tern Test",
            "servers": ["irc.example.org"],
            "channels": {
                "tern": null,
                "secret": { "key": "hunter2" },
            },
        });
        let config = NetworkConfig::new("libera", section, None).expect("valid test config");
        NetworkContext::new(config)
    }

    /// Drains queued outbound lines.
    pub(crate) fn drain(outbound: &mut OutgoingReceiver) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(item) = outbound.try_recv() {
            if let tern_core::Outgoing::Line(line) = item {
                lines.push(line);
            }
        }
        lines
    }
}
