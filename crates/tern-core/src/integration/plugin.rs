//! Plugin contract.
//!
//! A plugin is loaded once per process. During [`Plugin::load`] it registers
//! handlers on the global dispatcher, typically for
//! [`GlobalEventName::InitNetworkContext`](crate::GlobalEventName::InitNetworkContext),
//! and from there attaches per-network handlers and capabilities to every
//! new [`NetworkContext`](super::context::NetworkContext).

use std::sync::Arc;

use async_trait::async_trait;

use crate::framework::network::GlobalEventDispatcher;

/// A unit of functionality loaded into the runtime.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// Plugin version.
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// One-line description.
    fn description(&self) -> &str {
        ""
    }

    /// Registers the plugin's global handlers.
    async fn load(&self, global: &GlobalEventDispatcher) -> anyhow::Result<()>;
}

/// Shared plugin.
pub type BoxedPlugin = Arc<dyn Plugin>;
