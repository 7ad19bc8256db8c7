//! Runtime orchestration.
//!
//! [`TernRuntime`] loads the configuration, initializes logging, loads
//! plugins onto the global dispatcher and runs one [`Connection`] task per
//! configured network.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tern_runtime::TernRuntime;
//!
//! let runtime = TernRuntime::builder()
//!     .config_file("tern.yaml")
//!     .plugin(MyPlugin::new())
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tern_core::{BoxedPlugin, GlobalEvent, GlobalEventDispatcher, NetworkContext, Plugin};

use crate::config::{ConfigLoader, RuntimeConfig};
use crate::connection::Connection;
use crate::error::{ConnectionResult, RuntimeError, RuntimeResult};
use crate::logging;

/// The Tern runtime.
pub struct TernRuntime {
    config: RuntimeConfig,
    plugins: Vec<BoxedPlugin>,
    global: &'static GlobalEventDispatcher,
}

impl TernRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration, without plugins.
    ///
    /// Initializes logging from the `logging` section.
    pub fn from_config(config: RuntimeConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            networks = config.settings.networks().len(),
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            plugins: Vec::new(),
            global: GlobalEventDispatcher::global(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the loaded-on-run plugins.
    pub fn plugins(&self) -> &[BoxedPlugin] {
        &self.plugins
    }

    /// Adds a plugin, loaded when the runtime starts.
    pub fn add_plugin(&mut self, plugin: BoxedPlugin) {
        self.plugins.push(plugin);
    }

    /// Replaces the global dispatcher plugins register on.
    pub fn set_global_dispatcher(&mut self, global: &'static GlobalEventDispatcher) {
        self.global = global;
    }

    /// Runs until Ctrl+C, SIGTERM, or every connection has ended.
    pub async fn run(self) -> RuntimeResult<()> {
        info!("Tern runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_signal()).await
    }

    /// Runs until `shutdown` completes or every connection has ended.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.load_plugins().await?;

        let token = CancellationToken::new();
        let mut tasks = JoinSet::new();
        for network in self.config.settings.networks() {
            let (context, outbound) = NetworkContext::new(network.clone());
            self.global
                .dispatch(GlobalEvent::InitNetworkContext(Arc::clone(&context)))
                .await;
            debug!(network = context.name(), "Network context initialized");

            let name = context.name().to_owned();
            let connection = Connection::new(context, outbound, token.child_token());
            tasks.spawn(async move { (name, connection.run().await) });
        }

        tokio::select! {
            () = shutdown => info!("Shutting down"),
            () = join_connections(&mut tasks) => info!("All connections ended"),
        }

        token.cancel();
        join_connections(&mut tasks).await;
        info!("Runtime stopped");
        Ok(())
    }

    async fn load_plugins(&self) -> RuntimeResult<()> {
        for plugin in &self.plugins {
            plugin
                .load(self.global)
                .await
                .map_err(|source| RuntimeError::Plugin {
                    name: plugin.name().to_owned(),
                    source,
                })?;
            info!(
                plugin = plugin.name(),
                version = plugin.version(),
                "Plugin loaded"
            );
        }
        Ok(())
    }
}

async fn join_connections(tasks: &mut JoinSet<(String, ConnectionResult<()>)>) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((network, Err(err))) => error!(%network, error = %err, "Connection failed"),
            Err(err) => error!(error = %err, "Connection task panicked"),
        }
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(err) => {
                warn!(error = %err, "Failed to register SIGTERM handler");
                ctrl_c().await;
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    }
}

/// Resolves on Ctrl+C, or never if it cannot be listened for.
async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`TernRuntime`].
///
/// The built-in plugins are included unless
/// [`without_builtin_plugins`](Self::without_builtin_plugins) is called.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    plugins: Vec<BoxedPlugin>,
    builtin_plugins: bool,
    global: Option<&'static GlobalEventDispatcher>,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            plugins: Vec::new(),
            builtin_plugins: true,
            global: None,
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables `TERN_*` environment variables (default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a settings tree below files and environment.
    pub fn merge(mut self, defaults: Value) -> Self {
        self.config_loader = self.config_loader.merge(defaults);
        self
    }

    /// Adds a plugin.
    pub fn plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Adds several plugins.
    pub fn plugins(mut self, plugins: impl IntoIterator<Item = BoxedPlugin>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Leaves out the built-in protocol and CTCP plugins.
    pub fn without_builtin_plugins(mut self) -> Self {
        self.builtin_plugins = false;
        self
    }

    /// Uses `global` instead of the process-wide dispatcher.
    pub fn global_dispatcher(mut self, global: &'static GlobalEventDispatcher) -> Self {
        self.global = Some(global);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<TernRuntime> {
        let config = self.config_loader.load()?;
        let mut runtime = TernRuntime::from_config(config);

        if self.builtin_plugins {
            runtime.plugins.extend(tern_plugins::builtin_plugins());
        }
        runtime.plugins.extend(self.plugins);
        if let Some(global) = self.global {
            runtime.set_global_dispatcher(global);
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
