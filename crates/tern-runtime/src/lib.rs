//! Tern Runtime - orchestration layer for the Tern IRC framework.
//!
//! This crate provides:
//! - Configuration loading (`config`): figment sources, `TERN_*` overrides
//! - Logging setup (`logging`): `tracing-subscriber` driven by the `logging` section
//! - The plaintext connection driver (`connection`)
//! - Runtime orchestration (`TernRuntime`)
//!
//! ```ignore
//! use tern_runtime::TernRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Loads tern.yaml, installs logging, adds the built-in plugins.
//!     let runtime = TernRuntime::builder().build()?;
//!
//!     // One connection per configured network, until Ctrl+C.
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile, RuntimeConfig, load_config,
    load_config_from_file,
};
pub use connection::Connection;
pub use error::{
    ConnectionError, ConnectionResult, LoggingError, LoggingResult, RuntimeError, RuntimeResult,
};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, TernRuntime};

// Re-export tracing for use by plugins
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the logging macros and `Level`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
