//! Kiwicast Runtime - orchestration layer for kiwicast.
//!
//! This crate provides:
//! - Configuration and secrets loading (`config`)
//! - Logging setup (`logging`)
//! - The session state and the chat command dispatcher (`SessionState`, `CommandDispatcher`)
//! - The live chat polling loop (`ChatPoller`)
//! - The top-level runtime wiring OBS and YouTube together (`KiwicastRuntime`)
//!
//! ```ignore
//! use kiwicast_runtime::KiwicastRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = KiwicastRuntime::builder().build()?;
//!     runtime.connect().await?;
//!
//!     // Run until Ctrl+C
//!     runtime.run("live-chat-id").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod poller;
pub mod runtime;
pub mod session;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ConfigSource, FileConfigSource, Secrets,
};
pub use dispatcher::{CommandDispatcher, CommandRegistry, DispatchOutcome, Effect, SessionDispatch};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use poller::ChatPoller;
pub use runtime::{KiwicastRuntime, RuntimeBuilder, wait_for_shutdown};
pub use session::SessionState;
pub use kiwicast_transport::LiveBroadcast;

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
