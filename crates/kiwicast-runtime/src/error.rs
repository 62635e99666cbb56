//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use kiwicast_core::{FetchError, LookupError, SceneControlError};

/// Errors that can occur while starting or running kiwicast.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration or secrets could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The fallback receiver or preset does not exist.
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// OBS could not be reached or refused a request.
    #[error("OBS error: {0}")]
    SceneControl(#[from] SceneControlError),

    /// The chat feed could not be reached.
    #[error("Chat feed error: {0}")]
    Fetch(#[from] FetchError),

    /// No credential for the named service is configured.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// `run` was called before `connect`.
    #[error("Runtime is not connected")]
    NotConnected,

    /// Waiting for a shutdown signal failed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
