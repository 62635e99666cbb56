//! Error types shared across kiwicast components.
//!
//! Configuration and startup errors live in `kiwicast-runtime`; the errors here
//! are the ones raised at the domain and collaborator boundaries.

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Lookup Errors
// =============================================================================

/// A receiver or preset identifier did not match anything in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No receiver endpoint carries this identifier.
    #[error("SDR with ID '{0}' not found in the configuration")]
    ReceiverNotFound(String),

    /// No named preset carries this identifier.
    #[error("preset with ID '{0}' not found in the configuration")]
    PresetNotFound(String),
}

// =============================================================================
// Chat Feed Errors
// =============================================================================

/// Errors returned by a [`ChatFeed`](crate::ChatFeed) fetch.
///
/// The poller treats every variant as transient.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("chat feed transport error: {0}")]
    Transport(String),

    /// The feed answered with a non-success status.
    #[error("chat feed API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the feed.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode chat feed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Scene Control Errors
// =============================================================================

/// Errors returned by a [`SceneControl`](crate::SceneControl) call.
#[derive(Debug, Clone, Error)]
pub enum SceneControlError {
    /// The control connection is not (or no longer) established.
    #[error("scene control is not connected")]
    NotConnected,

    /// No response arrived in time.
    #[error("scene control request timed out after {0:?}")]
    Timeout(Duration),

    /// The controller rejected the request.
    #[error("scene control request failed ({code}): {comment}")]
    Request {
        /// Status code reported by the controller.
        code: i64,
        /// Human-readable reason, empty if none was given.
        comment: String,
    },

    /// Authentication with the controller failed.
    #[error("scene control authentication failed: {0}")]
    Authentication(String),

    /// The underlying transport failed.
    #[error("scene control transport error: {0}")]
    Transport(String),

    /// A message could not be encoded or decoded.
    #[error("scene control protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for SceneControlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration lookups.
pub type LookupResult<T> = Result<T, LookupError>;

/// Result type for chat feed fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for scene control calls.
pub type SceneControlResult<T> = Result<T, SceneControlError>;
