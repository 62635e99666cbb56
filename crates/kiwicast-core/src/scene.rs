//! Broadcast controller abstraction.

use async_trait::async_trait;

use crate::error::SceneControlResult;

/// Controls the broadcast output (OBS in production).
///
/// Callers treat both operations as fire-and-forget; a returned error only
/// signals that the request could not be delivered or was rejected.
#[async_trait]
pub trait SceneControl: Send + Sync {
    /// Stops the broadcast output.
    async fn stop_stream(&self) -> SceneControlResult<()>;

    /// Switches the program output to the scene called `name`.
    async fn set_active_scene(&self, name: &str) -> SceneControlResult<()>;
}
