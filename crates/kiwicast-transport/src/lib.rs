//! Network clients for kiwicast.
//!
//! | Feature | Client | Implements |
//! |---------|--------|------------|
//! | `obs` | [`ObsClient`] (obs-websocket v5) | [`SceneControl`](kiwicast_core::SceneControl) |
//! | `youtube` | [`YouTubeClient`] (Data API v3) | [`ChatFeed`](kiwicast_core::ChatFeed) |

#[cfg(feature = "obs")]
pub mod obs;

#[cfg(feature = "youtube")]
pub mod youtube;

#[cfg(feature = "obs")]
pub use obs::ObsClient;

#[cfg(feature = "youtube")]
pub use youtube::{LiveBroadcast, YouTubeClient, YouTubeCredentials};
