//! # Kiwicast Core
//!
//! The domain layer of kiwicast: everything that can be expressed without I/O.
//!
//! ## Layers
//!
//! - **Presets**: sparse receiver profiles, overlay resolution and the
//!   KiwiSDR query-string encoding ([`ReceiverProfile`], [`resolve`], [`QueryString`])
//! - **Chat**: command parsing and duplicate suppression ([`parse_command`], [`DedupWindow`])
//! - **Configuration schema**: the document receivers and presets are loaded from
//!   ([`ConfigDocument`])
//! - **Collaborators**: the seams the runtime drives ([`ChatFeed`], [`SceneControl`],
//!   [`CommandSink`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────┐    ┌─────────────┐    ┌───────────┐    ┌──────────────┐
//! │ ChatFeed  │───▶│ DedupWindow │───▶│  parse    │───▶│ CommandSink  │
//! │ (YouTube) │    │             │    │ _command  │    │ (dispatcher) │
//! └───────────┘    └─────────────┘    └───────────┘    └──────┬───────┘
//!                                                             │
//!                                      ┌──────────────┐       │
//!                                      │ SceneControl │◀──────┤
//!                                      │    (OBS)     │       │
//!                                      └──────────────┘       ▼
//!                                                      resolve / to_query
//! ```

pub mod chat;
pub mod command;
pub mod config;
pub mod dedup;
pub mod error;
pub mod preset;
pub mod scene;

pub use chat::{ChatFeed, ChatMessage, ChatPage, CommandSink, PollCursor};
pub use command::{COMMAND_PREFIX, CommandInvocation, parse_command};
pub use config::{
    BrowserSourceConfig, ConfigDocument, FallbackConfig, LogFormat, LogLevel, LogOutput,
    LoggingConfig, NamedPreset, ObsConfig, ObsSceneConfig, ReceiverEndpoint, SdrConfig,
    YoutubeConfig,
};
pub use dedup::DedupWindow;
pub use error::{
    FetchError, FetchResult, LookupError, LookupResult, SceneControlError, SceneControlResult,
};
pub use preset::{QueryString, ReceiverProfile, ResolvedProfile, resolve, serialize};
pub use scene::SceneControl;
