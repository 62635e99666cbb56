//! Configuration schema definitions.
//!
//! Loading, layering and validation live in `kiwicast-runtime`; this module only
//! describes the shape of the document and answers lookups against it.
//!
//! # Example Document
//!
//! ```json
//! {
//!   "version": 1,
//!   "sdr": {
//!     "fallback": { "sdr": "twente", "preset": "ft8" },
//!     "kiwis": [{ "id": "twente", "url": "http://websdr.ewi.utwente.nl:8901/" }],
//!     "base_preset": { "zoom": 10, "volume": 50 },
//!     "presets": [{ "id": "ft8", "freq": 14074, "mode": "usb" }]
//!   },
//!   "obs": { "websocket_port": 4455 },
//!   "youtube": { "live_chat_poll_interval": 10 }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use unicase::UniCase;

use crate::error::{LookupError, LookupResult};
use crate::preset::{ReceiverProfile, ResolvedProfile, resolve};

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Receivers and presets.
    pub sdr: SdrConfig,

    /// OBS connection and scene layout.
    #[serde(default)]
    pub obs: ObsConfig,

    /// Live chat polling.
    #[serde(default)]
    pub youtube: YoutubeConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> u32 {
    1
}

// =============================================================================
// SDR
// =============================================================================

/// Receiver fleet, base profile and named presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdrConfig {
    /// Receiver and preset selected at startup.
    pub fallback: FallbackConfig,

    /// Controllable receivers.
    #[serde(default)]
    pub kiwis: Vec<ReceiverEndpoint>,

    /// Profile every preset is overlaid onto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_preset: Option<ReceiverProfile>,

    /// Named overrides of the base profile.
    #[serde(default)]
    pub presets: Vec<NamedPreset>,
}

impl SdrConfig {
    /// Finds a receiver by identifier, ignoring case.
    pub fn receiver(&self, id: &str) -> LookupResult<&ReceiverEndpoint> {
        self.kiwis
            .iter()
            .find(|k| ids_match(&k.id, id))
            .ok_or_else(|| LookupError::ReceiverNotFound(id.to_string()))
    }

    /// Finds a preset by identifier, ignoring case.
    pub fn preset(&self, id: &str) -> LookupResult<&NamedPreset> {
        self.presets
            .iter()
            .find(|p| ids_match(&p.id, id))
            .ok_or_else(|| LookupError::PresetNotFound(id.to_string()))
    }

    /// Returns the base profile, or an empty one if none is configured.
    pub fn base_profile(&self) -> ReceiverProfile {
        self.base_preset.clone().unwrap_or_default()
    }

    /// Overlays the preset `id` onto the base profile.
    pub fn resolve_preset(&self, id: &str) -> LookupResult<ResolvedProfile> {
        let preset = self.preset(id)?;
        Ok(resolve(&self.base_profile(), &preset.profile))
    }
}

/// Compares identifiers under Unicode case folding (`"Maße"` matches `"MASSE"`).
pub fn ids_match(a: &str, b: &str) -> bool {
    UniCase::new(a) == UniCase::new(b)
}

/// Accepts a string or a bare scalar for a string field.
///
/// Environment overrides are parsed loosely, so `KIWICAST_SDR__FALLBACK__PRESET=7074`
/// arrives as a number.
pub fn string_or_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Flag(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    })
}

/// Receiver and preset used when the session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Receiver identifier.
    #[serde(deserialize_with = "string_or_scalar")]
    pub sdr: String,
    /// Preset identifier.
    #[serde(deserialize_with = "string_or_scalar")]
    pub preset: String,
}

/// A controllable KiwiSDR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverEndpoint {
    /// Unique identifier, matched case-insensitively.
    pub id: String,
    /// Base URL of the receiver's web interface.
    pub url: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Preset this receiver defaults to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl ReceiverEndpoint {
    /// Returns the nickname, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.id)
    }

    /// Builds the URL that opens this receiver tuned to `profile`.
    pub fn url_for(&self, profile: &ReceiverProfile) -> String {
        format!("{}{}", self.url, profile.to_query())
    }
}

/// A named override of the base profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPreset {
    /// Unique identifier, matched case-insensitively.
    pub id: String,
    /// The fields this preset overrides.
    #[serde(flatten)]
    pub profile: ReceiverProfile,
}

// =============================================================================
// OBS
// =============================================================================

/// OBS WebSocket connection and scene layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsConfig {
    /// Host running OBS.
    #[serde(default = "default_obs_host", deserialize_with = "string_or_scalar")]
    pub websocket_host: String,

    /// obs-websocket port.
    #[serde(default = "default_obs_port")]
    pub websocket_port: u16,

    /// How long to wait for a request response, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Scenes kiwicast knows about.
    #[serde(default)]
    pub scenes: Vec<ObsSceneConfig>,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            websocket_host: default_obs_host(),
            websocket_port: default_obs_port(),
            request_timeout_secs: default_request_timeout_secs(),
            scenes: Vec::new(),
        }
    }
}

impl ObsConfig {
    /// Returns the `ws://` URL of the obs-websocket server.
    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}", self.websocket_host, self.websocket_port)
    }
}

fn default_obs_host() -> String {
    "localhost".to_string()
}

fn default_obs_port() -> u16 {
    4455
}

fn default_request_timeout_secs() -> u64 {
    5
}

/// A scene and the browser source showing the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsSceneConfig {
    /// Scene name.
    pub name: String,
    /// Browser source inside the scene.
    pub browser_source: BrowserSourceConfig,
}

/// Settings of an OBS browser source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSourceConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps_custom: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reroute_audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_when_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpage_control_level: Option<u32>,
}

// =============================================================================
// YouTube
// =============================================================================

/// Live chat polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Seconds to wait between fetches when the feed advises no interval.
    #[serde(default = "default_poll_interval")]
    pub live_chat_poll_interval: u64,

    /// Number of message ids remembered for deduplication (0 = unbounded).
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            live_chat_poll_interval: default_poll_interval(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_dedup_capacity() -> usize {
    crate::dedup::DedupWindow::DEFAULT_CAPACITY
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Output destination.
    pub output: LogOutput,
    /// Log file, used when `output` is `file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Include thread ids.
    pub thread_ids: bool,
    /// Include source file and line.
    pub file_location: bool,
    /// Per-module levels, e.g. `kiwicast_transport = "debug"`.
    pub filters: BTreeMap<String, LogLevel>,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the runtime's `json-log` feature; falls back to compact otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}
