//! Credentials kept apart from the main configuration document.
//!
//! The secrets file is plain JSON and is usually created by the binary on
//! first start. Every field can be overridden with a `KIWICAST_SECRETS__*`
//! environment variable, e.g. `KIWICAST_SECRETS__OBS_WEBSOCKET_PASSWORD`.
//! Override values are taken verbatim, so `1234` stays the string `"1234"`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};

/// Environment prefix for secret overrides.
pub const SECRETS_ENV_PREFIX: &str = "KIWICAST_SECRETS__";

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_PATH: &str = "config/secrets.json";

/// OBS and YouTube credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    /// obs-websocket server password; empty when authentication is disabled.
    #[serde(default)]
    pub obs_websocket_password: String,

    /// OAuth access token for the YouTube Data API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_access_token: Option<String>,

    /// API key for the YouTube Data API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,
}

impl Secrets {
    /// Creates secrets holding only the OBS password.
    pub fn with_obs_password(password: impl Into<String>) -> Self {
        Self {
            obs_websocket_password: password.into(),
            ..Default::default()
        }
    }

    /// Loads secrets from `path`, layering environment overrides on top.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::load_with_overrides(path.as_ref(), env_overrides())
    }

    /// Loads secrets from `path` alone, ignoring `KIWICAST_SECRETS__*`.
    pub fn load_without_env<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::load_with_overrides(path.as_ref(), BTreeMap::new())
    }

    fn load_with_overrides(path: &Path, overrides: BTreeMap<String, String>) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let secrets: Self = Figment::new()
            .merge(Json::file(path))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        debug!(path = %path.display(), "Secrets loaded");
        Ok(secrets)
    }

    /// Writes secrets to `path`, creating parent directories as needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, content)?;

        info!(path = %path.display(), "Secrets saved");
        Ok(())
    }

    /// Returns the OBS password, or `None` when it is empty.
    pub fn obs_password(&self) -> Option<&str> {
        Some(self.obs_websocket_password.as_str()).filter(|p| !p.is_empty())
    }
}

/// Collects `KIWICAST_SECRETS__*` as raw strings keyed by lowercase field name.
fn env_overrides() -> BTreeMap<String, String> {
    Env::prefixed(SECRETS_ENV_PREFIX)
        .iter()
        .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
        .collect()
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: bool) -> &'static str {
            if value { "<redacted>" } else { "<unset>" }
        }

        f.debug_struct("Secrets")
            .field(
                "obs_websocket_password",
                &redact(!self.obs_websocket_password.is_empty()),
            )
            .field("youtube_access_token", &redact(self.youtube_access_token.is_some()))
            .field("youtube_api_key", &redact(self.youtube_api_key.is_some()))
            .finish()
    }
}
