//! Loading the configuration document with `figment`.
//!
//! # Sources, lowest priority first
//!
//! 1. Configuration file (`config/config.json` by default)
//! 2. Environment variables (`KIWICAST_*`)
//!
//! # Feature Flags
//!
//! - JSON files are always supported.
//! - `toml-config`: additionally accepts `.toml` files.
//!
//! # Environment Overrides
//!
//! `KIWICAST_` followed by the field path, sections separated by `__`:
//!
//! - `KIWICAST_YOUTUBE__LIVE_CHAT_POLL_INTERVAL=5` → `youtube.live_chat_poll_interval = 5`
//! - `KIWICAST_OBS__WEBSOCKET_PORT=4456` → `obs.websocket_port = 4456`
//! - `KIWICAST_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use kiwicast_runtime::config::ConfigLoader;
//!
//! let document = ConfigLoader::new()
//!     .file("config/config.json")
//!     .without_env()
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json};
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::validation::validate_config;
use kiwicast_core::ConfigDocument;

/// Prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "KIWICAST_";

/// File names searched for when no explicit file is given.
const SEARCH_NAMES: &[&str] = &[
    "config/config.json",
    "kiwicast.json",
    #[cfg(feature = "toml-config")]
    "config/config.toml",
    #[cfg(feature = "toml-config")]
    "kiwicast.toml",
];

/// Reads a [`ConfigDocument`] from a file plus `KIWICAST_*` overrides.
///
/// Without an explicit [`file`](Self::file), the loader looks for one of the
/// usual names in each search directory in turn. With no directories added,
/// those are the working directory and the platform config dir
/// (`~/.config/kiwicast` on Linux).
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
    env_overrides: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            file: None,
            search_dirs: Vec::new(),
            env_overrides: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads exactly `path`; no search is performed.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Appends a directory to search when no file is set.
    pub fn search_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Applies `KIWICAST_*` environment overrides (the default).
    pub fn with_env(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(&self) -> ConfigResult<ConfigDocument> {
        let path = self.resolve_file()?;
        info!(path = %path.display(), "Reading configuration");

        let mut figment = merge_config_file(Figment::new(), &path)?;
        if self.env_overrides {
            trace!(prefix = ENV_PREFIX, "Applying environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: ConfigDocument = figment.extract()?;
        validate_config(&config)?;

        debug!(
            version = config.version,
            receivers = config.sdr.kiwis.len(),
            presets = config.sdr.presets.len(),
            "Configuration is valid"
        );
        Ok(config)
    }

    /// Returns the file that [`load`](Self::load) would read.
    pub fn resolve_file(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            return Ok(path.clone());
        }

        let dirs = if self.search_dirs.is_empty() {
            default_search_dirs()
        } else {
            self.search_dirs.clone()
        };

        let mut candidates = dirs
            .iter()
            .flat_map(|dir| SEARCH_NAMES.iter().map(move |name| dir.join(name)));
        match candidates.find(|candidate| candidate.exists()) {
            Some(path) => Ok(path),
            None => Err(ConfigError::FileNotFound(
                dirs.first()
                    .map_or_else(|| PathBuf::from(SEARCH_NAMES[0]), |dir| dir.join(SEARCH_NAMES[0])),
            )),
        }
    }
}

fn default_search_dirs() -> Vec<PathBuf> {
    let cwd = std::env::current_dir().ok();
    let user = dirs::config_dir().map(|dir| dir.join("kiwicast"));
    cwd.into_iter().chain(user).collect()
}

/// Adds `path` to `figment` using the provider matching its extension.
pub(crate) fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "json" => Ok(figment.merge(Json::file(path))),
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        _ => Err(ConfigError::ParseError(format!(
            "unsupported configuration format '.{ext}' for {}", path.display()
        ))),
    }
}

/// Loads the configuration from `path` with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<ConfigDocument> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL: &str = r#"{
        "version": 1,
        "sdr": {
            "fallback": { "sdr": "kiwi", "preset": "night" },
            "kiwis": [{ "id": "kiwi", "url": "http://kiwi.example:8073/" }],
            "presets": [{ "id": "night", "freq": 5000, "mode": "am" }]
        }
    }"#;

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, MINIMAL).unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();
        assert_eq!(config.sdr.fallback.preset, "night");
        assert_eq!(config.youtube.live_chat_poll_interval, 10);
        assert_eq!(config.obs.websocket_port, 4455);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(p) if p == path));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_required_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "version": 1 }"#).unwrap();

        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "").unwrap();

        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_search_path_finds_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/config.json"), MINIMAL).unwrap();

        let loader = ConfigLoader::new().search_dir(dir.path()).without_env();
        assert_eq!(
            loader.resolve_file().unwrap(),
            dir.path().join("config/config.json")
        );
        assert_eq!(loader.load().unwrap().sdr.kiwis.len(), 1);
    }

    #[test]
    fn test_numeric_override_of_string_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, MINIMAL.replace(r#""night""#, r#""7074""#)).unwrap();

        // `Env` parses `KIWICAST_SDR__FALLBACK__PRESET=7074` into an integer.
        let config: ConfigDocument = merge_config_file(Figment::new(), &path)
            .unwrap()
            .merge(figment::providers::Serialized::default("sdr.fallback.preset", 7074))
            .extract()
            .unwrap();
        assert_eq!(config.sdr.fallback.preset, "7074");
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validation_runs_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            MINIMAL.replace(r#""preset": "night" }"#, r#""preset": "day" }"#),
        )
        .unwrap();

        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
