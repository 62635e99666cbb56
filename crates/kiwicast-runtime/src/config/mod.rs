//! Configuration module for the kiwicast runtime.
//!
//! The schema itself lives in `kiwicast-core`; this module loads it with
//! figment, validates it and exposes it to the dispatcher as a
//! [`ConfigSource`] so the `reload` command can re-read it.

pub mod error;
pub mod loader;
pub mod secrets;
pub mod validation;

use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};
pub use kiwicast_core::config::*;
pub use loader::{ConfigLoader, ENV_PREFIX, load_config_from_file};
pub use secrets::{DEFAULT_SECRETS_PATH, SECRETS_ENV_PREFIX, Secrets};
pub use validation::validate_config;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Anything that can produce a fresh, validated configuration document.
pub trait ConfigSource: Send + Sync {
    /// Loads and validates the document.
    fn load(&self) -> ConfigResult<ConfigDocument>;
}

/// A [`ConfigSource`] bound to a single file.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    loader: ConfigLoader,
    path: PathBuf,
}

impl FileConfigSource {
    /// Creates a source reading `path` with environment overrides.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_loader(ConfigLoader::new(), path)
    }

    /// Creates a source reading `path` with a preconfigured loader.
    pub fn with_loader<P: AsRef<Path>>(loader: ConfigLoader, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            loader: loader.file(&path),
            path,
        }
    }

    /// Returns the file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> ConfigResult<ConfigDocument> {
        self.loader.load()
    }
}
