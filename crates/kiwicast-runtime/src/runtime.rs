//! Top-level runtime: wires configuration, OBS, YouTube and the chat poller.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kiwicast_runtime::KiwicastRuntime;
//!
//! let mut runtime = KiwicastRuntime::builder()
//!     .config_file("config/config.json")
//!     .secrets_file("config/secrets.json")
//!     .build()?;
//!
//! runtime.connect().await?;
//! let broadcasts = runtime.active_broadcasts().await?;
//! runtime.run(&broadcasts[0].live_chat_id).await?;
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{
    ConfigDocument, ConfigLoader, ConfigSource, DEFAULT_CONFIG_PATH, DEFAULT_SECRETS_PATH,
    FileConfigSource, LogLevel, Secrets,
};
use crate::dispatcher::CommandDispatcher;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::poller::ChatPoller;
use crate::session::SessionState;
use kiwicast_transport::{LiveBroadcast, ObsClient, YouTubeClient, YouTubeCredentials};

/// Live connections established by [`KiwicastRuntime::connect`].
struct Connections {
    obs: Arc<ObsClient>,
    youtube: Arc<YouTubeClient>,
}

/// The kiwicast runtime.
///
/// Holds the loaded configuration, the secrets and the session state, and
/// drives the chat poller once connected.
pub struct KiwicastRuntime {
    config: ConfigDocument,
    secrets: Secrets,
    config_source: Arc<FileConfigSource>,
    state: SessionState,
    connections: Option<Connections>,
}

impl std::fmt::Debug for KiwicastRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KiwicastRuntime")
            .field("secrets", &self.secrets)
            .field("config_source", &self.config_source)
            .field("state", &self.state)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl KiwicastRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns the configuration loaded at startup.
    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    /// Returns the session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns true once [`connect`](Self::connect) has succeeded.
    pub fn is_connected(&self) -> bool {
        self.connections.is_some()
    }

    /// Connects to OBS and prepares the YouTube client.
    pub async fn connect(&mut self) -> RuntimeResult<()> {
        let obs_config = &self.config.obs;
        info!(url = %obs_config.websocket_url(), "Connecting to OBS WebSocket");
        let obs = ObsClient::connect_with_config(obs_config, self.secrets.obs_password()).await?;

        match obs.scene_names().await {
            Ok(scenes) => info!(?scenes, "Connected to OBS"),
            Err(e) => warn!(error = %e, "Connected to OBS but failed to list scenes"),
        }

        info!("Authenticating YouTube API");
        let youtube = YouTubeClient::new(youtube_credentials(&self.secrets)?)?;

        self.connections = Some(Connections {
            obs: Arc::new(obs),
            youtube: Arc::new(youtube),
        });
        Ok(())
    }

    /// Lists the broadcasts of the authenticated channel that are live.
    pub async fn active_broadcasts(&self) -> RuntimeResult<Vec<LiveBroadcast>> {
        let connections = self.connections.as_ref().ok_or(RuntimeError::NotConnected)?;
        Ok(connections.youtube.list_active_broadcasts().await?)
    }

    /// Listens for commands in `chat_id` until Ctrl+C or SIGTERM.
    pub async fn run(&mut self, chat_id: &str) -> RuntimeResult<()> {
        self.run_until(chat_id, async {
            if let Err(e) = wait_for_shutdown().await {
                error!(error = %e, "Shutting down");
            }
        })
        .await
    }

    /// Listens for commands in `chat_id` until `shutdown` resolves.
    ///
    /// A page that has already been fetched is dispatched completely before
    /// the poller stops.
    pub async fn run_until<F>(&mut self, chat_id: &str, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let connections = self.connections.as_ref().ok_or(RuntimeError::NotConnected)?;

        match self.state.receiver_url() {
            Ok(url) => info!(
                receiver = %self.state.receiver_id,
                preset = %self.state.preset_id,
                url = %url,
                "Initial state loaded"
            ),
            Err(e) => warn!(error = %e, "Initial receiver is not configured"),
        }

        let dispatcher = CommandDispatcher::new(
            connections.obs.clone(),
            self.config_source.clone(),
        );
        let poller = ChatPoller::from_config(
            connections.youtube.clone(),
            chat_id,
            &self.config.youtube,
        );
        let token = poller.cancellation_token();

        let mut sink = dispatcher.bind(&mut self.state);
        tokio::join!(poller.run(&mut sink), async {
            shutdown.await;
            token.cancel();
        });

        connections.obs.close().await;
        info!("Runtime stopped");
        Ok(())
    }
}

/// Picks the YouTube credential, preferring an OAuth access token.
fn youtube_credentials(secrets: &Secrets) -> RuntimeResult<YouTubeCredentials> {
    let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

    if let Some(token) = non_empty(&secrets.youtube_access_token) {
        Ok(YouTubeCredentials::AccessToken(token))
    } else if let Some(key) = non_empty(&secrets.youtube_api_key) {
        Ok(YouTubeCredentials::ApiKey(key))
    } else {
        Err(RuntimeError::MissingCredential(
            "youtube_access_token or youtube_api_key",
        ))
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
pub async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`KiwicastRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = KiwicastRuntime::builder()
///     .config_file("config/production.json")
///     .log_level(LogLevel::Debug)
///     .build()?;
/// ```
#[derive(Debug)]
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config_path: PathBuf,
    secrets_path: PathBuf,
    secrets: Option<Secrets>,
    secrets_env: bool,
    log_level: Option<LogLevel>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            secrets: None,
            secrets_env: true,
            log_level: None,
        }
    }

    /// Sets the configuration file. `reload` re-reads the same file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = path.as_ref().to_path_buf();
        self
    }

    /// Sets the secrets file.
    pub fn secrets_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.secrets_path = path.as_ref().to_path_buf();
        self
    }

    /// Uses `secrets` instead of reading the secrets file.
    pub fn secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Overrides the configured log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self.secrets_env = true;
        self
    }

    /// Disables environment overrides for both configuration and secrets.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self.secrets_env = false;
        self
    }

    /// Loads configuration and secrets, initializes logging and builds the runtime.
    pub fn build(self) -> RuntimeResult<KiwicastRuntime> {
        let config_source = Arc::new(FileConfigSource::with_loader(
            self.config_loader,
            &self.config_path,
        ));
        let mut config = config_source.load()?;

        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        logging::init_from_config(&config.logging);

        info!(
            path = %self.config_path.display(),
            log_level = %config.logging.level,
            "Configuration loaded"
        );

        let secrets = match self.secrets {
            Some(secrets) => secrets,
            None if self.secrets_env => Secrets::load_from_file(&self.secrets_path)?,
            None => Secrets::load_without_env(&self.secrets_path)?,
        };

        let state = SessionState::from_config(config.clone())?;

        Ok(KiwicastRuntime {
            config,
            secrets,
            config_source,
            state,
            connections: None,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
