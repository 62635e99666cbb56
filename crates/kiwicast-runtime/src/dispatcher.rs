//! Chat command dispatch.
//!
//! Commands are looked up in a [`CommandRegistry`] that maps each name to a
//! handler. Handlers are pure: they turn the optional argument into an
//! [`Effect`] (or nothing). The [`CommandDispatcher`] then interprets the
//! effect against the session state and the OBS connection.
//!
//! ```rust,ignore
//! use kiwicast_runtime::dispatcher::{CommandDispatcher, Effect};
//!
//! let mut dispatcher = CommandDispatcher::new(obs, config_source);
//! dispatcher.register("intermission", |_| Some(Effect::SwitchScene("Intermission".into())));
//!
//! let mut sink = dispatcher.bind(&mut state);
//! poller.run(&mut sink).await;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ConfigSource;
use crate::error::RuntimeResult;
use crate::session::SessionState;
use kiwicast_core::{CommandSink, SceneControl};

// =============================================================================
// Effects
// =============================================================================

/// An action a command asks the dispatcher to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Re-read the configuration and re-resolve the current preset.
    Reload,
    /// Stop the OBS output stream.
    StopStream,
    /// Make the named scene the program scene.
    SwitchScene(String),
}

/// What happened to a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler is registered under this name.
    Unknown,
    /// The handler produced no effect.
    Ignored,
    /// The effect was applied.
    Applied(Effect),
    /// Applying the effect failed; the failure has been logged.
    Failed(Effect),
}

// =============================================================================
// CommandRegistry
// =============================================================================

/// A command handler: maps the optional argument to an effect.
pub type CommandHandler = Arc<dyn Fn(Option<&str>) -> Option<Effect> + Send + Sync>;

/// Command names mapped to handlers. Names are matched exactly.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `reload`, `stop` and `scene`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("reload", |_| Some(Effect::Reload));
        registry.register("stop", |_| Some(Effect::StopStream));
        registry.register("scene", |argument| match argument {
            Some(name) => Some(Effect::SwitchScene(name.to_string())),
            None => {
                warn!("Scene command requires a scene name");
                None
            }
        });
        registry
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<&str>) -> Option<Effect> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Returns the handler registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&CommandHandler> {
        self.handlers.get(name)
    }

    /// Returns the registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

// =============================================================================
// CommandDispatcher
// =============================================================================

/// Dispatches chat commands and interprets their effects.
pub struct CommandDispatcher {
    registry: CommandRegistry,
    scene_control: Arc<dyn SceneControl>,
    config_source: Arc<dyn ConfigSource>,
}

impl CommandDispatcher {
    /// Creates a dispatcher with the default command set.
    pub fn new(scene_control: Arc<dyn SceneControl>, config_source: Arc<dyn ConfigSource>) -> Self {
        Self::with_registry(CommandRegistry::with_defaults(), scene_control, config_source)
    }

    /// Creates a dispatcher with a custom command set.
    pub fn with_registry(
        registry: CommandRegistry,
        scene_control: Arc<dyn SceneControl>,
        config_source: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            registry,
            scene_control,
            config_source,
        }
    }

    /// Registers an additional command.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<&str>) -> Option<Effect> + Send + Sync + 'static,
    {
        self.registry.register(name, handler);
    }

    /// Returns the command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Runs the handler for `name` and applies its effect.
    #[instrument(level = "debug", skip(self, state))]
    pub async fn dispatch(
        &self,
        state: &mut SessionState,
        name: &str,
        argument: Option<&str>,
    ) -> DispatchOutcome {
        let Some(handler) = self.registry.lookup(name) else {
            info!(command = name, "Command not found");
            return DispatchOutcome::Unknown;
        };

        debug!(command = name, ?argument, "Executing command");
        let Some(effect) = handler(argument) else {
            return DispatchOutcome::Ignored;
        };

        match self.apply(state, &effect).await {
            Ok(()) => DispatchOutcome::Applied(effect),
            Err(e) => {
                error!(command = name, ?effect, error = %e, "Command failed");
                DispatchOutcome::Failed(effect)
            }
        }
    }

    /// Applies `effect`. On error `state` is left as it was.
    pub async fn apply(&self, state: &mut SessionState, effect: &Effect) -> RuntimeResult<()> {
        match effect {
            Effect::Reload => {
                info!("Reloading the configuration");
                // Sources hand back documents that already passed validation.
                let config = self.config_source.load()?;
                state.replace_config(config)?;
                info!(
                    receiver = %state.receiver_id,
                    preset = %state.preset_id,
                    "Configuration reloaded"
                );
            }
            Effect::StopStream => {
                info!("Stopping the broadcast");
                self.scene_control.stop_stream().await?;
            }
            Effect::SwitchScene(scene) => {
                info!(scene = %scene, "Switching scene");
                self.scene_control.set_active_scene(scene).await?;
            }
        }
        Ok(())
    }

    /// Binds the dispatcher to `state`, yielding the sink the poller drives.
    pub fn bind<'a>(&'a self, state: &'a mut SessionState) -> SessionDispatch<'a> {
        SessionDispatch {
            dispatcher: self,
            state,
        }
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// A [`CommandDispatcher`] bound to the session state it mutates.
pub struct SessionDispatch<'a> {
    dispatcher: &'a CommandDispatcher,
    state: &'a mut SessionState,
}

impl SessionDispatch<'_> {
    /// Returns the current session state.
    pub fn state(&self) -> &SessionState {
        &*self.state
    }
}

#[async_trait]
impl<'a> CommandSink for SessionDispatch<'a> {
    async fn handle_command(&mut self, name: &str, argument: Option<&str>) {
        self.dispatcher.dispatch(self.state, name, argument).await;
    }
}

// =============================================================================
// Tests
// =============================================================================
