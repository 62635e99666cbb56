//! Mutable state of a running session.

use kiwicast_core::{ConfigDocument, LookupResult, ReceiverEndpoint, ResolvedProfile};
use tracing::debug;

/// The active configuration together with the current receiver and preset.
///
/// Owned by the caller and handed to the dispatcher by `&mut`; nothing else
/// reads or writes it while the poller runs.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// The configuration document currently in effect.
    pub config: ConfigDocument,
    /// Identifier of the selected receiver, as spelled in `config`.
    pub receiver_id: String,
    /// Identifier of the selected preset, as spelled in `config`.
    pub preset_id: String,
    /// The selected preset overlaid on the base profile.
    pub profile: ResolvedProfile,
}

impl SessionState {
    /// Builds the initial state from the configured fallback receiver and preset.
    pub fn from_config(config: ConfigDocument) -> LookupResult<Self> {
        let receiver_id = config.sdr.receiver(&config.sdr.fallback.sdr)?.id.clone();
        let preset_id = config.sdr.preset(&config.sdr.fallback.preset)?.id.clone();
        let profile = config.sdr.resolve_preset(&preset_id)?;

        Ok(Self {
            config,
            receiver_id,
            preset_id,
            profile,
        })
    }

    /// Returns the selected receiver.
    pub fn receiver(&self) -> LookupResult<&ReceiverEndpoint> {
        self.config.sdr.receiver(&self.receiver_id)
    }

    /// Returns the URL that opens the selected receiver with the current profile.
    pub fn receiver_url(&self) -> LookupResult<String> {
        Ok(self.receiver()?.url_for(&self.profile))
    }

    /// Switches to `config`, keeping the current receiver and preset ids.
    ///
    /// The receiver is looked up and the preset re-resolved against the new
    /// document first; the state is only touched once both succeed.
    pub fn replace_config(&mut self, config: ConfigDocument) -> LookupResult<()> {
        let receiver_id = config.sdr.receiver(&self.receiver_id)?.id.clone();
        let preset_id = config.sdr.preset(&self.preset_id)?.id.clone();
        let profile = config.sdr.resolve_preset(&preset_id)?;

        debug!(receiver = %receiver_id, preset = %preset_id, "Session configuration replaced");

        self.config = config;
        self.receiver_id = receiver_id;
        self.preset_id = preset_id;
        self.profile = profile;
        Ok(())
    }
}
