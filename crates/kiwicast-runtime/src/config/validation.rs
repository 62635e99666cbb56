//! Configuration validation utilities.

use std::collections::HashSet;

use unicase::UniCase;

use super::error::{ConfigError, ConfigResult};
use kiwicast_core::{ConfigDocument, ReceiverEndpoint, SdrConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ConfigDocument) -> ConfigResult<()> {
    validate_sdr_config(&config.sdr)?;

    if config.youtube.live_chat_poll_interval == 0 {
        return Err(ConfigError::validation(
            "youtube.live_chat_poll_interval must be greater than 0",
        ));
    }

    if config.obs.websocket_port == 0 {
        return Err(ConfigError::validation("obs.websocket_port must be greater than 0"));
    }

    if config.obs.request_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "obs.request_timeout_secs must be greater than 0",
        ));
    }

    Ok(())
}

/// Validates receivers, presets and the fallback selection.
fn validate_sdr_config(sdr: &SdrConfig) -> ConfigResult<()> {
    let mut seen_ids = HashSet::new();
    for receiver in &sdr.kiwis {
        if !seen_ids.insert(UniCase::new(receiver.id.as_str())) {
            return Err(ConfigError::duplicate("receiver", &receiver.id));
        }
        validate_receiver(receiver)?;
    }

    let mut seen_ids = HashSet::new();
    for preset in &sdr.presets {
        if preset.id.is_empty() {
            return Err(ConfigError::validation("preset id must not be empty"));
        }
        if !seen_ids.insert(UniCase::new(preset.id.as_str())) {
            return Err(ConfigError::duplicate("preset", &preset.id));
        }
    }

    if let Err(e) = sdr.receiver(&sdr.fallback.sdr) {
        return Err(ConfigError::validation(format!("sdr.fallback.sdr: {e}")));
    }
    if let Err(e) = sdr.preset(&sdr.fallback.preset) {
        return Err(ConfigError::validation(format!("sdr.fallback.preset: {e}")));
    }

    Ok(())
}

/// Validates a single receiver endpoint.
fn validate_receiver(receiver: &ReceiverEndpoint) -> ConfigResult<()> {
    if receiver.id.is_empty() {
        return Err(ConfigError::validation("receiver id must not be empty"));
    }

    if receiver.url.is_empty() {
        return Err(ConfigError::invalid_url(&receiver.url, "URL cannot be empty"));
    }

    if !receiver.url.starts_with("http://") && !receiver.url.starts_with("https://") {
        return Err(ConfigError::invalid_url(
            &receiver.url,
            "URL must start with http:// or https://",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConfigDocument {
        serde_json::from_str(
            r#"{
                "sdr": {
                    "fallback": { "sdr": "a", "preset": "p1" },
                    "kiwis": [
                        { "id": "a", "url": "http://a.example/" },
                        { "id": "b", "url": "https://b.example/" }
                    ],
                    "presets": [{ "id": "p1" }, { "id": "p2", "zoom": 3 }]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_duplicate_receiver_ids_ignore_case() {
        let mut config = config();
        config.sdr.kiwis[1].id = "A".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateId { kind: "receiver", .. })
        ));
    }

    #[test]
    fn test_duplicate_preset_ids() {
        let mut config = config();
        config.sdr.presets[1].id = "P1".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateId { kind: "preset", .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_fold_case() {
        let mut config = config();
        config.sdr.presets[0].id = "Maße".into();
        config.sdr.presets[1].id = "MASSE".into();
        config.sdr.fallback.preset = "masse".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateId { kind: "preset", .. })
        ));
    }

    #[test]
    fn test_invalid_receiver_url() {
        let mut config = config();
        config.sdr.kiwis[0].url = "kiwi.example".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_unknown_fallback() {
        let mut config = config();
        config.sdr.fallback.sdr = "c".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = self::config();
        config.sdr.fallback.preset = "p3".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_fallback_matches_case_insensitively() {
        let mut config = config();
        config.sdr.fallback.sdr = "B".into();
        config.sdr.fallback.preset = "P2".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = config();
        config.youtube.live_chat_poll_interval = 0;
        assert!(validate_config(&config).is_err());
    }
}
