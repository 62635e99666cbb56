//! Receiver profiles and preset resolution.
//!
//! A [`ReceiverProfile`] is a sparse set of KiwiSDR tuning parameters. Every
//! field is optional: `None` means "inherit from the layer below", `Some(v)`
//! means "override", even when `v` is `0`, `""` or `false`.
//!
//! Presets are resolved by overlaying a named preset onto the base profile:
//!
//! ```text
//! base_preset     { freq: 7074, mode: "usb", zoom: 10, mute: true }
//! preset "ft8"    {             mode: "lsb",           mute: false }
//! ─────────────────────────────────────────────────────────────────
//! resolved        { freq: 7074, mode: "lsb", zoom: 10, mute: false }
//! ```
//!
//! The resolved profile is turned into the query string the KiwiSDR web client
//! understands with [`ReceiverProfile::to_query`].

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Expands to the overlay of every profile field, so adding a field in one
/// place cannot silently drop it from resolution.
macro_rules! overlay_fields {
    ($base:expr, $overlay:expr, { $($field:ident),* $(,)? }) => {
        ReceiverProfile {
            $($field: $overlay.$field.clone().or_else(|| $base.$field.clone()),)*
        }
    };
}

/// A sparse set of receiver parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverProfile {
    /// OBS scene associated with this preset. Not sent to the receiver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_scene: Option<String>,
    /// Carried through resolution unchanged. Not sent to the receiver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherit_base_preset: Option<bool>,
    /// Tuned frequency in kHz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    /// Demodulation mode (`am`, `usb`, `lsb`, `cw`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    /// Passband width, e.g. `"3000"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb_width: Option<String>,
    /// Passband center, e.g. `"1500"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb_center: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_colormap: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_auto: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_interpolation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_contrast: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    /// Memory slot list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem: Option<String>,
    /// Key sequence replayed by the web client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Extension to open on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl ReceiverProfile {
    /// Returns a profile with every field unset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Encodes the profile as a KiwiSDR query string.
    ///
    /// Frequency and mode share the `f` parameter. Boolean flags are emitted
    /// only when explicitly `true`; every other field is omitted when unset,
    /// zero or empty.
    pub fn to_query(&self) -> QueryString {
        let mut query = QueryString::default();

        let freq = self.freq.filter(|f| *f != 0.0);
        match (freq, self.mode.as_deref()) {
            (Some(freq), Some(mode)) => query.push("f", format!("{freq},{mode}")),
            (None, Some(mode)) => query.push("f", format!(",{mode}")),
            (Some(freq), None) => query.push("f", freq.to_string()),
            (None, None) => {}
        }

        query.push_number("z", self.zoom);
        query.push_number("vol", self.volume);
        query.push_text("pbw", self.pb_width.as_deref());
        query.push_text("pbc", self.pb_center.as_deref());
        query.push_number("cmap", self.wf_colormap);
        query.push_text("wf", self.wf_speed.as_deref());
        query.push_text("wfm", self.wf_range.as_deref());
        if self.wf_auto == Some(true) {
            query.push("wfa", "1");
        }
        query.push_number("wfi", self.wf_interpolation);
        query.push_number("sqrt", self.wf_contrast);
        if self.mute == Some(true) {
            query.push("mute", "");
        }
        query.push_text("mem", self.mem.as_deref());
        query.push_text("keys", self.keys.as_deref());
        query.push_text("user", self.user.as_deref());
        query.push_text("pwd", self.password.as_deref());
        query.push_text("ext", self.extension.as_deref());

        query
    }
}

/// Overlays `overlay` onto `base`.
///
/// Every field set in `overlay` wins; every unset field keeps the value from
/// `base`, which may itself be unset. No value is validated.
pub fn resolve(base: &ReceiverProfile, overlay: &ReceiverProfile) -> ResolvedProfile {
    ResolvedProfile(overlay_fields!(base, overlay, {
        obs_scene,
        inherit_base_preset,
        freq,
        mode,
        zoom,
        volume,
        pb_width,
        pb_center,
        wf_colormap,
        wf_speed,
        wf_range,
        wf_auto,
        wf_interpolation,
        wf_contrast,
        mute,
        mem,
        keys,
        user,
        password,
        extension,
    }))
}

/// Encodes a profile as a KiwiSDR query string. See [`ReceiverProfile::to_query`].
pub fn serialize(profile: &ReceiverProfile) -> QueryString {
    profile.to_query()
}

// =============================================================================
// ResolvedProfile
// =============================================================================

/// The fully merged profile actually applied to a receiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedProfile(ReceiverProfile);

impl ResolvedProfile {
    /// Wraps a profile that needs no further resolution.
    pub fn new(profile: ReceiverProfile) -> Self {
        Self(profile)
    }

    /// Returns the underlying profile.
    pub fn into_inner(self) -> ReceiverProfile {
        self.0
    }
}

impl Deref for ResolvedProfile {
    type Target = ReceiverProfile;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// =============================================================================
// QueryString
// =============================================================================

/// An ordered list of query parameters for a KiwiSDR URL.
///
/// `Display` renders the `?`-prefixed, form-urlencoded representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    params: Vec<(&'static str, String)>,
}

impl QueryString {
    fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.params.push((key, value.into()));
    }

    fn push_text(&mut self, key: &'static str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.push(key, value);
        }
    }

    fn push_number(&mut self, key: &'static str, value: Option<i64>) {
        if let Some(value) = value.filter(|v| *v != 0) {
            self.push(key, value.to_string());
        }
    }

    /// Returns the raw (unencoded) value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the parameter keys in emission order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().map(|(k, _)| *k)
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if no parameter is present.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Renders the `?`-prefixed, percent-encoded query string.
    pub fn encode(&self) -> String {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        format!("?{encoded}")
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> ReceiverProfile {
        ReceiverProfile {
            obs_scene: Some("SDR".into()),
            inherit_base_preset: Some(true),
            freq: Some(7074.0),
            mode: Some("usb".into()),
            zoom: Some(10),
            volume: Some(50),
            pb_width: Some("3000".into()),
            pb_center: Some("1500".into()),
            wf_colormap: Some(4),
            wf_speed: Some("2".into()),
            wf_range: Some("-110".into()),
            wf_auto: Some(true),
            wf_interpolation: Some(13),
            wf_contrast: Some(2),
            mute: Some(true),
            mem: Some("1".into()),
            keys: Some("abc".into()),
            user: Some("viewer".into()),
            password: Some("secret".into()),
            extension: Some("ft8".into()),
        }
    }

    fn other_profile() -> ReceiverProfile {
        ReceiverProfile {
            obs_scene: Some("Other".into()),
            inherit_base_preset: Some(false),
            freq: Some(14200.0),
            mode: Some("lsb".into()),
            zoom: Some(3),
            volume: Some(80),
            pb_width: Some("2400".into()),
            pb_center: Some("1200".into()),
            wf_colormap: Some(1),
            wf_speed: Some("4".into()),
            wf_range: Some("-90".into()),
            wf_auto: Some(false),
            wf_interpolation: Some(10),
            wf_contrast: Some(1),
            mute: Some(false),
            mem: Some("2".into()),
            keys: Some("xyz".into()),
            user: Some("operator".into()),
            password: Some("hunter2".into()),
            extension: Some("wspr".into()),
        }
    }

    #[test]
    fn test_resolve_empty_overlay_keeps_base() {
        let base = full_profile();
        let resolved = resolve(&base, &ReceiverProfile::empty());
        assert_eq!(*resolved, base);
    }

    #[test]
    fn test_resolve_full_overlay_wins_everywhere() {
        let overlay = other_profile();
        let resolved = resolve(&full_profile(), &overlay);
        assert_eq!(*resolved, overlay);
    }

    #[test]
    fn test_resolve_onto_empty_base() {
        let overlay = ReceiverProfile {
            zoom: Some(5),
            ..Default::default()
        };
        let resolved = resolve(&ReceiverProfile::empty(), &overlay);
        assert_eq!(*resolved, overlay);
    }

    #[test]
    fn test_resolve_partial_overlay() {
        let overlay = ReceiverProfile {
            mode: Some("am".into()),
            volume: Some(20),
            ..Default::default()
        };
        let resolved = resolve(&full_profile(), &overlay);

        assert_eq!(resolved.mode.as_deref(), Some("am"));
        assert_eq!(resolved.volume, Some(20));
        assert_eq!(resolved.freq, Some(7074.0));
        assert_eq!(resolved.zoom, Some(10));
        assert_eq!(resolved.extension.as_deref(), Some("ft8"));
    }

    #[test]
    fn test_resolve_falsy_overrides_are_not_unset() {
        let overlay = ReceiverProfile {
            mute: Some(false),
            wf_auto: Some(false),
            zoom: Some(0),
            freq: Some(0.0),
            keys: Some(String::new()),
            ..Default::default()
        };
        let resolved = resolve(&full_profile(), &overlay);

        assert_eq!(resolved.mute, Some(false));
        assert_eq!(resolved.wf_auto, Some(false));
        assert_eq!(resolved.zoom, Some(0));
        assert_eq!(resolved.freq, Some(0.0));
        assert_eq!(resolved.keys.as_deref(), Some(""));
    }

    #[test]
    fn test_resolve_unset_in_both_stays_unset() {
        let base = ReceiverProfile {
            freq: Some(10000.0),
            ..Default::default()
        };
        let overlay = ReceiverProfile {
            mode: Some("am".into()),
            ..Default::default()
        };
        let resolved = resolve(&base, &overlay);
        assert_eq!(resolved.zoom, None);
        assert_eq!(resolved.mute, None);
        assert_eq!(resolved.user, None);
    }

    #[test]
    fn test_serialize_empty_overlay_is_idempotent() {
        let base = full_profile();
        let resolved = resolve(&base, &ReceiverProfile::empty());
        assert_eq!(serialize(&resolved), serialize(&base));
        assert_eq!(resolved.to_query().encode(), base.to_query().encode());
    }

    #[test]
    fn test_frequency_and_mode() {
        let profile = ReceiverProfile {
            freq: Some(14200.0),
            mode: Some("usb".into()),
            ..Default::default()
        };
        let query = profile.to_query();
        assert_eq!(query.get("f"), Some("14200,usb"));
        assert_eq!(query.encode(), "?f=14200%2Cusb");
    }

    #[test]
    fn test_mode_only() {
        let profile = ReceiverProfile {
            mode: Some("usb".into()),
            ..Default::default()
        };
        assert_eq!(profile.to_query().get("f"), Some(",usb"));
    }

    #[test]
    fn test_frequency_only() {
        let profile = ReceiverProfile {
            freq: Some(7074.5),
            ..Default::default()
        };
        assert_eq!(profile.to_query().get("f"), Some("7074.5"));
    }

    #[test]
    fn test_zero_frequency_behaves_as_unset() {
        let profile = ReceiverProfile {
            freq: Some(0.0),
            mode: Some("am".into()),
            ..Default::default()
        };
        assert_eq!(profile.to_query().get("f"), Some(",am"));
    }

    #[test]
    fn test_neither_frequency_nor_mode() {
        let profile = ReceiverProfile {
            zoom: Some(2),
            ..Default::default()
        };
        let query = profile.to_query();
        assert_eq!(query.get("f"), None);
        assert_eq!(query.encode(), "?z=2");
    }

    #[test]
    fn test_empty_profile_encodes_to_bare_prefix() {
        let query = ReceiverProfile::empty().to_query();
        assert!(query.is_empty());
        assert_eq!(query.to_string(), "?");
    }

    #[test]
    fn test_full_profile_key_order() {
        let keys: Vec<_> = full_profile().to_query().keys().collect();
        assert_eq!(
            keys,
            vec![
                "f", "z", "vol", "pbw", "pbc", "cmap", "wf", "wfm", "wfa", "wfi", "sqrt", "mute",
                "mem", "keys", "user", "pwd", "ext"
            ]
        );
    }

    #[test]
    fn test_boolean_flags() {
        let query = full_profile().to_query();
        assert_eq!(query.get("wfa"), Some("1"));
        assert_eq!(query.get("mute"), Some(""));

        let query = other_profile().to_query();
        assert_eq!(query.get("wfa"), None);
        assert_eq!(query.get("mute"), None);
    }

    #[test]
    fn test_falsy_values_are_omitted() {
        let profile = ReceiverProfile {
            zoom: Some(0),
            volume: Some(0),
            pb_width: Some(String::new()),
            user: Some(String::new()),
            ..Default::default()
        };
        assert!(profile.to_query().is_empty());
    }

    #[test]
    fn test_encoding_escapes_values() {
        let profile = ReceiverProfile {
            keys: Some("a b&c".into()),
            mute: Some(true),
            ..Default::default()
        };
        assert_eq!(profile.to_query().encode(), "?mute=&keys=a+b%26c");
    }

    #[test]
    fn test_profile_deserializes_sparse_json() {
        let profile: ReceiverProfile =
            serde_json::from_str(r#"{"freq": 14200, "mute": false, "zoom": 0}"#).unwrap();
        assert_eq!(profile.freq, Some(14200.0));
        assert_eq!(profile.mute, Some(false));
        assert_eq!(profile.zoom, Some(0));
        assert_eq!(profile.mode, None);
    }
}
