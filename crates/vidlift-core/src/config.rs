#![forbid(unsafe_code)]

//! Tunables for the content script, loadable from JSON.
//!
//! Every field defaults to the value the extension ships with, so
//! `VidliftConfig::default()` and `VidliftConfig::from_json_str("{}")` behave
//! identically.
//!
//! ```
//! use vidlift_core::config::{ReentryPolicy, VidliftConfig};
//!
//! let config = VidliftConfig::from_json_str(r#"{ "reentry": "restart" }"#).unwrap();
//! assert_eq!(config.reentry, ReentryPolicy::Restart);
//! assert_eq!(config.probe_limit, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::VidliftError;

/// Default bound on occlusion-probe iterations.
pub const DEFAULT_PROBE_LIMIT: usize = 10;

/// One below the 32-bit maximum so page content using `i32::MAX` still loses
/// ties to nothing but itself.
pub const DEFAULT_OVERLAY_Z_INDEX: i64 = 2_147_483_646;

/// What to do with a `PICK_VIDEO` command while a picker session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Drop the request; the live session continues unchanged.
    #[default]
    Ignore,
    /// Cancel the live session, then start a new one.
    Restart,
}

/// Storage keys consulted through [`HostPreferences`](crate::host::HostPreferences).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceKeys {
    pub theme: String,
    pub auto_resize_all: String,
}

impl Default for PreferenceKeys {
    fn default() -> Self {
        Self {
            theme: "theme".into(),
            auto_resize_all: "autoResizeAll".into(),
        }
    }
}

/// Content-script configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VidliftConfig {
    /// Maximum elements peeled off by one occlusion probe.
    pub probe_limit: usize,
    /// Stacking order given to overlays.
    pub overlay_z_index: i64,
    /// Body cursor while a picker session is live.
    pub picker_cursor: String,
    pub reentry: ReentryPolicy,
    pub preference_keys: PreferenceKeys,
    /// Edge length of the native resize grip, in CSS pixels. Presses inside
    /// it never start a drag.
    pub resize_grip_px: f64,
    pub drag_label: String,
}

impl Default for VidliftConfig {
    fn default() -> Self {
        Self {
            probe_limit: DEFAULT_PROBE_LIMIT,
            overlay_z_index: DEFAULT_OVERLAY_Z_INDEX,
            picker_cursor: "crosshair".into(),
            reentry: ReentryPolicy::default(),
            preference_keys: PreferenceKeys::default(),
            resize_grip_px: 16.0,
            drag_label: "Drag me".into(),
        }
    }
}

impl VidliftConfig {
    /// Load from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, VidliftError> {
        serde_json::from_str(s).map_err(VidliftError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_matches_default() {
        let parsed = VidliftConfig::from_json_str("{}").expect("empty object parses");
        assert_eq!(parsed, VidliftConfig::default());
    }

    #[test]
    fn partial_nested_keys_keep_other_defaults() {
        let parsed =
            VidliftConfig::from_json_str(r#"{ "preference_keys": { "theme": "vidlift.theme" } }"#)
                .expect("parses");
        assert_eq!(parsed.preference_keys.theme, "vidlift.theme");
        assert_eq!(parsed.preference_keys.auto_resize_all, "autoResizeAll");
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = VidliftConfig::from_json_str("{ probe_limit: }").unwrap_err();
        assert!(matches!(err, VidliftError::Config(_)));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(VidliftConfig::from_json_str(r#"{ "reentry": "queue" }"#).is_err());
    }
}
