#![forbid(unsafe_code)]

//! Commands posted by the popup / background script.
//!
//! Wire form is a tagged JSON object:
//!
//! ```json
//! { "type": "PICK_VIDEO", "mode": "pip" }
//! { "type": "AUTO_RESIZE_ALL_VIDEOS" }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::VidliftError;

/// What happens to the video a picker session resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickMode {
    /// Lift the video into a floating overlay.
    #[default]
    Resize,
    /// Hand the video to the browser's picture-in-picture window.
    Pip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    PickVideo {
        #[serde(default)]
        mode: PickMode,
    },
    AutoResizeAllVideos,
}

impl Command {
    pub fn from_json_str(s: &str) -> Result<Self, VidliftError> {
        serde_json::from_str(s).map_err(VidliftError::Command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_video_mode_defaults_to_resize() {
        assert_eq!(
            Command::from_json_str(r#"{"type":"PICK_VIDEO"}"#).expect("parses"),
            Command::PickVideo {
                mode: PickMode::Resize
            }
        );
    }

    #[test]
    fn pick_video_pip_mode() {
        assert_eq!(
            Command::from_json_str(r#"{"type":"PICK_VIDEO","mode":"pip"}"#).expect("parses"),
            Command::PickVideo {
                mode: PickMode::Pip
            }
        );
    }

    #[test]
    fn auto_resize_ignores_extra_fields() {
        assert_eq!(
            Command::from_json_str(r#"{"type":"AUTO_RESIZE_ALL_VIDEOS","tabId":4}"#)
                .expect("parses"),
            Command::AutoResizeAllVideos
        );
    }

    #[test]
    fn unknown_type_is_command_error() {
        let err = Command::from_json_str(r#"{"type":"INJECT_PICKER"}"#).unwrap_err();
        assert!(matches!(err, VidliftError::Command(_)));
    }

    #[test]
    fn serializes_to_wire_form() {
        let json = serde_json::to_string(&Command::PickVideo {
            mode: PickMode::Pip,
        })
        .expect("serializes");
        assert_eq!(json, r#"{"type":"PICK_VIDEO","mode":"pip"}"#);
    }
}
