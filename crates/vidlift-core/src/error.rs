#![forbid(unsafe_code)]

//! Error types.
//!
//! Nothing here is allowed to reach the host page: the controller logs these
//! and aborts the one operation that produced them.

use thiserror::Error;

/// Rejection of a native media request (`play()`, `requestPictureInPicture()`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The browser refused the request (autoplay policy, missing user gesture,
    /// feature policy, ...).
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
    /// The target is not a media element.
    #[error("{0} is not a media element")]
    NotMedia(String),
}

/// A DOM mutation that could not be applied because a node it depends on is
/// no longer in the expected place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("reference node has no parent")]
    Detached,
    #[error("dom operation failed: {0}")]
    Operation(String),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum VidliftError {
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
    #[error("unrecognized command: {0}")]
    Command(#[source] serde_json::Error),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_error_display_names_operation() {
        let err = MediaError::Rejected {
            operation: "play",
            reason: "NotAllowedError".into(),
        };
        assert_eq!(err.to_string(), "play rejected: NotAllowedError");
    }

    #[test]
    fn dom_error_converts_into_top_level() {
        let err: VidliftError = DomError::Detached.into();
        assert_eq!(err.to_string(), "reference node has no parent");
    }
}
