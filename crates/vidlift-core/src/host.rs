#![forbid(unsafe_code)]

//! Host traits: the boundary between vidlift logic and a concrete page.
//!
//! The logic in this crate never touches a browser directly. Everything goes
//! through [`Host`], which `vidlift-web` implements over `web-sys` and
//! [`MemoryHost`](crate::memory::MemoryHost) implements in memory for tests.
//!
//! All methods are synchronous. Native calls that return promises (`play()`,
//! `requestPictureInPicture()`) are fire-and-forget: a synchronous failure is
//! returned, an asynchronous rejection is logged by the implementation via
//! [`media::log_rejection`](crate::media::log_rejection).

use core::fmt::Debug;

use crate::error::{DomError, MediaError};
use crate::geometry::{Point, Rect};
use crate::media::MediaState;

/// Attribute carried by every overlay container.
pub const OVERLAY_MARKER: &str = "data-vidlift-overlay";
/// Attribute carried by every placeholder.
pub const PLACEHOLDER_MARKER: &str = "data-vidlift-placeholder";
/// Attribute stamped on a video while it is hosted by an overlay. Its value
/// is the overlay id.
pub const OVERLAID_MARKER: &str = "data-vidlift-overlaid";
/// Attribute naming the part an element plays inside an overlay.
pub const ROLE_ATTRIBUTE: &str = "data-vidlift-role";

/// Inline style properties snapshotted on attach and restored on detach.
pub const PRESERVED_STYLE_PROPERTIES: [&str; 5] =
    ["position", "width", "height", "display", "z-index"];

/// Document tree, style, and listener access.
pub trait HostDocument {
    /// Element handle. Equality is node identity.
    type Node: Clone + PartialEq + Debug;

    fn body(&self) -> Self::Node;

    /// Current document address (`location.href`).
    fn location(&self) -> String;

    /// Topmost hit-testable element at a viewport point (`elementFromPoint`).
    fn element_from_point(&self, point: Point) -> Option<Self::Node>;

    /// Upper-case tag name, e.g. `"VIDEO"`.
    fn tag_name(&self, node: &Self::Node) -> String;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Result<Self::Node, DomError>;

    /// Append `child` as the last child of `parent`, moving it if attached.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Insert `node` immediately before `reference` in `reference`'s parent.
    fn insert_before(&mut self, node: &Self::Node, reference: &Self::Node) -> Result<(), DomError>;

    /// Detach `node` from its parent. No-op when already detached.
    fn remove(&mut self, node: &Self::Node);

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    /// Inline style value; empty string when unset.
    fn style(&self, node: &Self::Node, property: &str) -> String;

    /// Set an inline style value; an empty value removes the property.
    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str);

    /// Computed `display` value.
    fn computed_display(&self, node: &Self::Node) -> String;

    /// Viewport-space bounding box.
    fn bounding_rect(&self, node: &Self::Node) -> Rect;

    /// Current `(scrollX, scrollY)`.
    fn scroll_offset(&self) -> Point;

    fn set_text(&mut self, node: &Self::Node, text: &str);

    /// `querySelectorAll` over the whole document, in document order.
    fn query_all(&self, selector: &str) -> Vec<Self::Node>;

    /// Set an `<input>`'s current value.
    fn set_input_value(&mut self, node: &Self::Node, value: &str);

    /// Set a checkbox's checked state.
    fn set_checked(&mut self, node: &Self::Node, checked: bool);

    /// Install or remove the picker's capturing click listener and keydown
    /// listener. The two are always switched together.
    fn set_selection_listeners(&mut self, installed: bool);
}

/// Native media element control.
pub trait HostMedia: HostDocument {
    fn media_state(&self, video: &Self::Node) -> MediaState;

    /// Whether the browser's built-in controls are shown (`controls`).
    fn native_controls(&self, video: &Self::Node) -> bool;

    /// Toggle the browser's built-in controls.
    fn set_native_controls(&mut self, video: &Self::Node, enabled: bool);

    fn play(&mut self, video: &Self::Node) -> Result<(), MediaError>;

    fn pause(&mut self, video: &Self::Node);

    fn set_muted(&mut self, video: &Self::Node, muted: bool);

    fn set_volume(&mut self, video: &Self::Node, volume: f64);

    fn set_current_time(&mut self, video: &Self::Node, seconds: f64);

    fn set_loop(&mut self, video: &Self::Node, looping: bool);

    fn request_picture_in_picture(&mut self, video: &Self::Node) -> Result<(), MediaError>;
}

/// Stored user preferences and OS signals.
pub trait HostPreferences {
    /// Read one stored preference.
    fn preference(&self, key: &str) -> Option<String>;

    /// Whether the OS reports a dark color scheme
    /// (`prefers-color-scheme: dark`).
    fn prefers_dark_scheme(&self) -> bool;
}

/// Unified host combining document, media, and preference access.
pub trait Host: HostMedia + HostPreferences {}

impl<T: HostMedia + HostPreferences> Host for T {}

/// The part an element plays inside an overlay, stamped as
/// [`ROLE_ATTRIBUTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Overlay,
    DragBar,
    Dismiss,
    ResizeRegion,
    Controls,
    PlayPause,
    Mute,
    Volume,
    Seek,
    Loop,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overlay => "overlay",
            Self::DragBar => "drag-bar",
            Self::Dismiss => "dismiss",
            Self::ResizeRegion => "resize-region",
            Self::Controls => "controls",
            Self::PlayPause => "play-pause",
            Self::Mute => "mute",
            Self::Volume => "volume",
            Self::Seek => "seek",
            Self::Loop => "loop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "overlay" => Self::Overlay,
            "drag-bar" => Self::DragBar,
            "dismiss" => Self::Dismiss,
            "resize-region" => Self::ResizeRegion,
            "controls" => Self::Controls,
            "play-pause" => Self::PlayPause,
            "mute" => Self::Mute,
            "volume" => Self::Volume,
            "seek" => Self::Seek,
            "loop" => Self::Loop,
            _ => return None,
        })
    }

    /// Interactive controls swallow pointer input so it never starts a drag.
    pub const fn is_interactive(self) -> bool {
        matches!(
            self,
            Self::Dismiss | Self::PlayPause | Self::Mute | Self::Volume | Self::Seek | Self::Loop
        )
    }
}

/// Whether `node` is a video element.
pub fn is_video<D: HostDocument>(dom: &D, node: &D::Node) -> bool {
    dom.tag_name(node).eq_ignore_ascii_case("video")
}

/// Walk from `node` up to the nearest ancestor (inclusive) carrying a role.
pub fn closest_role<D: HostDocument>(dom: &D, node: &D::Node) -> Option<(Role, D::Node)> {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if let Some(role) = dom
            .attribute(&candidate, ROLE_ATTRIBUTE)
            .as_deref()
            .and_then(Role::parse)
        {
            return Some((role, candidate));
        }
        current = dom.parent(&candidate);
    }
    None
}

/// Walk from `node` up to the overlay container it belongs to and return its
/// id.
pub fn owning_overlay<D: HostDocument>(dom: &D, node: &D::Node) -> Option<u32> {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if let Some(id) = dom.attribute(&candidate, OVERLAY_MARKER) {
            return id.parse().ok();
        }
        current = dom.parent(&candidate);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_attribute_value() {
        for role in [
            Role::Overlay,
            Role::DragBar,
            Role::Dismiss,
            Role::ResizeRegion,
            Role::Controls,
            Role::PlayPause,
            Role::Mute,
            Role::Volume,
            Role::Seek,
            Role::Loop,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("video"), None);
    }

    #[test]
    fn drag_surfaces_are_not_interactive() {
        assert!(!Role::DragBar.is_interactive());
        assert!(!Role::Overlay.is_interactive());
        assert!(!Role::ResizeRegion.is_interactive());
        assert!(Role::Seek.is_interactive());
    }
}
