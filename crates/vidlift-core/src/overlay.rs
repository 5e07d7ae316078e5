#![forbid(unsafe_code)]

//! Overlay lifecycle: lift a live video out of the page into a floating,
//! draggable, resizable container, and put it back losslessly.
//!
//! # Invariants
//!
//! 1. At most one overlay per video. Membership is an out-of-band tag
//!    ([`OVERLAID_MARKER`]) on the video itself, so the registry never has to
//!    be consulted by identity and a video discarded by the page carries its
//!    membership away with it.
//! 2. A placeholder with the video's original box and `display` holds the
//!    video's slot for exactly as long as the overlay exists.
//! 3. On detach the video goes back before its placeholder *before* the
//!    placeholder is removed, so the page never reflows around an empty slot.
//! 4. The preserved inline style properties are restored exactly as captured.
//!
//! # Failure Modes
//!
//! - If the page removed the placeholder's parent in the meantime, detach
//!   skips the reinsertion, logs, and still tears the overlay down.
//! - [`OverlayManager::detach_all`] is the emergency path: it removes every
//!   marked element from the document and restores nothing.

use tracing::{debug, info, warn};

use crate::config::VidliftConfig;
use crate::controls::ControlSurface;
use crate::error::DomError;
use crate::geometry::{Point, px};
use crate::host::{
    HostDocument, HostMedia, OVERLAID_MARKER, OVERLAY_MARKER, PLACEHOLDER_MARKER,
    PRESERVED_STYLE_PROPERTIES, ROLE_ATTRIBUTE, Role, closest_role,
};
use crate::theme::ThemeColors;

/// Overlay identifier, unique for the lifetime of one [`OverlayManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u32);

impl OverlayId {
    fn attribute_value(self) -> String {
        self.0.to_string()
    }

    fn parse(value: &str) -> Option<Self> {
        value.parse().ok().map(Self)
    }
}

/// Create an element, stamp its role, and apply inline styles.
pub(crate) fn create_part<D: HostDocument>(
    dom: &mut D,
    tag: &str,
    role: Option<Role>,
    styles: &[(&str, &str)],
) -> Result<D::Node, DomError> {
    let node = dom.create_element(tag)?;
    if let Some(role) = role {
        dom.set_attribute(&node, ROLE_ATTRIBUTE, role.as_str());
    }
    for (property, value) in styles {
        dom.set_style(&node, property, value);
    }
    Ok(node)
}

/// Inline style values of [`PRESERVED_STYLE_PROPERTIES`], in that order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineStyleSnapshot {
    values: [String; PRESERVED_STYLE_PROPERTIES.len()],
}

impl InlineStyleSnapshot {
    pub fn capture<D: HostDocument>(dom: &D, node: &D::Node) -> Self {
        Self {
            values: PRESERVED_STYLE_PROPERTIES.map(|property| dom.style(node, property)),
        }
    }

    pub fn restore<D: HostDocument>(&self, dom: &mut D, node: &D::Node) {
        for (property, value) in PRESERVED_STYLE_PROPERTIES.iter().zip(&self.values) {
            dom.set_style(node, property, value);
        }
    }

    /// Captured value for one preserved property.
    pub fn get(&self, property: &str) -> Option<&str> {
        PRESERVED_STYLE_PROPERTIES
            .iter()
            .position(|candidate| *candidate == property)
            .map(|index| self.values[index].as_str())
    }
}

/// One live overlay.
#[derive(Debug, Clone)]
pub struct Overlay<N> {
    id: OverlayId,
    video: N,
    placeholder: N,
    root: N,
    region: N,
    controls: ControlSurface<N>,
    original_style: InlineStyleSnapshot,
    original_native_controls: bool,
    /// Document-space top-left corner.
    position: Point,
}

impl<N> Overlay<N> {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn video(&self) -> &N {
        &self.video
    }

    pub fn placeholder(&self) -> &N {
        &self.placeholder
    }

    pub fn root(&self) -> &N {
        &self.root
    }

    pub fn controls(&self) -> &ControlSurface<N> {
        &self.controls
    }

    pub fn original_style(&self) -> &InlineStyleSnapshot {
        &self.original_style
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached(OverlayId),
    /// The video already lives in this overlay; nothing changed.
    AlreadyAttached(OverlayId),
}

impl AttachOutcome {
    pub const fn id(self) -> OverlayId {
        match self {
            Self::Attached(id) | Self::AlreadyAttached(id) => id,
        }
    }
}

/// What a detach managed to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachReport {
    pub id: OverlayId,
    /// `false` when the original slot was gone and the video could not be
    /// put back.
    pub position_restored: bool,
}

#[derive(Debug, Clone)]
struct DragState {
    overlay: OverlayId,
    pointer_origin: Point,
    start_position: Point,
    saved_user_select: String,
}

/// Owns every live overlay and the drag in progress, if any.
#[derive(Debug, Clone)]
pub struct OverlayManager<N> {
    overlays: Vec<Overlay<N>>,
    next_id: u32,
    drag: Option<DragState>,
    z_index: i64,
    drag_label: String,
    resize_grip: f64,
}

impl<N: Clone + PartialEq + core::fmt::Debug> OverlayManager<N> {
    pub fn new(config: &VidliftConfig) -> Self {
        Self {
            overlays: Vec::new(),
            next_id: 1,
            drag: None,
            z_index: config.overlay_z_index,
            drag_label: config.drag_label.clone(),
            resize_grip: config.resize_grip_px,
        }
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay<N>> {
        self.overlays.iter().find(|overlay| overlay.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay<N>> {
        self.overlays.iter()
    }

    /// Overlay currently hosting `video`.
    pub fn overlay_for_video<D: HostDocument<Node = N>>(
        &self,
        dom: &D,
        video: &N,
    ) -> Option<OverlayId> {
        let id = OverlayId::parse(&dom.attribute(video, OVERLAID_MARKER)?)?;
        self.get(id).map(Overlay::id)
    }

    /// Overlay whose container holds `node`.
    pub fn overlay_containing<D: HostDocument<Node = N>>(
        &self,
        dom: &D,
        node: &N,
    ) -> Option<OverlayId> {
        let id = OverlayId(crate::host::owning_overlay(dom, node)?);
        self.get(id).map(Overlay::id)
    }

    pub fn dragging(&self) -> Option<OverlayId> {
        self.drag.as_ref().map(|drag| drag.overlay)
    }

    /// Lift `video` into a new overlay. A video that is already overlaid is
    /// left alone.
    pub fn attach<D: HostMedia<Node = N>>(
        &mut self,
        dom: &mut D,
        video: &N,
        colors: &ThemeColors,
    ) -> Result<AttachOutcome, DomError> {
        if let Some(existing) = self.overlay_for_video(dom, video) {
            debug!(overlay = existing.0, "video already overlaid");
            return Ok(AttachOutcome::AlreadyAttached(existing));
        }

        let rect = dom.bounding_rect(video);
        let original_style = InlineStyleSnapshot::capture(dom, video);
        let original_native_controls = dom.native_controls(video);
        let display = dom.computed_display(video);

        let width = px(rect.width);
        let height = px(rect.height);
        let id = OverlayId(self.next_id);
        let position = rect.to_document(dom.scroll_offset());
        let position = Point::new(position.x, position.y);

        // The whole overlay is assembled detached; the page is first touched
        // by the placeholder insertion below.
        let placeholder = create_part(
            dom,
            "div",
            None,
            &[
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("display", display.as_str()),
            ],
        )?;
        dom.set_attribute(&placeholder, PLACEHOLDER_MARKER, "true");

        let z_index = self.z_index.to_string();
        let left = px(position.x);
        let top = px(position.y);
        let root = create_part(
            dom,
            "div",
            Some(Role::Overlay),
            &[
                ("position", "absolute"),
                ("left", left.as_str()),
                ("top", top.as_str()),
                ("z-index", z_index.as_str()),
                ("display", "inline-block"),
                ("overflow", "visible"),
            ],
        )?;
        dom.set_attribute(&root, OVERLAY_MARKER, &id.attribute_value());

        let drag_bar = create_part(
            dom,
            "div",
            Some(Role::DragBar),
            &[
                ("height", "17px"),
                ("background", colors.drag_background),
                ("color", colors.drag_foreground),
                ("cursor", "move"),
                ("user-select", "none"),
                ("text-align", "center"),
                ("font-size", "12px"),
                ("position", "relative"),
                ("display", "flex"),
                ("align-items", "center"),
                ("justify-content", "center"),
            ],
        )?;
        dom.set_text(&drag_bar, &self.drag_label);
        dom.append_child(&root, &drag_bar);

        let dismiss = create_part(
            dom,
            "button",
            Some(Role::Dismiss),
            &[
                ("position", "absolute"),
                ("right", "4px"),
                ("top", "2px"),
                ("background", "none"),
                ("border", "none"),
                ("outline", "none"),
                ("color", colors.dismiss_foreground),
                ("font-size", "12px"),
                ("cursor", "pointer"),
                ("padding", "0"),
                ("line-height", "1"),
            ],
        )?;
        dom.set_text(&dismiss, "\u{2716}");
        dom.append_child(&drag_bar, &dismiss);

        let region = create_part(
            dom,
            "div",
            Some(Role::ResizeRegion),
            &[
                ("resize", "both"),
                ("overflow", "hidden"),
                ("position", "relative"),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("background-color", "black"),
            ],
        )?;
        dom.append_child(&root, &region);
        let controls = ControlSurface::build(dom, &root, video, colors)?;

        dom.insert_before(&placeholder, video)?;
        self.next_id = self.next_id.saturating_add(1);
        let body = dom.body();
        dom.append_child(&body, &root);

        dom.set_native_controls(video, false);
        for (property, value) in [
            ("position", "static"),
            ("width", "100%"),
            ("height", "100%"),
            ("display", "block"),
            ("z-index", "auto"),
        ] {
            dom.set_style(video, property, value);
        }
        dom.append_child(&region, video);
        dom.set_attribute(video, OVERLAID_MARKER, &id.attribute_value());

        debug!(overlay = id.0, x = position.x, y = position.y, "overlay attached");
        self.overlays.push(Overlay {
            id,
            video: video.clone(),
            placeholder,
            root,
            region,
            controls,
            original_style,
            original_native_controls,
            position,
        });
        Ok(AttachOutcome::Attached(id))
    }

    /// Put the video back where it came from and remove the overlay.
    /// Returns `None` when `id` is not live.
    pub fn detach<D: HostMedia<Node = N>>(
        &mut self,
        dom: &mut D,
        id: OverlayId,
    ) -> Option<DetachReport> {
        let index = self.overlays.iter().position(|overlay| overlay.id == id)?;
        if self.dragging() == Some(id) {
            self.end_drag(dom);
        }
        let overlay = self.overlays.remove(index);

        let position_restored = match dom.insert_before(&overlay.video, &overlay.placeholder) {
            Ok(()) => true,
            Err(error) => {
                warn!(overlay = id.0, %error, "original slot gone; video not reinserted");
                false
            }
        };
        dom.remove(&overlay.placeholder);
        dom.remove(&overlay.root);

        overlay.original_style.restore(dom, &overlay.video);
        dom.set_native_controls(&overlay.video, overlay.original_native_controls);
        dom.remove_attribute(&overlay.video, OVERLAID_MARKER);

        debug!(overlay = id.0, position_restored, "overlay detached");
        Some(DetachReport {
            id,
            position_restored,
        })
    }

    /// Remove every overlay and placeholder in the document, tracked or not,
    /// without restoring anything. Returns the number of elements removed.
    pub fn detach_all<D: HostDocument<Node = N>>(&mut self, dom: &mut D) -> usize {
        self.end_drag(dom);
        let mut removed = 0;
        for selector in [
            format!("[{OVERLAY_MARKER}]"),
            format!("[{PLACEHOLDER_MARKER}]"),
        ] {
            for node in dom.query_all(&selector) {
                dom.remove(&node);
                removed += 1;
            }
        }
        for overlay in self.overlays.drain(..) {
            dom.remove_attribute(&overlay.video, OVERLAID_MARKER);
        }
        info!(removed, "all overlays removed");
        removed
    }

    /// Begin dragging if `target` is a drag surface. Presses on interactive
    /// controls, the video region, or the resize grip never drag.
    pub fn begin_drag<D: HostDocument<Node = N>>(
        &mut self,
        dom: &mut D,
        target: &N,
        client: Point,
        page: Point,
    ) -> bool {
        let Some((role, _)) = closest_role(dom, target) else {
            return false;
        };
        if !matches!(role, Role::DragBar | Role::Overlay) {
            return false;
        }
        let Some(id) = self.overlay_containing(dom, target) else {
            return false;
        };
        let Some(overlay) = self.get(id) else {
            return false;
        };
        let grip = self.resize_grip;
        if dom.bounding_rect(&overlay.root).in_bottom_right_corner(client, grip)
            || dom.bounding_rect(&overlay.region).in_bottom_right_corner(client, grip)
        {
            return false;
        }
        let start_position = overlay.position;

        self.end_drag(dom);
        let body = dom.body();
        let saved_user_select = dom.style(&body, "user-select");
        dom.set_style(&body, "user-select", "none");
        self.drag = Some(DragState {
            overlay: id,
            pointer_origin: page,
            start_position,
            saved_user_select,
        });
        debug!(overlay = id.0, "drag started");
        true
    }

    /// Follow the pointer during a drag. Returns whether a drag is active.
    pub fn drag_move<D: HostDocument<Node = N>>(&mut self, dom: &mut D, page: Point) -> bool {
        let Some(drag) = &self.drag else {
            return false;
        };
        let target = drag
            .start_position
            .offset(page.delta_from(drag.pointer_origin));
        let id = drag.overlay;
        let Some(overlay) = self.overlays.iter_mut().find(|overlay| overlay.id == id) else {
            self.drag = None;
            return false;
        };
        overlay.position = target;
        dom.set_style(&overlay.root, "left", &px(target.x));
        dom.set_style(&overlay.root, "top", &px(target.y));
        true
    }

    /// Finish the drag in progress. Returns whether one was active.
    pub fn end_drag<D: HostDocument<Node = N>>(&mut self, dom: &mut D) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let body = dom.body();
        dom.set_style(&body, "user-select", &drag.saved_user_select);
        debug!(overlay = drag.overlay.0, "drag ended");
        true
    }
}
