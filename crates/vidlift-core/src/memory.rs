#![forbid(unsafe_code)]

//! Deterministic in-memory host.
//!
//! [`MemoryHost`] models just enough of a browser document to drive every
//! vidlift component without a browser:
//! - a node arena rooted at `<body>`, with attributes and inline styles,
//! - hit testing ordered by inherited `z-index` then document order, skipping
//!   nodes whose effective `pointer-events` is `none`,
//! - per-video [`MediaState`] with scriptable `play()` / PiP rejection,
//! - counters for the picker's selection listeners.
//!
//! Layout is not computed: tests assign bounding rects explicitly.

use std::collections::{BTreeMap, HashMap};

use crate::error::{DomError, MediaError};
use crate::geometry::{Point, Rect};
use crate::host::{HostDocument, HostMedia, HostPreferences};
use crate::media::MediaState;

/// Node handle into a [`MemoryHost`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

const BODY: NodeId = NodeId(0);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    rect: Rect,
    computed_display: Option<String>,
    text: String,
    value: String,
    checked: bool,
    media: Option<MediaState>,
    native_controls: bool,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_uppercase();
        let media = matches!(tag.as_str(), "VIDEO" | "AUDIO").then(MediaState::default);
        Self {
            native_controls: media.is_some(),
            tag,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            rect: Rect::default(),
            computed_display: None,
            text: String::new(),
            value: String::new(),
            checked: false,
            media,
        }
    }
}

/// Listener bookkeeping, exposed for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerCounts {
    pub click_capture: usize,
    pub keydown: usize,
}

/// In-memory document implementing [`Host`](crate::host::Host).
#[derive(Debug, Clone)]
pub struct MemoryHost {
    nodes: Vec<NodeData>,
    location: String,
    scroll: Point,
    listeners: ListenerCounts,
    preferences: HashMap<String, String>,
    prefers_dark: bool,
    play_rejection: Option<String>,
    pip_rejection: Option<String>,
    pip_requests: Vec<NodeId>,
    rejected_tags: Vec<String>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl MemoryHost {
    /// Create a document whose `<body>` covers a `width` x `height` viewport.
    pub fn new(width: f64, height: f64) -> Self {
        let mut body = NodeData::new("body");
        body.rect = Rect::new(0.0, 0.0, width, height);
        Self {
            nodes: vec![body],
            location: "https://example.test/".into(),
            scroll: Point::default(),
            listeners: ListenerCounts::default(),
            preferences: HashMap::new(),
            prefers_dark: false,
            play_rejection: None,
            pip_rejection: None,
            pip_requests: Vec::new(),
            rejected_tags: Vec::new(),
        }
    }

    fn allocate(&mut self, tag: &str) -> NodeId {
        self.nodes.push(NodeData::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element under `parent` with a bounding rect.
    pub fn add_element(&mut self, parent: NodeId, tag: &str, rect: Rect) -> NodeId {
        let id = self.allocate(tag);
        self.nodes[id.0].rect = rect;
        self.append_child(&parent, &id);
        id
    }

    /// Shorthand for `add_element(parent, "video", rect)`.
    pub fn add_video(&mut self, parent: NodeId, rect: Rect) -> NodeId {
        self.add_element(parent, "video", rect)
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node.0].rect = rect;
    }

    pub fn set_computed_display(&mut self, node: NodeId, display: &str) {
        self.nodes[node.0].computed_display = Some(display.to_owned());
    }

    pub fn set_location(&mut self, href: &str) {
        self.location = href.to_owned();
    }

    pub fn set_scroll(&mut self, scroll: Point) {
        self.scroll = scroll;
    }

    pub fn set_preference(&mut self, key: &str, value: &str) {
        self.preferences.insert(key.to_owned(), value.to_owned());
    }

    pub fn set_prefers_dark(&mut self, dark: bool) {
        self.prefers_dark = dark;
    }

    /// Make subsequent `play()` calls fail with `reason` (`None` to accept).
    pub fn reject_play(&mut self, reason: Option<&str>) {
        self.play_rejection = reason.map(str::to_owned);
    }

    /// Make subsequent PiP requests fail with `reason` (`None` to accept).
    pub fn reject_picture_in_picture(&mut self, reason: Option<&str>) {
        self.pip_rejection = reason.map(str::to_owned);
    }

    /// Make `create_element(tag)` fail from now on.
    pub fn reject_element_creation(&mut self, tag: &str) {
        self.rejected_tags.push(tag.to_owned());
    }

    /// Videos that successfully entered picture-in-picture, in order.
    pub fn pip_requests(&self) -> &[NodeId] {
        &self.pip_requests
    }

    pub fn listener_counts(&self) -> ListenerCounts {
        self.listeners
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.nodes[node.0].text
    }

    pub fn input_value(&self, node: NodeId) -> &str {
        &self.nodes[node.0].value
    }

    pub fn is_checked(&self, node: NodeId) -> bool {
        self.nodes[node.0].checked
    }

    /// Direct access to a media element's state, for simulating playback.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a media element.
    pub fn media_mut(&mut self, node: NodeId) -> &mut MediaState {
        self.nodes[node.0]
            .media
            .as_mut()
            .expect("node is not a media element")
    }

    /// All inline style properties of a node.
    pub fn inline_style(&self, node: NodeId) -> &BTreeMap<String, String> {
        &self.nodes[node.0].style
    }

    /// Whether `node` is reachable from `<body>`.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == BODY {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// Connected nodes in document (pre-)order, starting with `<body>`.
    fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![BODY];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// First value of `property` found walking up from `node`.
    fn inherited_style(&self, node: NodeId, property: &str) -> Option<&str> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(value) = self.nodes[id.0].style.get(property) {
                return Some(value.as_str());
            }
            current = self.nodes[id.0].parent;
        }
        None
    }

    fn hit_testable(&self, node: NodeId) -> bool {
        self.inherited_style(node, "pointer-events") != Some("none")
    }

    /// Nearest numeric `z-index` walking up from `node` (`auto` defers to
    /// the parent).
    fn stacking_level(&self, node: NodeId) -> i64 {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(level) = self.nodes[id.0]
                .style
                .get("z-index")
                .and_then(|z| z.parse().ok())
            {
                return level;
            }
            current = self.nodes[id.0].parent;
        }
        0
    }

    fn matches_selector(&self, node: NodeId, selector: &str) -> bool {
        let data = &self.nodes[node.0];
        let (tag, attr) = match selector.find('[') {
            Some(start) => (
                &selector[..start],
                Some(selector[start + 1..].trim_end_matches(']')),
            ),
            None => (selector, None),
        };
        if !tag.is_empty() && !data.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
        match attr {
            None => true,
            Some(expr) => match expr.split_once('=') {
                Some((name, value)) => {
                    data.attributes.get(name).map(String::as_str) == Some(value.trim_matches('"'))
                }
                None => data.attributes.contains_key(expr),
            },
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }
}

impl HostDocument for MemoryHost {
    type Node = NodeId;

    fn body(&self) -> NodeId {
        BODY
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn element_from_point(&self, point: Point) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .enumerate()
            .filter(|(_, id)| self.nodes[id.0].rect.contains(point) && self.hit_testable(*id))
            .max_by_key(|(order, id)| (self.stacking_level(*id), *order))
            .map(|(_, id)| id)
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.nodes[node.0].tag.clone()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        if self.rejected_tags.iter().any(|rejected| rejected == tag) {
            return Err(DomError::Operation(format!("cannot create <{tag}>")));
        }
        Ok(self.allocate(tag))
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.detach(*child);
        self.nodes[child.0].parent = Some(*parent);
        self.nodes[parent.0].children.push(*child);
    }

    fn insert_before(&mut self, node: &NodeId, reference: &NodeId) -> Result<(), DomError> {
        let parent = self.nodes[reference.0].parent.ok_or(DomError::Detached)?;
        self.detach(*node);
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings
            .iter()
            .position(|child| child == reference)
            .ok_or(DomError::Detached)?;
        siblings.insert(index, *node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    fn remove(&mut self, node: &NodeId) {
        self.detach(*node);
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.nodes[node.0].attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.nodes[node.0]
            .attributes
            .insert(name.to_owned(), value.to_owned());
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        self.nodes[node.0].attributes.remove(name);
    }

    fn style(&self, node: &NodeId, property: &str) -> String {
        self.nodes[node.0]
            .style
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: &str) {
        let style = &mut self.nodes[node.0].style;
        if value.is_empty() {
            style.remove(property);
        } else {
            style.insert(property.to_owned(), value.to_owned());
        }
    }

    fn computed_display(&self, node: &NodeId) -> String {
        let data = &self.nodes[node.0];
        if let Some(display) = data.style.get("display") {
            return display.clone();
        }
        if let Some(display) = &data.computed_display {
            return display.clone();
        }
        match data.tag.as_str() {
            "DIV" | "BODY" | "SECTION" | "ARTICLE" | "MAIN" => "block".into(),
            _ => "inline".into(),
        }
    }

    fn bounding_rect(&self, node: &NodeId) -> Rect {
        self.nodes[node.0].rect
    }

    fn scroll_offset(&self) -> Point {
        self.scroll
    }

    fn set_text(&mut self, node: &NodeId, text: &str) {
        self.nodes[node.0].text = text.to_owned();
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|id| self.matches_selector(*id, selector))
            .collect()
    }

    fn set_input_value(&mut self, node: &NodeId, value: &str) {
        self.nodes[node.0].value = value.to_owned();
    }

    fn set_checked(&mut self, node: &NodeId, checked: bool) {
        self.nodes[node.0].checked = checked;
    }

    fn set_selection_listeners(&mut self, installed: bool) {
        let counts = &mut self.listeners;
        if installed {
            counts.click_capture += 1;
            counts.keydown += 1;
        } else {
            counts.click_capture = counts.click_capture.saturating_sub(1);
            counts.keydown = counts.keydown.saturating_sub(1);
        }
    }
}

impl HostMedia for MemoryHost {
    fn media_state(&self, video: &NodeId) -> MediaState {
        self.nodes[video.0].media.unwrap_or_default()
    }

    fn native_controls(&self, video: &NodeId) -> bool {
        self.nodes[video.0].native_controls
    }

    fn set_native_controls(&mut self, video: &NodeId, enabled: bool) {
        self.nodes[video.0].native_controls = enabled;
    }

    fn play(&mut self, video: &NodeId) -> Result<(), MediaError> {
        if let Some(reason) = &self.play_rejection {
            return Err(MediaError::Rejected {
                operation: "play",
                reason: reason.clone(),
            });
        }
        let tag = self.nodes[video.0].tag.clone();
        let media = self.nodes[video.0]
            .media
            .as_mut()
            .ok_or(MediaError::NotMedia(tag))?;
        media.paused = false;
        Ok(())
    }

    fn pause(&mut self, video: &NodeId) {
        if let Some(media) = self.nodes[video.0].media.as_mut() {
            media.paused = true;
        }
    }

    fn set_muted(&mut self, video: &NodeId, muted: bool) {
        if let Some(media) = self.nodes[video.0].media.as_mut() {
            media.muted = muted;
        }
    }

    fn set_volume(&mut self, video: &NodeId, volume: f64) {
        if let Some(media) = self.nodes[video.0].media.as_mut() {
            media.volume = volume;
        }
    }

    fn set_current_time(&mut self, video: &NodeId, seconds: f64) {
        if let Some(media) = self.nodes[video.0].media.as_mut() {
            media.current_time = seconds;
        }
    }

    fn set_loop(&mut self, video: &NodeId, looping: bool) {
        if let Some(media) = self.nodes[video.0].media.as_mut() {
            media.looping = looping;
        }
    }

    fn request_picture_in_picture(&mut self, video: &NodeId) -> Result<(), MediaError> {
        if let Some(reason) = &self.pip_rejection {
            return Err(MediaError::Rejected {
                operation: "requestPictureInPicture",
                reason: reason.clone(),
            });
        }
        if self.nodes[video.0].media.is_none() {
            return Err(MediaError::NotMedia(self.nodes[video.0].tag.clone()));
        }
        self.pip_requests.push(*video);
        Ok(())
    }
}

impl HostPreferences for MemoryHost {
    fn preference(&self, key: &str) -> Option<String> {
        self.preferences.get(key).cloned()
    }

    fn prefers_dark_scheme(&self) -> bool {
        self.prefers_dark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_prefers_later_sibling_at_same_level() {
        let mut host = MemoryHost::default();
        let body = host.body();
        let below = host.add_element(body, "div", Rect::new(0.0, 0.0, 100.0, 100.0));
        let above = host.add_element(body, "div", Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(host.element_from_point(Point::new(5.0, 5.0)), Some(above));
        host.set_style(&above, "pointer-events", "none");
        assert_eq!(host.element_from_point(Point::new(5.0, 5.0)), Some(below));
    }

    #[test]
    fn hit_test_honours_z_index() {
        let mut host = MemoryHost::default();
        let body = host.body();
        let raised = host.add_element(body, "div", Rect::new(0.0, 0.0, 50.0, 50.0));
        let _later = host.add_element(body, "div", Rect::new(0.0, 0.0, 50.0, 50.0));
        host.set_style(&raised, "z-index", "5");
        assert_eq!(host.element_from_point(Point::new(1.0, 1.0)), Some(raised));
    }

    #[test]
    fn pointer_events_none_is_inherited() {
        let mut host = MemoryHost::default();
        let body = host.body();
        let wrapper = host.add_element(body, "div", Rect::new(0.0, 0.0, 50.0, 50.0));
        let child = host.add_element(wrapper, "span", Rect::new(0.0, 0.0, 50.0, 50.0));
        host.set_style(&wrapper, "pointer-events", "none");
        assert_eq!(host.element_from_point(Point::new(1.0, 1.0)), Some(body));
        host.set_style(&child, "pointer-events", "auto");
        assert_eq!(host.element_from_point(Point::new(1.0, 1.0)), Some(child));
    }

    #[test]
    fn point_outside_viewport_hits_nothing() {
        let host = MemoryHost::new(100.0, 100.0);
        assert_eq!(host.element_from_point(Point::new(150.0, 10.0)), None);
    }

    #[test]
    fn insert_before_detached_reference_fails() {
        let mut host = MemoryHost::default();
        let orphan = host.create_element("div").expect("create");
        let node = host.create_element("div").expect("create");
        assert_eq!(host.insert_before(&node, &orphan), Err(DomError::Detached));
    }

    #[test]
    fn query_all_by_tag_and_attribute() {
        let mut host = MemoryHost::default();
        let body = host.body();
        let video = host.add_video(body, Rect::new(0.0, 0.0, 10.0, 10.0));
        let marked = host.add_element(body, "div", Rect::default());
        host.set_attribute(&marked, "data-x", "1");
        assert_eq!(host.query_all("video"), vec![video]);
        assert_eq!(host.query_all("[data-x]"), vec![marked]);
        assert_eq!(host.query_all("div[data-x=\"1\"]"), vec![marked]);
        assert!(host.query_all("[data-x=\"2\"]").is_empty());
    }

    #[test]
    fn selection_listeners_are_counted_in_pairs() {
        let mut host = MemoryHost::default();
        host.set_selection_listeners(true);
        assert_eq!(
            host.listener_counts(),
            ListenerCounts {
                click_capture: 1,
                keydown: 1
            }
        );
        host.set_selection_listeners(false);
        host.set_selection_listeners(false);
        assert_eq!(host.listener_counts(), ListenerCounts::default());
    }
}
