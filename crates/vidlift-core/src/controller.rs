#![forbid(unsafe_code)]

//! Content-script controller: routes host events to the picker, the overlay
//! manager, and the navigation watcher.
//!
//! The host owns the real event listeners. It translates each native event
//! into a [`HostEvent`], calls [`ContentScript::dispatch`], and applies the
//! returned [`EventDisposition`] to the native event. Nothing dispatched here
//! returns an error: failures are logged and abort only the operation that
//! produced them.

use tracing::{debug, info, warn};

use crate::command::{Command, PickMode};
use crate::config::VidliftConfig;
use crate::controls::ControlValue;
use crate::geometry::Point;
use crate::host::{Host, Role, closest_role, owning_overlay};
use crate::media::{self, MediaEvent};
use crate::navigation::NavigationWatcher;
use crate::overlay::{AttachOutcome, OverlayManager};
use crate::picker::{CancelReason, ClickOutcome, Picker, PickerPhase};
use crate::theme::ThemeColors;

/// Canonical events pushed by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent<N> {
    /// A command from the popup / background script.
    Message(Command),
    /// Click seen by the picker's capturing listener (viewport point).
    SelectionClick { point: Point },
    /// Keydown seen by the picker's listener.
    KeyDown { key: String },
    /// Delegated click anywhere in the document. Ignored while selecting, so
    /// overlay controls cannot act underneath the picker.
    Click { target: N },
    PointerDown { target: N, client: Point, page: Point },
    PointerMove { page: Point },
    PointerUp,
    /// `input` / `change` on a form control.
    ControlInput { target: N, value: ControlValue },
    /// Native media notification from `video`.
    Media { video: N, event: MediaEvent },
    /// The document's structure changed.
    DocumentMutated,
}

/// What the host should do with the native event afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventDisposition {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventDisposition {
    /// Leave the event alone.
    pub const PASS: Self = Self {
        prevent_default: false,
        stop_propagation: false,
    };
    /// Keep the event away from page handlers.
    pub const STOP: Self = Self {
        prevent_default: false,
        stop_propagation: true,
    };
    /// Cancel the default action and keep the event away from page handlers.
    pub const SWALLOW: Self = Self {
        prevent_default: true,
        stop_propagation: true,
    };
}

/// All vidlift state for one page.
#[derive(Debug)]
pub struct ContentScript<H: Host> {
    host: H,
    config: VidliftConfig,
    picker: Picker,
    overlays: OverlayManager<H::Node>,
    navigation: NavigationWatcher,
}

impl<H: Host> ContentScript<H> {
    pub fn new(host: H, config: VidliftConfig) -> Self {
        let navigation = NavigationWatcher::new(host.location());
        Self {
            picker: Picker::new(&config),
            overlays: OverlayManager::new(&config),
            navigation,
            config,
            host,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &VidliftConfig {
        &self.config
    }

    pub fn picker(&self) -> &Picker {
        &self.picker
    }

    pub fn overlays(&self) -> &OverlayManager<H::Node> {
        &self.overlays
    }

    /// Apply stored start-up preferences. Returns the number of overlays
    /// created.
    pub fn start(&mut self) -> usize {
        let key = &self.config.preference_keys.auto_resize_all;
        let enabled = self
            .host
            .preference(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
        if enabled {
            info!("auto-resize preference set; lifting all videos");
            self.auto_resize_all()
        } else {
            0
        }
    }

    /// Route one host event.
    pub fn dispatch(&mut self, event: HostEvent<H::Node>) -> EventDisposition {
        match event {
            HostEvent::Message(command) => {
                self.handle_command(command);
                EventDisposition::PASS
            }
            HostEvent::SelectionClick { point } => self.handle_selection_click(point),
            HostEvent::KeyDown { key } => {
                self.picker.handle_key(&mut self.host, &key);
                EventDisposition::PASS
            }
            HostEvent::Click { target } => self.handle_click(&target),
            HostEvent::PointerDown {
                target,
                client,
                page,
            } => self.handle_pointer_down(&target, client, page),
            HostEvent::PointerMove { page } => {
                self.overlays.drag_move(&mut self.host, page);
                EventDisposition::PASS
            }
            HostEvent::PointerUp => {
                self.overlays.end_drag(&mut self.host);
                EventDisposition::PASS
            }
            HostEvent::ControlInput { target, value } => self.handle_control_input(&target, value),
            HostEvent::Media { video, event } => {
                self.handle_media(&video, event);
                EventDisposition::PASS
            }
            HostEvent::DocumentMutated => {
                self.check_navigation();
                EventDisposition::PASS
            }
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        debug!(?command, "command received");
        match command {
            Command::PickVideo { mode } => {
                self.picker.start(&mut self.host, mode);
            }
            Command::AutoResizeAllVideos => {
                self.auto_resize_all();
            }
        }
    }

    /// Lift every visible, not yet overlaid video. Returns the number of new
    /// overlays.
    pub fn auto_resize_all(&mut self) -> usize {
        let videos = self.host.query_all("video");
        let mut attached = 0;
        for video in videos {
            if self.host.bounding_rect(&video).is_empty() {
                continue;
            }
            if matches!(self.lift(&video), Some(AttachOutcome::Attached(_))) {
                attached += 1;
            }
        }
        debug!(attached, "auto-resize finished");
        attached
    }

    /// Forced cleanup: drop every overlay and cancel selection mode.
    pub fn reset(&mut self) {
        self.overlays.detach_all(&mut self.host);
        self.picker.cancel(&mut self.host, CancelReason::Navigation);
    }

    fn check_navigation(&mut self) {
        let location = self.host.location();
        if let Some(navigation) = self.navigation.observe(&location) {
            info!(from = %navigation.from, to = %navigation.to, "page navigated; cleaning up");
            self.reset();
        }
    }

    fn lift(&mut self, video: &H::Node) -> Option<AttachOutcome> {
        let colors = ThemeColors::resolve(&self.host, &self.config.preference_keys.theme);
        match self.overlays.attach(&mut self.host, video, &colors) {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                warn!(%error, "video could not be lifted");
                None
            }
        }
    }

    fn handle_selection_click(&mut self, point: Point) -> EventDisposition {
        if self.picker.phase() == PickerPhase::Selecting && self.hits_overlay(point) {
            debug!(x = point.x, y = point.y, "selection click on an overlay ignored");
            return EventDisposition::PASS;
        }
        match self.picker.handle_click(&mut self.host, point) {
            ClickOutcome::Selected { video, mode } => {
                match mode {
                    PickMode::Resize => {
                        self.lift(&video);
                    }
                    PickMode::Pip => {
                        if let Err(error) = self.host.request_picture_in_picture(&video) {
                            media::log_rejection(&error);
                        }
                    }
                }
                EventDisposition::SWALLOW
            }
            ClickOutcome::Missed(_) | ClickOutcome::Idle => EventDisposition::PASS,
        }
    }

    fn hits_overlay(&self, point: Point) -> bool {
        self.host
            .element_from_point(point)
            .is_some_and(|hit| owning_overlay(&self.host, &hit).is_some())
    }

    fn handle_click(&mut self, target: &H::Node) -> EventDisposition {
        if self.picker.phase() == PickerPhase::Selecting {
            return EventDisposition::PASS;
        }
        let Some((role, _)) = closest_role(&self.host, target) else {
            return EventDisposition::PASS;
        };
        let Some(id) = self.overlays.overlay_containing(&self.host, target) else {
            return EventDisposition::PASS;
        };
        match role {
            Role::Dismiss => {
                self.overlays.detach(&mut self.host, id);
            }
            Role::PlayPause | Role::Mute => {
                if let Some(overlay) = self.overlays.get(id) {
                    overlay.controls().activate(&mut self.host, role);
                }
            }
            _ => {}
        }
        if role.is_interactive() {
            EventDisposition::STOP
        } else {
            EventDisposition::PASS
        }
    }

    fn handle_pointer_down(
        &mut self,
        target: &H::Node,
        client: Point,
        page: Point,
    ) -> EventDisposition {
        if let Some((role, _)) = closest_role(&self.host, target) {
            if role.is_interactive() {
                return EventDisposition::STOP;
            }
        }
        if self.overlays.begin_drag(&mut self.host, target, client, page) {
            EventDisposition::SWALLOW
        } else {
            EventDisposition::PASS
        }
    }

    fn handle_control_input(
        &mut self,
        target: &H::Node,
        value: ControlValue,
    ) -> EventDisposition {
        let Some((role, _)) = closest_role(&self.host, target) else {
            return EventDisposition::PASS;
        };
        let Some(id) = self.overlays.overlay_containing(&self.host, target) else {
            return EventDisposition::PASS;
        };
        if let Some(overlay) = self.overlays.get(id) {
            overlay.controls().input(&mut self.host, role, value);
        }
        EventDisposition::STOP
    }

    fn handle_media(&mut self, video: &H::Node, event: MediaEvent) {
        let Some(id) = self.overlays.overlay_for_video(&self.host, video) else {
            return;
        };
        if let Some(overlay) = self.overlays.get(id) {
            overlay.controls().on_media_event(&mut self.host, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::host::{HostDocument, HostMedia};
    use crate::memory::{ListenerCounts, MemoryHost, NodeId};

    fn script() -> (ContentScript<MemoryHost>, NodeId) {
        let mut host = MemoryHost::default();
        let body = host.body();
        let video = host.add_video(body, Rect::new(100.0, 100.0, 400.0, 300.0));
        (ContentScript::new(host, VidliftConfig::default()), video)
    }

    fn role_node(script: &ContentScript<MemoryHost>, role: Role) -> NodeId {
        script.host().query_all(&format!("[data-vidlift-role=\"{}\"]", role.as_str()))[0]
    }

    #[test]
    fn pick_then_click_lifts_video() {
        let (mut script, video) = script();
        script.dispatch(HostEvent::Message(Command::PickVideo {
            mode: PickMode::Resize,
        }));
        let disposition = script.dispatch(HostEvent::SelectionClick {
            point: Point::new(200.0, 200.0),
        });
        assert_eq!(disposition, EventDisposition::SWALLOW);
        assert_eq!(script.overlays().len(), 1);
        assert!(script.overlays().overlay_for_video(script.host(), &video).is_some());
        assert_eq!(script.picker().phase(), PickerPhase::Idle);
    }

    #[test]
    fn missed_click_passes_through() {
        let (mut script, _) = script();
        script.handle_command(Command::PickVideo {
            mode: PickMode::Resize,
        });
        let disposition = script.dispatch(HostEvent::SelectionClick {
            point: Point::new(5.0, 5.0),
        });
        assert_eq!(disposition, EventDisposition::PASS);
        assert_eq!(script.picker().phase(), PickerPhase::Selecting);
    }

    #[test]
    fn rejected_pip_still_exits_selection_mode() {
        let (mut script, _) = script();
        script.host_mut().reject_picture_in_picture(Some("SecurityError"));
        script.handle_command(Command::PickVideo {
            mode: PickMode::Pip,
        });
        script.dispatch(HostEvent::SelectionClick {
            point: Point::new(200.0, 200.0),
        });
        assert_eq!(script.picker().phase(), PickerPhase::Idle);
        assert_eq!(script.host().listener_counts(), ListenerCounts::default());
        assert!(script.host().pip_requests().is_empty());
        assert!(script.overlays().is_empty());
    }

    #[test]
    fn pip_pick_requests_picture_in_picture() {
        let (mut script, video) = script();
        script.handle_command(Command::PickVideo {
            mode: PickMode::Pip,
        });
        script.dispatch(HostEvent::SelectionClick {
            point: Point::new(200.0, 200.0),
        });
        assert_eq!(script.host().pip_requests(), &[video]);
    }

    #[test]
    fn dismiss_click_detaches() {
        let (mut script, _) = script();
        script.auto_resize_all();
        let dismiss = role_node(&script, Role::Dismiss);
        let disposition = script.dispatch(HostEvent::Click { target: dismiss });
        assert_eq!(disposition, EventDisposition::STOP);
        assert!(script.overlays().is_empty());
    }

    #[test]
    fn overlay_clicks_while_selecting_neither_dismiss_nor_relift() {
        let (mut script, video) = script();
        script.auto_resize_all();
        let first = script.overlays().overlay_for_video(script.host(), &video);
        script.handle_command(Command::PickVideo {
            mode: PickMode::Resize,
        });

        let dismiss = role_node(&script, Role::Dismiss);
        let delegated = script.dispatch(HostEvent::Click { target: dismiss });
        let selection = script.dispatch(HostEvent::SelectionClick {
            point: Point::new(200.0, 200.0),
        });

        assert_eq!(delegated, EventDisposition::PASS);
        assert_eq!(selection, EventDisposition::PASS);
        assert_eq!(script.overlays().len(), 1);
        assert_eq!(
            script.overlays().overlay_for_video(script.host(), &video),
            first
        );
        assert_eq!(script.picker().phase(), PickerPhase::Selecting);

        script.dispatch(HostEvent::KeyDown {
            key: "Escape".into(),
        });
        script.dispatch(HostEvent::Click { target: dismiss });
        assert!(script.overlays().is_empty());
    }

    #[test]
    fn control_pointer_down_never_drags() {
        let (mut script, _) = script();
        script.auto_resize_all();
        let seek = role_node(&script, Role::Seek);
        let disposition = script.dispatch(HostEvent::PointerDown {
            target: seek,
            client: Point::default(),
            page: Point::default(),
        });
        assert_eq!(disposition, EventDisposition::STOP);
        assert_eq!(script.overlays().dragging(), None);
    }

    #[test]
    fn drag_bar_pointer_sequence_moves_overlay() {
        let (mut script, _) = script();
        script.auto_resize_all();
        let bar = role_node(&script, Role::DragBar);
        let start = Point::new(110.0, 105.0);
        assert_eq!(
            script.dispatch(HostEvent::PointerDown {
                target: bar,
                client: start,
                page: start,
            }),
            EventDisposition::SWALLOW
        );
        script.dispatch(HostEvent::PointerMove {
            page: Point::new(160.0, 125.0),
        });
        script.dispatch(HostEvent::PointerUp);
        let overlay = script.overlays().iter().next().expect("overlay");
        assert_eq!(overlay.position(), Point::new(150.0, 120.0));
        assert_eq!(script.overlays().dragging(), None);
    }

    #[test]
    fn volume_input_routes_to_controls() {
        let (mut script, video) = script();
        script.auto_resize_all();
        let volume = role_node(&script, Role::Volume);
        let disposition = script.dispatch(HostEvent::ControlInput {
            target: volume,
            value: ControlValue::Number(0.0),
        });
        assert_eq!(disposition, EventDisposition::STOP);
        assert!(script.host().media_state(&video).muted);
    }

    #[test]
    fn media_event_on_unrelated_video_is_ignored() {
        let (mut script, _) = script();
        let body = script.host().body();
        let stray = script
            .host_mut()
            .add_video(body, Rect::new(0.0, 0.0, 0.0, 0.0));
        script.dispatch(HostEvent::Media {
            video: stray,
            event: MediaEvent::Play,
        });
        assert!(script.overlays().is_empty());
    }

    #[test]
    fn start_honours_auto_resize_preference() {
        let (mut script, _) = script();
        assert_eq!(script.start(), 0);
        script.host_mut().set_preference("autoResizeAll", "true");
        assert_eq!(script.start(), 1);
        assert_eq!(script.start(), 0);
    }
}
