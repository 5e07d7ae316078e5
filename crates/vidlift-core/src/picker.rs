#![forbid(unsafe_code)]

//! Picker state machine: the "click a video" selection mode.
//!
//! ```text
//! Idle --start--> Selecting --click on video--> Selected --teardown--> Idle
//!                     |  \--Escape / navigation--> Cancelled --teardown--> Idle
//!                     \--click elsewhere--> Selecting
//! ```
//!
//! # Invariants
//!
//! 1. At most one session is live. A second start is resolved by the
//!    configured [`ReentryPolicy`].
//! 2. Entering Selecting installs the click-capture and keydown listeners as
//!    one pair; every exit removes the same pair, restores the body cursor,
//!    and clears the session, whatever the exit path.
//! 3. Teardown happens before the picked video is handed off, so a failing
//!    hand-off (e.g. a rejected picture-in-picture request) cannot leave the
//!    page in selection mode.
//! 4. Cancelling while Idle is a no-op.

use tracing::debug;

use crate::command::PickMode;
use crate::config::{ReentryPolicy, VidliftConfig};
use crate::geometry::Point;
use crate::host::HostDocument;
use crate::occlusion::{self, ProbeOutcome};

/// Coarse picker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerPhase {
    Idle,
    Selecting,
}

/// Why a session ended without a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Escape,
    Navigation,
    /// Replaced by a new session under [`ReentryPolicy::Restart`].
    Restart,
}

/// One live selection-mode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerSession {
    id: u64,
    mode: PickMode,
    saved_cursor: String,
}

impl PickerSession {
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn mode(&self) -> PickMode {
        self.mode
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { session: u64 },
    /// A session was already live and the request was dropped.
    Ignored { active: u64 },
    Restarted { previous: u64, session: u64 },
}

/// Result of a click delivered to the picker.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome<N> {
    /// No session is live; the click belongs to the page.
    Idle,
    /// No video under the click; the session keeps selecting.
    Missed(ProbeOutcome),
    /// The session ended on `video`, which the caller hands off per `mode`.
    Selected { video: N, mode: PickMode },
}

/// The picker. Owns the single live [`PickerSession`], if any.
#[derive(Debug, Clone)]
pub struct Picker {
    session: Option<PickerSession>,
    next_session: u64,
    policy: ReentryPolicy,
    cursor: String,
    probe_limit: usize,
}

const CURSOR: &str = "cursor";

impl Picker {
    pub fn new(config: &VidliftConfig) -> Self {
        Self {
            session: None,
            next_session: 1,
            policy: config.reentry,
            cursor: config.picker_cursor.clone(),
            probe_limit: config.probe_limit,
        }
    }

    pub fn phase(&self) -> PickerPhase {
        if self.session.is_some() {
            PickerPhase::Selecting
        } else {
            PickerPhase::Idle
        }
    }

    pub fn session(&self) -> Option<&PickerSession> {
        self.session.as_ref()
    }

    /// Enter selection mode.
    pub fn start<D: HostDocument>(&mut self, dom: &mut D, mode: PickMode) -> StartOutcome {
        let previous = match (&self.session, self.policy) {
            (Some(active), ReentryPolicy::Ignore) => {
                debug!(session = active.id, "picker already selecting; start ignored");
                return StartOutcome::Ignored { active: active.id };
            }
            (Some(active), ReentryPolicy::Restart) => {
                let previous = active.id;
                self.cancel(dom, CancelReason::Restart);
                Some(previous)
            }
            (None, _) => None,
        };

        let body = dom.body();
        let saved_cursor = dom.style(&body, CURSOR);
        dom.set_style(&body, CURSOR, &self.cursor);
        dom.set_selection_listeners(true);

        let id = self.next_session;
        self.next_session = self.next_session.saturating_add(1);
        self.session = Some(PickerSession {
            id,
            mode,
            saved_cursor,
        });
        debug!(session = id, ?mode, "picker selecting");

        match previous {
            Some(previous) => StartOutcome::Restarted {
                previous,
                session: id,
            },
            None => StartOutcome::Started { session: id },
        }
    }

    /// Deliver a capturing-phase click at a viewport point.
    pub fn handle_click<D: HostDocument>(
        &mut self,
        dom: &mut D,
        point: Point,
    ) -> ClickOutcome<D::Node> {
        if self.session.is_none() {
            return ClickOutcome::Idle;
        }
        let probe = occlusion::probe(dom, point, self.probe_limit);
        let Some(video) = probe.video else {
            return ClickOutcome::Missed(probe.outcome);
        };
        let Some(session) = self.teardown(dom) else {
            return ClickOutcome::Idle;
        };
        debug!(session = session.id, mode = ?session.mode, "picker selected video");
        ClickOutcome::Selected {
            video,
            mode: session.mode,
        }
    }

    /// Deliver a keydown. Returns whether it cancelled the session.
    pub fn handle_key<D: HostDocument>(&mut self, dom: &mut D, key: &str) -> bool {
        if matches!(key, "Escape" | "Esc") {
            self.cancel(dom, CancelReason::Escape)
        } else {
            false
        }
    }

    /// Cancel the live session. Returns whether one was live.
    pub fn cancel<D: HostDocument>(&mut self, dom: &mut D, reason: CancelReason) -> bool {
        match self.teardown(dom) {
            Some(session) => {
                debug!(session = session.id, ?reason, "picker cancelled");
                true
            }
            None => false,
        }
    }

    fn teardown<D: HostDocument>(&mut self, dom: &mut D) -> Option<PickerSession> {
        let session = self.session.take()?;
        dom.set_selection_listeners(false);
        let body = dom.body();
        dom.set_style(&body, CURSOR, &session.saved_cursor);
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::memory::{ListenerCounts, MemoryHost, NodeId};

    fn page() -> (MemoryHost, NodeId) {
        let mut host = MemoryHost::default();
        let body = host.body();
        let video = host.add_video(body, Rect::new(100.0, 100.0, 400.0, 300.0));
        (host, video)
    }

    fn picker(policy: ReentryPolicy) -> Picker {
        Picker::new(&VidliftConfig {
            reentry: policy,
            ..VidliftConfig::default()
        })
    }

    #[test]
    fn start_sets_cursor_and_installs_listener_pair() {
        let (mut host, _) = page();
        let mut picker = picker(ReentryPolicy::Ignore);
        assert_eq!(
            picker.start(&mut host, PickMode::Resize),
            StartOutcome::Started { session: 1 }
        );
        assert_eq!(picker.phase(), PickerPhase::Selecting);
        assert_eq!(host.style(&host.body(), "cursor"), "crosshair");
        assert_eq!(
            host.listener_counts(),
            ListenerCounts {
                click_capture: 1,
                keydown: 1
            }
        );
    }

    #[test]
    fn escape_restores_cursor_and_removes_listeners() {
        let (mut host, _) = page();
        let body = host.body();
        host.set_style(&body, "cursor", "default");
        let mut picker = picker(ReentryPolicy::Ignore);
        picker.start(&mut host, PickMode::Resize);
        assert!(!picker.handle_key(&mut host, "Enter"));
        assert!(picker.handle_key(&mut host, "Escape"));
        assert_eq!(picker.phase(), PickerPhase::Idle);
        assert_eq!(host.style(&body, "cursor"), "default");
        assert_eq!(host.listener_counts(), ListenerCounts::default());
    }

    #[test]
    fn click_on_video_selects_and_tears_down() {
        let (mut host, video) = page();
        let mut picker = picker(ReentryPolicy::Ignore);
        picker.start(&mut host, PickMode::Pip);
        let outcome = picker.handle_click(&mut host, Point::new(150.0, 150.0));
        assert_eq!(
            outcome,
            ClickOutcome::Selected {
                video,
                mode: PickMode::Pip
            }
        );
        assert_eq!(picker.phase(), PickerPhase::Idle);
        assert_eq!(host.listener_counts(), ListenerCounts::default());
        assert_eq!(host.style(&host.body(), "cursor"), "");
    }

    #[test]
    fn click_on_nothing_keeps_selecting() {
        let (mut host, _) = page();
        let mut picker = picker(ReentryPolicy::Ignore);
        picker.start(&mut host, PickMode::Resize);
        let outcome = picker.handle_click(&mut host, Point::new(10.0, 10.0));
        assert!(matches!(outcome, ClickOutcome::Missed(_)));
        assert_eq!(picker.phase(), PickerPhase::Selecting);
        assert_eq!(host.listener_counts().click_capture, 1);
    }

    #[test]
    fn click_while_idle_is_ignored() {
        let (mut host, _) = page();
        let mut picker = picker(ReentryPolicy::Ignore);
        assert_eq!(
            picker.handle_click(&mut host, Point::new(150.0, 150.0)),
            ClickOutcome::Idle
        );
    }

    #[test]
    fn reentry_ignore_keeps_single_session() {
        let (mut host, _) = page();
        let mut picker = picker(ReentryPolicy::Ignore);
        picker.start(&mut host, PickMode::Resize);
        assert_eq!(
            picker.start(&mut host, PickMode::Pip),
            StartOutcome::Ignored { active: 1 }
        );
        assert_eq!(host.listener_counts().click_capture, 1);
        assert_eq!(picker.session().map(PickerSession::mode), Some(PickMode::Resize));
    }

    #[test]
    fn reentry_restart_replaces_session_without_duplicate_listeners() {
        let (mut host, _) = page();
        let body = host.body();
        host.set_style(&body, "cursor", "wait");
        let mut picker = picker(ReentryPolicy::Restart);
        picker.start(&mut host, PickMode::Resize);
        assert_eq!(
            picker.start(&mut host, PickMode::Pip),
            StartOutcome::Restarted {
                previous: 1,
                session: 2
            }
        );
        assert_eq!(host.listener_counts().click_capture, 1);
        assert_eq!(host.listener_counts().keydown, 1);
        assert_eq!(picker.session().map(PickerSession::mode), Some(PickMode::Pip));
        picker.cancel(&mut host, CancelReason::Escape);
        assert_eq!(host.style(&body, "cursor"), "wait");
    }

    #[test]
    fn cancel_while_idle_is_a_no_op() {
        let (mut host, _) = page();
        let mut picker = picker(ReentryPolicy::Ignore);
        assert!(!picker.cancel(&mut host, CancelReason::Navigation));
        assert_eq!(host.listener_counts(), ListenerCounts::default());
    }
}
