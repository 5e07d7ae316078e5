#![forbid(unsafe_code)]

//! Document-level listeners and the translation of their raw payloads.
//!
//! All overlay interaction is delegated: one capturing listener per event
//! type on the window sees every event before any page handler does, and the
//! core decides from the target's role attribute whether the event is ours.
//! Overlay elements therefore never carry listeners of their own, and
//! removing an overlay cannot leak one.

use vidlift_core::controls::ControlValue;
use vidlift_core::media::MediaEvent;

/// What a delegated listener feeds into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Click,
    PointerDown,
    PointerMove,
    PointerUp,
    /// `input` and `change` on form controls.
    ControlInput,
    Media(MediaEvent),
}

/// One `addEventListener` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerSpec {
    pub event: &'static str,
    pub kind: ListenerKind,
    /// Registered on the document rather than the window. Media events do
    /// not bubble and are only seen in the capturing phase of the document.
    pub on_document: bool,
}

impl ListenerSpec {
    const fn window(event: &'static str, kind: ListenerKind) -> Self {
        Self {
            event,
            kind,
            on_document: false,
        }
    }
}

/// Every delegated listener, all registered with `capture: true`.
pub fn delegated_listeners() -> Vec<ListenerSpec> {
    let mut specs = vec![
        ListenerSpec::window("click", ListenerKind::Click),
        ListenerSpec::window("mousedown", ListenerKind::PointerDown),
        ListenerSpec::window("mousemove", ListenerKind::PointerMove),
        ListenerSpec::window("mouseup", ListenerKind::PointerUp),
        ListenerSpec::window("input", ListenerKind::ControlInput),
        ListenerSpec::window("change", ListenerKind::ControlInput),
    ];
    specs.extend(MediaEvent::ALL.iter().map(|(event, name)| ListenerSpec {
        event: name,
        kind: ListenerKind::Media(*event),
        on_document: true,
    }));
    specs
}

/// Only the primary button starts a drag.
pub const fn is_primary_button(button: i16) -> bool {
    button == 0
}

/// Decode the value an `<input>` reports.
///
/// Checkboxes report their checked state; everything else must carry a
/// finite number (range inputs). Returns `None` for values the controls
/// cannot use.
pub fn control_value(input_type: &str, value: &str, checked: bool) -> Option<ControlValue> {
    if input_type.eq_ignore_ascii_case("checkbox") {
        return Some(ControlValue::Checked(checked));
    }
    let number: f64 = value.trim().parse().ok()?;
    number.is_finite().then_some(ControlValue::Number(number))
}
