#![forbid(unsafe_code)]

//! Media element state and the slider arithmetic bound to it.

use tracing::warn;

use crate::error::MediaError;

/// Seek slider range is `0..=SEEK_SLIDER_MAX`.
pub const SEEK_SLIDER_MAX: f64 = 100.0;

/// Snapshot of a media element's native playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaState {
    pub paused: bool,
    pub muted: bool,
    /// `0.0..=1.0`.
    pub volume: f64,
    pub current_time: f64,
    /// `NaN` until metadata has loaded, `+inf` for live streams.
    pub duration: f64,
    pub looping: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            paused: true,
            muted: false,
            volume: 1.0,
            current_time: 0.0,
            duration: f64::NAN,
            looping: false,
        }
    }
}

/// Native media notifications the control surface listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    Play,
    Pause,
    VolumeChange,
    TimeUpdate,
    DurationChange,
}

impl MediaEvent {
    /// All events, with their DOM event names.
    pub const ALL: [(MediaEvent, &'static str); 5] = [
        (MediaEvent::Play, "play"),
        (MediaEvent::Pause, "pause"),
        (MediaEvent::VolumeChange, "volumechange"),
        (MediaEvent::TimeUpdate, "timeupdate"),
        (MediaEvent::DurationChange, "durationchange"),
    ];

    pub fn from_dom_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(_, dom_name)| *dom_name == name)
            .map(|(event, _)| *event)
    }
}

fn usable_duration(duration: f64) -> Option<f64> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

/// Seek slider position for a playback position, or `None` while the
/// duration is unknown or unbounded.
pub fn seek_slider_value(current_time: f64, duration: f64) -> Option<f64> {
    let duration = usable_duration(duration)?;
    if !current_time.is_finite() {
        return None;
    }
    Some((current_time / duration * SEEK_SLIDER_MAX).clamp(0.0, SEEK_SLIDER_MAX))
}

/// Playback position for a seek slider value, or `None` while the duration
/// is unknown or unbounded.
pub fn seek_target_time(slider_value: f64, duration: f64) -> Option<f64> {
    let duration = usable_duration(duration)?;
    if !slider_value.is_finite() {
        return None;
    }
    Some(slider_value.clamp(0.0, SEEK_SLIDER_MAX) / SEEK_SLIDER_MAX * duration)
}

/// Volume and mute flag resulting from a volume slider input.
///
/// Zero forces mute; any positive value clears it. Out-of-range and
/// non-finite inputs are clamped into `0.0..=1.0` (NaN reads as `0.0`).
pub fn volume_from_slider(value: f64) -> (f64, bool) {
    let volume = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (volume, volume == 0.0)
}

pub const fn play_pause_glyph(paused: bool) -> &'static str {
    if paused { "\u{25b6}\u{fe0f}" } else { "\u{23f8}\u{fe0f}" }
}

pub const fn mute_glyph(muted: bool) -> &'static str {
    if muted { "\u{1f507}" } else { "\u{1f50a}" }
}

/// Log an asynchronous media request rejection. The operation is abandoned;
/// no state is changed.
pub fn log_rejection(error: &MediaError) {
    warn!(%error, "media request abandoned");
}
