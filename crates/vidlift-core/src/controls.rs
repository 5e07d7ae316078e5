#![forbid(unsafe_code)]

//! Overlay control surface: play/pause, mute, volume, seek, and loop bound
//! two-way to the hosted video's native state.
//!
//! User input writes straight to the media element. The UI is re-rendered
//! from a fresh [`MediaState`](crate::media::MediaState) snapshot after every
//! write and on every native media notification, so changes made elsewhere
//! (media keys, page scripts) show up too, and a rejected `play()` leaves
//! the icon on the state the element actually has.

use tracing::debug;

use crate::error::DomError;
use crate::host::{HostMedia, Role};
use crate::media::{
    self, MediaEvent, mute_glyph, play_pause_glyph, seek_slider_value, seek_target_time,
    volume_from_slider,
};
use crate::overlay::create_part;
use crate::theme::ThemeColors;

/// Value delivered by an `input` / `change` event on a control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    /// Range input position.
    Number(f64),
    /// Checkbox state.
    Checked(bool),
}

/// Elements of one control surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSurface<N> {
    video: N,
    container: N,
    play_pause: N,
    mute: N,
    volume: N,
    seek: N,
    loop_toggle: N,
}

fn slider_text(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl<N: Clone + PartialEq + core::fmt::Debug> ControlSurface<N> {
    /// Build the surface as the last child of `parent` and render the
    /// video's current state into it. Fails only if an element cannot be
    /// created, in which case `parent` is left untouched.
    pub fn build<D: HostMedia<Node = N>>(
        dom: &mut D,
        parent: &N,
        video: &N,
        colors: &ThemeColors,
    ) -> Result<Self, DomError> {
        let shadow = format!("0 2px 6px {}", colors.border);
        let container = create_part(
            dom,
            "div",
            Some(Role::Controls),
            &[
                ("margin-top", "4px"),
                ("background", colors.controls_background),
                ("color", colors.controls_foreground),
                ("padding", "8px"),
                ("display", "flex"),
                ("gap", "8px"),
                ("align-items", "center"),
                ("border-radius", "4px"),
                ("box-shadow", shadow.as_str()),
                ("font-size", "14px"),
            ],
        )?;

        let button_style = [
            ("background", "none"),
            ("border", "none"),
            ("outline", "none"),
            ("color", colors.controls_foreground),
            ("font-size", "16px"),
            ("cursor", "pointer"),
        ];
        let play_pause = create_part(dom, "button", Some(Role::PlayPause), &button_style)?;
        dom.append_child(&container, &play_pause);
        let mute = create_part(dom, "button", Some(Role::Mute), &button_style)?;
        dom.append_child(&container, &mute);

        let volume = create_part(dom, "input", Some(Role::Volume), &[("width", "100px")])?;
        for (name, value) in [("type", "range"), ("min", "0"), ("max", "1"), ("step", "0.01")] {
            dom.set_attribute(&volume, name, value);
        }
        dom.append_child(&container, &volume);

        let seek = create_part(dom, "input", Some(Role::Seek), &[("flex", "1")])?;
        for (name, value) in [("type", "range"), ("min", "0"), ("max", "100")] {
            dom.set_attribute(&seek, name, value);
        }
        dom.append_child(&container, &seek);

        let label = create_part(
            dom,
            "label",
            None,
            &[
                ("display", "flex"),
                ("align-items", "center"),
                ("gap", "4px"),
                ("font-size", "14px"),
            ],
        )?;
        let loop_toggle = create_part(dom, "input", Some(Role::Loop), &[])?;
        dom.set_attribute(&loop_toggle, "type", "checkbox");
        dom.append_child(&label, &loop_toggle);
        let caption = create_part(dom, "span", None, &[])?;
        dom.set_text(&caption, "Loop");
        dom.append_child(&label, &caption);
        dom.append_child(&container, &label);
        dom.append_child(parent, &container);

        let surface = Self {
            video: video.clone(),
            container,
            play_pause,
            mute,
            volume,
            seek,
            loop_toggle,
        };
        surface.sync(dom);
        Ok(surface)
    }

    pub fn container(&self) -> &N {
        &self.container
    }

    /// Element carrying `role`, if it is part of this surface.
    pub fn part(&self, role: Role) -> Option<&N> {
        match role {
            Role::Controls => Some(&self.container),
            Role::PlayPause => Some(&self.play_pause),
            Role::Mute => Some(&self.mute),
            Role::Volume => Some(&self.volume),
            Role::Seek => Some(&self.seek),
            Role::Loop => Some(&self.loop_toggle),
            _ => None,
        }
    }

    /// Handle a click on a button. Returns whether `role` was a button here.
    pub fn activate<D: HostMedia<Node = N>>(&self, dom: &mut D, role: Role) -> bool {
        match role {
            Role::PlayPause => {
                if dom.media_state(&self.video).paused {
                    if let Err(error) = dom.play(&self.video) {
                        media::log_rejection(&error);
                    }
                } else {
                    dom.pause(&self.video);
                }
                self.sync_play_pause(dom);
                true
            }
            Role::Mute => {
                let muted = dom.media_state(&self.video).muted;
                dom.set_muted(&self.video, !muted);
                self.sync_volume(dom);
                true
            }
            _ => false,
        }
    }

    /// Handle an `input` / `change` value. Returns whether it was applied.
    pub fn input<D: HostMedia<Node = N>>(
        &self,
        dom: &mut D,
        role: Role,
        value: ControlValue,
    ) -> bool {
        match (role, value) {
            (Role::Volume, ControlValue::Number(value)) => {
                let (volume, mute) = volume_from_slider(value);
                dom.set_volume(&self.video, volume);
                if mute {
                    dom.set_muted(&self.video, true);
                } else if dom.media_state(&self.video).muted {
                    dom.set_muted(&self.video, false);
                }
                self.sync_volume(dom);
                true
            }
            (Role::Seek, ControlValue::Number(value)) => {
                let duration = dom.media_state(&self.video).duration;
                match seek_target_time(value, duration) {
                    Some(time) => {
                        dom.set_current_time(&self.video, time);
                        self.sync_seek(dom);
                        true
                    }
                    None => {
                        debug!(value, duration, "seek ignored: duration unknown");
                        false
                    }
                }
            }
            (Role::Loop, ControlValue::Checked(checked)) => {
                dom.set_loop(&self.video, checked);
                self.sync_loop(dom);
                true
            }
            _ => false,
        }
    }

    /// Re-render the part a native media notification affects.
    pub fn on_media_event<D: HostMedia<Node = N>>(&self, dom: &mut D, event: MediaEvent) {
        match event {
            MediaEvent::Play | MediaEvent::Pause => self.sync_play_pause(dom),
            MediaEvent::VolumeChange => self.sync_volume(dom),
            MediaEvent::TimeUpdate | MediaEvent::DurationChange => self.sync_seek(dom),
        }
    }

    /// Re-render every control.
    pub fn sync<D: HostMedia<Node = N>>(&self, dom: &mut D) {
        self.sync_play_pause(dom);
        self.sync_volume(dom);
        self.sync_seek(dom);
        self.sync_loop(dom);
    }

    fn sync_play_pause<D: HostMedia<Node = N>>(&self, dom: &mut D) {
        let paused = dom.media_state(&self.video).paused;
        dom.set_text(&self.play_pause, play_pause_glyph(paused));
    }

    fn sync_volume<D: HostMedia<Node = N>>(&self, dom: &mut D) {
        let state = dom.media_state(&self.video);
        dom.set_text(&self.mute, mute_glyph(state.muted));
        dom.set_input_value(&self.volume, &slider_text(state.volume));
    }

    fn sync_seek<D: HostMedia<Node = N>>(&self, dom: &mut D) {
        let state = dom.media_state(&self.video);
        let value = seek_slider_value(state.current_time, state.duration).unwrap_or(0.0);
        dom.set_input_value(&self.seek, &slider_text(value));
    }

    fn sync_loop<D: HostMedia<Node = N>>(&self, dom: &mut D) {
        let looping = dom.media_state(&self.video).looping;
        dom.set_checked(&self.loop_toggle, looping);
    }
}
