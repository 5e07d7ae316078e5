#![forbid(unsafe_code)]

//! `vidlift-core` pulls a video out of an arbitrary web page into a floating,
//! draggable, resizable overlay, and puts it back without a trace.
//!
//! Design goals:
//! - **Host-driven**: the embedding environment (the `vidlift-web` content
//!   script) owns every native listener and pushes [`controller::HostEvent`]s.
//! - **Deterministic**: all page access goes through the [`host`] traits, so
//!   the same logic runs against [`memory::MemoryHost`] in tests.
//! - **Never breaks the page**: fallible browser calls are logged and
//!   abandoned; nothing panics or propagates out of event dispatch.
//!
//! Components, leaf first: [`occlusion`] (which video did the user mean),
//! [`overlay`] with its [`controls`], [`picker`] (selection mode),
//! [`navigation`] (SPA route changes), tied together by [`controller`].

pub mod command;
pub mod config;
pub mod controller;
pub mod controls;
pub mod error;
pub mod geometry;
pub mod host;
pub mod media;
pub mod memory;
pub mod navigation;
pub mod occlusion;
pub mod overlay;
pub mod picker;
pub mod theme;

pub use command::{Command, PickMode};
pub use config::VidliftConfig;
pub use controller::{ContentScript, EventDisposition, HostEvent};
pub use error::{DomError, MediaError, VidliftError};
pub use geometry::{Point, Rect};
pub use host::{Host, HostDocument, HostMedia, HostPreferences};
