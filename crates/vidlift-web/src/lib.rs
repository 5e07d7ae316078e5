#![forbid(unsafe_code)]

//! `vidlift-web` runs [`vidlift_core`] as a browser-extension content script.
//!
//! The crate is split the same way on every target:
//! - [`listeners`], [`console`] and [`style`] are plain Rust and build (and
//!   test) natively: which document listeners exist, how log lines look, and
//!   how inline declaration priorities are carried.
//! - `wasm` (only on `wasm32`) binds them to the page through `web-sys`:
//!   a `WebHost` implementing the core host traits, and the exported
//!   `VidliftContentScript` the extension's JS glue drives.

pub mod console;
pub mod listeners;
pub mod style;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{VidliftContentScript, WebHost};
