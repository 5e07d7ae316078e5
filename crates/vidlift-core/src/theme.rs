#![forbid(unsafe_code)]

//! Overlay colors, resolved once per overlay from the stored theme
//! preference and the OS color-scheme signal.

use crate::host::HostPreferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    /// Parse a stored value. Unknown values fall back to `System`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "dark" => Self::Dark,
            _ => Self::System,
        }
    }

    pub fn is_dark(self, os_prefers_dark: bool) -> bool {
        match self {
            Self::Light => false,
            Self::Dark => true,
            Self::System => os_prefers_dark,
        }
    }
}

/// Colors applied to the drag bar and control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub drag_background: &'static str,
    pub drag_foreground: &'static str,
    pub dismiss_foreground: &'static str,
    pub controls_background: &'static str,
    pub controls_foreground: &'static str,
    pub border: &'static str,
}

impl ThemeColors {
    pub const LIGHT: Self = Self {
        drag_background: "rgba(0, 123, 255, 0.35)",
        drag_foreground: "#007bff",
        dismiss_foreground: "#fff",
        controls_background: "#f1f1f1",
        controls_foreground: "#333",
        border: "rgba(0, 0, 0, 0.15)",
    };

    pub const DARK: Self = Self {
        drag_background: "rgba(30, 64, 120, 0.85)",
        drag_foreground: "#9cc7ff",
        dismiss_foreground: "#e5e7eb",
        controls_background: "#1f2937",
        controls_foreground: "#e5e7eb",
        border: "rgba(255, 255, 255, 0.12)",
    };

    /// Resolve colors from the host's stored preference under `key`.
    pub fn resolve<P: HostPreferences + ?Sized>(prefs: &P, key: &str) -> Self {
        let preference = prefs
            .preference(key)
            .map(|value| ThemePreference::parse(&value))
            .unwrap_or_default();
        if preference.is_dark(prefs.prefers_dark_scheme()) {
            Self::DARK
        } else {
            Self::LIGHT
        }
    }
}
