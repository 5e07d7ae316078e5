#![forbid(unsafe_code)]

//! Single-page-app navigation detection.
//!
//! The host calls [`NavigationWatcher::observe`] whenever the document's
//! structure changes (a `MutationObserver` callback on the web). A change of
//! address since the previous observation means the app swapped its view
//! without a page load, and any overlay may now point at a video the page
//! has thrown away.

/// One detected address change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct NavigationWatcher {
    last: String,
}

impl NavigationWatcher {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            last: initial.into(),
        }
    }

    /// Last address observed.
    pub fn current(&self) -> &str {
        &self.last
    }

    /// Compare `location` with the previous observation.
    pub fn observe(&mut self, location: &str) -> Option<Navigation> {
        if location == self.last {
            return None;
        }
        let from = std::mem::replace(&mut self.last, location.to_owned());
        Some(Navigation {
            from,
            to: location.to_owned(),
        })
    }
}
