#![forbid(unsafe_code)]

//! Occlusion probing: find the video under a point even when custom
//! controls, transparent shields, or ad frames sit on top of it.
//!
//! The probe asks the host for the topmost element at the point. If it is not
//! a video, that element's inline `pointer-events` is set to `none` and the
//! query repeats. Every element touched this way gets its original inline
//! value back, in the order it was peeled, before the probe returns.

use tracing::{debug, trace};

use crate::config::DEFAULT_PROBE_LIMIT;
use crate::geometry::Point;
use crate::host::{HostDocument, is_video};

const POINTER_EVENTS: &str = "pointer-events";

/// How a probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    /// The point resolved to no element (outside the viewport, or every
    /// layer peeled away).
    NothingAtPoint,
    /// The iteration bound was hit before a video surfaced.
    LimitReached,
    /// The host kept returning an element that had already been peeled.
    Stuck,
}

/// Result of one occlusion probe.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe<N> {
    pub video: Option<N>,
    pub outcome: ProbeOutcome,
    /// Number of non-video layers made hit-test transparent and restored.
    pub peeled: usize,
}

/// Run an occlusion probe with an explicit iteration bound.
pub fn probe<D: HostDocument>(dom: &mut D, point: Point, limit: usize) -> Probe<D::Node> {
    let mut peeled: Vec<(D::Node, String)> = Vec::new();
    let mut video = None;
    let mut outcome = ProbeOutcome::LimitReached;

    for _ in 0..limit {
        let Some(hit) = dom.element_from_point(point) else {
            outcome = ProbeOutcome::NothingAtPoint;
            break;
        };
        if is_video(dom, &hit) {
            video = Some(hit);
            outcome = ProbeOutcome::Found;
            break;
        }
        if peeled.iter().any(|(node, _)| *node == hit) {
            outcome = ProbeOutcome::Stuck;
            break;
        }
        trace!(tag = %dom.tag_name(&hit), depth = peeled.len(), "peeling occluding layer");
        let original = dom.style(&hit, POINTER_EVENTS);
        dom.set_style(&hit, POINTER_EVENTS, "none");
        peeled.push((hit, original));
    }

    let count = peeled.len();
    for (node, original) in peeled {
        dom.set_style(&node, POINTER_EVENTS, &original);
    }
    debug!(?outcome, peeled = count, x = point.x, y = point.y, "occlusion probe finished");

    Probe {
        video,
        outcome,
        peeled: count,
    }
}

/// Topmost video at a viewport point, looking through at most
/// `DEFAULT_PROBE_LIMIT` occluding layers.
pub fn resolve_video_at<D: HostDocument>(dom: &mut D, point: Point) -> Option<D::Node> {
    probe(dom, point, DEFAULT_PROBE_LIMIT).video
}
