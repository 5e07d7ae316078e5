#![forbid(unsafe_code)]

//! Property tests for the overlay lifecycle.
//!
//! 1. **Round trip**: attach, optionally drag, then detach leaves the video
//!    at its original index among its siblings with its preserved inline
//!    style and native-controls flag exactly as captured, and leaves no
//!    overlay or placeholder element behind.
//! 2. **Idempotent attach**: attaching an overlaid video again changes
//!    nothing.
//! 3. **Forced cleanup** removes every marked element for any number of
//!    overlays.

use proptest::prelude::*;
use vidlift_core::config::VidliftConfig;
use vidlift_core::geometry::{Point, Rect};
use vidlift_core::host::{HostDocument, HostMedia, Role};
use vidlift_core::memory::{MemoryHost, NodeId};
use vidlift_core::overlay::{AttachOutcome, OverlayManager};
use vidlift_core::theme::ThemeColors;

#[derive(Debug, Clone)]
struct Scenario {
    siblings_before: usize,
    siblings_after: usize,
    styles: Vec<(&'static str, &'static str)>,
    native_controls: bool,
    scroll: (f64, f64),
    drag: Option<(f64, f64)>,
}

fn preserved_style() -> impl Strategy<Value = Vec<(&'static str, &'static str)>> {
    let property = prop_oneof![
        prop::sample::select(vec!["relative", "absolute", "sticky"]).prop_map(|v| ("position", v)),
        prop::sample::select(vec!["100%", "640px", "50vw"]).prop_map(|v| ("width", v)),
        prop::sample::select(vec!["auto", "360px"]).prop_map(|v| ("height", v)),
        prop::sample::select(vec!["inline", "block", "none"]).prop_map(|v| ("display", v)),
        prop::sample::select(vec!["1", "-1", "999"]).prop_map(|v| ("z-index", v)),
        prop::sample::select(vec!["cover", "contain"]).prop_map(|v| ("object-fit", v)),
    ];
    prop::collection::vec(property, 0..6)
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (
        0..4usize,
        0..4usize,
        preserved_style(),
        any::<bool>(),
        (0.0..500.0f64, 0.0..2000.0f64),
        prop::option::of((-300.0..300.0f64, -300.0..300.0f64)),
    )
        .prop_map(
            |(siblings_before, siblings_after, styles, native_controls, scroll, drag)| Scenario {
                siblings_before,
                siblings_after,
                styles,
                native_controls,
                scroll,
                drag,
            },
        )
}

struct Page {
    host: MemoryHost,
    container: NodeId,
    video: NodeId,
}

fn build(scenario: &Scenario) -> Page {
    let mut host = MemoryHost::default();
    let body = host.body();
    let container = host.add_element(body, "section", Rect::new(0.0, 0.0, 1280.0, 720.0));
    for _ in 0..scenario.siblings_before {
        host.add_element(container, "p", Rect::new(0.0, 0.0, 1280.0, 20.0));
    }
    let video = host.add_video(container, Rect::new(40.0, 80.0, 640.0, 360.0));
    for _ in 0..scenario.siblings_after {
        host.add_element(container, "p", Rect::new(0.0, 500.0, 1280.0, 20.0));
    }
    for (property, value) in &scenario.styles {
        host.set_style(&video, property, value);
    }
    host.set_native_controls(&video, scenario.native_controls);
    host.set_scroll(Point::new(scenario.scroll.0, scenario.scroll.1));
    Page {
        host,
        container,
        video,
    }
}

fn attach(manager: &mut OverlayManager<NodeId>, page: &mut Page) -> AttachOutcome {
    manager
        .attach(&mut page.host, &page.video, &ThemeColors::DARK)
        .expect("attach succeeds")
}

proptest! {
    #[test]
    fn attach_detach_round_trip_is_lossless(scenario in scenario()) {
        let mut page = build(&scenario);
        let mut manager = OverlayManager::new(&VidliftConfig::default());
        let children = page.host.children(page.container).to_vec();
        let style = page.host.inline_style(page.video).clone();
        let body = page.host.body();
        let body_style = page.host.inline_style(body).clone();

        let id = attach(&mut manager, &mut page).id();
        prop_assert!(!page.host.children(page.container).contains(&page.video));

        if let Some((dx, dy)) = scenario.drag {
            let bar = page.host.query_all("[data-vidlift-role=\"drag-bar\"]")[0];
            let origin = Point::new(10.0, 10.0);
            prop_assert!(manager.begin_drag(&mut page.host, &bar, origin, origin));
            manager.drag_move(&mut page.host, Point::new(origin.x + dx, origin.y + dy));
        }

        let report = manager.detach(&mut page.host, id).expect("overlay is live");
        prop_assert!(report.position_restored);
        prop_assert_eq!(page.host.children(page.container), children.as_slice());
        prop_assert_eq!(page.host.inline_style(page.video), &style);
        prop_assert_eq!(page.host.native_controls(&page.video), scenario.native_controls);
        prop_assert_eq!(page.host.inline_style(body), &body_style);
        prop_assert!(page.host.query_all("[data-vidlift-overlay]").is_empty());
        prop_assert!(page.host.query_all("[data-vidlift-placeholder]").is_empty());
        prop_assert!(page.host.attribute(&page.video, "data-vidlift-overlaid").is_none());
        prop_assert!(manager.is_empty());
    }

    #[test]
    fn second_attach_is_a_no_op(scenario in scenario()) {
        let mut page = build(&scenario);
        let mut manager = OverlayManager::new(&VidliftConfig::default());
        let first = attach(&mut manager, &mut page);
        let overlays = page.host.query_all("[data-vidlift-overlay]");
        let style = page.host.inline_style(page.video).clone();

        let second = attach(&mut manager, &mut page);
        prop_assert_eq!(second, AttachOutcome::AlreadyAttached(first.id()));
        prop_assert_eq!(page.host.query_all("[data-vidlift-overlay]"), overlays);
        prop_assert_eq!(page.host.inline_style(page.video), &style);
        prop_assert_eq!(manager.len(), 1);
    }

    #[test]
    fn detach_all_leaves_no_markers(count in 0..6usize) {
        let mut host = MemoryHost::default();
        let body = host.body();
        let mut manager = OverlayManager::new(&VidliftConfig::default());
        for index in 0..count {
            let video = host.add_video(body, Rect::new(index as f64 * 10.0, 0.0, 100.0, 80.0));
            manager
                .attach(&mut host, &video, &ThemeColors::LIGHT)
                .expect("attach succeeds");
        }
        prop_assert_eq!(manager.len(), count);

        manager.detach_all(&mut host);
        prop_assert!(manager.is_empty());
        prop_assert!(host.query_all("[data-vidlift-overlay]").is_empty());
        prop_assert!(host.query_all("[data-vidlift-placeholder]").is_empty());
        prop_assert!(host.query_all("[data-vidlift-overlaid]").is_empty());
        let controls_selector = format!("[data-vidlift-role=\"{}\"]", Role::Controls.as_str());
        prop_assert!(host.query_all(&controls_selector).is_empty());
    }
}
