//! Level 6: Viewport Tests
//!
//! Tests pan/zoom through the controller: coordinate conversion, animated
//! transitions driven by frames, fit-view and translate extents.

mod common;

use common::harness::FlowHarness;
use flow_canvas::{CoordinateExtent, FitViewOptions, FlowConfig, Transform, XYPosition};
use futures::executor::block_on;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// Coordinate Conversion
// ============================================================================

#[test]
fn test_screen_to_world_follows_transform() {
    let harness = FlowHarness::new();
    block_on(harness.ctrl.set_viewport(Transform::new(100.0, 50.0, 2.0), None));

    assert_eq!(
        harness.ctrl.screen_to_world(XYPosition::new(300.0, 250.0)),
        XYPosition::new(100.0, 100.0)
    );
}

#[test]
fn test_screen_to_world_snaps_when_enabled() {
    let harness = FlowHarness::with_config(FlowConfig {
        snap_to_grid: true,
        snap_grid: [10.0, 10.0],
        ..Default::default()
    });
    assert_eq!(
        harness.ctrl.screen_to_world(XYPosition::new(14.0, 15.0)),
        XYPosition::new(10.0, 20.0)
    );
}

// ============================================================================
// Transitions
// ============================================================================

#[test]
fn test_animated_viewport_runs_on_frames() {
    let harness = FlowHarness::new();
    let target = Transform::new(-200.0, -100.0, 1.5);
    let mut done = harness
        .ctrl
        .set_viewport(target, Some(Duration::from_millis(100)))
        .boxed_local();

    assert_eq!(harness.ctrl.transform(), Transform::IDENTITY);
    assert!((&mut done).now_or_never().is_none());

    let mut frames = 0;
    while harness.ctrl.animation_frame(FRAME) {
        frames += 1;
        assert!(frames < 100, "transition never settled");
    }
    assert_eq!(harness.ctrl.transform(), target);
    block_on(done);
}

#[test]
fn test_pan_interrupts_animated_zoom() {
    let harness = FlowHarness::new();
    let done = harness.ctrl.zoom_in(Some(Duration::from_millis(300)));
    harness.ctrl.animation_frame(FRAME);

    assert!(harness.ctrl.pan_by(XYPosition::new(10.0, 0.0)));
    assert!(!harness.ctrl.animation_frame(FRAME));
    block_on(done);
    assert!(harness.ctrl.transform().zoom < 1.2);
}

#[test]
fn test_zoom_steps_keep_container_center() {
    let harness = FlowHarness::new();
    let center = XYPosition::new(400.0, 300.0);
    let before = harness.ctrl.screen_to_world(center);

    block_on(harness.ctrl.zoom_in(None));
    assert!(approx(harness.ctrl.transform().zoom, 1.2));
    let after = harness.ctrl.screen_to_world(center);
    assert!(approx(before.x, after.x) && approx(before.y, after.y));

    block_on(harness.ctrl.zoom_out(None));
    assert!(approx(harness.ctrl.transform().zoom, 1.0));
}

#[test]
fn test_zoom_is_clamped_to_bounds() {
    let harness = FlowHarness::new();
    for _ in 0..10 {
        block_on(harness.ctrl.zoom_out(None));
    }
    assert_eq!(harness.ctrl.transform().zoom, 0.5);

    block_on(harness.ctrl.set_viewport(Transform::new(0.0, 0.0, 10.0), None));
    assert_eq!(harness.ctrl.transform().zoom, 2.0);
}

// ============================================================================
// Fit View
// ============================================================================

#[test]
fn test_fit_view_async_matches_sync() {
    let sync = FlowHarness::new();
    assert!(sync.ctrl.fit_view_sync(&FitViewOptions::default()));

    let animated = FlowHarness::new();
    let done = animated.ctrl.fit_view(&FitViewOptions {
        duration: Some(Duration::from_millis(200)),
        ..Default::default()
    });
    while animated.ctrl.animation_frame(FRAME) {}

    assert!(block_on(done));
    assert_eq!(animated.ctrl.transform(), sync.ctrl.transform());
}

#[test]
fn test_fit_view_restricted_to_nodes() {
    let harness = FlowHarness::new();
    let fitted = harness.ctrl.fit_view_sync(&FitViewOptions {
        padding: 0.0,
        nodes: Some(vec!["b".to_owned()]),
        ..Default::default()
    });

    // b is 150x100 at (400, 200); max zoom caps the fit.
    assert!(fitted);
    assert_eq!(harness.ctrl.transform(), Transform::new(-550.0, -200.0, 2.0));
}

#[test]
fn test_fit_view_without_measured_nodes() {
    let harness = FlowHarness::with_nodes_and_edges(FlowConfig::default(), vec![], vec![]);
    assert!(!harness.ctrl.fit_view_sync(&FitViewOptions::default()));
    assert!(!block_on(harness.ctrl.fit_view(&FitViewOptions::default())));
    assert_eq!(harness.ctrl.transform(), Transform::IDENTITY);
}

// ============================================================================
// Translate Extent
// ============================================================================

fn bounded() -> FlowHarness {
    FlowHarness::with_config(FlowConfig {
        translate_extent: CoordinateExtent::new(0.0, 0.0, 1000.0, 1000.0),
        ..Default::default()
    })
}

#[test]
fn test_pan_stops_at_extent() {
    let harness = bounded();
    assert!(!harness.ctrl.pan_by(XYPosition::new(50.0, 0.0)));
    assert!(harness.ctrl.pan_by(XYPosition::new(-500.0, 0.0)));
    assert_eq!(harness.ctrl.transform().x, -200.0);
}

#[test]
fn test_config_change_reclamps_viewport() {
    let harness = FlowHarness::new();
    block_on(harness.ctrl.set_viewport(Transform::new(300.0, 300.0, 2.0), None));

    harness.ctrl.set_config(FlowConfig {
        max_zoom: 1.5,
        translate_extent: CoordinateExtent::new(0.0, 0.0, 1000.0, 1000.0),
        ..Default::default()
    });
    let transform = harness.ctrl.transform();
    assert_eq!(transform.zoom, 1.5);
    assert_eq!((transform.x, transform.y), (0.0, 0.0));
}

#[test]
fn test_auto_pan_blocked_by_extent() {
    let harness = FlowHarness::with_config(FlowConfig {
        translate_extent: CoordinateExtent::new(0.0, 0.0, 800.0, 600.0),
        ..Default::default()
    });
    harness.pointer_down("a", 110.0, 110.0);
    harness.pointer_move(112.0, 110.0);
    harness.pointer_move(790.0, 110.0);
    let before = harness.tracker.events.borrow().len();

    harness.ctrl.animation_frame(FRAME);
    assert_eq!(harness.ctrl.transform(), Transform::IDENTITY);
    assert_eq!(harness.position("a"), XYPosition::new(778.0, 100.0));
    assert_eq!(harness.tracker.events.borrow().len(), before);
    harness.pointer_up();
}
