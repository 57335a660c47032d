//! Level 1: Initialization Tests
//!
//! Tests node adoption, absolute position resolution and fit-view-on-init.

mod common;

use common::harness::{FlowHarness, CONTAINER};
use flow_canvas::{
    world_to_screen, FlowConfig, Node, NodeChange, NodeMeasurement, Transform, XYPosition,
};

#[test]
fn test_default_scene_positions() {
    let harness = FlowHarness::new();
    assert_eq!(harness.position_absolute("a"), Some(XYPosition::new(100.0, 100.0)));
    assert_eq!(harness.position_absolute("b"), Some(XYPosition::new(400.0, 200.0)));
    assert!(harness.tracker.errors.borrow().is_empty());
}

#[test]
fn test_nested_positions_compose() {
    let harness = FlowHarness::with_nodes_and_edges(
        FlowConfig::default(),
        vec![
            Node::new("grandparent", 0.0, 0.0),
            Node::new("parent", 10.0, 10.0).with_parent("grandparent"),
            Node::new("child", 5.0, 5.0).with_parent("parent"),
        ],
        vec![],
    );
    assert_eq!(harness.position_absolute("child"), Some(XYPosition::new(15.0, 15.0)));
}

#[test]
fn test_origin_shifts_absolute_position() {
    let harness = FlowHarness::with_nodes_and_edges(
        FlowConfig::default(),
        vec![Node::new("n", 0.0, 0.0)
            .with_measured(100.0, 40.0)
            .with_origin([0.5, 0.5])],
        vec![],
    );
    assert_eq!(harness.position_absolute("n"), Some(XYPosition::new(-50.0, -20.0)));
}

#[test]
fn test_unknown_parent_is_reported_and_ignored() {
    let harness = FlowHarness::with_nodes_and_edges(
        FlowConfig::default(),
        vec![Node::new("orphan", 7.0, 8.0).with_parent("nobody")],
        vec![],
    );
    assert_eq!(harness.position_absolute("orphan"), Some(XYPosition::new(7.0, 8.0)));
    assert!(harness.tracker.error_codes().contains(&"016"));
}

#[test]
fn test_parent_cycle_terminates() {
    let harness = FlowHarness::with_nodes_and_edges(
        FlowConfig::default(),
        vec![
            Node::new("x", 1.0, 0.0).with_parent("y"),
            Node::new("y", 2.0, 0.0).with_parent("x"),
        ],
        vec![],
    );
    assert!(harness.tracker.error_codes().contains(&"017"));
    assert!(harness.position_absolute("x").is_some());
}

#[test]
fn test_replacing_nodes_keeps_measurements() {
    let harness = FlowHarness::new();
    harness
        .ctrl
        .set_nodes(vec![Node::new("a", 0.0, 0.0), Node::new("c", 0.0, 0.0)]);

    let store = harness.ctrl.store();
    let store = store.borrow();
    assert_eq!(store.node("a").and_then(|n| n.measured).map(|d| d.width), Some(150.0));
    assert_eq!(store.node("c").and_then(|n| n.measured), None);
    assert!(store.node("b").is_none());
}

#[test]
fn test_measurement_of_unknown_node_reports_error() {
    let harness = FlowHarness::new();
    harness
        .ctrl
        .handle_node_measured(&[NodeMeasurement::new("ghost", 10.0, 10.0)]);
    assert_eq!(harness.tracker.error_codes(), vec!["018"]);
    assert!(harness.tracker.events.borrow().is_empty());
}

#[test]
fn test_remeasuring_emits_dimension_change() {
    let harness = FlowHarness::new();
    harness.ctrl.handle_node_measured(&[
        NodeMeasurement::new("a", 150.0, 100.0),
        NodeMeasurement::new("b", 160.0, 100.0),
    ]);

    let changes = harness.tracker.node_changes();
    assert_eq!(changes.len(), 1);
    assert!(matches!(&changes[0], NodeChange::Dimensions { id, .. } if id == "b"));
}

#[test]
fn test_fit_view_on_init_centers_nodes() {
    let harness = FlowHarness::with_config(FlowConfig {
        fit_view_on_init: true,
        ..Default::default()
    });

    // Nodes span (100, 100) to (550, 300).
    let transform = harness.ctrl.transform();
    let center = world_to_screen(XYPosition::new(325.0, 200.0), &transform);
    assert!((center.x - CONTAINER.width / 2.0).abs() < 1e-9);
    assert!((center.y - CONTAINER.height / 2.0).abs() < 1e-9);
    assert!((transform.zoom - 800.0 / (450.0 * 1.1)).abs() < 1e-9);
}

#[test]
fn test_fit_view_on_init_waits_for_measurements() {
    let harness = FlowHarness::with_nodes_and_edges(
        FlowConfig {
            fit_view_on_init: true,
            ..Default::default()
        },
        vec![Node::new("late", 1000.0, 1000.0)],
        vec![],
    );
    assert_eq!(harness.ctrl.transform(), Transform::IDENTITY);

    harness
        .ctrl
        .handle_node_measured(&[NodeMeasurement::new("late", 100.0, 100.0)]);
    assert_ne!(harness.ctrl.transform(), Transform::IDENTITY);
}
