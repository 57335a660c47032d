//! Level 5: Keyboard Input Tests
//!
//! Tests arrow-key nudging of the selection and deleting elements through
//! the confirmation hook.

mod common;

use common::harness::{default_edges, default_nodes, FlowHarness};
use flow_canvas::{
    CoordinateExtent, DeleteDecision, DeletionCandidates, Edge, EdgeChange, FlowConfig, FlowEvent,
    Node, NodeChange, XYPosition,
};
use futures::channel::oneshot;
use futures::executor::block_on;
use futures::FutureExt;
use std::cell::RefCell;
use std::rc::Rc;

const RIGHT: XYPosition = XYPosition::new(1.0, 0.0);
const UP: XYPosition = XYPosition::new(0.0, -1.0);

// ============================================================================
// Nudge Tests
// ============================================================================

#[test]
fn test_arrow_moves_selection() {
    let harness = FlowHarness::new();
    harness.ctrl.select_nodes(&["a"]);
    harness.tracker.clear();

    harness.ctrl.nudge_selection(RIGHT, false);
    assert_eq!(harness.position("a"), XYPosition::new(105.0, 100.0));
    assert_eq!(harness.position("b"), XYPosition::new(400.0, 200.0));
    assert_eq!(
        harness.tracker.positions_of("a"),
        vec![(XYPosition::new(105.0, 100.0), false)]
    );
}

#[test]
fn test_fast_arrow_moves_four_steps() {
    let harness = FlowHarness::new();
    harness.ctrl.select_nodes(&["a"]);
    harness.ctrl.nudge_selection(UP, true);
    assert_eq!(harness.position("a"), XYPosition::new(100.0, 80.0));
}

#[test]
fn test_arrow_with_grid_moves_one_cell() {
    let harness = FlowHarness::with_config(FlowConfig {
        snap_to_grid: true,
        snap_grid: [20.0, 20.0],
        ..Default::default()
    });
    harness.ctrl.select_nodes(&["a"]);
    harness.ctrl.nudge_selection(RIGHT, false);
    assert_eq!(harness.position("a"), XYPosition::new(120.0, 100.0));
}

#[test]
fn test_arrow_is_clamped_by_extent() {
    let harness = FlowHarness::with_config(FlowConfig {
        node_extent: CoordinateExtent::new(0.0, 0.0, 252.0, 1000.0),
        ..Default::default()
    });
    harness.ctrl.select_nodes(&["a"]);
    harness.ctrl.nudge_selection(RIGHT, false);
    assert_eq!(harness.position("a"), XYPosition::new(102.0, 100.0));
}

#[test]
fn test_arrow_without_selection_is_quiet() {
    let harness = FlowHarness::new();
    harness.ctrl.nudge_selection(RIGHT, false);
    assert!(harness.tracker.events.borrow().is_empty());
}

// ============================================================================
// Delete Tests
// ============================================================================

fn nested() -> FlowHarness {
    let mut nodes = default_nodes();
    nodes.push(Node::new("child", 10.0, 10.0).with_measured(20.0, 20.0).with_parent("a"));
    let mut edges = default_edges();
    edges.push(Edge::new("child-b", "child", "b"));
    FlowHarness::with_nodes_and_edges(FlowConfig::default(), nodes, edges)
}

#[test]
fn test_delete_node_takes_children_and_edges() {
    let harness = nested();
    let removed = block_on(harness.ctrl.delete_elements(&["a"], &[]));

    let node_ids: Vec<&str> = removed.nodes.iter().map(|n| n.id.as_str()).collect();
    let edge_ids: Vec<&str> = removed.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(node_ids, vec!["a", "child"]);
    assert_eq!(edge_ids, vec!["a-b", "child-b"]);

    assert_eq!(harness.tracker.kinds(), vec!["edges", "nodes"]);
    let store = harness.ctrl.store();
    assert_eq!(store.borrow().nodes().keys().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn test_delete_edge_only() {
    let harness = FlowHarness::new();
    let removed = block_on(harness.ctrl.delete_elements(&[], &["a-b"]));
    assert!(removed.nodes.is_empty());
    assert_eq!(
        *harness.tracker.events.borrow(),
        vec![FlowEvent::EdgesChange(vec![EdgeChange::Remove { id: "a-b".into() }])]
    );
}

#[test]
fn test_non_deletable_node_shields_children() {
    let mut nodes = default_nodes();
    nodes[0].deletable = Some(false);
    nodes.push(Node::new("child", 10.0, 10.0).with_parent("a"));
    let harness = FlowHarness::with_nodes_and_edges(FlowConfig::default(), nodes, default_edges());

    let removed = block_on(harness.ctrl.delete_elements(&["a"], &[]));
    assert!(removed.is_empty());
    assert!(harness.tracker.events.borrow().is_empty());
}

#[test]
fn test_hook_sees_candidates_and_can_veto() {
    let harness = nested();
    let seen = Rc::new(RefCell::new(Vec::new()));
    harness.ctrl.on_before_delete({
        let seen = seen.clone();
        move |candidates: &DeletionCandidates| {
            seen.borrow_mut().push(candidates.nodes.len());
            async { DeleteDecision::Veto }.boxed_local()
        }
    });

    let removed = block_on(harness.ctrl.delete_elements(&["a"], &[]));
    assert!(removed.is_empty());
    assert_eq!(*seen.borrow(), vec![2]);
    assert_eq!(harness.ctrl.store().borrow().nodes().len(), 3);
}

#[test]
fn test_pending_confirmation_suspends_deletion() {
    let harness = FlowHarness::new();
    let (answer, pending) = oneshot::channel::<DeleteDecision>();
    let pending = Rc::new(RefCell::new(Some(pending)));
    harness.ctrl.on_before_delete({
        let pending = pending.clone();
        move |_: &DeletionCandidates| match pending.borrow_mut().take() {
            Some(rx) => rx.map(|r| r.unwrap_or(DeleteDecision::Veto)).boxed_local(),
            None => async { DeleteDecision::Veto }.boxed_local(),
        }
    });

    let mut deletion = harness.ctrl.delete_elements(&["b"], &[]).boxed_local();
    assert!((&mut deletion).now_or_never().is_none());
    assert!(harness.tracker.events.borrow().is_empty());

    let _ = answer.send(DeleteDecision::Allow);
    let removed = block_on(deletion);
    assert_eq!(removed.nodes.len(), 1);
    assert_eq!(
        harness.tracker.node_changes(),
        vec![NodeChange::Remove { id: "b".into() }]
    );
}
