//! Test harness with a small two-node flow.
//!
//! Node `a` sits at (100, 100) and node `b` at (400, 200), both 150x100,
//! each with a target handle on the left and a source handle on the right.
//! Edge `a-b` connects them.

#![allow(dead_code)]

use super::EventTracker;
use flow_canvas::{
    DragTarget, Edge, FlowConfig, FlowController, Handle, Node, NodeMeasurement, PointerEvent,
    Rect, Side, XYPosition,
};

/// Client-space rect of the canvas.
pub const CONTAINER: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

pub fn node_with_handles(id: &str, x: f64, y: f64) -> Node {
    Node::new(id, x, y)
        .with_measured(150.0, 100.0)
        .with_handle(Handle::target(0.0, 45.0).with_size(10.0, 10.0).with_position(Side::Left))
        .with_handle(Handle::source(140.0, 45.0).with_size(10.0, 10.0).with_position(Side::Right))
}

pub fn default_nodes() -> Vec<Node> {
    vec![node_with_handles("a", 100.0, 100.0), node_with_handles("b", 400.0, 200.0)]
}

pub fn default_edges() -> Vec<Edge> {
    vec![Edge::new("a-b", "a", "b")]
}

pub struct FlowHarness {
    pub ctrl: FlowController,
    pub tracker: EventTracker,
}

impl FlowHarness {
    /// Create a harness with the default nodes and edge.
    pub fn new() -> Self {
        Self::with_config(FlowConfig::default())
    }

    pub fn with_config(config: FlowConfig) -> Self {
        Self::with_nodes_and_edges(config, default_nodes(), default_edges())
    }

    /// Create a harness with custom nodes and edges.
    ///
    /// Nodes carrying a measured size are reported to the controller as if
    /// the renderer had just laid them out, before the tracker is attached.
    pub fn with_nodes_and_edges(config: FlowConfig, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let ctrl = FlowController::new(config);
        ctrl.set_dimensions(CONTAINER.width, CONTAINER.height);

        let tracker = EventTracker::new();
        tracker.attach(&ctrl);

        let measurements: Vec<NodeMeasurement> = nodes
            .iter()
            .filter_map(|n| {
                n.measured
                    .map(|d| NodeMeasurement::new(n.id.clone(), d.width, d.height))
            })
            .collect();
        ctrl.set_nodes(nodes);
        ctrl.set_edges(edges);
        ctrl.handle_node_measured(&measurements);
        tracker.events.borrow_mut().clear();

        Self { ctrl, tracker }
    }

    pub fn position(&self, id: &str) -> XYPosition {
        self.ctrl
            .store()
            .borrow()
            .node(id)
            .map(|n| n.position)
            .unwrap_or_default()
    }

    pub fn position_absolute(&self, id: &str) -> Option<XYPosition> {
        self.ctrl.store().borrow().position_absolute(id)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ctrl.store().borrow().is_selected(id)
    }

    // === Pointer simulation (client coordinates) ===

    pub fn pointer_down(&self, id: &str, x: f64, y: f64) {
        self.ctrl.handle_pointer_down(
            DragTarget::Node(id.into()),
            PointerEvent::primary(x, y),
            CONTAINER,
        );
    }

    pub fn pointer_down_on_selection(&self, x: f64, y: f64) {
        self.ctrl
            .handle_pointer_down(DragTarget::Selection, PointerEvent::primary(x, y), CONTAINER);
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        self.ctrl.handle_pointer_move(PointerEvent::primary(x, y));
    }

    pub fn pointer_up(&self) {
        self.ctrl.handle_pointer_up();
    }

    /// Press at `from`, cross the drag threshold, then move by `delta`
    /// screen pixels and release.
    ///
    /// Movement before the threshold is crossed is not applied, so the
    /// node ends up exactly `delta` (divided by zoom) from where it was.
    pub fn drag_node(&self, id: &str, from: (f64, f64), delta: (f64, f64)) {
        self.pointer_down(id, from.0, from.1);
        self.pointer_move(from.0 + 2.0, from.1);
        self.pointer_move(from.0 + 2.0 + delta.0, from.1 + delta.1);
        self.pointer_up();
    }
}
