//! # Flow Canvas
//!
//! Geometry and interaction engine for node-and-edge diagrams: the part of
//! a flow editor that sits between raw pointer input and the caller's node
//! and edge collections. Rendering is left to the host.
//!
//! ## Features
//!
//! - **Nested nodes** - Absolute positions resolved through parent chains,
//!   with node origins and per-node extents
//! - **Edge anchors** - Handle lookup in strict or loose connection mode
//! - **Pan & zoom** - Clamped viewport with animated transitions and fit view
//! - **Dragging** - Threshold, snapping, group extents, parent expansion and
//!   auto-pan near the container edges
//! - **Typed changes** - Every interaction reports ordered [`FlowEvent`]s
//!
//! ## Core Types
//!
//! - [`FlowStore`] - Node and edge lookups plus derived per-node state
//! - [`PanZoom`] - The viewport transform engine
//! - [`DragEngine`] - Pointer gesture state machine
//! - [`FlowController`] - Shared handle wiring the three together
//!
//! ## Coordinates
//!
//! World space is where node positions live. Screen space is container
//! pixels, related to world space by the viewport [`Transform`]
//! `screen = world * zoom + translate`. Pointer events arrive in client
//! coordinates together with the container rect.
//!
//! ```
//! use flow_canvas::{screen_to_world, Transform, XYPosition};
//!
//! let transform = Transform::new(100.0, 50.0, 2.0);
//! let world = screen_to_world(XYPosition::new(110.0, 60.0), &transform, None);
//! assert_eq!(world, XYPosition::new(5.0, 5.0));
//! ```

pub mod changes;
pub mod config;
pub mod controller;
pub mod drag;
pub mod edges;
pub mod error;
pub mod geometry;
pub mod node;
pub mod position;
pub mod selection;
pub mod state;
pub mod viewport;

pub use changes::{EdgeChange, FlowEvent, NodeChange};
pub use config::{ConnectionMode, FitViewOptions, FlowConfig};
pub use controller::FlowController;
pub use drag::{
    nudge_selected_nodes, AutoPan, DragEngine, DragEvent, DragItem, DragPhase, DragTarget,
    PointerButton, PointerEvent,
};
pub use edges::{get_edge_position, EdgeEndpoint, EdgePosition};
pub use error::{FlowError, Result};
pub use geometry::{
    calc_auto_pan, clamp, clamp_position, overlapping_area, screen_to_world, snap_position,
    world_to_screen, Bounds, CoordinateExtent, Dimensions, NodeOrigin, Rect, SnapGrid, Transform,
    XYPosition,
};
pub use hit_test::{EdgeGeometry, NodeGeometry, SimpleEdgeGeometry, SimpleNodeGeometry};
pub use node::{Edge, Handle, HandleBounds, HandleType, Node, NodeExtent, NodeInternals, Side};
pub use position::{calculate_node_position, evaluate_absolute_position, NodePosition};
pub use selection::SelectionChanges;
pub use state::{
    DeleteDecision, DeletionCandidates, FlowStore, IntersectionArea, NodeMeasurement,
    OnBeforeDelete,
};
pub use viewport::{viewport_for_bounds, PanZoom};
