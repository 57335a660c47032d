//! Node, edge and handle records supplied by the caller, plus the
//! engine-owned side table entry ([`NodeInternals`]) kept per node.

use crate::geometry::{CoordinateExtent, Dimensions, NodeOrigin, XYPosition};
use serde::{Deserialize, Serialize};

/// Whether a handle starts or ends an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleType::Source => "source",
            HandleType::Target => "target",
        }
    }
}

impl std::fmt::Display for HandleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a node (or handle box) an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

/// A connection point on a node, positioned relative to the node's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub id: Option<String>,
    pub handle_type: HandleType,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub position: Option<Side>,
}

impl Handle {
    pub fn new(handle_type: HandleType, x: f64, y: f64) -> Self {
        Self {
            id: None,
            handle_type,
            x,
            y,
            width: None,
            height: None,
            position: None,
        }
    }

    pub fn source(x: f64, y: f64) -> Self {
        Self::new(HandleType::Source, x, y)
    }

    pub fn target(x: f64, y: f64) -> Self {
        Self::new(HandleType::Target, x, y)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_position(mut self, side: Side) -> Self {
        self.position = Some(side);
        self
    }
}

/// Handles of one node split by type, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandleBounds {
    pub source: Vec<Handle>,
    pub target: Vec<Handle>,
}

impl HandleBounds {
    pub fn from_handles(handles: &[Handle]) -> Self {
        let (source, target) = handles
            .iter()
            .cloned()
            .partition(|h| h.handle_type == HandleType::Source);
        Self { source, target }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }

    pub fn of_type(&self, handle_type: HandleType) -> &[Handle] {
        match handle_type {
            HandleType::Source => &self.source,
            HandleType::Target => &self.target,
        }
    }
}

/// Where a node may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeExtent {
    /// A fixed rectangle, relative to the parent's absolute position when the
    /// node has a parent, absolute otherwise.
    Fixed(CoordinateExtent),
    /// The parent node's box.
    Parent,
}

/// A node as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    /// Position relative to the parent's box, or world position for root nodes.
    pub position: XYPosition,
    pub parent_id: Option<String>,
    /// Size reported by the renderer.
    pub measured: Option<Dimensions>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub initial_width: Option<f64>,
    pub initial_height: Option<f64>,
    /// Overrides the flow-wide node origin.
    pub origin: Option<NodeOrigin>,
    pub extent: Option<NodeExtent>,
    pub expand_parent: bool,
    pub handles: Vec<Handle>,
    pub selected: bool,
    pub hidden: bool,
    pub draggable: Option<bool>,
    pub selectable: Option<bool>,
    pub deletable: Option<bool>,
}

impl Node {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            position: XYPosition::new(x, y),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_measured(mut self, width: f64, height: f64) -> Self {
        self.measured = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_initial_size(mut self, width: f64, height: f64) -> Self {
        self.initial_width = Some(width);
        self.initial_height = Some(height);
        self
    }

    pub fn with_origin(mut self, origin: NodeOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_extent(mut self, extent: NodeExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_expand_parent(mut self) -> Self {
        self.expand_parent = true;
        self
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handles.push(handle);
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = Some(draggable);
        self
    }

    /// Measured size, falling back to explicit then initial size; zero when unknown.
    ///
    /// Only a missing source falls back. A measured zero is kept, see
    /// [`has_width`](Self::has_width) for the readiness check that skips it.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.known_width().unwrap_or(0.0),
            height: self.known_height().unwrap_or(0.0),
        }
    }

    fn known_width(&self) -> Option<f64> {
        self.measured
            .map(|m| m.width)
            .or(self.width)
            .or(self.initial_width)
    }

    fn known_height(&self) -> Option<f64> {
        self.measured
            .map(|m| m.height)
            .or(self.height)
            .or(self.initial_height)
    }

    /// Some width source is non-zero. A zero measurement falls through to the
    /// explicit and initial width here.
    pub fn has_width(&self) -> bool {
        [self.measured.map(|m| m.width), self.width, self.initial_width]
            .into_iter()
            .flatten()
            .any(|w| w != 0.0 && !w.is_nan())
    }

    /// Both width and height are known from some source.
    pub fn has_dimensions(&self) -> bool {
        self.known_width().is_some() && self.known_height().is_some()
    }

    /// Origin of this node, or `default` when it does not override it.
    pub fn origin_or(&self, default: NodeOrigin) -> NodeOrigin {
        self.origin.unwrap_or(default)
    }

    pub fn is_draggable(&self, nodes_draggable: bool) -> bool {
        self.draggable.unwrap_or(nodes_draggable)
    }

    pub fn is_selectable(&self, elements_selectable: bool) -> bool {
        self.selectable.unwrap_or(elements_selectable)
    }
}

/// Engine-owned derived state of a node, recomputed by the resolver pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeInternals {
    /// World-space top-left corner of the node's box.
    pub position_absolute: XYPosition,
    /// Handle boxes reported by the measurement pass.
    pub handle_bounds: Option<HandleBounds>,
    pub selected: bool,
    /// Set while the node is part of an active drag.
    pub dragging: bool,
}

/// An edge as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `None` uses the first source handle of the source node.
    pub source_handle: Option<String>,
    /// `None` uses the first target handle of the target node.
    pub target_handle: Option<String>,
    pub selected: bool,
    pub hidden: bool,
    pub deletable: Option<bool>,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_handles(
        mut self,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Self {
        self.source_handle = source_handle.map(str::to_owned);
        self.target_handle = target_handle.map(str::to_owned);
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn connects(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}
