//! Typed change records emitted by the engine.
//!
//! The engine never mutates caller-owned state. Instead it emits these
//! records in order and the caller decides how to fold them into its own
//! node and edge collections (see [`FlowStore::apply_node_changes`]).
//!
//! [`FlowStore::apply_node_changes`]: crate::FlowStore::apply_node_changes

use crate::drag::DragEvent;
use crate::geometry::{Dimensions, XYPosition};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Position {
        id: String,
        position: Option<XYPosition>,
        dragging: bool,
    },
    Dimensions {
        id: String,
        dimensions: Option<Dimensions>,
        /// Also overwrite the node's explicit `width`/`height`.
        set_attributes: bool,
    },
    Select {
        id: String,
        selected: bool,
    },
    Remove {
        id: String,
    },
}

impl NodeChange {
    pub fn id(&self) -> &str {
        match self {
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Remove { id } => id,
        }
    }

    pub fn position(id: impl Into<String>, position: XYPosition, dragging: bool) -> Self {
        NodeChange::Position {
            id: id.into(),
            position: Some(position),
            dragging,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        NodeChange::Select {
            id: id.into(),
            selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Select { id: String, selected: bool },
    Remove { id: String },
}

impl EdgeChange {
    pub fn id(&self) -> &str {
        match self {
            EdgeChange::Select { id, .. } | EdgeChange::Remove { id } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        EdgeChange::Select {
            id: id.into(),
            selected,
        }
    }
}

/// One entry of the ordered output stream of an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    NodesChange(Vec<NodeChange>),
    EdgesChange(Vec<EdgeChange>),
    DragStart(DragEvent),
    Drag(DragEvent),
    DragStop(DragEvent),
    /// The gesture was aborted (e.g. pointer capture lost). Positions stay at
    /// the last committed frame.
    DragCancel(DragEvent),
}

impl FlowEvent {
    /// The node changes carried by this event, if any.
    pub fn node_changes(&self) -> Option<&[NodeChange]> {
        match self {
            FlowEvent::NodesChange(changes) => Some(changes),
            _ => None,
        }
    }
}

/// Push a node change batch unless it's empty.
pub(crate) fn push_node_changes(events: &mut Vec<FlowEvent>, changes: Vec<NodeChange>) {
    if !changes.is_empty() {
        events.push(FlowEvent::NodesChange(changes));
    }
}

/// Push an edge change batch unless it's empty.
pub(crate) fn push_edge_changes(events: &mut Vec<FlowEvent>, changes: Vec<EdgeChange>) {
    if !changes.is_empty() {
        events.push(FlowEvent::EdgesChange(changes));
    }
}
