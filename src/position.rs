//! Absolute position resolution for nested nodes.
//!
//! A node's `position` is relative to its parent's box. The world-space
//! top-left corner of every node is derived here and cached in the
//! [`NodeInternals`] side table; nothing else in the crate walks parent
//! chains on its own.

use crate::changes::NodeChange;
use crate::error::FlowError;
use crate::geometry::{
    bounds_of_rects, clamp_position, round_half_up, CoordinateExtent, Dimensions, NodeOrigin,
    Rect, XYPosition,
};
use crate::node::{Node, NodeExtent, NodeInternals};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Nodes by id, in insertion order.
pub type NodeLookup = IndexMap<String, Node>;
/// Engine-owned derived state by node id.
pub type InternalsLookup = HashMap<String, NodeInternals>;
/// Child ids by parent id, in insertion order.
pub type ParentLookup = HashMap<String, Vec<String>>;

/// Offset of a node's top-left corner from its parent's top-left corner.
fn local_offset(node: &Node, node_origin: NodeOrigin) -> XYPosition {
    let origin = node.origin_or(node_origin);
    let dims = node.dimensions();
    XYPosition::new(
        node.position.x - dims.width * origin[0],
        node.position.y - dims.height * origin[1],
    )
}

/// World-space top-left corner of `node`.
///
/// Sums the origin-adjusted relative positions of the node and all of its
/// ancestors. The walk is bounded by the number of nodes: a longer chain
/// can only be a cycle, which is reported and resolved as if the node had
/// no parent. A dangling `parent_id` ends the chain at that point.
pub fn evaluate_absolute_position(
    node: &Node,
    nodes: &NodeLookup,
    node_origin: NodeOrigin,
    on_error: &mut dyn FnMut(FlowError),
) -> XYPosition {
    let own = local_offset(node, node_origin);
    let mut absolute = own;
    let mut current = node;
    let mut steps = 0;

    while let Some(parent_id) = current.parent_id.as_deref() {
        steps += 1;
        if steps > nodes.len() {
            on_error(FlowError::ParentCycle {
                node_id: node.id.clone(),
            });
            return own;
        }

        match nodes.get(parent_id) {
            Some(parent) => {
                absolute = absolute + local_offset(parent, node_origin);
                current = parent;
            }
            None => {
                // Only the node owning the dangling link reports it, descendants
                // silently stop at the same place.
                if steps == 1 {
                    on_error(FlowError::ParentNotFound {
                        node_id: current.id.clone(),
                        parent_id: parent_id.to_owned(),
                    });
                }
                break;
            }
        }
    }

    absolute
}

/// Recompute `position_absolute` for every node.
///
/// Side table entries are created for new nodes; other fields of existing
/// entries are left alone.
pub fn update_absolute_positions(
    nodes: &NodeLookup,
    internals: &mut InternalsLookup,
    node_origin: NodeOrigin,
    on_error: &mut dyn FnMut(FlowError),
) {
    for (id, node) in nodes {
        let position_absolute = evaluate_absolute_position(node, nodes, node_origin, on_error);
        internals.entry(id.clone()).or_default().position_absolute = position_absolute;
    }
}

/// World-space box of a node.
pub fn node_rect(node: &Node, position_absolute: XYPosition) -> Rect {
    let dims = node.dimensions();
    Rect::new(
        position_absolute.x,
        position_absolute.y,
        dims.width,
        dims.height,
    )
}

/// A proposed placement for a node, in both coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    /// Relative to the parent, origin-adjusted, as stored on the node record.
    pub position: XYPosition,
    /// World-space top-left corner.
    pub position_absolute: XYPosition,
}

/// Turn a desired world-space top-left corner into a clamped placement.
///
/// `node_extent` applies when the node has no extent of its own. A
/// [`NodeExtent::Parent`] node that may expand its parent is clamped
/// against `node_extent` instead of the parent box. Returns `None` when the
/// node doesn't exist.
pub fn calculate_node_position(
    node_id: &str,
    next_position: XYPosition,
    nodes: &NodeLookup,
    internals: &InternalsLookup,
    node_origin: NodeOrigin,
    node_extent: &CoordinateExtent,
    on_error: &mut dyn FnMut(FlowError),
) -> Option<NodePosition> {
    let Some(node) = nodes.get(node_id) else {
        on_error(FlowError::NodeNotFound {
            node_id: node_id.to_owned(),
        });
        return None;
    };

    let parent = node.parent_id.as_deref().and_then(|id| nodes.get(id));
    let parent_absolute = parent
        .and_then(|p| internals.get(&p.id))
        .map(|i| i.position_absolute)
        .unwrap_or_default();
    let dims = node.dimensions();
    let origin = node.origin_or(node_origin);

    let extent = match node.extent {
        Some(NodeExtent::Parent) if !node.expand_parent => match parent {
            Some(parent) if parent.has_dimensions() => {
                let parent_dims = parent.dimensions();
                CoordinateExtent::new(
                    parent_absolute.x,
                    parent_absolute.y,
                    parent_absolute.x + parent_dims.width,
                    parent_absolute.y + parent_dims.height,
                )
            }
            Some(_) => *node_extent,
            None => {
                if node.parent_id.is_none() {
                    on_error(FlowError::ParentExtentWithoutParent {
                        node_id: node.id.clone(),
                    });
                }
                *node_extent
            }
        },
        Some(NodeExtent::Fixed(extent)) if parent.is_some() => extent.translate(parent_absolute),
        Some(NodeExtent::Fixed(extent)) => extent,
        _ => *node_extent,
    };

    if !extent.is_infinite() && !node.has_dimensions() {
        on_error(FlowError::MissingDimensions {
            node_id: node.id.clone(),
        });
    }

    let position_absolute = clamp_position(next_position, &extent, dims);

    Some(NodePosition {
        position: XYPosition::new(
            position_absolute.x - parent_absolute.x + dims.width * origin[0],
            position_absolute.y - parent_absolute.y + dims.height * origin[1],
        ),
        position_absolute,
    })
}

/// A child whose new box may grow its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentExpandChild {
    pub id: String,
    pub parent_id: String,
    /// World-space box of the child at its new position.
    pub rect: Rect,
}

struct Expansion {
    parent_rect: Rect,
    expanded: Rect,
}

/// Changes that grow each parent so it contains its moved children.
///
/// Growing to the left or top moves the parent and shifts its other
/// children the opposite way, so they stay put in world space. Dimension
/// changes are emitted with `set_attributes`.
pub fn handle_expand_parent(
    children: &[ParentExpandChild],
    nodes: &NodeLookup,
    internals: &InternalsLookup,
    parent_lookup: &ParentLookup,
    node_origin: NodeOrigin,
) -> Vec<NodeChange> {
    let mut changes = Vec::new();
    let mut expansions: IndexMap<&str, Expansion> = IndexMap::new();

    for child in children {
        let Some(parent) = nodes.get(&child.parent_id) else {
            continue;
        };

        match expansions.get_mut(parent.id.as_str()) {
            Some(expansion) => {
                expansion.expanded = bounds_of_rects(expansion.expanded, child.rect);
            }
            None => {
                let position_absolute = internals
                    .get(&parent.id)
                    .map(|i| i.position_absolute)
                    .unwrap_or_default();
                let parent_rect = node_rect(parent, position_absolute);
                expansions.insert(
                    parent.id.as_str(),
                    Expansion {
                        parent_rect,
                        expanded: bounds_of_rects(parent_rect, child.rect),
                    },
                );
            }
        }
    }

    for (parent_id, Expansion { parent_rect, expanded }) in expansions {
        let Some(parent) = nodes.get(parent_id) else {
            continue;
        };
        let origin = parent.origin_or(node_origin);
        let dims = parent.dimensions();

        let x_change = if expanded.x < parent_rect.x {
            round_half_up((expanded.x - parent_rect.x).abs())
        } else {
            0.0
        };
        let y_change = if expanded.y < parent_rect.y {
            round_half_up((expanded.y - parent_rect.y).abs())
        } else {
            0.0
        };

        let new_width = dims.width.max(round_half_up(expanded.width));
        let new_height = dims.height.max(round_half_up(expanded.height));
        let width_change = (new_width - dims.width) * origin[0];
        let height_change = (new_height - dims.height) * origin[1];

        if x_change > 0.0 || y_change > 0.0 || width_change != 0.0 || height_change != 0.0 {
            changes.push(NodeChange::position(
                parent_id,
                XYPosition::new(
                    parent.position.x - x_change + width_change,
                    parent.position.y - y_change + height_change,
                ),
                false,
            ));

            for child_id in parent_lookup.get(parent_id).into_iter().flatten() {
                if children.iter().any(|c| &c.id == child_id) {
                    continue;
                }
                if let Some(sibling) = nodes.get(child_id) {
                    changes.push(NodeChange::position(
                        child_id.as_str(),
                        XYPosition::new(
                            sibling.position.x + x_change,
                            sibling.position.y + y_change,
                        ),
                        false,
                    ));
                }
            }
        }

        if dims.width < expanded.width
            || dims.height < expanded.height
            || x_change > 0.0
            || y_change > 0.0
        {
            let width_extra = if x_change > 0.0 {
                origin[0] * x_change - width_change
            } else {
                0.0
            };
            let height_extra = if y_change > 0.0 {
                origin[1] * y_change - height_change
            } else {
                0.0
            };
            changes.push(NodeChange::Dimensions {
                id: parent_id.to_owned(),
                dimensions: Some(Dimensions::new(
                    new_width + width_extra,
                    new_height + height_extra,
                )),
                set_attributes: true,
            });
        }
    }

    changes
}
