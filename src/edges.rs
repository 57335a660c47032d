//! Edge anchor resolution.
//!
//! An edge attaches to one handle on each of its nodes. The anchor is a
//! point on the handle box, picked by the side the handle faces.

use crate::config::ConnectionMode;
use crate::error::{FlowError, Result};
use crate::geometry::XYPosition;
use crate::node::{Handle, HandleBounds, HandleType, Node, NodeInternals, Side};
use std::borrow::Cow;

/// World-space endpoints of an edge and the sides they leave from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePosition {
    pub source_x: f64,
    pub source_y: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub source_position: Side,
    pub target_position: Side,
}

/// One end of an edge as seen by the anchor resolver.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEndpoint<'a> {
    pub node: &'a Node,
    pub internals: &'a NodeInternals,
    pub handle_id: Option<&'a str>,
}

/// A node can anchor edges once it has handles and a non-zero width from
/// any source.
pub fn is_node_initialized(node: &Node, internals: &NodeInternals) -> bool {
    let has_handles = internals
        .handle_bounds
        .as_ref()
        .is_some_and(|b| !b.is_empty())
        || !node.handles.is_empty();

    has_handles && node.has_width()
}

/// Measured handle bounds, or the ones declared on the node record.
fn handle_bounds<'a>(node: &'a Node, internals: &'a NodeInternals) -> Cow<'a, HandleBounds> {
    match &internals.handle_bounds {
        Some(bounds) if !bounds.is_empty() => Cow::Borrowed(bounds),
        _ => Cow::Owned(HandleBounds::from_handles(&node.handles)),
    }
}

/// The handle with `id`, or the first handle when `id` is `None`.
pub fn get_handle<'a>(handles: &[&'a Handle], id: Option<&str>) -> Option<&'a Handle> {
    match id {
        Some(id) => handles.iter().copied().find(|h| h.id.as_deref() == Some(id)),
        None => handles.first().copied(),
    }
}

/// Anchor point on `handle` for a node whose box starts at `position_absolute`.
///
/// Handles without a size use the node's box; a node without a size
/// anchors on a 1x1 box.
pub fn get_handle_position(
    node: &Node,
    position_absolute: XYPosition,
    handle: &Handle,
    fallback_side: Side,
) -> XYPosition {
    let dims = node.dimensions();
    let width = handle
        .width
        .unwrap_or(if dims.width > 0.0 { dims.width } else { 1.0 });
    let height = handle
        .height
        .unwrap_or(if dims.height > 0.0 { dims.height } else { 1.0 });
    let x = handle.x + position_absolute.x;
    let y = handle.y + position_absolute.y;

    match handle.position.unwrap_or(fallback_side) {
        Side::Top => XYPosition::new(x + width / 2.0, y),
        Side::Right => XYPosition::new(x + width, y + height / 2.0),
        Side::Bottom => XYPosition::new(x + width / 2.0, y + height),
        Side::Left => XYPosition::new(x, y + height / 2.0),
    }
}

/// Resolve both anchors of an edge.
///
/// `Ok(None)` means an endpoint isn't measured yet and the edge shouldn't
/// be drawn. A handle that can't be found is an error naming the side.
/// Loose mode lets the target end attach to source handles too.
pub fn get_edge_position(
    edge_id: &str,
    source: EdgeEndpoint<'_>,
    target: EdgeEndpoint<'_>,
    connection_mode: ConnectionMode,
) -> Result<Option<EdgePosition>> {
    if !is_node_initialized(source.node, source.internals)
        || !is_node_initialized(target.node, target.internals)
    {
        return Ok(None);
    }

    let source_bounds = handle_bounds(source.node, source.internals);
    let target_bounds = handle_bounds(target.node, target.internals);

    let source_handles: Vec<&Handle> = source_bounds.source.iter().collect();
    let target_handles: Vec<&Handle> = match connection_mode {
        ConnectionMode::Strict => target_bounds.target.iter().collect(),
        ConnectionMode::Loose => target_bounds
            .target
            .iter()
            .chain(target_bounds.source.iter())
            .collect(),
    };

    let missing = |side: HandleType| FlowError::MissingHandle {
        edge_id: edge_id.to_owned(),
        side,
        source_handle: source.handle_id.map(str::to_owned),
        target_handle: target.handle_id.map(str::to_owned),
    };

    let source_handle =
        get_handle(&source_handles, source.handle_id).ok_or_else(|| missing(HandleType::Source))?;
    let target_handle =
        get_handle(&target_handles, target.handle_id).ok_or_else(|| missing(HandleType::Target))?;

    let source_position = source_handle.position.unwrap_or(Side::Bottom);
    let target_position = target_handle.position.unwrap_or(Side::Top);

    let source_point = get_handle_position(
        source.node,
        source.internals.position_absolute,
        source_handle,
        source_position,
    );
    let target_point = get_handle_position(
        target.node,
        target.internals.position_absolute,
        target_handle,
        target_position,
    );

    Ok(Some(EdgePosition {
        source_x: source_point.x,
        source_y: source_point.y,
        target_x: target_point.x,
        target_y: target_point.y,
        source_position,
        target_position,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn internals_at(x: f64, y: f64) -> NodeInternals {
        NodeInternals {
            position_absolute: XYPosition::new(x, y),
            ..Default::default()
        }
    }

    fn source_node() -> Node {
        Node::new("a", 0.0, 0.0)
            .with_measured(100.0, 50.0)
            .with_handle(
                Handle::source(90.0, 20.0)
                    .with_id("out")
                    .with_size(10.0, 10.0)
                    .with_position(Side::Right),
            )
    }

    fn target_node() -> Node {
        Node::new("b", 200.0, 0.0)
            .with_measured(100.0, 50.0)
            .with_handle(
                Handle::target(0.0, 20.0)
                    .with_id("in")
                    .with_size(10.0, 10.0)
                    .with_position(Side::Left),
            )
    }

    #[test]
    fn test_anchor_on_handle_sides() {
        let (a, b) = (source_node(), target_node());
        let (ia, ib) = (internals_at(0.0, 0.0), internals_at(200.0, 0.0));
        let pos = get_edge_position(
            "e",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: Some("in") },
            ConnectionMode::Strict,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            pos,
            EdgePosition {
                source_x: 100.0,
                source_y: 25.0,
                target_x: 200.0,
                target_y: 25.0,
                source_position: Side::Right,
                target_position: Side::Left,
            }
        );
    }

    #[test]
    fn test_measured_handle_bounds_win_over_declared() {
        let a = source_node();
        let b = target_node();
        let ia = NodeInternals {
            handle_bounds: Some(HandleBounds {
                source: vec![Handle::source(40.0, 40.0).with_size(20.0, 10.0)],
                target: vec![],
            }),
            ..internals_at(10.0, 10.0)
        };
        let ib = internals_at(200.0, 0.0);
        let pos = get_edge_position(
            "e",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: None },
            ConnectionMode::Strict,
        )
        .unwrap()
        .unwrap();

        // Falls back to Bottom when the handle doesn't name a side.
        assert_eq!(pos.source_position, Side::Bottom);
        assert_eq!((pos.source_x, pos.source_y), (60.0, 60.0));
    }

    #[test]
    fn test_unsized_handle_uses_node_box() {
        let node = Node::new("a", 0.0, 0.0).with_measured(100.0, 50.0);
        let handle = Handle::target(0.0, 0.0);
        let point = get_handle_position(&node, XYPosition::new(10.0, 10.0), &handle, Side::Top);
        assert_eq!(point, XYPosition::new(60.0, 10.0));
    }

    #[test]
    fn test_unmeasured_node_yields_none() {
        let a = Node::new("a", 0.0, 0.0).with_handle(Handle::source(0.0, 0.0));
        let b = target_node();
        let ia = internals_at(0.0, 0.0);
        let ib = internals_at(200.0, 0.0);
        let pos = get_edge_position(
            "e",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: None },
            ConnectionMode::Strict,
        );
        assert_eq!(pos, Ok(None));
    }

    #[test]
    fn test_zero_measured_width_falls_back_to_explicit_width() {
        let a = Node {
            width: Some(100.0),
            height: Some(50.0),
            ..source_node().with_measured(0.0, 0.0)
        };
        let b = target_node();
        let ia = internals_at(0.0, 0.0);
        let ib = internals_at(200.0, 0.0);
        let pos = get_edge_position(
            "e",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: None },
            ConnectionMode::Strict,
        )
        .unwrap()
        .unwrap();
        assert_eq!((pos.source_x, pos.source_y), (100.0, 25.0));

        let collapsed = source_node().with_measured(0.0, 0.0);
        let pos = get_edge_position(
            "e",
            EdgeEndpoint { node: &collapsed, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: None },
            ConnectionMode::Strict,
        );
        assert_eq!(pos, Ok(None));
    }

    #[test]
    fn test_missing_source_handle_names_source_side() {
        let (a, b) = (source_node(), target_node());
        let (ia, ib) = (internals_at(0.0, 0.0), internals_at(200.0, 0.0));
        let err = get_edge_position(
            "e1",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: Some("nope") },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: None },
            ConnectionMode::Strict,
        )
        .unwrap_err();

        assert_eq!(
            err,
            FlowError::MissingHandle {
                edge_id: "e1".into(),
                side: HandleType::Source,
                source_handle: Some("nope".into()),
                target_handle: None,
            }
        );
    }

    #[test]
    fn test_loose_mode_targets_source_handles() {
        let a = source_node();
        let b = source_node();
        let (ia, ib) = (internals_at(0.0, 0.0), internals_at(0.0, 100.0));

        let strict = get_edge_position(
            "e",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: Some("out") },
            ConnectionMode::Strict,
        );
        assert!(matches!(
            strict,
            Err(FlowError::MissingHandle { side: HandleType::Target, .. })
        ));

        let loose = get_edge_position(
            "e",
            EdgeEndpoint { node: &a, internals: &ia, handle_id: None },
            EdgeEndpoint { node: &b, internals: &ib, handle_id: Some("out") },
            ConnectionMode::Loose,
        )
        .unwrap()
        .unwrap();
        assert_eq!((loose.target_x, loose.target_y), (100.0, 125.0));
    }
}
