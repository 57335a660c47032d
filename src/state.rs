//! The node and edge store.
//!
//! [`FlowStore`] owns the id lookups, the derived [`NodeInternals`] side
//! table and the queue of reported errors. Everything that needs a node's absolute
//! position reads it from here.

use crate::changes::{EdgeChange, NodeChange};
use crate::config::{FitViewOptions, FlowConfig};
use crate::edges::{get_edge_position, EdgeEndpoint, EdgePosition};
use crate::error::{FlowError, Result};
use crate::geometry::{
    bounds_of_boxes, box_to_rect, rect_to_box, Bounds, Dimensions, Rect, XYPosition,
};
use crate::hit_test::{
    edges_in_selection_box, find_node_at, is_rect_intersecting, nodes_in_selection_box,
    SimpleEdgeGeometry, SimpleNodeGeometry,
};
use crate::node::{Edge, HandleBounds, Node, NodeInternals};
use crate::position::{
    node_rect, update_absolute_positions, InternalsLookup, NodeLookup, ParentLookup,
};
use crate::selection::{diff_selection, SelectionChanges};
use futures::future::LocalBoxFuture;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Edges by id, in insertion order.
pub type EdgeLookup = IndexMap<String, Edge>;

/// A size report from the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeasurement {
    pub id: String,
    pub dimensions: Dimensions,
    pub handle_bounds: Option<HandleBounds>,
    /// Emit a dimensions change even when nothing changed.
    pub force: bool,
}

impl NodeMeasurement {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            dimensions: Dimensions::new(width, height),
            handle_bounds: None,
            force: false,
        }
    }

    pub fn with_handle_bounds(mut self, handle_bounds: HandleBounds) -> Self {
        self.handle_bounds = Some(handle_bounds);
        self
    }
}

/// The area an intersection query tests against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntersectionArea<'a> {
    /// The box of an existing node, which is itself excluded from results.
    Node(&'a str),
    Rect(Rect),
}

/// Nodes and edges selected for removal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeletionCandidates {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl DeletionCandidates {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Remove changes for every candidate.
    pub fn removal_changes(&self) -> (Vec<NodeChange>, Vec<EdgeChange>) {
        (
            self.nodes
                .iter()
                .map(|n| NodeChange::Remove { id: n.id.clone() })
                .collect(),
            self.edges
                .iter()
                .map(|e| EdgeChange::Remove { id: e.id.clone() })
                .collect(),
        )
    }
}

/// Answer of the deletion confirmation hook.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteDecision {
    Allow,
    Veto,
    /// Delete this set instead of the proposed one.
    Replace(DeletionCandidates),
}

/// Asynchronous deletion confirmation hook.
pub type OnBeforeDelete =
    Rc<dyn Fn(&DeletionCandidates) -> LocalBoxFuture<'static, DeleteDecision>>;

pub struct FlowStore {
    config: FlowConfig,
    nodes: NodeLookup,
    internals: InternalsLookup,
    parent_lookup: ParentLookup,
    edges: EdgeLookup,
    /// Edge ids by connected node id.
    connections: HashMap<String, Vec<String>>,
    multi_selection_active: bool,
    /// Reported errors not yet taken by the owner.
    errors: Vec<FlowError>,
}

impl Default for FlowStore {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl std::fmt::Debug for FlowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowStore")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("multi_selection_active", &self.multi_selection_active)
            .finish()
    }
}

impl FlowStore {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            nodes: NodeLookup::new(),
            internals: InternalsLookup::new(),
            parent_lookup: ParentLookup::new(),
            edges: EdgeLookup::new(),
            connections: HashMap::new(),
            multi_selection_active: false,
            errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Replace the config. Absolute positions are recomputed since the node
    /// origin may have changed.
    pub fn set_config(&mut self, config: FlowConfig) {
        self.config = config;
        self.update_absolute_positions();
    }

    /// Log an error and queue it for [`take_errors`](Self::take_errors).
    pub fn report(&mut self, error: FlowError) {
        log::warn!("[{}] {}", error.code(), error);
        self.errors.push(error);
    }

    /// Drain the errors reported since the last call, oldest first.
    pub fn take_errors(&mut self) -> Vec<FlowError> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn report_all(&mut self, errors: Vec<FlowError>) {
        for error in errors {
            self.report(error);
        }
    }

    // === Lookups ===

    pub fn nodes(&self) -> &NodeLookup {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn internals(&self, id: &str) -> Option<&NodeInternals> {
        self.internals.get(id)
    }

    pub fn internals_lookup(&self) -> &InternalsLookup {
        &self.internals
    }

    pub fn parent_lookup(&self) -> &ParentLookup {
        &self.parent_lookup
    }

    pub fn position_absolute(&self, id: &str) -> Option<XYPosition> {
        self.internals.get(id).map(|i| i.position_absolute)
    }

    /// Direct children of `parent_id`.
    pub fn children(&self, parent_id: &str) -> &[String] {
        self.parent_lookup
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn edges(&self) -> &EdgeLookup {
        &self.edges
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn is_selected(&self, node_id: &str) -> bool {
        self.internals.get(node_id).is_some_and(|i| i.selected)
    }

    pub fn selected_node_ids(&self) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|id| self.is_selected(id))
            .cloned()
            .collect()
    }

    /// Edges attached to `node_id`, whose anchors move with it.
    pub fn connected_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.connections
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|edge_id| self.edges.get(edge_id))
            .collect()
    }

    // === Adoption ===

    /// Replace all nodes.
    ///
    /// Measured sizes and handle bounds survive for ids that persist when
    /// the new record doesn't carry its own. Selection is taken from the
    /// supplied records.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        let previous_nodes = std::mem::take(&mut self.nodes);
        let mut previous_internals = std::mem::take(&mut self.internals);
        self.parent_lookup.clear();

        for mut node in nodes {
            let previous = previous_internals.remove(&node.id);
            if node.measured.is_none() {
                node.measured = previous_nodes.get(&node.id).and_then(|n| n.measured);
            }

            let internals = NodeInternals {
                handle_bounds: previous.and_then(|p| p.handle_bounds),
                selected: node.selected,
                ..Default::default()
            };

            if let Some(parent_id) = &node.parent_id {
                self.parent_lookup
                    .entry(parent_id.clone())
                    .or_default()
                    .push(node.id.clone());
            }

            self.internals.insert(node.id.clone(), internals);
            self.nodes.insert(node.id.clone(), node);
        }

        log::debug!("adopted {} nodes", self.nodes.len());
        self.update_absolute_positions();
    }

    /// Replace all edges and rebuild the per-node connection index.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.edges.clear();
        self.connections.clear();

        for edge in edges {
            self.connections
                .entry(edge.source.clone())
                .or_default()
                .push(edge.id.clone());
            if edge.target != edge.source {
                self.connections
                    .entry(edge.target.clone())
                    .or_default()
                    .push(edge.id.clone());
            }
            self.edges.insert(edge.id.clone(), edge);
        }
    }

    /// Re-run the absolute position pass over all nodes.
    pub fn update_absolute_positions(&mut self) {
        let mut errors = Vec::new();
        update_absolute_positions(
            &self.nodes,
            &mut self.internals,
            self.config.node_origin,
            &mut |e| errors.push(e),
        );
        self.report_all(errors);
    }

    /// Record renderer measurements.
    ///
    /// Returns a dimensions change for every node whose size or handles
    /// changed (or that asked to be forced).
    pub fn update_node_internals(&mut self, updates: &[NodeMeasurement]) -> Vec<NodeChange> {
        let mut changes = Vec::new();
        let mut errors = Vec::new();

        for update in updates {
            let Some(node) = self.nodes.get_mut(&update.id) else {
                errors.push(FlowError::NodeNotFound {
                    node_id: update.id.clone(),
                });
                continue;
            };
            let internals = self.internals.entry(update.id.clone()).or_default();

            let size_changed = node.measured != Some(update.dimensions);
            let handles_changed = update
                .handle_bounds
                .as_ref()
                .is_some_and(|b| internals.handle_bounds.as_ref() != Some(b));

            if !(size_changed || handles_changed || update.force) {
                continue;
            }

            node.measured = Some(update.dimensions);
            if let Some(bounds) = &update.handle_bounds {
                internals.handle_bounds = Some(bounds.clone());
            }
            changes.push(NodeChange::Dimensions {
                id: update.id.clone(),
                dimensions: Some(update.dimensions),
                set_attributes: false,
            });
        }

        self.report_all(errors);
        if !changes.is_empty() {
            self.update_absolute_positions();
        }
        changes
    }

    // === Change application ===

    /// Fold node changes into the store and recompute absolute positions.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) {
        for change in changes {
            match change {
                NodeChange::Position {
                    id,
                    position,
                    dragging,
                } => {
                    if let Some(node) = self.nodes.get_mut(id) {
                        if let Some(position) = position {
                            node.position = *position;
                        }
                    }
                    if let Some(internals) = self.internals.get_mut(id) {
                        internals.dragging = *dragging;
                    }
                }
                NodeChange::Dimensions {
                    id,
                    dimensions,
                    set_attributes,
                } => {
                    if let (Some(node), Some(dims)) = (self.nodes.get_mut(id), dimensions) {
                        node.measured = Some(*dims);
                        if *set_attributes {
                            node.width = Some(dims.width);
                            node.height = Some(dims.height);
                        }
                    }
                }
                NodeChange::Select { id, selected } => {
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.selected = *selected;
                    }
                    if let Some(internals) = self.internals.get_mut(id) {
                        internals.selected = *selected;
                    }
                }
                NodeChange::Remove { id } => self.remove_node(id),
            }
        }

        self.update_absolute_positions();
    }

    fn remove_node(&mut self, id: &str) {
        let Some(node) = self.nodes.shift_remove(id) else {
            return;
        };
        self.internals.remove(id);
        self.parent_lookup.remove(id);
        if let Some(parent_id) = node.parent_id.as_deref() {
            if let Some(siblings) = self.parent_lookup.get_mut(parent_id) {
                siblings.retain(|child| child != id);
                if siblings.is_empty() {
                    self.parent_lookup.remove(parent_id);
                }
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) {
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    if let Some(edge) = self.edges.get_mut(id) {
                        edge.selected = *selected;
                    }
                }
                EdgeChange::Remove { id } => {
                    if let Some(edge) = self.edges.shift_remove(id) {
                        for node_id in [&edge.source, &edge.target] {
                            if let Some(ids) = self.connections.get_mut(node_id) {
                                ids.retain(|e| e != id);
                            }
                        }
                    }
                }
            }
        }
    }

    // === Selection ===

    pub fn multi_selection_active(&self) -> bool {
        self.multi_selection_active
    }

    pub fn set_multi_selection_active(&mut self, active: bool) {
        self.multi_selection_active = active;
    }

    fn select_nodes_exactly(&mut self, ids: &HashSet<&str>) -> Vec<NodeChange> {
        let flips = diff_selection(
            self.nodes
                .keys()
                .map(|id| (id.as_str(), self.is_selected(id))),
            ids,
        );
        let changes: Vec<NodeChange> = flips
            .into_iter()
            .map(|(id, selected)| NodeChange::select(id, selected))
            .collect();
        self.apply_selection(&changes, &[]);
        changes
    }

    fn select_edges_exactly(&mut self, ids: &HashSet<&str>) -> Vec<EdgeChange> {
        let flips = diff_selection(
            self.edges.values().map(|e| (e.id.as_str(), e.selected)),
            ids,
        );
        let changes: Vec<EdgeChange> = flips
            .into_iter()
            .map(|(id, selected)| EdgeChange::select(id, selected))
            .collect();
        self.apply_selection(&[], &changes);
        changes
    }

    fn apply_selection(&mut self, nodes: &[NodeChange], edges: &[EdgeChange]) {
        for change in nodes {
            if let NodeChange::Select { id, selected } = change {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.selected = *selected;
                }
                if let Some(internals) = self.internals.get_mut(id) {
                    internals.selected = *selected;
                }
            }
        }
        self.apply_edge_changes(edges);
    }

    /// Select `ids`. Without multi-selection everything else, edges included,
    /// is unselected.
    pub fn add_selected_nodes(&mut self, ids: &[&str]) -> SelectionChanges {
        if self.multi_selection_active {
            let nodes: Vec<NodeChange> = ids
                .iter()
                .filter(|id| self.nodes.contains_key(**id))
                .map(|id| NodeChange::select(*id, true))
                .collect();
            self.apply_selection(&nodes, &[]);
            return SelectionChanges {
                nodes,
                edges: Vec::new(),
            };
        }

        let wanted: HashSet<&str> = ids.iter().copied().collect();
        SelectionChanges {
            nodes: self.select_nodes_exactly(&wanted),
            edges: self.select_edges_exactly(&HashSet::new()),
        }
    }

    /// Select edge `ids`. Without multi-selection everything else, nodes
    /// included, is unselected.
    pub fn add_selected_edges(&mut self, ids: &[&str]) -> SelectionChanges {
        if self.multi_selection_active {
            let edges: Vec<EdgeChange> = ids
                .iter()
                .filter(|id| self.edges.contains_key(**id))
                .map(|id| EdgeChange::select(*id, true))
                .collect();
            self.apply_selection(&[], &edges);
            return SelectionChanges {
                nodes: Vec::new(),
                edges,
            };
        }

        let wanted: HashSet<&str> = ids.iter().copied().collect();
        SelectionChanges {
            nodes: self.select_nodes_exactly(&HashSet::new()),
            edges: self.select_edges_exactly(&wanted),
        }
    }

    /// Unselect the given nodes and edges, or every selected one when `None`.
    pub fn unselect_nodes_and_edges(
        &mut self,
        nodes: Option<&[&str]>,
        edges: Option<&[&str]>,
    ) -> SelectionChanges {
        let node_ids: Vec<String> = match nodes {
            Some(ids) => ids
                .iter()
                .filter(|id| self.nodes.contains_key(**id))
                .map(|id| id.to_string())
                .collect(),
            None => self.selected_node_ids(),
        };
        let edge_ids: Vec<String> = match edges {
            Some(ids) => ids
                .iter()
                .filter(|id| self.edges.contains_key(**id))
                .map(|id| id.to_string())
                .collect(),
            None => self
                .edges
                .values()
                .filter(|e| e.selected)
                .map(|e| e.id.clone())
                .collect(),
        };

        let changes = SelectionChanges {
            nodes: node_ids
                .into_iter()
                .map(|id| NodeChange::select(id, false))
                .collect(),
            edges: edge_ids
                .into_iter()
                .map(|id| EdgeChange::select(id, false))
                .collect(),
        };
        self.apply_selection(&changes.nodes, &changes.edges);
        changes
    }

    /// Unselect everything that is selected.
    pub fn reset_selected_elements(&mut self) -> SelectionChanges {
        SelectionChanges {
            nodes: self.select_nodes_exactly(&HashSet::new()),
            edges: self.select_edges_exactly(&HashSet::new()),
        }
    }

    // === Edge anchors ===

    /// Anchors of one edge.
    ///
    /// `Ok(None)` for an unknown edge or one whose nodes aren't measured yet.
    pub fn edge_position(&self, edge_id: &str) -> Result<Option<EdgePosition>> {
        let Some(edge) = self.edges.get(edge_id) else {
            return Ok(None);
        };

        let source = self.edge_endpoint(edge, &edge.source, edge.source_handle.as_deref())?;
        let target = self.edge_endpoint(edge, &edge.target, edge.target_handle.as_deref())?;
        get_edge_position(&edge.id, source, target, self.config.connection_mode)
    }

    fn edge_endpoint<'a>(
        &'a self,
        edge: &Edge,
        node_id: &str,
        handle_id: Option<&'a str>,
    ) -> Result<EdgeEndpoint<'a>> {
        match (self.nodes.get(node_id), self.internals.get(node_id)) {
            (Some(node), Some(internals)) => Ok(EdgeEndpoint {
                node,
                internals,
                handle_id,
            }),
            _ => Err(FlowError::EdgeEndpointNotFound {
                edge_id: edge.id.clone(),
                node_id: node_id.to_owned(),
            }),
        }
    }

    /// Anchors of every visible edge that can be drawn. Configuration errors
    /// are reported and the offending edge skipped.
    pub fn edge_positions(&mut self) -> Vec<(String, EdgePosition)> {
        let mut positions = Vec::new();
        let mut errors = Vec::new();

        for edge in self.edges.values().filter(|e| !e.hidden) {
            match self.edge_position(&edge.id) {
                Ok(Some(position)) => positions.push((edge.id.clone(), position)),
                Ok(None) => {}
                Err(error) => errors.push(error),
            }
        }

        self.report_all(errors);
        positions
    }

    // === Intersections ===

    /// World-space box of a node.
    pub fn node_rect(&self, id: &str) -> Option<Rect> {
        let node = self.nodes.get(id)?;
        Some(node_rect(node, self.position_absolute(id)?))
    }

    fn visible_node_geometries(&self) -> impl Iterator<Item = SimpleNodeGeometry> + '_ {
        self.nodes
            .values()
            .filter(|n| !n.hidden)
            .filter_map(|n| {
                Some(SimpleNodeGeometry {
                    id: n.id.clone(),
                    rect: self.node_rect(&n.id)?,
                })
            })
    }

    fn area_rect(&self, area: IntersectionArea<'_>) -> Option<Rect> {
        match area {
            IntersectionArea::Node(id) => self.node_rect(id),
            IntersectionArea::Rect(rect) => Some(rect),
        }
    }

    /// Visible nodes overlapping `area`.
    pub fn intersecting_nodes(&self, area: IntersectionArea<'_>, partially: bool) -> Vec<String> {
        let Some(rect) = self.area_rect(area) else {
            return Vec::new();
        };
        let exclude = match area {
            IntersectionArea::Node(id) => Some(id),
            IntersectionArea::Rect(_) => None,
        };

        nodes_in_selection_box(
            rect,
            self.visible_node_geometries()
                .filter(|g| Some(g.id.as_str()) != exclude),
            partially,
        )
    }

    /// Whether node `id` overlaps `area`.
    pub fn is_node_intersecting(
        &self,
        id: &str,
        area: IntersectionArea<'_>,
        partially: bool,
    ) -> bool {
        match (self.node_rect(id), self.area_rect(area)) {
            (Some(rect), Some(area)) => is_rect_intersecting(rect, area, partially),
            _ => false,
        }
    }

    /// Visible nodes inside a world-space selection rectangle.
    pub fn nodes_in_selection_box(&self, selection: Rect, partially: bool) -> Vec<String> {
        nodes_in_selection_box(selection, self.visible_node_geometries(), partially)
    }

    /// Visible edges with an anchor inside a world-space selection rectangle.
    pub fn edges_in_selection_box(&mut self, selection: Rect) -> Vec<String> {
        let geometries: Vec<SimpleEdgeGeometry> = self
            .edge_positions()
            .into_iter()
            .map(|(id, p)| SimpleEdgeGeometry {
                id,
                start: XYPosition::new(p.source_x, p.source_y),
                end: XYPosition::new(p.target_x, p.target_y),
            })
            .collect();
        edges_in_selection_box(selection, geometries)
    }

    /// Topmost visible node under a world-space point.
    pub fn node_at(&self, point: XYPosition) -> Option<String> {
        find_node_at(point, self.visible_node_geometries())
    }

    /// Union of the boxes of `ids`. Zero-sized when none resolve.
    pub fn nodes_bounds(&self, ids: &[&str]) -> Rect {
        let bounds = ids
            .iter()
            .filter_map(|id| self.node_rect(id))
            .map(rect_to_box)
            .fold(Bounds::EMPTY, bounds_of_boxes);

        if bounds == Bounds::EMPTY {
            Rect::default()
        } else {
            box_to_rect(bounds)
        }
    }

    /// Bounds of the nodes a fit-view should show, `None` if there are none.
    pub fn fit_view_bounds(&self, options: &FitViewOptions) -> Option<Rect> {
        let ids: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| {
                options
                    .nodes
                    .as_ref()
                    .map_or(true, |wanted| wanted.contains(&n.id))
            })
            .filter(|n| options.include_hidden_nodes || !n.hidden)
            .filter(|n| n.has_dimensions())
            .map(|n| n.id.as_str())
            .collect();

        if ids.is_empty() {
            None
        } else {
            Some(self.nodes_bounds(&ids))
        }
    }

    // === Deletion ===

    /// Resolve what deleting `node_ids` and `edge_ids` would remove.
    ///
    /// Descendants of deleted nodes go too, as do edges connected to any of
    /// them. Elements marked non-deletable are kept, and a kept node also
    /// shields its own descendants.
    pub fn elements_to_remove(&self, node_ids: &[&str], edge_ids: &[&str]) -> DeletionCandidates {
        let deletable = |id: &str| {
            self.nodes
                .get(id)
                .is_some_and(|n| n.deletable.unwrap_or(true))
        };

        let mut doomed: HashSet<&str> = HashSet::new();
        let mut queue: Vec<&str> = node_ids.iter().copied().filter(|id| deletable(*id)).collect();
        while let Some(id) = queue.pop() {
            if !doomed.insert(id) {
                continue;
            }
            queue.extend(
                self.children(id)
                    .iter()
                    .map(String::as_str)
                    .filter(|child| deletable(*child)),
            );
        }

        let nodes: Vec<Node> = self
            .nodes
            .values()
            .filter(|n| doomed.contains(n.id.as_str()))
            .cloned()
            .collect();

        let edges: Vec<Edge> = self
            .edges
            .values()
            .filter(|e| e.deletable.unwrap_or(true))
            .filter(|e| {
                doomed.contains(e.source.as_str())
                    || doomed.contains(e.target.as_str())
                    || edge_ids.contains(&e.id.as_str())
            })
            .cloned()
            .collect();

        DeletionCandidates { nodes, edges }
    }
}
