//! Pointer-driven node dragging.
//!
//! [`DragEngine`] is a small state machine, `Idle → Armed → Dragging → Idle`,
//! fed with raw pointer events in client coordinates. While dragging it owns
//! the set of [`DragItem`]s, commits their positions to the [`FlowStore`]
//! frame by frame and reports every commit as ordered [`FlowEvent`]s.
//!
//! Auto-pan runs beside the gesture: while [`DragEngine::auto_pan_active`]
//! is true the host calls [`DragEngine::animation_frame`] once per frame.

use crate::changes::{push_node_changes, FlowEvent, NodeChange};
use crate::error::FlowError;
use crate::geometry::{
    bounds_of_boxes, calc_auto_pan, rect_to_box, screen_to_world, snap_position, Bounds,
    CoordinateExtent, Dimensions, NodeOrigin, Rect, XYPosition,
};
use crate::node::{Node, NodeExtent};
use crate::position::{calculate_node_position, handle_expand_parent, ParentExpandChild};
use crate::state::FlowStore;
use crate::viewport::PanZoom;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// A pointer event in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client: XYPosition,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, button: PointerButton) -> Self {
        Self {
            client: XYPosition::new(x, y),
            button,
        }
    }

    pub fn primary(x: f64, y: f64) -> Self {
        Self::new(x, y, PointerButton::Primary)
    }
}

/// What the pointer went down on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Node(String),
    /// The selection rectangle: drags every selected node.
    Selection,
}

impl DragTarget {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            DragTarget::Node(id) => Some(id),
            DragTarget::Selection => None,
        }
    }
}

/// A node being moved by the current gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub id: String,
    /// Relative position as committed to the node.
    pub position: XYPosition,
    /// World-space top-left corner.
    pub position_absolute: XYPosition,
    /// Pointer minus `position_absolute` when the drag started.
    pub distance: XYPosition,
    pub dimensions: Dimensions,
    pub extent: Option<NodeExtent>,
    pub parent_id: Option<String>,
    pub origin: Option<NodeOrigin>,
    pub expand_parent: bool,
}

impl DragItem {
    fn new(node: &Node, position_absolute: XYPosition, pointer: XYPosition) -> Self {
        Self {
            id: node.id.clone(),
            position: node.position,
            position_absolute,
            distance: pointer - position_absolute,
            dimensions: node.dimensions(),
            extent: node.extent,
            parent_id: node.parent_id.clone(),
            origin: node.origin,
            expand_parent: node.expand_parent,
        }
    }

    fn rect(&self) -> Rect {
        Rect::new(
            self.position_absolute.x,
            self.position_absolute.y,
            self.dimensions.width,
            self.dimensions.height,
        )
    }
}

/// Payload of drag lifecycle events.
#[derive(Debug, Clone, PartialEq)]
pub struct DragEvent {
    /// The node under the pointer, `None` for selection drags.
    pub node_id: Option<String>,
    pub items: Vec<DragItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Armed,
    Dragging,
}

/// Start/stop handle of the auto-pan frame loop.
#[derive(Debug, Default)]
pub struct AutoPan {
    running: bool,
}

impl AutoPan {
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self) {
        if !self.running {
            log::trace!("auto-pan started");
            self.running = true;
        }
    }

    fn stop(&mut self) {
        if self.running {
            log::trace!("auto-pan stopped");
            self.running = false;
        }
    }
}

#[derive(Debug)]
struct Gesture {
    target: DragTarget,
    container: Rect,
    /// Container-relative screen position of the press.
    press: XYPosition,
    /// Container-relative screen position of the latest pointer event.
    mouse: XYPosition,
    /// World position of the latest applied pointer.
    last_pos: XYPosition,
}

impl Gesture {
    fn drag_event(&self, items: &IndexMap<String, DragItem>) -> DragEvent {
        DragEvent {
            node_id: self.target.node_id().map(str::to_owned),
            items: items.values().cloned().collect(),
        }
    }
}

#[derive(Debug, Default)]
enum DragState {
    #[default]
    Idle,
    Armed(Gesture),
    Dragging {
        gesture: Gesture,
        items: IndexMap<String, DragItem>,
    },
}

#[derive(Debug, Default)]
pub struct DragEngine {
    state: DragState,
    auto_pan: AutoPan,
}

/// Container-relative screen position and world position of a pointer.
fn pointer_position(
    event: &PointerEvent,
    container: &Rect,
    viewport: &PanZoom,
) -> (XYPosition, XYPosition) {
    let screen = XYPosition::new(event.client.x - container.x, event.client.y - container.y);
    let world = screen_to_world(screen, &viewport.transform(), None);
    (screen, world)
}

impl DragEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        match self.state {
            DragState::Idle => DragPhase::Idle,
            DragState::Armed(_) => DragPhase::Armed,
            DragState::Dragging { .. } => DragPhase::Dragging,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.phase() == DragPhase::Dragging
    }

    /// Whether the host should keep calling [`animation_frame`](Self::animation_frame).
    pub fn auto_pan_active(&self) -> bool {
        self.auto_pan.is_running()
    }

    /// The items of the running drag, empty otherwise.
    pub fn drag_items(&self) -> Vec<&DragItem> {
        match &self.state {
            DragState::Dragging { items, .. } => items.values().collect(),
            _ => Vec::new(),
        }
    }

    /// Press on a node or the selection.
    ///
    /// Ignored for non-primary buttons and while another gesture is active.
    /// `container` is the client-space rect of the canvas.
    pub fn pointer_down(
        &mut self,
        store: &mut FlowStore,
        viewport: &PanZoom,
        target: DragTarget,
        event: PointerEvent,
        container: Rect,
    ) -> Vec<FlowEvent> {
        if event.button != PointerButton::Primary {
            return Vec::new();
        }
        if !matches!(self.state, DragState::Idle) {
            log::debug!("pointer down on {target:?} ignored: a gesture is already active");
            return Vec::new();
        }
        if let DragTarget::Node(id) = &target {
            if store.node(id).is_none() {
                store.report(FlowError::NodeNotFound { node_id: id.clone() });
                return Vec::new();
            }
        }

        let (screen, world) = pointer_position(&event, &container, viewport);
        let gesture = Gesture {
            target,
            container,
            press: screen,
            mouse: screen,
            last_pos: world,
        };
        log::debug!("drag armed on {:?}", gesture.target);

        if store.config().node_drag_threshold <= 0.0 {
            return self.start(store, gesture);
        }
        self.state = DragState::Armed(gesture);
        Vec::new()
    }

    pub fn pointer_move(
        &mut self,
        store: &mut FlowStore,
        viewport: &PanZoom,
        event: PointerEvent,
    ) -> Vec<FlowEvent> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => Vec::new(),
            DragState::Armed(mut gesture) => {
                let (screen, world) = pointer_position(&event, &gesture.container, viewport);
                gesture.mouse = screen;

                let dx = screen.x - gesture.press.x;
                let dy = screen.y - gesture.press.y;
                if (dx * dx + dy * dy).sqrt() > store.config().node_drag_threshold {
                    gesture.last_pos = world;
                    self.start(store, gesture)
                } else {
                    self.state = DragState::Armed(gesture);
                    Vec::new()
                }
            }
            DragState::Dragging {
                mut gesture,
                mut items,
            } => {
                let (screen, world) = pointer_position(&event, &gesture.container, viewport);
                gesture.mouse = screen;

                let events = if world != gesture.last_pos {
                    update_items(store, &mut gesture, &mut items, world, true)
                } else {
                    Vec::new()
                };
                self.state = DragState::Dragging { gesture, items };
                events
            }
        }
    }

    /// Release: commits the final positions with `dragging: false`.
    pub fn pointer_up(&mut self, store: &mut FlowStore) -> Vec<FlowEvent> {
        self.finish(store, FlowEvent::DragStop)
    }

    /// Abort the gesture, e.g. on pointer capture loss.
    ///
    /// Nodes stay where the last committed frame put them; their dragging
    /// flag is cleared.
    pub fn cancel(&mut self, store: &mut FlowStore) -> Vec<FlowEvent> {
        self.finish(store, FlowEvent::DragCancel)
    }

    fn finish(
        &mut self,
        store: &mut FlowStore,
        lifecycle: fn(DragEvent) -> FlowEvent,
    ) -> Vec<FlowEvent> {
        self.auto_pan.stop();

        match std::mem::take(&mut self.state) {
            DragState::Idle => Vec::new(),
            DragState::Armed(gesture) => {
                log::debug!("press on {:?} released below the drag threshold", gesture.target);
                Vec::new()
            }
            DragState::Dragging { gesture, items } => {
                if items.is_empty() {
                    return Vec::new();
                }
                let changes = node_position_changes(store, &items, false);
                store.apply_node_changes(&changes);

                log::debug!("drag on {:?} finished with {} items", gesture.target, items.len());
                let event = lifecycle(gesture.drag_event(&items));

                let mut events = Vec::with_capacity(2);
                push_node_changes(&mut events, changes);
                events.push(event);
                events
            }
        }
    }

    /// One auto-pan step.
    ///
    /// Pans the viewport when the pointer sits within the margin of the
    /// container edge and, if the viewport moved, drags the items along so
    /// they stay under the pointer.
    pub fn animation_frame(
        &mut self,
        store: &mut FlowStore,
        viewport: &mut PanZoom,
    ) -> Vec<FlowEvent> {
        if !self.auto_pan.is_running() {
            return Vec::new();
        }
        let DragState::Dragging { gesture, items } = &mut self.state else {
            self.auto_pan.stop();
            return Vec::new();
        };

        let config = store.config();
        let step = calc_auto_pan(
            gesture.mouse,
            Dimensions::new(gesture.container.width, gesture.container.height),
            config.auto_pan_speed,
            config.auto_pan_margin,
        );
        if step.x == 0.0 && step.y == 0.0 {
            return Vec::new();
        }

        let before = viewport.transform();
        if !viewport.pan_by(step) {
            return Vec::new();
        }
        let after = viewport.transform();
        log::trace!("auto-pan by {step:?}");

        let shifted = XYPosition::new(
            gesture.last_pos.x - (after.x - before.x) / after.zoom,
            gesture.last_pos.y - (after.y - before.y) / after.zoom,
        );
        update_items(store, gesture, items, shifted, false)
    }

    fn start(&mut self, store: &mut FlowStore, gesture: Gesture) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        let config = store.config();
        let (select_nodes_on_drag, elements_selectable, auto_pan) = (
            config.select_nodes_on_drag,
            config.elements_selectable,
            config.auto_pan_on_node_drag,
        );

        if let Some(id) = gesture.target.node_id() {
            let selectable = store
                .node(id)
                .is_some_and(|n| n.is_selectable(elements_selectable));
            let selected = store.is_selected(id);
            let multi = store.multi_selection_active();

            if (!select_nodes_on_drag || !selectable) && !multi && !selected {
                store
                    .unselect_nodes_and_edges(None, None)
                    .push_into(&mut events);
            }
            if selectable && select_nodes_on_drag {
                if !selected {
                    store.add_selected_nodes(&[id]).push_into(&mut events);
                } else if multi {
                    store
                        .unselect_nodes_and_edges(Some(&[id][..]), Some(&[][..]))
                        .push_into(&mut events);
                }
            }
        }

        let items = collect_drag_items(store, gesture.last_pos, gesture.target.node_id());
        log::debug!("drag started on {:?} with {} items", gesture.target, items.len());

        if !items.is_empty() {
            events.push(FlowEvent::DragStart(gesture.drag_event(&items)));
        }
        if auto_pan {
            self.auto_pan.start();
        }
        self.state = DragState::Dragging { gesture, items };
        events
    }
}

/// Whether any ancestor of `node` is selected.
fn is_parent_selected(node: &Node, store: &FlowStore) -> bool {
    let mut current = node;
    // Bounded like the position resolver, cycles end the walk.
    for _ in 0..store.nodes().len() {
        let Some(parent) = current.parent_id.as_deref().and_then(|id| store.node(id)) else {
            return false;
        };
        if store.is_selected(&parent.id) {
            return true;
        }
        current = parent;
    }
    false
}

/// Selected draggable nodes plus the pressed one, skipping nodes that move
/// with a selected ancestor anyway.
fn collect_drag_items(
    store: &FlowStore,
    pointer: XYPosition,
    node_id: Option<&str>,
) -> IndexMap<String, DragItem> {
    let nodes_draggable = store.config().nodes_draggable;

    store
        .nodes()
        .values()
        .filter(|node| store.is_selected(&node.id) || Some(node.id.as_str()) == node_id)
        .filter(|node| node.parent_id.is_none() || !is_parent_selected(node, store))
        .filter(|node| node.is_draggable(nodes_draggable))
        .map(|node| {
            let position_absolute = store.position_absolute(&node.id).unwrap_or_default();
            (node.id.clone(), DragItem::new(node, position_absolute, pointer))
        })
        .collect()
}

/// Extent for one member of a group drag, so the whole group stays inside
/// `extent` without changing the members' offsets to each other.
fn group_member_extent(
    item: &DragItem,
    group: &Bounds,
    extent: &CoordinateExtent,
) -> CoordinateExtent {
    let abs = item.position_absolute;
    CoordinateExtent::new(
        abs.x - group.x + extent.0[0][0],
        abs.y - group.y + extent.0[0][1],
        abs.x + item.dimensions.width - group.x2 + extent.0[1][0],
        abs.y + item.dimensions.height - group.y2 + extent.0[1][1],
    )
}

/// Move every item to follow `pointer` and commit the result.
///
/// Nothing is emitted when no item actually moved.
fn update_items(
    store: &mut FlowStore,
    gesture: &mut Gesture,
    items: &mut IndexMap<String, DragItem>,
    pointer: XYPosition,
    emit_drag: bool,
) -> Vec<FlowEvent> {
    gesture.last_pos = pointer;

    let config = store.config();
    let snap_grid = config.active_snap_grid();
    let node_origin = config.node_origin;
    let node_extent = config.node_extent;

    let group = (items.len() > 1).then(|| {
        items
            .values()
            .map(|item| rect_to_box(item.rect()))
            .fold(Bounds::EMPTY, bounds_of_boxes)
    });

    let mut errors = Vec::new();
    let mut has_change = false;

    for item in items.values_mut() {
        let mut next = pointer - item.distance;
        if let Some(grid) = snap_grid {
            next = snap_position(next, grid);
        }

        let extent = match &group {
            Some(group) if item.extent.is_none() && !node_extent.is_infinite() => {
                group_member_extent(item, group, &node_extent)
            }
            _ => node_extent,
        };

        if let Some(update) = calculate_node_position(
            &item.id,
            next,
            store.nodes(),
            store.internals_lookup(),
            node_origin,
            &extent,
            &mut |e| errors.push(e),
        ) {
            has_change |= update.position != item.position;
            item.position = update.position;
            item.position_absolute = update.position_absolute;
        }
    }
    store.report_all(errors);

    if !has_change {
        return Vec::new();
    }

    let changes = node_position_changes(store, items, true);
    log::trace!("drag frame commits {} changes", changes.len());
    store.apply_node_changes(&changes);

    let mut events = vec![FlowEvent::NodesChange(changes)];
    if emit_drag {
        events.push(FlowEvent::Drag(gesture.drag_event(items)));
    }
    events
}

/// Position changes for `items`, followed by the parent growth their
/// `expand_parent` members cause.
fn node_position_changes(
    store: &FlowStore,
    items: &IndexMap<String, DragItem>,
    dragging: bool,
) -> Vec<NodeChange> {
    let mut changes = Vec::with_capacity(items.len());
    let mut expanding = Vec::new();

    for item in items.values() {
        let mut position = item.position;

        if let (true, Some(parent_id)) = (item.expand_parent, &item.parent_id) {
            expanding.push(ParentExpandChild {
                id: item.id.clone(),
                parent_id: parent_id.clone(),
                rect: item.rect(),
            });
            position = XYPosition::new(position.x.max(0.0), position.y.max(0.0));
        }

        changes.push(NodeChange::position(item.id.clone(), position, dragging));
    }

    if !expanding.is_empty() {
        changes.extend(handle_expand_parent(
            &expanding,
            store.nodes(),
            store.internals_lookup(),
            store.parent_lookup(),
            store.config().node_origin,
        ));
    }
    changes
}

/// Move the selected draggable nodes one step, as arrow keys do.
///
/// A step is 5 world units, or one grid cell when snapping, times 4 when
/// `fast`. Goes through the same clamping and parent expansion as a drag.
pub fn nudge_selected_nodes(
    store: &mut FlowStore,
    direction: XYPosition,
    fast: bool,
) -> Vec<NodeChange> {
    let config = store.config();
    let snap_grid = config.active_snap_grid();
    let velocity = snap_grid.unwrap_or([5.0, 5.0]);
    let factor = if fast { 4.0 } else { 1.0 };
    let delta = XYPosition::new(
        direction.x * velocity[0] * factor,
        direction.y * velocity[1] * factor,
    );
    let node_origin = config.node_origin;
    let node_extent = config.node_extent;
    let nodes_draggable = config.nodes_draggable;

    let mut items: IndexMap<String, DragItem> = store
        .nodes()
        .values()
        .filter(|node| store.is_selected(&node.id) && node.is_draggable(nodes_draggable))
        .map(|node| {
            let position_absolute = store.position_absolute(&node.id).unwrap_or_default();
            (node.id.clone(), DragItem::new(node, position_absolute, position_absolute))
        })
        .collect();

    let mut errors = Vec::new();
    for item in items.values_mut() {
        let mut next = item.position_absolute + delta;
        if let Some(grid) = snap_grid {
            next = snap_position(next, grid);
        }
        if let Some(update) = calculate_node_position(
            &item.id,
            next,
            store.nodes(),
            store.internals_lookup(),
            node_origin,
            &node_extent,
            &mut |e| errors.push(e),
        ) {
            item.position = update.position;
            item.position_absolute = update.position_absolute;
        }
    }
    store.report_all(errors);

    if items.is_empty() {
        return Vec::new();
    }
    let changes = node_position_changes(store, &items, false);
    store.apply_node_changes(&changes);
    changes
}
