//! High-level controller for flow canvases.
//!
//! The [`FlowController`] bundles the [`FlowStore`], the [`PanZoom`]
//! viewport and the [`DragEngine`] behind one cloneable handle, so UI
//! callbacks can forward raw input and get ordered [`FlowEvent`]s back
//! through a single event handler.
//!
//! # Example
//!
//! ```
//! use flow_canvas::{
//!     DragTarget, FlowConfig, FlowController, FlowEvent, Node, NodeMeasurement, PointerEvent,
//!     Rect,
//! };
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let ctrl = FlowController::new(FlowConfig::default());
//! ctrl.set_nodes(vec![Node::new("a", 0.0, 0.0)]);
//! ctrl.handle_node_measured(&[NodeMeasurement::new("a", 100.0, 40.0)]);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! ctrl.on_event({
//!     let seen = seen.clone();
//!     move |event: &FlowEvent| seen.borrow_mut().push(event.clone())
//! });
//!
//! let container = Rect::new(0.0, 0.0, 800.0, 600.0);
//! let press = PointerEvent::primary(10.0, 10.0);
//! ctrl.handle_pointer_down(DragTarget::Node("a".into()), press, container);
//! ctrl.handle_pointer_move(PointerEvent::primary(60.0, 10.0));
//! ctrl.handle_pointer_move(PointerEvent::primary(110.0, 10.0));
//! ctrl.handle_pointer_up();
//!
//! assert_eq!(ctrl.store().borrow().node("a").unwrap().position.x, 50.0);
//! assert!(matches!(seen.borrow().last(), Some(FlowEvent::DragStop(_))));
//! ```

use crate::changes::{push_edge_changes, push_node_changes, FlowEvent};
use crate::config::{FitViewOptions, FlowConfig};
use crate::drag::{nudge_selected_nodes, DragEngine, DragTarget, PointerEvent};
use crate::edges::EdgePosition;
use crate::error::{FlowError, OnError};
use crate::geometry::{screen_to_world, Rect, Transform, XYPosition};
use crate::node::{Edge, Node};
use crate::selection::SelectionChanges;
use crate::state::{DeleteDecision, DeletionCandidates, FlowStore, NodeMeasurement, OnBeforeDelete};
use crate::viewport::PanZoom;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

type EventHandler = Box<dyn FnMut(&FlowEvent)>;

/// Controller that owns the flow state and turns input into events.
///
/// Every `handle_*` method releases its borrows before the error and event
/// handlers run, so handlers may call back into the controller.
///
/// Clone this controller to share it across callbacks.
#[derive(Clone)]
pub struct FlowController {
    store: Rc<RefCell<FlowStore>>,
    viewport: Rc<RefCell<PanZoom>>,
    drag: Rc<RefCell<DragEngine>>,
    on_event: Rc<RefCell<Option<EventHandler>>>,
    on_error: Rc<RefCell<Option<OnError>>>,
    on_before_delete: Rc<RefCell<Option<OnBeforeDelete>>>,
    fit_view_done: Rc<RefCell<bool>>,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl FlowController {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            viewport: Rc::new(RefCell::new(PanZoom::from_config(&config))),
            store: Rc::new(RefCell::new(FlowStore::new(config))),
            drag: Rc::new(RefCell::new(DragEngine::new())),
            on_event: Rc::new(RefCell::new(None)),
            on_error: Rc::new(RefCell::new(None)),
            on_before_delete: Rc::new(RefCell::new(None)),
            fit_view_done: Rc::new(RefCell::new(false)),
        }
    }

    /// Get access to the store.
    pub fn store(&self) -> Rc<RefCell<FlowStore>> {
        self.store.clone()
    }

    /// Get access to the viewport.
    pub fn viewport(&self) -> Rc<RefCell<PanZoom>> {
        self.viewport.clone()
    }

    pub fn transform(&self) -> Transform {
        self.viewport.borrow().transform()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.borrow().is_dragging()
    }

    // === Wiring ===

    /// Set the handler receiving every emitted event, replacing any previous one.
    pub fn on_event(&self, handler: impl FnMut(&FlowEvent) + 'static) {
        *self.on_event.borrow_mut() = Some(Box::new(handler));
    }

    /// Set the error channel.
    ///
    /// Errors are delivered after the operation that raised them, ahead of
    /// its events.
    pub fn on_error(&self, handler: impl FnMut(&FlowError) + 'static) {
        *self.on_error.borrow_mut() = Some(Box::new(handler));
    }

    /// Set the deletion confirmation hook consulted by [`delete_elements`](Self::delete_elements).
    pub fn on_before_delete(
        &self,
        hook: impl Fn(&DeletionCandidates) -> LocalBoxFuture<'static, DeleteDecision> + 'static,
    ) {
        *self.on_before_delete.borrow_mut() = Some(Rc::new(hook));
    }

    /// Deliver queued store errors, then `events`.
    ///
    /// Callers must have released their store borrow.
    fn dispatch(&self, events: Vec<FlowEvent>) {
        let errors = self.store.borrow_mut().take_errors();
        deliver(&*self.on_error, &errors);
        deliver(&*self.on_event, &events);
    }

    fn flush_errors(&self) {
        self.dispatch(Vec::new());
    }

    // === Supply ===

    pub fn set_config(&self, config: FlowConfig) {
        {
            let mut viewport = self.viewport.borrow_mut();
            viewport.set_min_zoom(config.min_zoom);
            viewport.set_max_zoom(config.max_zoom);
            viewport.set_translate_extent(config.translate_extent);
        }
        self.store.borrow_mut().set_config(config);
        self.flush_errors();
    }

    pub fn set_nodes(&self, nodes: Vec<Node>) {
        self.store.borrow_mut().set_nodes(nodes);
        self.flush_errors();
    }

    pub fn set_edges(&self, edges: Vec<Edge>) {
        self.store.borrow_mut().set_edges(edges);
        self.flush_errors();
    }

    /// Report the container size in screen pixels.
    pub fn set_dimensions(&self, width: f64, height: f64) {
        self.viewport.borrow_mut().set_dimensions(width, height);
    }

    // === Direct handlers ===

    /// Handle node size reports from the renderer.
    ///
    /// The first pass that finds something to fit also runs fit-view-on-init.
    pub fn handle_node_measured(&self, measurements: &[NodeMeasurement]) {
        let changes = {
            let mut store = self.store.borrow_mut();
            let changes = store.update_node_internals(measurements);

            let mut fit_view_done = self.fit_view_done.borrow_mut();
            if store.config().fit_view_on_init && !*fit_view_done {
                let options = store.config().fit_view_options.clone();
                *fit_view_done = self.viewport.borrow_mut().fit_view_sync(&store, &options);
                if *fit_view_done {
                    log::debug!("fit view on init applied");
                }
            }
            changes
        };

        let mut events = Vec::new();
        push_node_changes(&mut events, changes);
        self.dispatch(events);
    }

    pub fn handle_pointer_down(&self, target: DragTarget, event: PointerEvent, container: Rect) {
        let events = {
            let mut store = self.store.borrow_mut();
            let viewport = self.viewport.borrow();
            self.drag
                .borrow_mut()
                .pointer_down(&mut store, &viewport, target, event, container)
        };
        self.dispatch(events);
    }

    pub fn handle_pointer_move(&self, event: PointerEvent) {
        let events = {
            let mut store = self.store.borrow_mut();
            let viewport = self.viewport.borrow();
            self.drag.borrow_mut().pointer_move(&mut store, &viewport, event)
        };
        self.dispatch(events);
    }

    pub fn handle_pointer_up(&self) {
        let events = self.drag.borrow_mut().pointer_up(&mut self.store.borrow_mut());
        self.dispatch(events);
    }

    /// Abort the running gesture, e.g. when pointer capture is lost.
    pub fn cancel_drag(&self) {
        let events = self.drag.borrow_mut().cancel(&mut self.store.borrow_mut());
        self.dispatch(events);
    }

    /// Advance viewport transitions and auto-pan by one frame.
    ///
    /// Returns whether another frame is needed.
    pub fn animation_frame(&self, dt: Duration) -> bool {
        let (events, more) = {
            let mut store = self.store.borrow_mut();
            let mut viewport = self.viewport.borrow_mut();
            let mut drag = self.drag.borrow_mut();

            viewport.tick(dt);
            let events = drag.animation_frame(&mut store, &mut viewport);
            (events, viewport.is_animating() || drag.auto_pan_active())
        };
        self.dispatch(events);
        more
    }

    /// Click on a node: selects it, or toggles it off with multi-selection.
    pub fn handle_node_click(&self, id: &str) {
        let events = {
            let mut store = self.store.borrow_mut();
            let mut events = Vec::new();
            if store.node(id).is_none() {
                store.report(FlowError::NodeNotFound { node_id: id.to_owned() });
            } else if !store.is_selected(id) {
                store.add_selected_nodes(&[id]).push_into(&mut events);
            } else if store.multi_selection_active() {
                store
                    .unselect_nodes_and_edges(Some(&[id][..]), Some(&[][..]))
                    .push_into(&mut events);
            }
            events
        };
        self.dispatch(events);
    }

    /// Move the selection one keyboard step in `direction`.
    pub fn nudge_selection(&self, direction: XYPosition, fast: bool) {
        let changes = nudge_selected_nodes(&mut self.store.borrow_mut(), direction, fast);
        let mut events = Vec::new();
        push_node_changes(&mut events, changes);
        self.dispatch(events);
    }

    // === Selection ===

    pub fn set_multi_selection_active(&self, active: bool) {
        self.store.borrow_mut().set_multi_selection_active(active);
    }

    pub fn select_nodes(&self, ids: &[&str]) {
        let changes = self.store.borrow_mut().add_selected_nodes(ids);
        self.dispatch_selection(changes);
    }

    pub fn select_edges(&self, ids: &[&str]) {
        let changes = self.store.borrow_mut().add_selected_edges(ids);
        self.dispatch_selection(changes);
    }

    /// Select exactly the nodes inside a world-space rectangle.
    pub fn select_in_box(&self, selection: Rect, partially: bool) {
        let changes = {
            let mut store = self.store.borrow_mut();
            let ids = store.nodes_in_selection_box(selection, partially);
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            store.add_selected_nodes(&ids)
        };
        self.dispatch_selection(changes);
    }

    pub fn unselect(&self, nodes: Option<&[&str]>, edges: Option<&[&str]>) {
        let changes = self.store.borrow_mut().unselect_nodes_and_edges(nodes, edges);
        self.dispatch_selection(changes);
    }

    pub fn reset_selection(&self) {
        let changes = self.store.borrow_mut().reset_selected_elements();
        self.dispatch_selection(changes);
    }

    fn dispatch_selection(&self, changes: SelectionChanges) {
        let mut events = Vec::new();
        changes.push_into(&mut events);
        self.dispatch(events);
    }

    // === Deletion ===

    /// Delete nodes and edges, after asking the confirmation hook.
    ///
    /// Descendants and connected edges are included. The hook may veto or
    /// replace the set. Accepted removals are applied to the store and
    /// emitted edges first. Resolves with what was actually removed.
    pub fn delete_elements(
        &self,
        node_ids: &[&str],
        edge_ids: &[&str],
    ) -> impl Future<Output = DeletionCandidates> + 'static {
        let candidates = self.store.borrow().elements_to_remove(node_ids, edge_ids);
        let hook = self.on_before_delete.borrow().clone();
        let ctrl = self.clone();

        async move {
            if candidates.is_empty() {
                return candidates;
            }
            let approved = match hook {
                None => candidates,
                Some(hook) => match hook(&candidates).await {
                    DeleteDecision::Allow => candidates,
                    DeleteDecision::Veto => {
                        log::debug!("deletion vetoed");
                        DeletionCandidates::default()
                    }
                    DeleteDecision::Replace(other) => other,
                },
            };
            ctrl.remove(&approved);
            approved
        }
    }

    fn remove(&self, approved: &DeletionCandidates) {
        if approved.is_empty() {
            return;
        }
        let (nodes, edges) = approved.removal_changes();
        {
            let mut store = self.store.borrow_mut();
            store.apply_edge_changes(&edges);
            store.apply_node_changes(&nodes);
        }
        let mut events = Vec::new();
        push_edge_changes(&mut events, edges);
        push_node_changes(&mut events, nodes);
        self.dispatch(events);
    }

    // === Viewport ===

    pub fn screen_to_world(&self, point: XYPosition) -> XYPosition {
        let snap_grid = self.store.borrow().config().active_snap_grid();
        screen_to_world(point, &self.transform(), snap_grid)
    }

    pub fn pan_by(&self, delta: XYPosition) -> bool {
        self.viewport.borrow_mut().pan_by(delta)
    }

    pub fn set_viewport(
        &self,
        target: Transform,
        duration: Option<Duration>,
    ) -> impl Future<Output = ()> + 'static {
        self.viewport.borrow_mut().set_viewport(target, duration)
    }

    pub fn zoom_in(&self, duration: Option<Duration>) -> impl Future<Output = ()> + 'static {
        self.viewport.borrow_mut().zoom_in(duration)
    }

    pub fn zoom_out(&self, duration: Option<Duration>) -> impl Future<Output = ()> + 'static {
        self.viewport.borrow_mut().zoom_out(duration)
    }

    /// Fit the nodes into view immediately. Returns whether any node was fitted.
    pub fn fit_view_sync(&self, options: &FitViewOptions) -> bool {
        let store = self.store.borrow();
        self.viewport.borrow_mut().fit_view_sync(&store, options)
    }

    /// Fit the nodes into view, animated when `options.duration` is set.
    ///
    /// Drive the animation with [`animation_frame`](Self::animation_frame).
    pub fn fit_view(&self, options: &FitViewOptions) -> impl Future<Output = bool> + 'static {
        let store = self.store.borrow();
        self.viewport.borrow_mut().fit_view(&store, options)
    }

    // === Edges ===

    /// Anchors of every edge whose endpoints are ready.
    pub fn edge_positions(&self) -> Vec<(String, EdgePosition)> {
        let positions = self.store.borrow_mut().edge_positions();
        self.flush_errors();
        positions
    }

    // === Callback factories ===

    /// Returns a callback for pointer moves in client coordinates.
    pub fn pointer_move_callback(&self) -> impl Fn(f64, f64) {
        let ctrl = self.clone();
        move |x, y| ctrl.handle_pointer_move(PointerEvent::primary(x, y))
    }

    /// Returns a callback for pointer release.
    pub fn pointer_up_callback(&self) -> impl Fn() {
        let ctrl = self.clone();
        move || ctrl.handle_pointer_up()
    }

    /// Returns a callback for single node size reports.
    pub fn node_measured_callback(&self) -> impl Fn(&str, f64, f64) {
        let ctrl = self.clone();
        move |id: &str, width: f64, height: f64| {
            ctrl.handle_node_measured(&[NodeMeasurement::new(id, width, height)])
        }
    }
}

/// Run the handler in `slot` over `items`.
///
/// The handler is taken out for the duration so it can re-enter the
/// controller. A handler installed meanwhile wins over the old one.
fn deliver<T>(slot: &RefCell<Option<Box<dyn FnMut(&T)>>>, items: &[T]) {
    if items.is_empty() {
        return;
    }
    let Some(mut handler) = slot.borrow_mut().take() else {
        return;
    };
    for item in items {
        handler(item);
    }
    let mut slot = slot.borrow_mut();
    if slot.is_none() {
        *slot = Some(handler);
    }
}
