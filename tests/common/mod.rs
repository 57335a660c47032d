//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use flow_canvas::{FlowController, FlowError, FlowEvent, NodeChange, XYPosition};
use std::cell::RefCell;
use std::rc::Rc;

/// Records everything a controller emits.
#[derive(Default, Clone)]
pub struct EventTracker {
    pub events: Rc<RefCell<Vec<FlowEvent>>>,
    pub errors: Rc<RefCell<Vec<FlowError>>>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install this tracker as the controller's event handler and error channel.
    pub fn attach(&self, ctrl: &FlowController) {
        let events = self.events.clone();
        ctrl.on_event(move |event: &FlowEvent| events.borrow_mut().push(event.clone()));
        let errors = self.errors.clone();
        ctrl.on_error(move |error: &FlowError| errors.borrow_mut().push(error.clone()));
    }

    /// Clear all recorded events and errors.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
        self.errors.borrow_mut().clear();
    }

    pub fn error_codes(&self) -> Vec<&'static str> {
        self.errors.borrow().iter().map(FlowError::code).collect()
    }

    /// Short names of the recorded events, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .borrow()
            .iter()
            .map(|event| match event {
                FlowEvent::NodesChange(_) => "nodes",
                FlowEvent::EdgesChange(_) => "edges",
                FlowEvent::DragStart(_) => "drag_start",
                FlowEvent::Drag(_) => "drag",
                FlowEvent::DragStop(_) => "drag_stop",
                FlowEvent::DragCancel(_) => "drag_cancel",
            })
            .collect()
    }

    /// All recorded node changes, flattened.
    pub fn node_changes(&self) -> Vec<NodeChange> {
        self.events
            .borrow()
            .iter()
            .filter_map(FlowEvent::node_changes)
            .flatten()
            .cloned()
            .collect()
    }

    /// Positions reported for `id`, with their dragging flag.
    pub fn positions_of(&self, id: &str) -> Vec<(XYPosition, bool)> {
        self.node_changes()
            .into_iter()
            .filter_map(|change| match change {
                NodeChange::Position {
                    id: changed,
                    position: Some(position),
                    dragging,
                } if changed == id => Some((position, dragging)),
                _ => None,
            })
            .collect()
    }
}
