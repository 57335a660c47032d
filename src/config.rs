//! Flow-wide settings.
//!
//! All fields have defaults, so a config can be deserialized from a partial
//! document:
//!
//! ```
//! use flow_canvas::FlowConfig;
//!
//! let config: FlowConfig = serde_json::from_str(r#"{ "snap_to_grid": true }"#).unwrap();
//! assert!(config.snap_to_grid);
//! assert_eq!(config.snap_grid, [15.0, 15.0]);
//! ```

use crate::geometry::{CoordinateExtent, NodeOrigin, SnapGrid};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which handles an edge's target may attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Targets only attach to target handles.
    #[default]
    Strict,
    /// Targets may attach to source handles too.
    Loose,
}

/// Options for fitting nodes into the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitViewOptions {
    /// Fraction of the bounds added around them.
    pub padding: f64,
    pub include_hidden_nodes: bool,
    /// Overrides the flow's zoom bounds for this fit.
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    /// Animate towards the fitted transform.
    pub duration: Option<Duration>,
    /// Restrict the fit to these node ids.
    pub nodes: Option<Vec<String>>,
}

impl Default for FitViewOptions {
    fn default() -> Self {
        Self {
            padding: 0.1,
            include_hidden_nodes: false,
            min_zoom: None,
            max_zoom: None,
            duration: None,
            nodes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub node_origin: NodeOrigin,
    /// Extent applied to every node without one of its own.
    pub node_extent: CoordinateExtent,
    pub snap_to_grid: bool,
    pub snap_grid: SnapGrid,
    pub nodes_draggable: bool,
    pub elements_selectable: bool,
    pub select_nodes_on_drag: bool,
    /// Pointer travel, in screen pixels, before a press turns into a drag.
    pub node_drag_threshold: f64,
    pub auto_pan_on_node_drag: bool,
    /// Pan step at the very edge of the container, in screen pixels per frame.
    pub auto_pan_speed: f64,
    /// Distance from the container edge where auto-pan kicks in.
    pub auto_pan_margin: f64,
    pub connection_mode: ConnectionMode,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub translate_extent: CoordinateExtent,
    pub fit_view_on_init: bool,
    pub fit_view_options: FitViewOptions,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            node_origin: [0.0, 0.0],
            node_extent: CoordinateExtent::INFINITE,
            snap_to_grid: false,
            snap_grid: [15.0, 15.0],
            nodes_draggable: true,
            elements_selectable: true,
            select_nodes_on_drag: true,
            node_drag_threshold: 1.0,
            auto_pan_on_node_drag: true,
            auto_pan_speed: 15.0,
            auto_pan_margin: 40.0,
            connection_mode: ConnectionMode::Strict,
            min_zoom: 0.5,
            max_zoom: 2.0,
            translate_extent: CoordinateExtent::INFINITE,
            fit_view_on_init: false,
            fit_view_options: FitViewOptions::default(),
        }
    }
}

impl FlowConfig {
    /// The grid to snap to, if snapping is enabled.
    pub fn active_snap_grid(&self) -> Option<SnapGrid> {
        self.snap_to_grid.then_some(self.snap_grid)
    }
}
