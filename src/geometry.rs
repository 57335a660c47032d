//! Coordinate primitives shared by every other module.
//!
//! Two coordinate systems are involved:
//!
//! - **world space**: the un-zoomed, un-panned plane nodes are authored in
//! - **screen space**: pixels inside the container, after the viewport transform
//!
//! ```text
//! screen = world * zoom + translate
//! world  = (screen - translate) / zoom
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::{Add, Sub};

/// Grid used for snapping, `[x_step, y_step]`.
pub type SnapGrid = [f64; 2];

/// Point inside a node's box its position refers to, `[ox, oy]` in `[0, 1]²`.
///
/// `[0, 0]` is the top-left corner, `[0.5, 0.5]` the center.
pub type NodeOrigin = [f64; 2];

/// A point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYPosition {
    pub x: f64,
    pub y: f64,
}

impl XYPosition {
    pub const ZERO: XYPosition = XYPosition { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for XYPosition {
    type Output = XYPosition;

    fn add(self, rhs: XYPosition) -> XYPosition {
        XYPosition::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for XYPosition {
    type Output = XYPosition;

    fn sub(self, rhs: XYPosition) -> XYPosition {
        XYPosition::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height of a box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Rectangle as origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> XYPosition {
        XYPosition::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Rectangle as two corners: `(x, y)` top-left and `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Bounds {
    /// The identity element for [`bounds_of_boxes`]: folding any box into it
    /// yields that box.
    pub const EMPTY: Bounds = Bounds {
        x: f64::INFINITY,
        y: f64::INFINITY,
        x2: f64::NEG_INFINITY,
        y2: f64::NEG_INFINITY,
    };

    pub const fn new(x: f64, y: f64, x2: f64, y2: f64) -> Self {
        Self { x, y, x2, y2 }
    }
}

/// A rectangular world-space bound, `[[min_x, min_y], [max_x, max_y]]`.
///
/// Serialized with `null` standing in for unbounded coordinates: a `null`
/// minimum reads back as `-inf`, a `null` maximum as `+inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateExtent(pub [[f64; 2]; 2]);

impl Serialize for CoordinateExtent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bounded = |v: f64| v.is_finite().then_some(v);
        let [[min_x, min_y], [max_x, max_y]] = self.0;
        [
            [bounded(min_x), bounded(min_y)],
            [bounded(max_x), bounded(max_y)],
        ]
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CoordinateExtent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [[min_x, min_y], [max_x, max_y]] = <[[Option<f64>; 2]; 2]>::deserialize(deserializer)?;
        Ok(Self::new(
            min_x.unwrap_or(f64::NEG_INFINITY),
            min_y.unwrap_or(f64::NEG_INFINITY),
            max_x.unwrap_or(f64::INFINITY),
            max_y.unwrap_or(f64::INFINITY),
        ))
    }
}

impl CoordinateExtent {
    /// An extent that never clamps.
    pub const INFINITE: CoordinateExtent = CoordinateExtent([
        [f64::NEG_INFINITY, f64::NEG_INFINITY],
        [f64::INFINITY, f64::INFINITY],
    ]);

    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self([[min_x, min_y], [max_x, max_y]])
    }

    pub fn min(&self) -> XYPosition {
        XYPosition::new(self.0[0][0], self.0[0][1])
    }

    pub fn max(&self) -> XYPosition {
        XYPosition::new(self.0[1][0], self.0[1][1])
    }

    /// Shift both corners by `offset`.
    pub fn translate(&self, offset: XYPosition) -> Self {
        Self::new(
            self.0[0][0] + offset.x,
            self.0[0][1] + offset.y,
            self.0[1][0] + offset.x,
            self.0[1][1] + offset.y,
        )
    }

    pub fn is_infinite(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_infinite())
    }
}

impl Default for CoordinateExtent {
    fn default() -> Self {
        Self::INFINITE
    }
}

/// Viewport transform: translation in screen pixels and a zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, zoom: 1.0 };

    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    /// Screen x of the world x coordinate.
    pub fn apply_x(&self, x: f64) -> f64 {
        x * self.zoom + self.x
    }

    /// Screen y of the world y coordinate.
    pub fn apply_y(&self, y: f64) -> f64 {
        y * self.zoom + self.y
    }

    /// World x under the screen x coordinate.
    pub fn invert_x(&self, x: f64) -> f64 {
        (x - self.x) / self.zoom
    }

    /// World y under the screen y coordinate.
    pub fn invert_y(&self, y: f64) -> f64 {
        (y - self.y) / self.zoom
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Clamp `val` into `[min, max]`.
///
/// When `min > max` the result is `max`.
pub fn clamp(val: f64, min: f64, max: f64) -> f64 {
    val.max(min).min(max)
}

/// Clamp a position so a box of `dimensions` placed there stays inside `extent`.
pub fn clamp_position(
    position: XYPosition,
    extent: &CoordinateExtent,
    dimensions: Dimensions,
) -> XYPosition {
    XYPosition {
        x: clamp(position.x, extent.0[0][0], extent.0[1][0] - dimensions.width),
        y: clamp(position.y, extent.0[0][1], extent.0[1][1] - dimensions.height),
    }
}

pub fn rect_to_box(rect: Rect) -> Bounds {
    Bounds {
        x: rect.x,
        y: rect.y,
        x2: rect.x + rect.width,
        y2: rect.y + rect.height,
    }
}

pub fn box_to_rect(bounds: Bounds) -> Rect {
    Rect {
        x: bounds.x,
        y: bounds.y,
        width: bounds.x2 - bounds.x,
        height: bounds.y2 - bounds.y,
    }
}

/// Component-wise union of two boxes.
pub fn bounds_of_boxes(a: Bounds, b: Bounds) -> Bounds {
    Bounds {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        x2: a.x2.max(b.x2),
        y2: a.y2.max(b.y2),
    }
}

pub fn bounds_of_rects(a: Rect, b: Rect) -> Rect {
    box_to_rect(bounds_of_boxes(rect_to_box(a), rect_to_box(b)))
}

/// Area of the intersection of two rects, rounded up. Zero when disjoint.
pub fn overlapping_area(a: Rect, b: Rect) -> f64 {
    let x_overlap = 0f64.max((a.x + a.width).min(b.x + b.width) - a.x.max(b.x));
    let y_overlap = 0f64.max((a.y + a.height).min(b.y + b.height) - a.y.max(b.y));

    (x_overlap * y_overlap).ceil()
}

/// Round to the nearest integer, ties toward positive infinity.
///
/// `2.5 → 3`, `-2.5 → -2`, `-3.5 → -3`.
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Snap a position to the nearest multiple of the grid on each axis.
pub fn snap_position(position: XYPosition, snap_grid: SnapGrid) -> XYPosition {
    XYPosition {
        x: snap_grid[0] * round_half_up(position.x / snap_grid[0]),
        y: snap_grid[1] * round_half_up(position.y / snap_grid[1]),
    }
}

/// Convert a screen-space point to world space, optionally snapping it.
pub fn screen_to_world(
    point: XYPosition,
    transform: &Transform,
    snap_grid: Option<SnapGrid>,
) -> XYPosition {
    let position = XYPosition {
        x: transform.invert_x(point.x),
        y: transform.invert_y(point.y),
    };

    match snap_grid {
        Some(grid) => snap_position(position, grid),
        None => position,
    }
}

/// Convert a world-space point to screen space.
pub fn world_to_screen(point: XYPosition, transform: &Transform) -> XYPosition {
    XYPosition {
        x: transform.apply_x(point.x),
        y: transform.apply_y(point.y),
    }
}

/// Velocity factor in `[-1, 1]` for one axis: positive inside the leading
/// margin (`value < min`), negative inside the trailing one (`value > max`).
fn calc_auto_pan_velocity(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        clamp((value - min).abs(), 1.0, min) / min
    } else if value > max {
        -clamp((value - max).abs(), 1.0, min) / min
    } else {
        0.0
    }
}

/// Screen-space pan step for a pointer at `position` inside a container of
/// size `bounds`.
///
/// The step ramps linearly from zero at `margin` pixels from an edge to
/// `speed` at the edge itself.
pub fn calc_auto_pan(
    position: XYPosition,
    bounds: Dimensions,
    speed: f64,
    margin: f64,
) -> XYPosition {
    XYPosition {
        x: calc_auto_pan_velocity(position.x, margin, bounds.width - margin) * speed,
        y: calc_auto_pan_velocity(position.y, margin, bounds.height - margin) * speed,
    }
}
