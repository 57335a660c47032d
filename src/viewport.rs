//! Pan/zoom state of the canvas.
//!
//! [`PanZoom`] owns the current [`Transform`] and keeps it inside the zoom
//! bounds and the translate extent at all times. Animated changes are
//! modelled as a pending transition that the host advances with
//! [`PanZoom::tick`] from its frame callback.

use crate::config::{FitViewOptions, FlowConfig};
use crate::geometry::{clamp, CoordinateExtent, Dimensions, Rect, Transform, XYPosition};
use crate::state::FlowStore;
use futures::channel::oneshot;
use futures::future::{self, Future, FutureExt};
use std::time::Duration;

/// Zoom factor applied by one `zoom_in`/`zoom_out` step.
const ZOOM_STEP: f64 = 1.2;

/// Transform that fits `bounds` into a `width` x `height` viewport.
///
/// `padding` is a fraction of the bounds added on every side; the result
/// is centered on the bounds.
pub fn viewport_for_bounds(
    bounds: Rect,
    width: f64,
    height: f64,
    min_zoom: f64,
    max_zoom: f64,
    padding: f64,
) -> Transform {
    let x_zoom = width / (bounds.width * (1.0 + padding));
    let y_zoom = height / (bounds.height * (1.0 + padding));
    let zoom = clamp(x_zoom.min(y_zoom), min_zoom, max_zoom);
    let center = bounds.center();

    Transform {
        x: width / 2.0 - center.x * zoom,
        y: height / 2.0 - center.y * zoom,
        zoom,
    }
}

fn ease_cubic_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let f = -2.0 * t + 2.0;
        1.0 - f * f * f / 2.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

struct Transition {
    from: Transform,
    to: Transform,
    elapsed: Duration,
    duration: Duration,
    // Dropping the sender also resolves the waiter, so an interrupted
    // transition never leaves a future hanging.
    done: oneshot::Sender<()>,
}

pub struct PanZoom {
    transform: Transform,
    min_zoom: f64,
    max_zoom: f64,
    translate_extent: CoordinateExtent,
    dimensions: Dimensions,
    transition: Option<Transition>,
}

impl Default for PanZoom {
    fn default() -> Self {
        Self::from_config(&FlowConfig::default())
    }
}

impl std::fmt::Debug for PanZoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanZoom")
            .field("transform", &self.transform)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("translate_extent", &self.translate_extent)
            .field("dimensions", &self.dimensions)
            .field("animating", &self.transition.is_some())
            .finish()
    }
}

impl PanZoom {
    pub fn new(min_zoom: f64, max_zoom: f64, translate_extent: CoordinateExtent) -> Self {
        Self {
            transform: Transform::IDENTITY,
            min_zoom,
            max_zoom,
            translate_extent,
            dimensions: Dimensions::default(),
            transition: None,
        }
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self::new(config.min_zoom, config.max_zoom, config.translate_extent)
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn zoom(&self) -> f64 {
        self.transform.zoom
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn translate_extent(&self) -> CoordinateExtent {
        self.translate_extent
    }

    /// Size of the container the transform maps into.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn set_dimensions(&mut self, width: f64, height: f64) {
        self.dimensions = Dimensions::new(width, height);
        self.reclamp();
    }

    pub fn set_min_zoom(&mut self, min_zoom: f64) {
        self.min_zoom = min_zoom;
        self.reclamp();
    }

    pub fn set_max_zoom(&mut self, max_zoom: f64) {
        self.max_zoom = max_zoom;
        self.reclamp();
    }

    pub fn set_translate_extent(&mut self, extent: CoordinateExtent) {
        self.translate_extent = extent;
        self.reclamp();
    }

    fn reclamp(&mut self) {
        let constrained = self.constrain(self.transform);
        if constrained != self.transform {
            log::debug!("viewport re-clamped to {constrained:?}");
            self.transform = constrained;
        }
    }

    /// Clamp the zoom into bounds, then shift the translation so the visible
    /// area stays within the translate extent. An extent smaller than the
    /// container is centered.
    pub fn constrain(&self, transform: Transform) -> Transform {
        let zoom = clamp(transform.zoom, self.min_zoom, self.max_zoom);
        let t = Transform { zoom, ..transform };
        let extent = &self.translate_extent.0;

        let dx0 = t.invert_x(0.0) - extent[0][0];
        let dx1 = t.invert_x(self.dimensions.width) - extent[1][0];
        let dy0 = t.invert_y(0.0) - extent[0][1];
        let dy1 = t.invert_y(self.dimensions.height) - extent[1][1];

        let tx = constrain_axis(dx0, dx1);
        let ty = constrain_axis(dy0, dy1);

        Transform {
            x: t.x + zoom * tx,
            y: t.y + zoom * ty,
            zoom,
        }
    }

    fn interrupt(&mut self) {
        if self.transition.take().is_some() {
            log::trace!("viewport transition interrupted");
        }
    }

    /// Translate by a screen-space delta.
    ///
    /// Returns whether the transform actually changed, which is false when
    /// the extent already blocks movement in that direction.
    pub fn pan_by(&mut self, delta: XYPosition) -> bool {
        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }
        self.interrupt();

        let next = self.constrain(Transform {
            x: self.transform.x + delta.x,
            y: self.transform.y + delta.y,
            zoom: self.transform.zoom,
        });
        let changed = next != self.transform;
        self.transform = next;
        changed
    }

    /// Move to `target`, immediately or animated over `duration`.
    ///
    /// The returned future resolves once the transform has settled, or when
    /// a later change interrupts the animation.
    pub fn set_viewport(
        &mut self,
        target: Transform,
        duration: Option<Duration>,
    ) -> impl Future<Output = ()> + 'static {
        let target = self.constrain(target);
        self.interrupt();

        match duration.filter(|d| !d.is_zero()) {
            None => {
                self.transform = target;
                future::ready(()).left_future()
            }
            Some(duration) => {
                let (done, waiter) = oneshot::channel();
                self.transition = Some(Transition {
                    from: self.transform,
                    to: target,
                    elapsed: Duration::ZERO,
                    duration,
                    done,
                });
                waiter.map(|_| ()).right_future()
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Advance a pending transition by `dt`. Returns whether the transform moved.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };

        transition.elapsed += dt;
        let progress =
            (transition.elapsed.as_secs_f64() / transition.duration.as_secs_f64()).min(1.0);
        let eased = ease_cubic_in_out(progress);
        let (from, to) = (transition.from, transition.to);

        self.transform = Transform {
            x: lerp(from.x, to.x, eased),
            y: lerp(from.y, to.y, eased),
            zoom: lerp(from.zoom, to.zoom, eased),
        };

        if progress >= 1.0 {
            self.transform = to;
            if let Some(finished) = self.transition.take() {
                let _ = finished.done.send(());
            }
        }
        true
    }

    /// Zoom to `zoom` keeping the container center fixed.
    pub fn scale_to(
        &mut self,
        zoom: f64,
        duration: Option<Duration>,
    ) -> impl Future<Output = ()> + 'static {
        let center = XYPosition::new(self.dimensions.width / 2.0, self.dimensions.height / 2.0);
        let world = XYPosition::new(
            self.transform.invert_x(center.x),
            self.transform.invert_y(center.y),
        );
        let zoom = clamp(zoom, self.min_zoom, self.max_zoom);

        self.set_viewport(
            Transform {
                x: center.x - world.x * zoom,
                y: center.y - world.y * zoom,
                zoom,
            },
            duration,
        )
    }

    pub fn scale_by(
        &mut self,
        factor: f64,
        duration: Option<Duration>,
    ) -> impl Future<Output = ()> + 'static {
        self.scale_to(self.transform.zoom * factor, duration)
    }

    pub fn zoom_in(&mut self, duration: Option<Duration>) -> impl Future<Output = ()> + 'static {
        self.scale_by(ZOOM_STEP, duration)
    }

    pub fn zoom_out(&mut self, duration: Option<Duration>) -> impl Future<Output = ()> + 'static {
        self.scale_by(1.0 / ZOOM_STEP, duration)
    }

    /// Center the viewport on a world point. `zoom` defaults to the max zoom.
    pub fn set_center(
        &mut self,
        x: f64,
        y: f64,
        zoom: Option<f64>,
        duration: Option<Duration>,
    ) -> impl Future<Output = ()> + 'static {
        let zoom = zoom.unwrap_or(self.max_zoom);
        self.set_viewport(
            Transform {
                x: self.dimensions.width / 2.0 - x * zoom,
                y: self.dimensions.height / 2.0 - y * zoom,
                zoom,
            },
            duration,
        )
    }

    /// Fit an arbitrary world rect into the container.
    pub fn fit_bounds(
        &mut self,
        bounds: Rect,
        padding: f64,
        duration: Option<Duration>,
    ) -> impl Future<Output = ()> + 'static {
        let target = viewport_for_bounds(
            bounds,
            self.dimensions.width,
            self.dimensions.height,
            self.min_zoom,
            self.max_zoom,
            padding,
        );
        self.set_viewport(target, duration)
    }

    fn fit_view_target(&self, store: &FlowStore, options: &FitViewOptions) -> Option<Transform> {
        let bounds = store.fit_view_bounds(options)?;
        Some(viewport_for_bounds(
            bounds,
            self.dimensions.width,
            self.dimensions.height,
            options.min_zoom.unwrap_or(self.min_zoom),
            options.max_zoom.unwrap_or(self.max_zoom),
            options.padding,
        ))
    }

    /// Fit the store's nodes immediately. Returns whether there was anything to fit.
    pub fn fit_view_sync(&mut self, store: &FlowStore, options: &FitViewOptions) -> bool {
        match self.fit_view_target(store, options) {
            Some(target) => {
                self.interrupt();
                self.transform = self.constrain(target);
                true
            }
            None => false,
        }
    }

    /// Fit the store's nodes, animated when `options.duration` is set.
    ///
    /// Ends on the same transform as [`fit_view_sync`](Self::fit_view_sync)
    /// and resolves with whether there was anything to fit.
    pub fn fit_view(
        &mut self,
        store: &FlowStore,
        options: &FitViewOptions,
    ) -> impl Future<Output = bool> + 'static {
        match self.fit_view_target(store, options) {
            Some(target) => self.set_viewport(target, options.duration).map(|_| true).left_future(),
            None => future::ready(false).right_future(),
        }
    }
}

/// d3-zoom's translate constraint for one axis.
fn constrain_axis(d0: f64, d1: f64) -> f64 {
    if d1 > d0 {
        (d0 + d1) / 2.0
    } else {
        let leading = d0.min(0.0);
        if leading != 0.0 {
            leading
        } else {
            d1.max(0.0)
        }
    }
}
