//! Shared zoom/pan transform.
//!
//! One [`ViewportController`] owns the scale and pan applied to every open
//! panel. Zoom input goes straight to the controller, which notifies its
//! subscribers synchronously before returning.

use crate::constants::{MAX_SCALE, MIN_SCALE};
use crate::observer::{SubscriptionId, Subscribers};

/// Scale and pan offset (surface pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl ViewportState {
    pub fn new(scale: f32, pan_x: f32, pan_y: f32) -> Self {
        Self {
            scale,
            pan_x,
            pan_y,
        }
    }

    /// Scale 1, no pan.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Zoom toward `anchor` so the point under it stays put.
    ///
    /// `new_pan = anchor - (anchor - pan) * new_scale / scale`
    pub fn zoom_toward(&self, anchor: (f32, f32), new_scale: f32) -> ViewportState {
        let ratio = new_scale / self.scale;
        ViewportState {
            scale: new_scale,
            pan_x: anchor.0 - (anchor.0 - self.pan_x) * ratio,
            pan_y: anchor.1 - (anchor.1 - self.pan_y) * ratio,
        }
    }

    /// Apply a pan delta.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewportState {
        ViewportState {
            scale: self.scale,
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
        }
    }

    /// Map a surface point to unscaled image coordinates.
    pub fn surface_to_image(&self, point: (f32, f32)) -> (f32, f32) {
        (
            (point.0 - self.pan_x) / self.scale,
            (point.1 - self.pan_y) / self.scale,
        )
    }

    /// CSS transform string for DOM surfaces.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan_x, self.pan_y, self.scale
        )
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::identity()
    }
}

/// Owner of the shared [`ViewportState`].
#[derive(Debug)]
pub struct ViewportController {
    state: ViewportState,
    min_scale: f32,
    max_scale: f32,
    subscribers: Subscribers<ViewportState>,
}

impl ViewportController {
    /// Create a controller with the default scale bounds.
    pub fn new() -> Self {
        Self::with_bounds(MIN_SCALE, MAX_SCALE)
    }

    /// Create a controller with custom scale bounds.
    ///
    /// Inverted bounds are swapped. Non-finite or non-positive bounds fall
    /// back to [`MIN_SCALE`]..[`MAX_SCALE`].
    pub fn with_bounds(min_scale: f32, max_scale: f32) -> Self {
        let (min_scale, max_scale) = normalize_bounds(min_scale, max_scale);
        let mut controller = Self {
            state: ViewportState::identity(),
            min_scale,
            max_scale,
            subscribers: Subscribers::new(),
        };
        controller.state.scale = controller.clamp(1.0);
        controller
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn scale(&self) -> f32 {
        self.state.scale
    }

    pub fn pan(&self) -> (f32, f32) {
        (self.state.pan_x, self.state.pan_y)
    }

    pub fn min_scale(&self) -> f32 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f32 {
        self.max_scale
    }

    fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Adjust the scale by `delta_scale`, keeping `anchor` fixed.
    ///
    /// Out-of-range results saturate at the bounds. Returns false when the
    /// clamped scale equals the current one (nothing changes, nobody is
    /// notified).
    /// Non-finite input is ignored.
    pub fn zoom_to(&mut self, anchor: (f32, f32), delta_scale: f32) -> bool {
        if !delta_scale.is_finite() || !anchor.0.is_finite() || !anchor.1.is_finite() {
            log::warn!(
                "Ignoring zoom by {} at ({}, {})",
                delta_scale,
                anchor.0,
                anchor.1
            );
            return false;
        }
        let new_scale = self.clamp(self.state.scale + delta_scale);
        if new_scale == self.state.scale {
            return false;
        }
        self.state = self.state.zoom_toward(anchor, new_scale);
        log::trace!(
            "Viewport: scale {:.3} pan ({:.1}, {:.1})",
            self.state.scale,
            self.state.pan_x,
            self.state.pan_y
        );
        self.notify();
        true
    }

    /// Move the pan offset. Pan is unconstrained.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        if !dx.is_finite() || !dy.is_finite() {
            log::warn!("Ignoring pan by ({}, {})", dx, dy);
            return;
        }
        self.state = self.state.pan_by(dx, dy);
        self.notify();
    }

    /// Restore scale 1 and zero pan.
    pub fn reset(&mut self) {
        self.state = ViewportState::new(self.clamp(1.0), 0.0, 0.0);
        log::debug!("Viewport reset");
        self.notify();
    }

    /// Register a listener called after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ViewportState) + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn notify(&mut self) {
        let state = self.state;
        self.subscribers.notify(&state);
    }
}

fn normalize_bounds(min_scale: f32, max_scale: f32) -> (f32, f32) {
    let usable = |s: f32| s.is_finite() && s > 0.0;
    if !usable(min_scale) || !usable(max_scale) {
        log::warn!(
            "Scale bounds {}..{} unusable, using {}..{}",
            min_scale,
            max_scale,
            MIN_SCALE,
            MAX_SCALE
        );
        return (MIN_SCALE, MAX_SCALE);
    }
    if min_scale > max_scale {
        log::warn!("Scale bounds {}..{} inverted, swapping", min_scale, max_scale);
        return (max_scale, min_scale);
    }
    (min_scale, max_scale)
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}
