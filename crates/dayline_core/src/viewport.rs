use serde::{Deserialize, Serialize};

use crate::model::MINUTES_PER_DAY;

/// Pinch-gesture state captured when the second touch point lands.
#[derive(Debug, Clone, Copy)]
struct PinchOrigin {
    start_distance: f32,
    start_scale: f32,
    focal_screen_x: f32,
}

/// Zoomable, pannable mapping from timeline minutes to horizontal pixels.
///
/// `scale` (pixels per minute) and `scroll_offset_px` are kept inside their
/// bounds by construction; every mutation clamps, so no operation can observe
/// an out-of-range viewport. Pinch moves are coalesced: callers queue deltas
/// as they arrive and apply at most one recomputation per display frame via
/// [`Viewport::on_frame`].
#[derive(Debug, Clone)]
pub struct Viewport {
    scale: f32,
    scroll_offset_px: f32,
    viewport_width_px: f32,
    min_scale: f32,
    max_scale: f32,
    pinch: Option<PinchOrigin>,
    pending_distance: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewportState {
    pub scale: f32,
    pub scroll_offset_px: f32,
    pub viewport_width_px: f32,
}

impl Viewport {
    pub fn new(viewport_width_px: f32, initial_scale: f32, min_scale: f32, max_scale: f32) -> Self {
        let min_scale = min_scale.max(f32::EPSILON);
        let max_scale = max_scale.max(min_scale);
        let scale = initial_scale.clamp(min_scale, max_scale);
        let mut viewport = Self {
            scale,
            scroll_offset_px: 0.0,
            viewport_width_px: viewport_width_px.max(0.0),
            min_scale,
            max_scale,
            pinch: None,
            pending_distance: None,
        };
        viewport.scroll_offset_px = viewport.clamp_offset(0.0, scale);
        viewport
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            scale: self.scale,
            scroll_offset_px: self.scroll_offset_px,
            viewport_width_px: self.viewport_width_px,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn scroll_offset_px(&self) -> f32 {
        self.scroll_offset_px
    }

    pub fn content_width(&self) -> f32 {
        MINUTES_PER_DAY as f32 * self.scale
    }

    /// Screen x-position of a timeline minute under the current transform.
    pub fn minute_to_x(&self, minute: f32) -> f32 {
        minute * self.scale - self.scroll_offset_px
    }

    /// Timeline minute under a screen x-position.
    pub fn x_to_minute(&self, x: f32) -> f32 {
        (self.scroll_offset_px + x) / self.scale
    }

    /// Records the two-finger gesture origin: distance between the touch
    /// points and the midpoint the zoom must keep stationary. A degenerate
    /// zero-distance pinch is ignored.
    pub fn begin_pinch(&mut self, start_distance: f32, focal_screen_x: f32) {
        if start_distance <= 0.0 || !start_distance.is_finite() {
            return;
        }
        self.pinch = Some(PinchOrigin {
            start_distance,
            start_scale: self.scale,
            focal_screen_x,
        });
        self.pending_distance = None;
    }

    /// Queues the latest pinch distance. Deltas arriving between frames
    /// overwrite each other; only the newest is applied when the frame fires.
    pub fn pinch_move(&mut self, distance: f32) {
        if self.pinch.is_none() || distance <= 0.0 || !distance.is_finite() {
            return;
        }
        self.pending_distance = Some(distance);
    }

    /// Applies the most recent queued pinch delta, once per display frame.
    /// Returns true when the transform changed.
    pub fn on_frame(&mut self) -> bool {
        let (Some(origin), Some(distance)) = (self.pinch, self.pending_distance.take()) else {
            return false;
        };

        let target_scale = (origin.start_scale * distance / origin.start_distance)
            .clamp(self.min_scale, self.max_scale);
        // Minute currently under the focal point, measured before this frame's
        // rescale so the same content stays under the user's fingers.
        let focal_minute = (self.scroll_offset_px + origin.focal_screen_x) / self.scale;
        let target_offset = focal_minute * target_scale - origin.focal_screen_x;

        let changed = target_scale != self.scale;
        self.scale = target_scale;
        self.scroll_offset_px = self.clamp_offset(target_offset, target_scale);
        changed
    }

    /// Ends the gesture, applying any still-queued delta first. No snapping:
    /// scale and offset stay wherever the last move left them.
    pub fn end_pinch(&mut self) {
        self.on_frame();
        self.pinch = None;
        self.pending_distance = None;
    }

    /// One-finger horizontal pan, clamped to the same offset bounds as zoom.
    pub fn pan_by(&mut self, delta_px: f32) {
        if !delta_px.is_finite() {
            return;
        }
        self.scroll_offset_px = self.clamp_offset(self.scroll_offset_px + delta_px, self.scale);
    }

    /// Layout resize. The offset is re-clamped so the viewport never shows
    /// past the end of the content.
    pub fn set_viewport_width(&mut self, width_px: f32) {
        self.viewport_width_px = width_px.max(0.0);
        self.scroll_offset_px = self.clamp_offset(self.scroll_offset_px, self.scale);
    }

    fn clamp_offset(&self, offset: f32, scale: f32) -> f32 {
        let max_offset = (MINUTES_PER_DAY as f32 * scale - self.viewport_width_px).max(0.0);
        offset.clamp(0.0, max_offset)
    }
}
