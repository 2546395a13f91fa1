//! Viewport transform: zoom, pan and rotation of the plan surface
//!
//! Screen position of a plan point is `R(plan * zoom) + pan`, where `R` is a
//! clockwise rotation by a multiple of 90° (screen y grows downward). All
//! changes are synchronous and apply on the next render.

use crate::geometry::{PlanPoint, ScreenPoint};

/// Default zoom bounds
pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
pub const DEFAULT_MAX_ZOOM: f64 = 4.0;

/// Plan rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation in degrees
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Next quarter turn clockwise
    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Next quarter turn counter-clockwise
    pub fn counter_clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg270,
            Rotation::Deg90 => Rotation::Deg0,
            Rotation::Deg180 => Rotation::Deg90,
            Rotation::Deg270 => Rotation::Deg180,
        }
    }

    fn apply(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (-y, x),
            Rotation::Deg180 => (-x, -y),
            Rotation::Deg270 => (y, -x),
        }
    }

    fn invert(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (y, -x),
            Rotation::Deg180 => (-x, -y),
            Rotation::Deg270 => (-y, x),
        }
    }
}

/// View transform of the open plan
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub rotation: Rotation,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            rotation: Rotation::Deg0,
        }
    }
}

/// Owns the transform and the current page of the open plan
#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: Transform,
    min_zoom: f64,
    max_zoom: f64,
    page_index: usize,
    page_count: usize,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

impl ViewportController {
    /// Create a controller with the given zoom bounds (swapped if inverted)
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            transform: Transform::default(),
            min_zoom,
            max_zoom,
            page_index: 0,
            page_count: 0,
        }
    }

    /// Current transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Current zoom factor
    pub fn zoom(&self) -> f64 {
        self.transform.zoom
    }

    /// Current page index
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Number of pages in the open plan
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Reset for a newly loaded plan
    pub fn load_plan(&mut self, page_count: usize) {
        self.transform = Transform {
            zoom: 1.0_f64.clamp(self.min_zoom, self.max_zoom),
            ..Transform::default()
        };
        self.page_index = 0;
        self.page_count = page_count;
    }

    /// Adjust zoom by `delta`, clamped to bounds; returns the new zoom
    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        self.set_zoom(self.transform.zoom + delta)
    }

    /// Set zoom, clamped to bounds; returns the new zoom
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.transform.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
        self.transform.zoom
    }

    /// Translate the view by a screen-space delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.transform.pan_x += dx;
        self.transform.pan_y += dy;
    }

    /// Rotate the view a quarter turn clockwise
    pub fn rotate_clockwise(&mut self) {
        self.transform.rotation = self.transform.rotation.clockwise();
    }

    /// Rotate the view a quarter turn counter-clockwise
    pub fn rotate_counter_clockwise(&mut self) {
        self.transform.rotation = self.transform.rotation.counter_clockwise();
    }

    /// Switch page, clamped to the plan; returns the page now shown
    pub fn set_page(&mut self, index: usize) -> usize {
        if self.page_count > 0 {
            self.page_index = index.min(self.page_count - 1);
        }
        self.page_index
    }

    /// Inverse transform: screen pixel to plan coordinate
    pub fn screen_to_plan(&self, point: ScreenPoint) -> PlanPoint {
        let t = &self.transform;
        let (x, y) = t.rotation.invert(point.x - t.pan_x, point.y - t.pan_y);
        PlanPoint::new(x / t.zoom, y / t.zoom)
    }

    /// Forward transform: plan coordinate to screen pixel
    pub fn plan_to_screen(&self, point: PlanPoint) -> ScreenPoint {
        let t = &self.transform;
        let (x, y) = t.rotation.apply(point.x * t.zoom, point.y * t.zoom);
        ScreenPoint::new(x + t.pan_x, y + t.pan_y)
    }

    /// Convert a screen-pixel distance to plan units at the current zoom
    pub fn screen_distance_to_plan(&self, pixels: f64) -> f64 {
        pixels / self.transform.zoom
    }
}
