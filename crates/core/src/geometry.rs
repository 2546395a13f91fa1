//! Plan-surface geometry primitives
//!
//! All measurement geometry is stored in plan coordinates: the coordinate
//! space of the rendered plan page at zoom 1.0, before pan, zoom or rotation
//! are applied. Screen coordinates only exist at the viewport boundary.

/// Point in plan-surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PlanPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanPoint {
    /// Create a new plan point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &PlanPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &PlanPoint) -> PlanPoint {
        PlanPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Point in viewport (screen pixel) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// Create a new screen point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Signed polygon area using the shoelace formula
///
/// Positive for counter-clockwise vertex order (y up), negative for clockwise.
/// Fewer than three points yields 0.0.
pub fn signed_area(points: &[PlanPoint]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x * points[j].y;
        twice_area -= points[j].x * points[i].y;
    }
    twice_area / 2.0
}

/// Absolute polygon area
pub fn polygon_area(points: &[PlanPoint]) -> f64 {
    signed_area(points).abs()
}

/// Vertex centroid, used for label placement
pub fn centroid(points: &[PlanPoint]) -> Option<PlanPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.x).sum();
    let sum_y: f64 = points.iter().map(|p| p.y).sum();
    Some(PlanPoint::new(sum_x / n, sum_y / n))
}

/// Bounding box as (min_x, min_y, max_x, max_y)
pub fn bounding_box(points: &[PlanPoint]) -> Option<(f64, f64, f64, f64)> {
    let first = points.first()?;
    let mut bounds = (first.x, first.y, first.x, first.y);
    for p in points.iter().skip(1) {
        bounds.0 = bounds.0.min(p.x);
        bounds.1 = bounds.1.min(p.y);
        bounds.2 = bounds.2.max(p.x);
        bounds.3 = bounds.3.max(p.y);
    }
    Some(bounds)
}

/// Collapse consecutive vertices closer than `tolerance`
///
/// A trailing vertex that coincides with the first one is dropped too, since
/// the ring is implicitly closed.
pub fn dedup_vertices(points: &[PlanPoint], tolerance: f64) -> Vec<PlanPoint> {
    let mut out: Vec<PlanPoint> = Vec::with_capacity(points.len());
    for p in points {
        match out.last() {
            Some(last) if last.distance_to(p) <= tolerance => {}
            _ => out.push(*p),
        }
    }
    while out.len() > 1 && out[0].distance_to(&out[out.len() - 1]) <= tolerance {
        out.pop();
    }
    out
}

/// Orientation of the ordered triple (p, q, r): >0 ccw, <0 cw, 0 collinear
fn orientation(p: &PlanPoint, q: &PlanPoint, r: &PlanPoint) -> f64 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

fn on_segment(p: &PlanPoint, q: &PlanPoint, r: &PlanPoint) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Whether segments (a1, a2) and (b1, b2) intersect, touching included
pub fn segments_intersect(a1: &PlanPoint, a2: &PlanPoint, b1: &PlanPoint, b2: &PlanPoint) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);

    if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
        return true;
    }

    (o1 == 0.0 && on_segment(a1, b1, a2))
        || (o2 == 0.0 && on_segment(a1, b2, a2))
        || (o3 == 0.0 && on_segment(b1, a1, b2))
        || (o4 == 0.0 && on_segment(b1, a2, b2))
}

/// Whether any two non-adjacent edges of the closed ring cross
pub fn is_self_intersecting(points: &[PlanPoint]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let a1 = &points[i];
        let a2 = &points[(i + 1) % n];
        for j in (i + 1)..n {
            // Edges sharing a vertex always touch
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b1 = &points[j];
            let b2 = &points[(j + 1) % n];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}
