//! Real-value computation per measurement shape
//!
//! Pure functions: plan-space magnitude in, metric quantity out. Point-count
//! preconditions (2 for linear/rectangle, 3+ for polygon) are the caller's
//! responsibility; the functions never panic on short input but return zero.

use crate::calibration::Calibration;
use crate::geometry::{polygon_area, PlanPoint};
use crate::units::QuantityUnit;

/// Result of measuring one shape
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeasuredValue {
    /// Raw magnitude in plan units (length or squared length)
    pub pixel_value: f64,
    /// Value converted through the calibration
    pub real_value: f64,
    /// Unit of `real_value`
    pub unit: QuantityUnit,
}

/// Length of the segment p1–p2 in linear metres
pub fn linear(p1: PlanPoint, p2: PlanPoint, calibration: &Calibration) -> MeasuredValue {
    let pixel_value = p1.distance_to(&p2);
    MeasuredValue {
        pixel_value,
        real_value: pixel_value / calibration.pixels_per_metre(),
        unit: QuantityUnit::LinearMetre,
    }
}

/// Area of the axis-aligned rectangle spanned by two corners
pub fn rectangle(p1: PlanPoint, p2: PlanPoint, calibration: &Calibration) -> MeasuredValue {
    let ppm = calibration.pixels_per_metre();
    let width = (p2.x - p1.x).abs();
    let height = (p2.y - p1.y).abs();
    MeasuredValue {
        pixel_value: width * height,
        real_value: (width / ppm) * (height / ppm),
        unit: QuantityUnit::SquareMetre,
    }
}

/// Area of a simple or self-intersecting polygon via the shoelace formula
pub fn polygon(points: &[PlanPoint], calibration: &Calibration) -> MeasuredValue {
    let ppm = calibration.pixels_per_metre();
    let pixel_value = polygon_area(points);
    MeasuredValue {
        pixel_value,
        real_value: pixel_value / (ppm * ppm),
        unit: QuantityUnit::SquareMetre,
    }
}

/// A count marker: always one each, no calibration involved
pub fn count() -> MeasuredValue {
    MeasuredValue {
        pixel_value: 0.0,
        real_value: 1.0,
        unit: QuantityUnit::Count,
    }
}

/// Volume of an area extruded by `depth` metres
pub fn volume(area_m2: f64, depth_m: f64) -> f64 {
    area_m2 * depth_m
}
