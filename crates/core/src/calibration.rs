//! Page calibration: plan-surface units per real-world unit
//!
//! A calibration is derived either from a standard drawing scale (1:100 etc.)
//! or from two reference points the user picked on the plan plus the known
//! real distance between them. Calibrations are scoped to a single page.

use crate::geometry::PlanPoint;
use crate::units::LengthUnit;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metres per inch, used to turn render DPI into plan units per paper metre
const METRES_PER_INCH: f64 = 0.0254;

/// Standard architectural and engineering drawing scales
pub const STANDARD_PRESETS: [u32; 12] = [1, 2, 5, 10, 20, 25, 50, 100, 200, 250, 500, 1000];

/// Calibration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("reference distance must be greater than zero (got {0})")]
    NonPositiveDistance(f64),

    #[error("calibration points are identical")]
    CoincidentPoints,

    #[error("invalid scale notation: {0:?}")]
    InvalidScale(String),

    #[error("render resolution must be greater than zero (got {0})")]
    InvalidResolution(f64),
}

/// How a calibration was obtained
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CalibrationSource {
    /// Standard paper scale
    Preset { scale: ScalePreset },
    /// Two picked points with a known real distance between them
    TwoPoint {
        a: PlanPoint,
        b: PlanPoint,
        distance: f64,
    },
}

/// Paper scale of the form 1:N
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScalePreset {
    denominator: u32,
}

impl ScalePreset {
    /// Create a 1:`denominator` scale; zero is rejected
    pub fn new(denominator: u32) -> Result<Self, CalibrationError> {
        if denominator == 0 {
            return Err(CalibrationError::InvalidScale("1:0".to_string()));
        }
        Ok(Self { denominator })
    }

    /// The N in 1:N
    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// All standard presets, largest drawing first
    pub fn standard() -> impl Iterator<Item = ScalePreset> {
        STANDARD_PRESETS
            .iter()
            .map(|&denominator| ScalePreset { denominator })
    }
}

impl FromStr for ScalePreset {
    type Err = CalibrationError;

    /// Accepts "1:100", "1 : 50", "1/200" and a leading "scale"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalibrationError::InvalidScale(s.to_string());

        let trimmed = s.trim();
        let body = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("scale"))
            .map(|_| trimmed[5..].trim_start())
            .unwrap_or(trimmed);

        let (lhs, rhs) = body
            .split_once(':')
            .or_else(|| body.split_once('/'))
            .ok_or_else(invalid)?;

        let lhs: u32 = lhs.trim().parse().map_err(|_| invalid())?;
        let rhs: u32 = rhs.trim().parse().map_err(|_| invalid())?;
        if lhs != 1 || rhs == 0 {
            return Err(invalid());
        }
        Ok(Self { denominator: rhs })
    }
}

impl fmt::Display for ScalePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1:{}", self.denominator)
    }
}

/// Scale factor mapping plan distance to real-world distance for one page
///
/// `pixels_per_unit` is always finite and strictly positive; the only
/// constructors are [`Calibration::from_preset`] and [`Calibration::manual`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Calibration {
    pixels_per_unit: f64,
    unit: LengthUnit,
    source: CalibrationSource,
}

impl Calibration {
    /// Calibration from a known paper scale
    ///
    /// A plan rendered at `render_dpi` plan units per paper inch holds
    /// `render_dpi / 0.0254` units per paper metre; at 1:N one real metre
    /// spans 1/N of that.
    pub fn from_preset(scale: ScalePreset, render_dpi: f64) -> Result<Self, CalibrationError> {
        if !(render_dpi.is_finite() && render_dpi > 0.0) {
            return Err(CalibrationError::InvalidResolution(render_dpi));
        }
        let pixels_per_metre = render_dpi / METRES_PER_INCH / f64::from(scale.denominator());
        Ok(Self {
            pixels_per_unit: pixels_per_metre,
            unit: LengthUnit::Metre,
            source: CalibrationSource::Preset { scale },
        })
    }

    /// Two-point calibration: `pixels_per_unit = dist(a, b) / real_distance`
    pub fn manual(
        a: PlanPoint,
        b: PlanPoint,
        real_distance: f64,
        unit: LengthUnit,
    ) -> Result<Self, CalibrationError> {
        if !(real_distance.is_finite() && real_distance > 0.0) {
            return Err(CalibrationError::NonPositiveDistance(real_distance));
        }
        let plan_distance = a.distance_to(&b);
        if plan_distance <= f64::EPSILON {
            return Err(CalibrationError::CoincidentPoints);
        }
        Ok(Self {
            pixels_per_unit: plan_distance / real_distance,
            unit,
            source: CalibrationSource::TwoPoint {
                a,
                b,
                distance: real_distance,
            },
        })
    }

    /// Plan units per calibration unit
    pub fn pixels_per_unit(&self) -> f64 {
        self.pixels_per_unit
    }

    /// Plan units per metre, regardless of the calibration unit
    pub fn pixels_per_metre(&self) -> f64 {
        self.pixels_per_unit / self.unit.metres()
    }

    /// Unit the calibration was entered in
    pub fn unit(&self) -> LengthUnit {
        self.unit
    }

    /// How this calibration was obtained
    pub fn source(&self) -> &CalibrationSource {
        &self.source
    }

    /// Convert a plan distance to the calibration unit
    pub fn to_real(&self, plan_distance: f64) -> f64 {
        plan_distance / self.pixels_per_unit
    }

    /// Convert a real distance in the calibration unit to plan units
    pub fn to_plan(&self, real_distance: f64) -> f64 {
        real_distance * self.pixels_per_unit
    }
}

/// Calibrations keyed by page index
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationMap {
    pages: BTreeMap<usize, Calibration>,
}

impl CalibrationMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a calibration for a page, replacing any previous one
    pub fn set(&mut self, page_index: usize, calibration: Calibration) {
        self.pages.insert(page_index, calibration);
    }

    /// Calibrate a page from a preset scale
    pub fn set_preset(
        &mut self,
        page_index: usize,
        scale: ScalePreset,
        render_dpi: f64,
    ) -> Result<Calibration, CalibrationError> {
        let calibration = Calibration::from_preset(scale, render_dpi)?;
        self.set(page_index, calibration.clone());
        Ok(calibration)
    }

    /// Calibrate a page from two points and a known distance
    ///
    /// On error the page's existing calibration (if any) is left untouched.
    pub fn set_manual(
        &mut self,
        page_index: usize,
        a: PlanPoint,
        b: PlanPoint,
        real_distance: f64,
        unit: LengthUnit,
    ) -> Result<Calibration, CalibrationError> {
        let calibration = Calibration::manual(a, b, real_distance, unit)?;
        self.set(page_index, calibration.clone());
        Ok(calibration)
    }

    /// Calibration for a page
    pub fn get(&self, page_index: usize) -> Option<&Calibration> {
        self.pages.get(&page_index)
    }

    /// Remove a page's calibration; returns the removed value
    pub fn clear(&mut self, page_index: usize) -> Option<Calibration> {
        self.pages.remove(&page_index)
    }

    /// Whether a page has a calibration
    pub fn is_calibrated(&self, page_index: usize) -> bool {
        self.pages.contains_key(&page_index)
    }

    /// Iterate over (page, calibration) pairs in page order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Calibration)> {
        self.pages.iter().map(|(page, cal)| (*page, cal))
    }

    /// Drop every calibration (new plan loaded)
    pub fn reset(&mut self) {
        self.pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_calibration() {
        let cal = Calibration::manual(
            PlanPoint::new(0.0, 0.0),
            PlanPoint::new(100.0, 0.0),
            5.0,
            LengthUnit::Metre,
        )
        .unwrap();
        assert_eq!(cal.pixels_per_unit(), 20.0);
        assert_eq!(cal.to_real(200.0), 10.0);
        assert_eq!(cal.to_plan(10.0), 200.0);
    }

    #[test]
    fn test_manual_calibration_in_feet() {
        let cal = Calibration::manual(
            PlanPoint::new(0.0, 0.0),
            PlanPoint::new(0.0, 30.48),
            10.0,
            LengthUnit::Foot,
        )
        .unwrap();
        assert!((cal.pixels_per_unit() - 3.048).abs() < 1e-12);
        // 10 ft = 3.048 m spans 30.48 units
        assert!((cal.pixels_per_metre() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_calibration_rejects_bad_distance() {
        let a = PlanPoint::new(0.0, 0.0);
        let b = PlanPoint::new(10.0, 0.0);
        assert_eq!(
            Calibration::manual(a, b, 0.0, LengthUnit::Metre),
            Err(CalibrationError::NonPositiveDistance(0.0))
        );
        assert_eq!(
            Calibration::manual(a, b, -3.0, LengthUnit::Metre),
            Err(CalibrationError::NonPositiveDistance(-3.0))
        );
        assert!(Calibration::manual(a, b, f64::NAN, LengthUnit::Metre).is_err());
    }

    #[test]
    fn test_manual_calibration_rejects_coincident_points() {
        let a = PlanPoint::new(42.0, 7.0);
        assert_eq!(
            Calibration::manual(a, a, 1.0, LengthUnit::Metre),
            Err(CalibrationError::CoincidentPoints)
        );
    }

    #[test]
    fn test_preset_calibration() {
        let scale: ScalePreset = "1:100".parse().unwrap();
        let cal = Calibration::from_preset(scale, 72.0).unwrap();
        // 72 dpi -> 2834.65 units per paper metre -> 28.35 per real metre at 1:100
        assert!((cal.pixels_per_unit() - 72.0 / 0.0254 / 100.0).abs() < 1e-9);
        assert_eq!(cal.unit(), LengthUnit::Metre);
        assert!(Calibration::from_preset(scale, 0.0).is_err());
    }

    #[test]
    fn test_scale_preset_parsing() {
        assert_eq!("1:100".parse::<ScalePreset>().unwrap().denominator(), 100);
        assert_eq!("1 : 50".parse::<ScalePreset>().unwrap().denominator(), 50);
        assert_eq!("1/200".parse::<ScalePreset>().unwrap().denominator(), 200);
        assert_eq!("Scale 1:20".parse::<ScalePreset>().unwrap().denominator(), 20);
        assert!("2:100".parse::<ScalePreset>().is_err());
        assert!("1:0".parse::<ScalePreset>().is_err());
        assert!("100".parse::<ScalePreset>().is_err());
        assert!("".parse::<ScalePreset>().is_err());
        assert_eq!(ScalePreset::new(250).unwrap().to_string(), "1:250");
        assert_eq!(ScalePreset::standard().count(), STANDARD_PRESETS.len());
    }

    #[test]
    fn test_calibration_map_is_per_page() {
        let mut map = CalibrationMap::new();
        map.set_manual(
            0,
            PlanPoint::new(0.0, 0.0),
            PlanPoint::new(100.0, 0.0),
            5.0,
            LengthUnit::Metre,
        )
        .unwrap();

        assert!(map.is_calibrated(0));
        assert!(!map.is_calibrated(1));

        // A failed calibration keeps the previous one
        let err = map.set_manual(
            0,
            PlanPoint::new(0.0, 0.0),
            PlanPoint::new(0.0, 0.0),
            5.0,
            LengthUnit::Metre,
        );
        assert!(err.is_err());
        assert_eq!(map.get(0).map(|c| c.pixels_per_unit()), Some(20.0));

        assert!(map.clear(0).is_some());
        assert!(!map.is_calibrated(0));
        assert!(map.clear(0).is_none());
    }
}
