//! Measurement record and enrichment updates
//!
//! Geometry, raw value and creation time are fixed when the measurement is
//! created. Enrichment fields (label, zone, materials, compliance code,
//! validation flag, cost link, depth) change afterwards through
//! [`MeasurementUpdate`], which validates every field before writing.

use crate::calculator::{self, MeasuredValue};
use crate::cost_link::CostItemId;
use crate::geometry::{self, PlanPoint};
use crate::units::QuantityUnit;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for measurements
pub type MeasurementId = uuid::Uuid;

/// Shape of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Linear,
    Rectangle,
    Polygon,
    Count,
}

impl MeasurementKind {
    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            MeasurementKind::Linear => "Line",
            MeasurementKind::Rectangle => "Rectangle",
            MeasurementKind::Polygon => "Polygon",
            MeasurementKind::Count => "Count",
        }
    }

    /// Whether `n` points is a valid outline for this kind
    pub fn accepts_point_count(self, n: usize) -> bool {
        match self {
            MeasurementKind::Linear | MeasurementKind::Rectangle => n == 2,
            MeasurementKind::Polygon => n >= 3,
            MeasurementKind::Count => n >= 1,
        }
    }

    /// Whether the measured value is an area
    pub fn is_area(self) -> bool {
        matches!(self, MeasurementKind::Rectangle | MeasurementKind::Polygon)
    }
}

/// Validation failures for measurement records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasurementError {
    #[error("{kind:?} measurement cannot have {count} points")]
    PointCount { kind: MeasurementKind, count: usize },

    #[error("measured value must be finite and non-negative (got {0})")]
    InvalidValue(f64),

    #[error("label must not be empty")]
    EmptyLabel,

    #[error("depth must be finite and greater than zero (got {0})")]
    InvalidDepth(f64),
}

/// Auto-suggested label, e.g. "Line 10.00m"
pub fn suggested_label(kind: MeasurementKind, value: &MeasuredValue) -> String {
    match kind {
        MeasurementKind::Count => kind.name().to_string(),
        _ => format!(
            "{} {:.2}{}",
            kind.name(),
            value.real_value,
            value.unit.short_suffix()
        ),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A drawn measurement on a plan page
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Measurement {
    id: MeasurementId,
    kind: MeasurementKind,
    points: Vec<PlanPoint>,
    pixel_value: f64,
    real_value: f64,
    unit: QuantityUnit,
    page_index: usize,
    timestamp: u64,

    #[serde(default)]
    is_deduction: bool,
    label: String,
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    materials: BTreeSet<String>,
    #[serde(default)]
    ncc_code: Option<String>,
    #[serde(default)]
    validated: bool,
    #[serde(default)]
    linked_cost_item: Option<CostItemId>,
    #[serde(default)]
    depth: Option<f64>,
}

impl Measurement {
    /// Create a measurement from a computed value
    ///
    /// The label defaults to [`suggested_label`].
    pub fn new(
        kind: MeasurementKind,
        points: Vec<PlanPoint>,
        value: MeasuredValue,
        page_index: usize,
    ) -> Result<Self, MeasurementError> {
        if !kind.accepts_point_count(points.len()) {
            return Err(MeasurementError::PointCount {
                kind,
                count: points.len(),
            });
        }
        for v in [value.pixel_value, value.real_value] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(MeasurementError::InvalidValue(v));
            }
        }
        Ok(Self {
            id: MeasurementId::new_v4(),
            kind,
            label: suggested_label(kind, &value),
            points,
            pixel_value: value.pixel_value,
            real_value: value.real_value,
            unit: value.unit,
            page_index,
            timestamp: now_millis(),
            is_deduction: false,
            area: None,
            materials: BTreeSet::new(),
            ncc_code: None,
            validated: false,
            linked_cost_item: None,
            depth: None,
        })
    }

    /// Count marker at a point
    pub fn count_marker(point: PlanPoint, page_index: usize) -> Self {
        Self {
            id: MeasurementId::new_v4(),
            kind: MeasurementKind::Count,
            label: MeasurementKind::Count.name().to_string(),
            points: vec![point],
            pixel_value: 0.0,
            real_value: calculator::count().real_value,
            unit: QuantityUnit::Count,
            page_index,
            timestamp: now_millis(),
            is_deduction: false,
            area: None,
            materials: BTreeSet::new(),
            ncc_code: None,
            validated: false,
            linked_cost_item: None,
            depth: None,
        }
    }

    pub fn id(&self) -> MeasurementId {
        self.id
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    pub fn points(&self) -> &[PlanPoint] {
        &self.points
    }

    /// Raw plan-surface magnitude
    pub fn pixel_value(&self) -> f64 {
        self.pixel_value
    }

    /// Calibrated value in `unit()` (1.0 for counts)
    pub fn real_value(&self) -> f64 {
        self.real_value
    }

    /// Real value with the deduction sign applied
    pub fn signed_value(&self) -> f64 {
        if self.is_deduction {
            -self.real_value
        } else {
            self.real_value
        }
    }

    pub fn unit(&self) -> QuantityUnit {
        self.unit
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Creation time, Unix milliseconds
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_deduction(&self) -> bool {
        self.is_deduction
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Named zone this measurement belongs to
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    pub fn materials(&self) -> &BTreeSet<String> {
        &self.materials
    }

    pub fn ncc_code(&self) -> Option<&str> {
        self.ncc_code.as_deref()
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn linked_cost_item(&self) -> Option<CostItemId> {
        self.linked_cost_item
    }

    pub fn depth(&self) -> Option<f64> {
        self.depth
    }

    /// Volume in cubic metres for area measurements with a depth
    pub fn volume(&self) -> Option<f64> {
        match (self.kind.is_area(), self.depth) {
            (true, Some(depth)) => Some(calculator::volume(self.real_value, depth)),
            _ => None,
        }
    }

    /// Where the value label is drawn: segment midpoint, outline centroid or the marker
    pub fn label_position(&self) -> PlanPoint {
        match self.kind {
            MeasurementKind::Linear if self.points.len() == 2 => {
                self.points[0].midpoint(&self.points[1])
            }
            _ => geometry::centroid(&self.points).unwrap_or_default(),
        }
    }

    /// Case-insensitive substring match over label, zone and materials
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.label.to_lowercase().contains(&needle)
            || self
                .area
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle))
            || self
                .materials
                .iter()
                .any(|m| m.to_lowercase().contains(&needle))
    }
}

/// Keeps `None` for a missing field and `Some(None)` for an explicit null
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Partial update of enrichment fields
///
/// `None` leaves a field untouched. For clearable fields `Some(None)` clears.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeasurementUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub area: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<BTreeSet<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub ncc_code: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<QuantityUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deduction: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub depth: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub linked_cost_item: Option<Option<CostItemId>>,
}

impl MeasurementUpdate {
    /// Rename
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Assign or clear the zone
    pub fn area(area: Option<String>) -> Self {
        Self {
            area: Some(area),
            ..Self::default()
        }
    }

    /// Replace the material set
    pub fn materials<I, S>(materials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            materials: Some(materials.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Record a unit change; the stored value is not recomputed
    pub fn unit(unit: QuantityUnit) -> Self {
        Self {
            unit: Some(unit),
            ..Self::default()
        }
    }

    /// Set the validation flag
    pub fn validated(validated: bool) -> Self {
        Self {
            validated: Some(validated),
            ..Self::default()
        }
    }

    /// Store a compliance code
    pub fn ncc_code(code: Option<String>) -> Self {
        Self {
            ncc_code: Some(code),
            ..Self::default()
        }
    }

    /// Mark as deduction (or not)
    pub fn deduction(is_deduction: bool) -> Self {
        Self {
            is_deduction: Some(is_deduction),
            ..Self::default()
        }
    }

    /// Assign or clear the extrusion depth in metres
    pub fn depth(depth: Option<f64>) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate every field, then write them all
    ///
    /// Either every field is applied or, on error, none is.
    pub fn apply(&self, measurement: &mut Measurement) -> Result<(), MeasurementError> {
        let label = match &self.label {
            Some(label) => Some(normalize_text(label).ok_or(MeasurementError::EmptyLabel)?),
            None => None,
        };
        if let Some(Some(depth)) = self.depth {
            if !(depth.is_finite() && depth > 0.0) {
                return Err(MeasurementError::InvalidDepth(depth));
            }
        }

        if let Some(label) = label {
            measurement.label = label;
        }
        if let Some(area) = &self.area {
            measurement.area = area.as_deref().and_then(normalize_text);
        }
        if let Some(materials) = &self.materials {
            measurement.materials = materials
                .iter()
                .filter_map(|m| normalize_text(m))
                .collect();
        }
        if let Some(code) = &self.ncc_code {
            measurement.ncc_code = code.as_deref().and_then(normalize_text);
        }
        if let Some(validated) = self.validated {
            measurement.validated = validated;
        }
        if let Some(unit) = self.unit {
            measurement.unit = unit;
        }
        if let Some(is_deduction) = self.is_deduction {
            measurement.is_deduction = is_deduction;
        }
        if let Some(depth) = self.depth {
            measurement.depth = depth;
        }
        if let Some(item) = self.linked_cost_item {
            measurement.linked_cost_item = item;
        }
        Ok(())
    }
}
