//! Review table over the measurement document
//!
//! Holds transient presentation state only: the search query, zone grouping,
//! selection and expanded rows. Row actions produce [`MeasurementUpdate`]s that
//! the session applies; nothing here mutates the document directly.

use crate::document::MeasurementDocument;
use crate::measurement::{Measurement, MeasurementId, MeasurementUpdate};
use crate::units::QuantityUnit;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Failure reported by an estimate consumer
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("estimate rejected: {0}")]
    Rejected(String),

    #[error("estimate unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a compliance lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no compliance code for this zone and material set")]
    NotFound,

    #[error("compliance lookup failed: {0}")]
    Service(String),
}

/// Receives measurements handed off to the cost estimate
pub trait EstimateSink {
    fn add_to_estimate(&mut self, ids: &[MeasurementId]) -> Result<(), EstimateError>;
}

/// Resolves a building-code reference from a zone and its materials
pub trait ComplianceLookup {
    fn fetch_code(
        &self,
        area: Option<&str>,
        materials: &BTreeSet<String>,
    ) -> Result<String, LookupError>;
}

/// Filtered rows partitioned by zone
#[derive(Debug, Default)]
pub struct GroupedRows<'a> {
    /// Zone name to rows, ordered by name
    pub zones: BTreeMap<String, Vec<&'a Measurement>>,
    pub unassigned: Vec<&'a Measurement>,
}

/// Transient state of the measurement review table
#[derive(Debug, Clone, Default)]
pub struct ReviewTable {
    query: String,
    group_by_area: bool,
    selected: BTreeSet<MeasurementId>,
    expanded: BTreeSet<MeasurementId>,
}

impl ReviewTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn group_by_area(&self) -> bool {
        self.group_by_area
    }

    pub fn set_group_by_area(&mut self, enabled: bool) {
        self.group_by_area = enabled;
    }

    /// Rows matching the query, in document order
    pub fn filtered<'a>(&self, document: &'a MeasurementDocument) -> Vec<&'a Measurement> {
        document
            .iter()
            .filter(|m| m.matches_query(&self.query))
            .collect()
    }

    /// Filtered rows grouped by zone
    pub fn grouped<'a>(&self, document: &'a MeasurementDocument) -> GroupedRows<'a> {
        let mut groups = GroupedRows::default();
        for m in self.filtered(document) {
            match m.area() {
                Some(area) => groups.zones.entry(area.to_string()).or_default().push(m),
                None => groups.unassigned.push(m),
            }
        }
        groups
    }

    /// Net total per unit over the whole document, ignoring the query
    pub fn totals(&self, document: &MeasurementDocument) -> BTreeMap<QuantityUnit, f64> {
        let mut totals = BTreeMap::new();
        for m in document.iter() {
            *totals.entry(m.unit()).or_insert(0.0) += m.signed_value();
        }
        totals
    }

    pub fn is_selected(&self, id: MeasurementId) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected(&self) -> &BTreeSet<MeasurementId> {
        &self.selected
    }

    /// Flip one row's selection; returns the new state
    pub fn toggle_selected(&mut self, id: MeasurementId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// Select every row currently visible under the query
    pub fn select_all_filtered(&mut self, document: &MeasurementDocument) {
        let ids: Vec<MeasurementId> = self.filtered(document).iter().map(|m| m.id()).collect();
        self.selected.extend(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Send the selection to the estimate and clear it
    ///
    /// Ids are passed in document order without duplicates; rows that no
    /// longer exist are dropped. The selection survives a sink failure.
    pub fn hand_off(
        &mut self,
        document: &MeasurementDocument,
        sink: &mut dyn EstimateSink,
    ) -> Result<Vec<MeasurementId>, EstimateError> {
        let mut seen = HashSet::new();
        let ids: Vec<MeasurementId> = document
            .iter()
            .map(|m| m.id())
            .filter(|id| self.selected.contains(id) && seen.insert(*id))
            .collect();
        if ids.is_empty() {
            self.selected.clear();
            return Ok(ids);
        }
        sink.add_to_estimate(&ids)?;
        self.selected.clear();
        Ok(ids)
    }

    pub fn is_expanded(&self, id: MeasurementId) -> bool {
        self.expanded.contains(&id)
    }

    /// Show or hide the material picker for a row
    pub fn toggle_expanded(&mut self, id: MeasurementId) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    /// Forget rows that left the document
    pub fn retain_existing(&mut self, document: &MeasurementDocument) {
        self.selected.retain(|id| document.get(*id).is_some());
        self.expanded.retain(|id| document.get(*id).is_some());
    }
}

/// Rename a row
pub fn rename(label: impl Into<String>) -> MeasurementUpdate {
    MeasurementUpdate::label(label)
}

/// Record a different unit; the value is not recomputed
pub fn reassign_unit(unit: QuantityUnit) -> MeasurementUpdate {
    MeasurementUpdate::unit(unit)
}

/// Flip the validated flag
pub fn toggle_validated(measurement: &Measurement) -> MeasurementUpdate {
    MeasurementUpdate::validated(!measurement.is_validated())
}

/// Add or remove one material tag
pub fn toggle_material(measurement: &Measurement, material: &str) -> MeasurementUpdate {
    let mut materials = measurement.materials().clone();
    if !materials.remove(material) {
        materials.insert(material.to_string());
    }
    MeasurementUpdate {
        materials: Some(materials),
        ..MeasurementUpdate::default()
    }
}

/// Look up the compliance code for a row
pub fn fetch_compliance_code(
    measurement: &Measurement,
    lookup: &dyn ComplianceLookup,
) -> Result<MeasurementUpdate, LookupError> {
    let code = lookup.fetch_code(measurement.area(), measurement.materials())?;
    Ok(MeasurementUpdate::ncc_code(Some(code)))
}
