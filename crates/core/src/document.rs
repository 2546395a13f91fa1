//! Measurement document: the ordered live set plus its undo history
//!
//! Structural changes (add, delete) push history snapshots. Enrichment
//! updates mutate the live set in place and are not undoable; an undo or redo
//! replaces the live set with the snapshot at the new cursor.

use crate::history::{History, DEFAULT_HISTORY_LIMIT};
use crate::measurement::{Measurement, MeasurementError, MeasurementId, MeasurementUpdate};
use crate::units::QuantityUnit;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Errors that can occur on document operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("measurement not found: {0}")]
    NotFound(MeasurementId),

    #[error("measurement already exists: {0}")]
    AlreadyExists(MeasurementId),

    #[error("invalid measurement: {0}")]
    Invalid(#[from] MeasurementError),
}

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Net quantity of one zone in one unit
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneQuantity {
    pub gross: f64,
    pub deductions: f64,
}

impl ZoneQuantity {
    /// Gross minus deductions
    pub fn net(&self) -> f64 {
        self.gross - self.deductions
    }
}

/// Owns every measurement of the open plan
#[derive(Debug, Clone)]
pub struct MeasurementDocument {
    measurements: Vec<Measurement>,
    history: History<Measurement>,
}

impl Default for MeasurementDocument {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl MeasurementDocument {
    /// Create an empty document keeping at most `history_limit` snapshots
    pub fn new(history_limit: usize) -> Self {
        Self {
            measurements: Vec::new(),
            history: History::new(&[], history_limit),
        }
    }

    /// Create a document from previously saved measurements
    ///
    /// The loaded set becomes the oldest history snapshot.
    pub fn from_measurements(
        measurements: Vec<Measurement>,
        history_limit: usize,
    ) -> DocumentResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for m in &measurements {
            if !m.kind().accepts_point_count(m.points().len()) {
                return Err(MeasurementError::PointCount {
                    kind: m.kind(),
                    count: m.points().len(),
                }
                .into());
            }
            if !seen.insert(m.id()) {
                return Err(DocumentError::AlreadyExists(m.id()));
            }
        }
        Ok(Self {
            history: History::new(&measurements, history_limit),
            measurements,
        })
    }

    /// Append a measurement and record a snapshot
    pub fn add(&mut self, measurement: Measurement) -> DocumentResult<MeasurementId> {
        let id = measurement.id();
        if self.get(id).is_some() {
            return Err(DocumentError::AlreadyExists(id));
        }
        self.measurements.push(measurement);
        self.history.push(&self.measurements);
        Ok(id)
    }

    /// Apply an enrichment update in place (not recorded in history)
    pub fn update(
        &mut self,
        id: MeasurementId,
        update: &MeasurementUpdate,
    ) -> DocumentResult<&Measurement> {
        let measurement = self
            .measurements
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or(DocumentError::NotFound(id))?;
        update.apply(measurement)?;
        Ok(measurement)
    }

    /// Remove a measurement and record a snapshot
    pub fn delete(&mut self, id: MeasurementId) -> DocumentResult<Measurement> {
        let index = self
            .measurements
            .iter()
            .position(|m| m.id() == id)
            .ok_or(DocumentError::NotFound(id))?;
        let removed = self.measurements.remove(index);
        self.history.push(&self.measurements);
        Ok(removed)
    }

    /// Restore the previous snapshot; false at the oldest one
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.measurements = snapshot.to_vec();
                true
            }
            None => false,
        }
    }

    /// Restore the next snapshot; false at the newest one
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.measurements = snapshot.to_vec();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Snapshot at the history cursor (shared, not copied)
    pub fn snapshot(&self) -> Arc<[Measurement]> {
        self.history.current()
    }

    /// Measurement by id
    pub fn get(&self, id: MeasurementId) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.id() == id)
    }

    /// All measurements in creation order
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Iterate in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }

    /// Measurements drawn on one page
    pub fn for_page(&self, page_index: usize) -> impl Iterator<Item = &Measurement> {
        self.measurements
            .iter()
            .filter(move |m| m.page_index() == page_index)
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Gross and deducted quantity per (zone, unit); unzoned rows use `None`
    pub fn net_by_zone(&self) -> BTreeMap<(Option<String>, QuantityUnit), ZoneQuantity> {
        let mut zones: BTreeMap<(Option<String>, QuantityUnit), ZoneQuantity> = BTreeMap::new();
        for m in &self.measurements {
            let entry = zones
                .entry((m.area().map(str::to_string), m.unit()))
                .or_insert(ZoneQuantity {
                    gross: 0.0,
                    deductions: 0.0,
                });
            if m.is_deduction() {
                entry.deductions += m.real_value();
            } else {
                entry.gross += m.real_value();
            }
        }
        zones
    }

    /// Drop everything including history (new plan loaded)
    pub fn reset(&mut self) {
        self.measurements.clear();
        self.history.reset(&[]);
    }
}
