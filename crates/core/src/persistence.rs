//! Session persistence and the store outbox
//!
//! Whole sessions are saved as a single JSON file, written atomically through
//! a temporary file. Row-level persistence to an external store goes through
//! [`StoreOp`]s computed by diffing two measurement sets.

use crate::calibration::CalibrationMap;
use crate::cost_link::CostItem;
use crate::measurement::{Measurement, MeasurementId};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Current session file format
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported session format version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid session: {0}")]
    Invalid(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Row-level change for an external measurement store
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreOp {
    Upsert { measurement: Measurement },
    Delete { id: MeasurementId },
}

/// Operations that turn `before` into `after`
///
/// New or changed rows become upserts in `after` order, missing rows become
/// deletes in `before` order.
pub fn diff_store_ops(before: &[Measurement], after: &[Measurement]) -> Vec<StoreOp> {
    let previous: HashMap<MeasurementId, &Measurement> =
        before.iter().map(|m| (m.id(), m)).collect();
    let live: HashSet<MeasurementId> = after.iter().map(|m| m.id()).collect();

    let upserts = after
        .iter()
        .filter(|m| previous.get(&m.id()).map_or(true, |old| *old != *m))
        .map(|m| StoreOp::Upsert {
            measurement: m.clone(),
        });
    let deletes = before
        .iter()
        .filter(|m| !live.contains(&m.id()))
        .map(|m| StoreOp::Delete { id: m.id() });

    upserts.chain(deletes).collect()
}

/// Everything needed to resume a takeoff
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub page_count: usize,
    #[serde(default)]
    pub calibrations: CalibrationMap,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub cost_items: Vec<CostItem>,
}

impl SessionSnapshot {
    /// Check invariants that serde cannot enforce
    pub fn validate(&self) -> PersistenceResult<()> {
        if self.version != SESSION_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }
        for (page, calibration) in self.calibrations.iter() {
            let ppu = calibration.pixels_per_unit();
            if !(ppu.is_finite() && ppu > 0.0) {
                return Err(PersistenceError::Invalid(format!(
                    "page {page} calibration has scale {ppu}"
                )));
            }
        }
        let mut seen = HashSet::new();
        for m in &self.measurements {
            if !seen.insert(m.id()) {
                return Err(PersistenceError::Invalid(format!(
                    "duplicate measurement {}",
                    m.id()
                )));
            }
            if self.page_count > 0 && m.page_index() >= self.page_count {
                return Err(PersistenceError::Invalid(format!(
                    "measurement {} is on page {} of {}",
                    m.id(),
                    m.page_index(),
                    self.page_count
                )));
            }
        }
        Ok(())
    }
}

/// Save a session to `path`
///
/// The file is written to a sibling temporary path and renamed into place.
pub fn save_session(path: &Path, snapshot: &SessionSnapshot) -> PersistenceResult<()> {
    let json = serde_json::to_string_pretty(snapshot)?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;

    log::info!(
        "saved session with {} measurements to {}",
        snapshot.measurements.len(),
        path.display()
    );
    Ok(())
}

/// Load and validate a session from `path`
pub fn load_session(path: &Path) -> PersistenceResult<SessionSnapshot> {
    let json = fs::read_to_string(path)?;
    let snapshot: SessionSnapshot = serde_json::from_str(&json)?;
    snapshot.validate()?;
    Ok(snapshot)
}
