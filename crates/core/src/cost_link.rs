//! Cost-estimate line items driven by linked measurements
//!
//! A cost item's quantity is `waste_factor × Σ ±real_value` over the linked
//! measurements that still exist in the document, deductions subtracted.
//! With one link this is `real_value × waste_factor`. The item only stores
//! measurement ids; the document remains the owner of the measurements.

use crate::document::MeasurementDocument;
use crate::measurement::{MeasurementId, MeasurementUpdate};
use log::warn;
use std::collections::HashMap;

/// Unique identifier for cost items
pub type CostItemId = uuid::Uuid;

/// One estimate line
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CostItem {
    pub id: CostItemId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    pub waste_factor: f64,
    pub unit_cost: f64,
    /// Labour hours per unit of quantity
    #[serde(default)]
    pub labor_hours: f64,
    #[serde(default)]
    pub linked_measurements: Vec<MeasurementId>,
    #[serde(default)]
    pub subtotal: f64,
}

impl CostItem {
    /// Create an unlinked item
    pub fn new(description: impl Into<String>, unit_cost: f64, waste_factor: f64) -> Self {
        Self {
            id: CostItemId::new_v4(),
            description: description.into(),
            quantity: 0.0,
            waste_factor,
            unit_cost,
            labor_hours: 0.0,
            linked_measurements: Vec::new(),
            subtotal: 0.0,
        }
    }

    /// Set labour hours per unit
    pub fn with_labor_hours(mut self, labor_hours: f64) -> Self {
        self.labor_hours = labor_hours;
        self
    }

    /// Total labour for the current quantity
    pub fn total_labor_hours(&self) -> f64 {
        self.quantity * self.labor_hours
    }

    /// Recompute quantity and subtotal from the document
    fn recompute(&mut self, document: &MeasurementDocument) {
        let net: f64 = self
            .linked_measurements
            .iter()
            .filter_map(|id| document.get(*id))
            .map(|m| m.signed_value())
            .sum();
        self.quantity = net * self.waste_factor;
        self.subtotal = self.quantity * self.unit_cost;
    }
}

/// Sum over every item in the book
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimateTotals {
    pub subtotal: f64,
    pub labor_hours: f64,
    pub items: usize,
}

/// Result of a successful link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    pub cost_item_id: CostItemId,
    pub quantity: f64,
    pub subtotal: f64,
}

/// The estimate's cost items
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CostBook {
    items: Vec<CostItem>,
}

impl CostBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a book from saved items
    pub fn from_items(items: Vec<CostItem>) -> Self {
        Self { items }
    }

    /// Insert or replace an item by id, recomputing it against the document
    pub fn upsert(&mut self, mut item: CostItem, document: &MeasurementDocument) -> CostItemId {
        let id = item.id;
        if !item.linked_measurements.is_empty() {
            item.recompute(document);
        }
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        id
    }

    /// Remove an item; measurements pointing at it are unstamped
    pub fn remove(
        &mut self,
        id: CostItemId,
        document: &mut MeasurementDocument,
    ) -> Option<CostItem> {
        let index = self.items.iter().position(|i| i.id == id)?;
        let item = self.items.remove(index);
        for measurement_id in &item.linked_measurements {
            unstamp(document, *measurement_id, id);
        }
        Some(item)
    }

    pub fn get(&self, id: CostItemId) -> Option<&CostItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn items(&self) -> &[CostItem] {
        &self.items
    }

    /// Link a measurement to a cost item
    ///
    /// Missing ids are a silent no-op (logged). A measurement drives one cost
    /// item at a time: linking it elsewhere detaches it from the previous item.
    pub fn link(
        &mut self,
        document: &mut MeasurementDocument,
        measurement_id: MeasurementId,
        cost_item_id: CostItemId,
    ) -> Option<LinkOutcome> {
        if document.get(measurement_id).is_none() {
            warn!("link ignored: measurement {measurement_id} not found");
            return None;
        }
        if self.get(cost_item_id).is_none() {
            warn!("link ignored: cost item {cost_item_id} not found");
            return None;
        }

        // The book owns the links; the measurement stamp can lag behind undo
        for item in self
            .items
            .iter_mut()
            .filter(|i| i.id != cost_item_id && i.linked_measurements.contains(&measurement_id))
        {
            item.linked_measurements.retain(|id| *id != measurement_id);
            item.recompute(document);
        }

        let stamp = MeasurementUpdate {
            linked_cost_item: Some(Some(cost_item_id)),
            ..MeasurementUpdate::default()
        };
        // The measurement was found above, so the update cannot miss
        if let Err(err) = document.update(measurement_id, &stamp) {
            warn!("link ignored: {err}");
            return None;
        }

        let item = self.items.iter_mut().find(|i| i.id == cost_item_id)?;
        if !item.linked_measurements.contains(&measurement_id) {
            item.linked_measurements.push(measurement_id);
        }
        item.recompute(document);
        Some(LinkOutcome {
            cost_item_id,
            quantity: item.quantity,
            subtotal: item.subtotal,
        })
    }

    /// Detach a measurement from a cost item
    pub fn unlink(
        &mut self,
        document: &mut MeasurementDocument,
        measurement_id: MeasurementId,
        cost_item_id: CostItemId,
    ) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == cost_item_id) else {
            warn!("unlink ignored: cost item {cost_item_id} not found");
            return false;
        };
        let before = item.linked_measurements.len();
        item.linked_measurements.retain(|id| *id != measurement_id);
        if item.linked_measurements.len() == before {
            return false;
        }
        item.recompute(document);
        unstamp(document, measurement_id, cost_item_id);
        true
    }

    /// Recompute every linked item after the live set changed
    pub fn resync(&mut self, document: &MeasurementDocument) {
        for item in self
            .items
            .iter_mut()
            .filter(|i| !i.linked_measurements.is_empty())
        {
            item.recompute(document);
        }
    }

    /// Rewrite every live measurement's cost stamp from the book's links
    ///
    /// History snapshots carry the stamp as it was when they were taken, so
    /// this runs after undo and redo.
    pub fn restamp(&self, document: &mut MeasurementDocument) {
        let owners: HashMap<MeasurementId, CostItemId> = self
            .items
            .iter()
            .flat_map(|item| item.linked_measurements.iter().map(move |m| (*m, item.id)))
            .rev()
            .collect();
        let stale: Vec<(MeasurementId, Option<CostItemId>)> = document
            .iter()
            .map(|m| (m.id(), m.linked_cost_item(), owners.get(&m.id()).copied()))
            .filter(|(_, stamped, owner)| stamped != owner)
            .map(|(id, _, owner)| (id, owner))
            .collect();

        for (measurement_id, owner) in stale {
            let stamp = MeasurementUpdate {
                linked_cost_item: Some(owner),
                ..MeasurementUpdate::default()
            };
            if let Err(err) = document.update(measurement_id, &stamp) {
                warn!("failed to restamp cost link on {measurement_id}: {err}");
            }
        }
    }

    /// Totals across the book
    pub fn totals(&self) -> EstimateTotals {
        self.items
            .iter()
            .fold(EstimateTotals::default(), |mut acc, item| {
                acc.subtotal += item.subtotal;
                acc.labor_hours += item.total_labor_hours();
                acc.items += 1;
                acc
            })
    }
}

fn unstamp(document: &mut MeasurementDocument, measurement_id: MeasurementId, item: CostItemId) {
    let stamped = document
        .get(measurement_id)
        .is_some_and(|m| m.linked_cost_item() == Some(item));
    if stamped {
        let clear = MeasurementUpdate {
            linked_cost_item: Some(None),
            ..MeasurementUpdate::default()
        };
        if let Err(err) = document.update(measurement_id, &clear) {
            warn!("failed to clear cost link on {measurement_id}: {err}");
        }
    }
}
