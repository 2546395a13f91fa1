//! Takeoff session: the single owner of all engine state
//!
//! Every mutation goes through [`TakeoffSession::dispatch`]. Pointer input is
//! mapped to plan coordinates, run through the interaction state machine, and
//! the resulting effects are applied here: the viewport moves, calibrations
//! are installed, measurements are created, and cost items are resynced after
//! every structural change.

use crate::calculator;
use crate::calibration::{Calibration, CalibrationError, CalibrationMap, ScalePreset};
use crate::config::{ConfigError, TakeoffConfig};
use crate::cost_link::{CostBook, CostItem, CostItemId, EstimateTotals};
use crate::document::{DocumentError, MeasurementDocument};
use crate::geometry::{PlanPoint, ScreenPoint};
use crate::interaction::{
    BlockReason, Effect, InteractionEvent, InteractionMachine, InteractionState, PointerInput,
    PreviewShape, ShapeDraft, Tool, TransitionContext,
};
use crate::measurement::{Measurement, MeasurementId, MeasurementKind, MeasurementUpdate};
use crate::page_load::{Completion, PageLoader, RasterInfo, RenderTicket};
use crate::persistence::{diff_store_ops, SessionSnapshot, StoreOp, SESSION_FORMAT_VERSION};
use crate::review::{self, ComplianceLookup, EstimateError, EstimateSink, LookupError, ReviewTable};
use crate::units::{LengthUnit, QuantityUnit};
use crate::viewport::ViewportController;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Screen distance under which consecutive polygon vertices are merged
const VERTEX_MERGE_PX: f64 = 0.5;

/// Errors surfaced by [`TakeoffSession::dispatch`]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Estimate(#[from] EstimateError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("no plan is loaded")]
    NoPlan,

    #[error("no measurement at row {0}")]
    RowOutOfRange(usize),

    #[error("invalid cost item: {0}")]
    InvalidCostItem(String),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A measurement addressed by id or by its row in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MeasurementRef {
    Id(MeasurementId),
    Row(usize),
}

impl From<MeasurementId> for MeasurementRef {
    fn from(id: MeasurementId) -> Self {
        MeasurementRef::Id(id)
    }
}

/// Pointer phase of an [`Action::Pointer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    DoubleClick,
}

/// Everything a host can ask the session to do
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Open a plan; resets everything and requests page 0
    LoadPlan { page_count: usize },
    SetPage { page_index: usize },
    PageRendered {
        generation: u64,
        width: u32,
        height: u32,
    },
    PageRenderFailed { generation: u64, message: String },
    SelectTool { tool: Tool },
    /// Arm two-point calibration with the known real distance
    BeginCalibration {
        real_distance: f64,
        #[serde(default)]
        unit: LengthUnit,
    },
    CancelCalibration,
    /// Calibrate the current page from a paper scale such as "1:100"
    ApplyPresetScale { scale: String },
    ClearCalibration,
    /// Pointer input in screen pixels
    Pointer { kind: PointerKind, x: f64, y: f64 },
    /// Wheel input in notches
    Wheel { notches: f64 },
    Cancel,
    Undo,
    Redo,
    UpdateMeasurement {
        measurement: MeasurementRef,
        update: MeasurementUpdate,
    },
    DeleteMeasurement { measurement: MeasurementRef },
    /// Create a cost item, or edit one while keeping its links
    UpsertCostItem {
        #[serde(default)]
        id: Option<CostItemId>,
        description: String,
        unit_cost: f64,
        #[serde(default)]
        waste_factor: Option<f64>,
        #[serde(default)]
        labor_hours: f64,
    },
    RemoveCostItem { cost_item_id: CostItemId },
    LinkCost {
        measurement: MeasurementRef,
        cost_item_id: CostItemId,
    },
    UnlinkCost {
        measurement: MeasurementRef,
        cost_item_id: CostItemId,
    },
    ZoomBy { delta: f64 },
    PanBy { dx: f64, dy: f64 },
    RotateClockwise,
    RotateCounterClockwise,
}

/// What a dispatched action did
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Unchanged,
    RenderRequested {
        ticket: RenderTicket,
    },
    PageReady {
        page_index: usize,
    },
    RenderFailed {
        page_index: usize,
        message: String,
    },
    RenderStale,
    PageChanged {
        page_index: usize,
        calibrated: bool,
        ticket: RenderTicket,
    },
    ToolSelected {
        tool: Tool,
    },
    CalibrationArmed,
    Calibrated {
        page_index: usize,
        pixels_per_unit: f64,
        unit: LengthUnit,
    },
    CalibrationCleared {
        page_index: usize,
    },
    MeasurementAdded {
        id: MeasurementId,
        kind: MeasurementKind,
        label: String,
        real_value: f64,
        unit: QuantityUnit,
    },
    Blocked {
        reason: BlockReason,
    },
    MeasurementUpdated {
        id: MeasurementId,
    },
    MeasurementDeleted {
        id: MeasurementId,
    },
    HistoryMoved {
        moved: bool,
        measurements: usize,
    },
    CostItemSaved {
        id: CostItemId,
        quantity: f64,
        subtotal: f64,
    },
    CostItemRemoved {
        id: CostItemId,
    },
    Linked {
        cost_item_id: CostItemId,
        quantity: f64,
        subtotal: f64,
    },
    Unlinked {
        cost_item_id: CostItemId,
        measurement_id: MeasurementId,
    },
    ViewChanged {
        zoom: f64,
        pan_x: f64,
        pan_y: f64,
        rotation: u16,
    },
}

/// Distance and unit waiting for the two calibration picks
#[derive(Debug, Clone, Copy, PartialEq)]
struct CalibrationRequest {
    real_distance: f64,
    unit: LengthUnit,
}

/// Interactive takeoff over one plan
#[derive(Debug, Clone)]
pub struct TakeoffSession {
    config: TakeoffConfig,
    viewport: ViewportController,
    calibrations: CalibrationMap,
    interaction: InteractionMachine,
    pending_calibration: Option<CalibrationRequest>,
    preview: Option<PreviewShape>,
    document: MeasurementDocument,
    cost_book: CostBook,
    loader: PageLoader,
    review: ReviewTable,
    /// Measurement set as last drained through `take_store_ops`
    persisted: Vec<Measurement>,
}

impl Default for TakeoffSession {
    fn default() -> Self {
        Self::build(TakeoffConfig::default())
    }
}

impl TakeoffSession {
    /// Create a session after validating `config`
    pub fn new(config: TakeoffConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TakeoffConfig) -> Self {
        Self {
            viewport: ViewportController::new(config.min_zoom, config.max_zoom),
            calibrations: CalibrationMap::new(),
            interaction: InteractionMachine::new(),
            pending_calibration: None,
            preview: None,
            document: MeasurementDocument::new(config.history_limit),
            cost_book: CostBook::new(),
            loader: PageLoader::new(),
            review: ReviewTable::new(),
            persisted: Vec::new(),
            config,
        }
    }

    /// Rebuild a saved session; the first page render is requested
    pub fn from_snapshot(config: TakeoffConfig, snapshot: SessionSnapshot) -> SessionResult<Self> {
        let mut session = Self::new(config)?;
        session.load_plan(snapshot.page_count);
        session.calibrations = snapshot.calibrations;
        session.document =
            MeasurementDocument::from_measurements(snapshot.measurements, session.config.history_limit)?;
        session.cost_book = CostBook::from_items(snapshot.cost_items);
        session.cost_book.resync(&session.document);
        session.persisted = session.document.measurements().to_vec();
        Ok(session)
    }

    /// Capture the persistent part of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SESSION_FORMAT_VERSION,
            page_count: self.viewport.page_count(),
            calibrations: self.calibrations.clone(),
            measurements: self.document.measurements().to_vec(),
            cost_items: self.cost_book.items().to_vec(),
        }
    }

    /// Apply one action
    pub fn dispatch(&mut self, action: Action) -> SessionResult<Outcome> {
        match action {
            Action::LoadPlan { page_count } => Ok(self.load_plan(page_count)),
            Action::SetPage { page_index } => self.set_page(page_index),
            Action::PageRendered {
                generation,
                width,
                height,
            } => Ok(self.page_rendered(generation, RasterInfo { width, height })),
            Action::PageRenderFailed {
                generation,
                message,
            } => Ok(self.page_render_failed(generation, message)),
            Action::SelectTool { tool } => {
                let effects = self.interaction.set_tool(tool);
                self.pending_calibration = None;
                self.apply_effects(effects)?;
                Ok(Outcome::ToolSelected { tool })
            }
            Action::BeginCalibration {
                real_distance,
                unit,
            } => self.begin_calibration(real_distance, unit),
            Action::CancelCalibration => {
                if self.interaction.state().is_calibrating() {
                    let effects = self.interaction.reset();
                    self.apply_effects(effects)?;
                }
                self.pending_calibration = None;
                Ok(Outcome::Unchanged)
            }
            Action::ApplyPresetScale { scale } => self.apply_preset(&scale),
            Action::ClearCalibration => {
                self.require_plan()?;
                let page_index = self.viewport.page_index();
                match self.calibrations.clear(page_index) {
                    Some(_) => {
                        info!("cleared calibration of page {page_index}");
                        Ok(Outcome::CalibrationCleared { page_index })
                    }
                    None => Ok(Outcome::Unchanged),
                }
            }
            Action::Pointer { kind, x, y } => self.pointer(kind, ScreenPoint::new(x, y)),
            Action::Wheel { notches } => {
                let delta = notches * self.config.wheel_zoom_step;
                self.handle_event(InteractionEvent::Wheel { delta })
            }
            Action::Cancel => {
                if self.interaction.state().is_calibrating() {
                    self.pending_calibration = None;
                }
                self.handle_event(InteractionEvent::Cancel)
            }
            Action::Undo => {
                let moved = self.document.undo();
                Ok(self.history_moved(moved))
            }
            Action::Redo => {
                let moved = self.document.redo();
                Ok(self.history_moved(moved))
            }
            Action::UpdateMeasurement {
                measurement,
                update,
            } => self.update_measurement(measurement, update),
            Action::DeleteMeasurement { measurement } => {
                let id = self.resolve(measurement)?;
                self.document.delete(id)?;
                self.after_structural_change();
                Ok(Outcome::MeasurementDeleted { id })
            }
            Action::UpsertCostItem {
                id,
                description,
                unit_cost,
                waste_factor,
                labor_hours,
            } => self.upsert_cost_item(id, description, unit_cost, waste_factor, labor_hours),
            Action::RemoveCostItem { cost_item_id } => {
                match self.cost_book.remove(cost_item_id, &mut self.document) {
                    Some(_) => Ok(Outcome::CostItemRemoved { id: cost_item_id }),
                    None => {
                        warn!("remove ignored: cost item {cost_item_id} not found");
                        Ok(Outcome::Unchanged)
                    }
                }
            }
            Action::LinkCost {
                measurement,
                cost_item_id,
            } => {
                let Some(measurement_id) = self.lookup(measurement) else {
                    return Ok(Outcome::Unchanged);
                };
                Ok(
                    match self
                        .cost_book
                        .link(&mut self.document, measurement_id, cost_item_id)
                    {
                        Some(link) => Outcome::Linked {
                            cost_item_id: link.cost_item_id,
                            quantity: link.quantity,
                            subtotal: link.subtotal,
                        },
                        None => Outcome::Unchanged,
                    },
                )
            }
            Action::UnlinkCost {
                measurement,
                cost_item_id,
            } => {
                let Some(measurement_id) = self.lookup(measurement) else {
                    return Ok(Outcome::Unchanged);
                };
                if self
                    .cost_book
                    .unlink(&mut self.document, measurement_id, cost_item_id)
                {
                    Ok(Outcome::Unlinked {
                        cost_item_id,
                        measurement_id,
                    })
                } else {
                    Ok(Outcome::Unchanged)
                }
            }
            Action::ZoomBy { delta } => {
                self.viewport.zoom_by(delta);
                Ok(self.view_changed())
            }
            Action::PanBy { dx, dy } => {
                self.viewport.pan_by(dx, dy);
                Ok(self.view_changed())
            }
            Action::RotateClockwise => {
                self.viewport.rotate_clockwise();
                Ok(self.view_changed())
            }
            Action::RotateCounterClockwise => {
                self.viewport.rotate_counter_clockwise();
                Ok(self.view_changed())
            }
        }
    }

    fn load_plan(&mut self, page_count: usize) -> Outcome {
        self.viewport.load_plan(page_count);
        self.calibrations.reset();
        self.document = MeasurementDocument::new(self.config.history_limit);
        self.cost_book = CostBook::new();
        self.review = ReviewTable::new();
        self.interaction = InteractionMachine::new();
        self.pending_calibration = None;
        self.preview = None;
        self.persisted.clear();
        info!("loaded plan with {page_count} pages");

        if page_count == 0 {
            self.loader.reset();
            self.sync_drawing_gate();
            return Outcome::Unchanged;
        }
        let ticket = self.loader.request(0);
        self.sync_drawing_gate();
        Outcome::RenderRequested { ticket }
    }

    fn set_page(&mut self, index: usize) -> SessionResult<Outcome> {
        self.require_plan()?;
        let previous = self.viewport.page_index();
        let page_index = self.viewport.set_page(index);
        let failed = self.loader.error().is_some();
        if page_index == previous && !failed {
            return Ok(Outcome::Unchanged);
        }

        let effects = self.interaction.reset();
        self.pending_calibration = None;
        self.apply_effects(effects)?;

        let ticket = self.loader.request(page_index);
        self.sync_drawing_gate();
        let calibrated = self.calibrations.is_calibrated(page_index);
        debug!("switched to page {page_index} (calibrated: {calibrated})");
        Ok(Outcome::PageChanged {
            page_index,
            calibrated,
            ticket,
        })
    }

    fn page_rendered(&mut self, generation: u64, raster: RasterInfo) -> Outcome {
        let ticket = RenderTicket {
            generation,
            page_index: self.viewport.page_index(),
        };
        match self.loader.complete(ticket, raster) {
            Completion::Accepted => {
                self.sync_drawing_gate();
                Outcome::PageReady {
                    page_index: ticket.page_index,
                }
            }
            Completion::Stale => Outcome::RenderStale,
        }
    }

    fn page_render_failed(&mut self, generation: u64, message: String) -> Outcome {
        let ticket = RenderTicket {
            generation,
            page_index: self.viewport.page_index(),
        };
        match self.loader.fail(ticket, message.clone()) {
            Completion::Accepted => {
                self.sync_drawing_gate();
                Outcome::RenderFailed {
                    page_index: ticket.page_index,
                    message,
                }
            }
            Completion::Stale => Outcome::RenderStale,
        }
    }

    fn sync_drawing_gate(&mut self) {
        self.interaction
            .set_drawing_enabled(self.loader.drawing_enabled());
    }

    fn begin_calibration(&mut self, real_distance: f64, unit: LengthUnit) -> SessionResult<Outcome> {
        self.require_plan()?;
        if !(real_distance.is_finite() && real_distance > 0.0) {
            return Err(CalibrationError::NonPositiveDistance(real_distance).into());
        }
        let effects = self.interaction.begin_calibration();
        self.apply_effects(effects)?;
        self.pending_calibration = Some(CalibrationRequest {
            real_distance,
            unit,
        });
        Ok(Outcome::CalibrationArmed)
    }

    fn apply_preset(&mut self, scale: &str) -> SessionResult<Outcome> {
        self.require_plan()?;
        let preset: ScalePreset = scale.parse()?;
        let page_index = self.viewport.page_index();
        let calibration = self
            .calibrations
            .set_preset(page_index, preset, self.config.render_dpi)?;
        info!(
            "page {page_index} calibrated from {preset} at {} dpi",
            self.config.render_dpi
        );
        Ok(calibrated(page_index, &calibration))
    }

    fn pointer(&mut self, kind: PointerKind, screen: ScreenPoint) -> SessionResult<Outcome> {
        let input = PointerInput {
            screen,
            plan: self.viewport.screen_to_plan(screen),
        };
        let event = match kind {
            PointerKind::Down => InteractionEvent::PointerDown(input),
            PointerKind::Move => InteractionEvent::PointerMove(input),
            PointerKind::Up => InteractionEvent::PointerUp(input),
            PointerKind::DoubleClick => InteractionEvent::DoubleClick(input),
        };
        self.handle_event(event)
    }

    fn handle_event(&mut self, event: InteractionEvent) -> SessionResult<Outcome> {
        let ctx = self.transition_context();
        let effects = self.interaction.handle(ctx, &event);
        self.apply_effects(effects)
    }

    fn transition_context(&self) -> TransitionContext {
        TransitionContext {
            tool: self.interaction.tool(),
            calibrated: self.calibrations.is_calibrated(self.viewport.page_index()),
            drawing_enabled: self.loader.drawing_enabled(),
            close_tolerance: self
                .viewport
                .screen_distance_to_plan(self.config.polygon_close_tolerance_px),
            merge_tolerance: self.viewport.screen_distance_to_plan(VERTEX_MERGE_PX),
            reject_self_intersecting: self.config.reject_self_intersecting_polygons,
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> SessionResult<Outcome> {
        let mut outcome = Outcome::Unchanged;
        for effect in effects {
            match effect {
                Effect::PanBy { dx, dy } => {
                    self.viewport.pan_by(dx, dy);
                    outcome = self.view_changed();
                }
                Effect::ZoomBy { delta } => {
                    self.viewport.zoom_by(delta);
                    outcome = self.view_changed();
                }
                Effect::SetPreview(preview) => self.preview = preview,
                Effect::Calibrate { a, b } => outcome = self.calibrate(a, b)?,
                Effect::Finalize(draft) => outcome = self.finalize(draft)?,
                Effect::Blocked(reason) => {
                    debug!("input ignored: {reason:?}");
                    outcome = Outcome::Blocked { reason };
                }
            }
        }
        Ok(outcome)
    }

    fn calibrate(&mut self, a: PlanPoint, b: PlanPoint) -> SessionResult<Outcome> {
        let Some(request) = self.pending_calibration else {
            warn!("calibration points picked without a pending distance");
            return Ok(Outcome::Unchanged);
        };
        let page_index = self.viewport.page_index();
        match self
            .calibrations
            .set_manual(page_index, a, b, request.real_distance, request.unit)
        {
            Ok(calibration) => {
                self.pending_calibration = None;
                info!(
                    "page {page_index} calibrated at {:.4} per {}",
                    calibration.pixels_per_unit(),
                    calibration.unit().symbol()
                );
                Ok(calibrated(page_index, &calibration))
            }
            Err(err) => {
                // Stay armed so the user can pick again
                let effects = self.interaction.begin_calibration();
                self.apply_effects(effects)?;
                Err(err.into())
            }
        }
    }

    fn finalize(&mut self, draft: ShapeDraft) -> SessionResult<Outcome> {
        let page_index = self.viewport.page_index();
        let value = match draft.kind {
            MeasurementKind::Count => calculator::count(),
            kind => {
                let Some(calibration) = self.calibrations.get(page_index) else {
                    debug!("{kind:?} discarded: page {page_index} is not calibrated");
                    return Ok(Outcome::Blocked {
                        reason: BlockReason::Uncalibrated,
                    });
                };
                match (kind, draft.points.as_slice()) {
                    (MeasurementKind::Linear, [a, b]) => calculator::linear(*a, *b, calibration),
                    (MeasurementKind::Rectangle, [a, b]) => {
                        calculator::rectangle(*a, *b, calibration)
                    }
                    (MeasurementKind::Polygon, points) if points.len() >= 3 => {
                        calculator::polygon(points, calibration)
                    }
                    _ => {
                        return Ok(Outcome::Blocked {
                            reason: BlockReason::Degenerate,
                        })
                    }
                }
            }
        };

        let measurement = Measurement::new(draft.kind, draft.points, value, page_index)
            .map_err(DocumentError::from)?;
        let outcome = Outcome::MeasurementAdded {
            id: measurement.id(),
            kind: measurement.kind(),
            label: measurement.label().to_string(),
            real_value: measurement.real_value(),
            unit: measurement.unit(),
        };
        debug!("added {} on page {page_index}", measurement.label());
        self.document.add(measurement)?;
        Ok(outcome)
    }

    fn update_measurement(
        &mut self,
        measurement: MeasurementRef,
        update: MeasurementUpdate,
    ) -> SessionResult<Outcome> {
        let id = self.resolve(measurement)?;
        // Cost links only change through link/unlink
        let update = MeasurementUpdate {
            linked_cost_item: None,
            ..update
        };
        self.document.update(id, &update)?;
        self.cost_book.resync(&self.document);
        Ok(Outcome::MeasurementUpdated { id })
    }

    fn upsert_cost_item(
        &mut self,
        id: Option<CostItemId>,
        description: String,
        unit_cost: f64,
        waste_factor: Option<f64>,
        labor_hours: f64,
    ) -> SessionResult<Outcome> {
        let waste_factor = waste_factor.unwrap_or(self.config.default_waste_factor);
        if !(unit_cost.is_finite() && unit_cost >= 0.0) {
            return Err(SessionError::InvalidCostItem(format!("unit cost {unit_cost}")));
        }
        if !(waste_factor.is_finite() && waste_factor > 0.0) {
            return Err(SessionError::InvalidCostItem(format!(
                "waste factor {waste_factor}"
            )));
        }
        if !(labor_hours.is_finite() && labor_hours >= 0.0) {
            return Err(SessionError::InvalidCostItem(format!(
                "labour hours {labor_hours}"
            )));
        }

        let mut item = CostItem::new(description, unit_cost, waste_factor).with_labor_hours(labor_hours);
        if let Some(id) = id {
            item.id = id;
        }
        if let Some(existing) = self.cost_book.get(item.id) {
            item.linked_measurements = existing.linked_measurements.clone();
        }
        let id = self.cost_book.upsert(item, &self.document);
        let (quantity, subtotal) = self
            .cost_book
            .get(id)
            .map(|item| (item.quantity, item.subtotal))
            .unwrap_or_default();
        Ok(Outcome::CostItemSaved {
            id,
            quantity,
            subtotal,
        })
    }

    fn history_moved(&mut self, moved: bool) -> Outcome {
        if moved {
            self.after_structural_change();
        }
        Outcome::HistoryMoved {
            moved,
            measurements: self.document.len(),
        }
    }

    fn after_structural_change(&mut self) {
        self.cost_book.resync(&self.document);
        self.cost_book.restamp(&mut self.document);
        self.review.retain_existing(&self.document);
    }

    fn view_changed(&self) -> Outcome {
        let t = self.viewport.transform();
        Outcome::ViewChanged {
            zoom: t.zoom,
            pan_x: t.pan_x,
            pan_y: t.pan_y,
            rotation: t.rotation.degrees(),
        }
    }

    fn require_plan(&self) -> SessionResult<()> {
        if self.viewport.page_count() == 0 {
            return Err(SessionError::NoPlan);
        }
        Ok(())
    }

    fn resolve(&self, measurement: MeasurementRef) -> SessionResult<MeasurementId> {
        match measurement {
            MeasurementRef::Id(id) => Ok(id),
            MeasurementRef::Row(row) => self
                .document
                .measurements()
                .get(row)
                .map(|m| m.id())
                .ok_or(SessionError::RowOutOfRange(row)),
        }
    }

    fn lookup(&self, measurement: MeasurementRef) -> Option<MeasurementId> {
        match self.resolve(measurement) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("link ignored: {err}");
                None
            }
        }
    }

    /// Drain row changes since the last call for an external store
    pub fn take_store_ops(&mut self) -> Vec<StoreOp> {
        let ops = diff_store_ops(&self.persisted, self.document.measurements());
        self.persisted = self.document.measurements().to_vec();
        ops
    }

    /// Hand the review selection to the estimate
    pub fn hand_off(&mut self, sink: &mut dyn EstimateSink) -> SessionResult<Vec<MeasurementId>> {
        Ok(self.review.hand_off(&self.document, sink)?)
    }

    /// Look up and store the compliance code of one measurement
    pub fn fetch_compliance_code(
        &mut self,
        measurement: MeasurementRef,
        lookup: &dyn ComplianceLookup,
    ) -> SessionResult<Outcome> {
        let id = self.resolve(measurement)?;
        let row = self
            .document
            .get(id)
            .ok_or(DocumentError::NotFound(id))?;
        let update = review::fetch_compliance_code(row, lookup)?;
        self.document.update(id, &update)?;
        Ok(Outcome::MeasurementUpdated { id })
    }

    pub fn config(&self) -> &TakeoffConfig {
        &self.config
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn calibrations(&self) -> &CalibrationMap {
        &self.calibrations
    }

    /// Calibration of the page on screen
    pub fn current_calibration(&self) -> Option<&Calibration> {
        self.calibrations.get(self.viewport.page_index())
    }

    pub fn document(&self) -> &MeasurementDocument {
        &self.document
    }

    pub fn cost_book(&self) -> &CostBook {
        &self.cost_book
    }

    pub fn loader(&self) -> &PageLoader {
        &self.loader
    }

    /// Shape being drawn, if any
    pub fn preview(&self) -> Option<&PreviewShape> {
        self.preview.as_ref()
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn tool(&self) -> Tool {
        self.interaction.tool()
    }

    pub fn review(&self) -> &ReviewTable {
        &self.review
    }

    pub fn review_mut(&mut self) -> &mut ReviewTable {
        &mut self.review
    }

    /// Net quantity per unit over every measurement
    pub fn quantity_totals(&self) -> BTreeMap<QuantityUnit, f64> {
        self.review.totals(&self.document)
    }

    pub fn estimate_totals(&self) -> EstimateTotals {
        self.cost_book.totals()
    }
}

fn calibrated(page_index: usize, calibration: &Calibration) -> Outcome {
    Outcome::Calibrated {
        page_index,
        pixels_per_unit: calibration.pixels_per_unit(),
        unit: calibration.unit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn ready_session(page_count: usize) -> TakeoffSession {
        let mut session = TakeoffSession::default();
        session
            .dispatch(Action::LoadPlan { page_count })
            .unwrap();
        session
            .dispatch(Action::PageRendered {
                generation: 1,
                width: 1000,
                height: 800,
            })
            .unwrap();
        session
    }

    fn pointer(session: &mut TakeoffSession, kind: PointerKind, x: f64, y: f64) -> Outcome {
        session
            .dispatch(Action::Pointer { kind, x, y })
            .unwrap()
    }

    fn click(session: &mut TakeoffSession, x: f64, y: f64) -> Outcome {
        let down = pointer(session, PointerKind::Down, x, y);
        pointer(session, PointerKind::Up, x, y);
        down
    }

    fn drag(session: &mut TakeoffSession, from: (f64, f64), to: (f64, f64)) -> Outcome {
        pointer(session, PointerKind::Down, from.0, from.1);
        pointer(session, PointerKind::Move, to.0, to.1);
        pointer(session, PointerKind::Up, to.0, to.1)
    }

    /// 200 plan units = 10 m, i.e. 20 units per metre
    fn calibrate(session: &mut TakeoffSession) {
        session
            .dispatch(Action::BeginCalibration {
                real_distance: 10.0,
                unit: LengthUnit::Metre,
            })
            .unwrap();
        click(session, 0.0, 0.0);
        let outcome = click(session, 200.0, 0.0);
        assert!(matches!(outcome, Outcome::Calibrated { pixels_per_unit, .. } if approx(pixels_per_unit, 20.0)));
    }

    fn select(session: &mut TakeoffSession, tool: Tool) {
        session.dispatch(Action::SelectTool { tool }).unwrap();
    }

    fn added(outcome: &Outcome) -> (String, f64, QuantityUnit) {
        match outcome {
            Outcome::MeasurementAdded {
                label,
                real_value,
                unit,
                ..
            } => (label.clone(), *real_value, *unit),
            other => panic!("expected a measurement, got {other:?}"),
        }
    }

    #[test]
    fn test_calibrate_then_measure_line_rectangle_triangle() {
        let mut session = ready_session(1);
        calibrate(&mut session);
        assert_eq!(session.current_calibration().unwrap().pixels_per_unit(), 20.0);

        select(&mut session, Tool::Line);
        let (label, value, unit) = added(&drag(&mut session, (0.0, 0.0), (200.0, 0.0)));
        assert_eq!(label, "Line 10.00m");
        assert!(approx(value, 10.0));
        assert_eq!(unit, QuantityUnit::LinearMetre);

        select(&mut session, Tool::Rectangle);
        let (_, value, unit) = added(&drag(&mut session, (0.0, 0.0), (100.0, 40.0)));
        assert!(approx(value, 10.0));
        assert_eq!(unit, QuantityUnit::SquareMetre);

        select(&mut session, Tool::Polygon);
        click(&mut session, 0.0, 0.0);
        click(&mut session, 100.0, 0.0);
        click(&mut session, 50.0, 100.0);
        click(&mut session, 50.0, 100.0);
        let outcome = pointer(&mut session, PointerKind::DoubleClick, 50.0, 100.0);
        let (label, value, _) = added(&outcome);
        assert!(approx(value, 12.5));
        assert_eq!(label, "Polygon 12.50m²");

        assert_eq!(session.document().len(), 3);
        assert!(session.preview().is_none());
        assert!(approx(
            session.quantity_totals()[&QuantityUnit::SquareMetre],
            22.5
        ));
    }

    #[test]
    fn test_uncalibrated_finalize_is_noop() {
        let mut session = ready_session(1);
        select(&mut session, Tool::Line);
        let outcome = drag(&mut session, (0.0, 0.0), (100.0, 0.0));
        assert_eq!(
            outcome,
            Outcome::Blocked {
                reason: BlockReason::Uncalibrated
            }
        );
        assert!(session.document().is_empty());

        // Counting needs no calibration
        select(&mut session, Tool::Count);
        let (label, value, unit) = added(&click(&mut session, 10.0, 10.0));
        assert_eq!(label, "Count");
        assert_eq!(value, 1.0);
        assert_eq!(unit, QuantityUnit::Count);
    }

    #[test]
    fn test_calibration_is_per_page() {
        let mut session = ready_session(3);
        calibrate(&mut session);

        let outcome = session
            .dispatch(Action::SetPage { page_index: 1 })
            .unwrap();
        let Outcome::PageChanged {
            page_index,
            calibrated,
            ticket,
        } = outcome
        else {
            panic!("expected a page change, got {outcome:?}");
        };
        assert_eq!(page_index, 1);
        assert!(!calibrated);
        session
            .dispatch(Action::PageRendered {
                generation: ticket.generation,
                width: 1000,
                height: 800,
            })
            .unwrap();

        select(&mut session, Tool::Line);
        assert_eq!(
            drag(&mut session, (0.0, 0.0), (100.0, 0.0)),
            Outcome::Blocked {
                reason: BlockReason::Uncalibrated
            }
        );

        let back = session
            .dispatch(Action::SetPage { page_index: 0 })
            .unwrap();
        assert!(matches!(back, Outcome::PageChanged { page_index: 0, calibrated: true, .. }));

        let clamped = session
            .dispatch(Action::SetPage { page_index: 99 })
            .unwrap();
        assert!(matches!(clamped, Outcome::PageChanged { page_index: 2, .. }));
    }

    #[test]
    fn test_loading_gate_and_stale_renders() {
        let mut session = ready_session(2);
        session
            .dispatch(Action::SetPage { page_index: 1 })
            .unwrap();
        select(&mut session, Tool::Count);
        assert_eq!(*session.interaction_state(), InteractionState::Idle);

        assert_eq!(
            click(&mut session, 5.0, 5.0),
            Outcome::Blocked {
                reason: BlockReason::PageNotReady
            }
        );
        assert!(session.document().is_empty());
        assert!(matches!(
            session.dispatch(Action::Wheel { notches: 2.0 }).unwrap(),
            Outcome::ViewChanged { zoom, .. } if approx(zoom, 1.2)
        ));

        // Page 0's old render arrives late
        assert_eq!(
            session
                .dispatch(Action::PageRendered {
                    generation: 1,
                    width: 10,
                    height: 10
                })
                .unwrap(),
            Outcome::RenderStale
        );

        let failed = session
            .dispatch(Action::PageRenderFailed {
                generation: 2,
                message: "corrupt page".to_string(),
            })
            .unwrap();
        assert!(matches!(failed, Outcome::RenderFailed { page_index: 1, .. }));
        assert_eq!(session.loader().error(), Some("corrupt page"));
        assert!(matches!(
            click(&mut session, 5.0, 5.0),
            Outcome::Blocked {
                reason: BlockReason::PageNotReady
            }
        ));

        // Retrying the same page is allowed after a failure
        let retry = session
            .dispatch(Action::SetPage { page_index: 1 })
            .unwrap();
        assert!(matches!(retry, Outcome::PageChanged { ticket, .. } if ticket.generation == 3));

        session
            .dispatch(Action::PageRendered {
                generation: 3,
                width: 10,
                height: 10,
            })
            .unwrap();
        assert_eq!(*session.interaction_state(), InteractionState::PlacingCount);
    }

    #[test]
    fn test_calibration_errors_keep_mode_armed() {
        let mut session = ready_session(1);
        assert!(matches!(
            session.dispatch(Action::BeginCalibration {
                real_distance: 0.0,
                unit: LengthUnit::Metre
            }),
            Err(SessionError::Calibration(CalibrationError::NonPositiveDistance(_)))
        ));

        session
            .dispatch(Action::BeginCalibration {
                real_distance: 5.0,
                unit: LengthUnit::Metre,
            })
            .unwrap();
        click(&mut session, 10.0, 10.0);
        let err = session
            .dispatch(Action::Pointer {
                kind: PointerKind::Down,
                x: 10.0,
                y: 10.0,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Calibration(CalibrationError::CoincidentPoints)
        ));
        assert_eq!(
            *session.interaction_state(),
            InteractionState::CalibratingFirstPoint
        );
        assert!(session.current_calibration().is_none());

        pointer(&mut session, PointerKind::Up, 10.0, 10.0);
        click(&mut session, 0.0, 0.0);
        let outcome = click(&mut session, 100.0, 0.0);
        assert!(matches!(outcome, Outcome::Calibrated { pixels_per_unit, .. } if approx(pixels_per_unit, 20.0)));
    }

    #[test]
    fn test_preset_scale_and_clear() {
        let mut session = ready_session(1);
        let outcome = session
            .dispatch(Action::ApplyPresetScale {
                scale: "1:100".to_string(),
            })
            .unwrap();
        let expected = 72.0 / 0.0254 / 100.0;
        assert!(matches!(outcome, Outcome::Calibrated { pixels_per_unit, .. } if approx(pixels_per_unit, expected)));

        assert!(session
            .dispatch(Action::ApplyPresetScale {
                scale: "big".to_string()
            })
            .is_err());

        assert_eq!(
            session.dispatch(Action::ClearCalibration).unwrap(),
            Outcome::CalibrationCleared { page_index: 0 }
        );
        assert_eq!(
            session.dispatch(Action::ClearCalibration).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn test_actions_need_a_plan() {
        let mut session = TakeoffSession::default();
        assert!(matches!(
            session.dispatch(Action::SetPage { page_index: 1 }),
            Err(SessionError::NoPlan)
        ));
        assert!(matches!(
            session.dispatch(Action::ApplyPresetScale {
                scale: "1:50".to_string()
            }),
            Err(SessionError::NoPlan)
        ));
    }

    #[test]
    fn test_cost_link_follows_delete_and_undo() {
        let mut session = ready_session(1);
        calibrate(&mut session);
        select(&mut session, Tool::Polygon);
        for (x, y) in [(0.0, 0.0), (100.0, 0.0), (50.0, 100.0)] {
            click(&mut session, x, y);
        }
        pointer(&mut session, PointerKind::DoubleClick, 50.0, 100.0);

        let item_id = CostItemId::new_v4();
        session
            .dispatch(Action::UpsertCostItem {
                id: Some(item_id),
                description: "Floor tiles".to_string(),
                unit_cost: 40.0,
                waste_factor: Some(1.1),
                labor_hours: 0.0,
            })
            .unwrap();
        let linked = session
            .dispatch(Action::LinkCost {
                measurement: MeasurementRef::Row(0),
                cost_item_id: item_id,
            })
            .unwrap();
        assert!(matches!(linked, Outcome::Linked { quantity, .. } if approx(quantity, 13.75)));

        session
            .dispatch(Action::DeleteMeasurement {
                measurement: MeasurementRef::Row(0),
            })
            .unwrap();
        assert_eq!(session.cost_book().get(item_id).unwrap().quantity, 0.0);

        session.dispatch(Action::Undo).unwrap();
        let item = session.cost_book().get(item_id).unwrap();
        assert!(approx(item.quantity, 13.75));
        assert!(approx(item.subtotal, 550.0));

        // Editing the item keeps its links
        session
            .dispatch(Action::UpsertCostItem {
                id: Some(item_id),
                description: "Floor tiles".to_string(),
                unit_cost: 50.0,
                waste_factor: Some(1.0),
                labor_hours: 0.0,
            })
            .unwrap();
        assert!(approx(session.estimate_totals().subtotal, 625.0));

        // Unknown rows are a no-op
        assert_eq!(
            session
                .dispatch(Action::LinkCost {
                    measurement: MeasurementRef::Row(7),
                    cost_item_id: item_id,
                })
                .unwrap(),
            Outcome::Unchanged
        );
    }

    fn upsert_item(session: &mut TakeoffSession, description: &str) -> CostItemId {
        let id = CostItemId::new_v4();
        session
            .dispatch(Action::UpsertCostItem {
                id: Some(id),
                description: description.to_string(),
                unit_cost: 10.0,
                waste_factor: Some(1.0),
                labor_hours: 0.0,
            })
            .unwrap();
        id
    }

    fn link(session: &mut TakeoffSession, row: usize, cost_item_id: CostItemId) -> Outcome {
        session
            .dispatch(Action::LinkCost {
                measurement: MeasurementRef::Row(row),
                cost_item_id,
            })
            .unwrap()
    }

    #[test]
    fn test_relink_after_undo_costs_measurement_once() {
        let mut session = ready_session(1);
        select(&mut session, Tool::Count);
        click(&mut session, 1.0, 1.0);
        let first = upsert_item(&mut session, "Downlights");
        let second = upsert_item(&mut session, "Spotlights");
        link(&mut session, 0, first);

        click(&mut session, 5.0, 5.0);
        session.dispatch(Action::Undo).unwrap();
        assert_eq!(session.document().len(), 1);
        assert_eq!(
            session.document().measurements()[0].linked_cost_item(),
            Some(first)
        );

        link(&mut session, 0, second);
        assert_eq!(session.cost_book().get(first).unwrap().quantity, 0.0);
        assert_eq!(session.cost_book().get(second).unwrap().quantity, 1.0);
        assert!(approx(session.estimate_totals().subtotal, 10.0));

        // Redo brings back a snapshot stamped with the old item
        session.dispatch(Action::Redo).unwrap();
        assert_eq!(
            session.document().measurements()[0].linked_cost_item(),
            Some(second)
        );
        assert!(approx(session.estimate_totals().subtotal, 10.0));
    }

    struct RecordingSink {
        received: Vec<Vec<MeasurementId>>,
        fail: bool,
    }

    impl EstimateSink for RecordingSink {
        fn add_to_estimate(&mut self, ids: &[MeasurementId]) -> Result<(), EstimateError> {
            if self.fail {
                return Err(EstimateError::Unavailable("offline".to_string()));
            }
            self.received.push(ids.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_hand_off_sends_live_selection() {
        let mut session = ready_session(1);
        select(&mut session, Tool::Count);
        click(&mut session, 1.0, 1.0);
        click(&mut session, 2.0, 2.0);
        let ids: Vec<MeasurementId> = session.document().iter().map(|m| m.id()).collect();
        for id in &ids {
            session.review_mut().toggle_selected(*id);
        }
        session
            .dispatch(Action::DeleteMeasurement {
                measurement: MeasurementRef::Row(0),
            })
            .unwrap();

        let mut sink = RecordingSink {
            received: Vec::new(),
            fail: true,
        };
        assert!(matches!(
            session.hand_off(&mut sink),
            Err(SessionError::Estimate(EstimateError::Unavailable(_)))
        ));
        assert!(session.review().is_selected(ids[1]));

        sink.fail = false;
        assert_eq!(session.hand_off(&mut sink).unwrap(), vec![ids[1]]);
        assert_eq!(sink.received, vec![vec![ids[1]]]);
        assert!(session.review().selected().is_empty());
    }

    struct WetAreaLookup;

    impl ComplianceLookup for WetAreaLookup {
        fn fetch_code(
            &self,
            area: Option<&str>,
            materials: &std::collections::BTreeSet<String>,
        ) -> Result<String, LookupError> {
            match (area, materials.contains("Timber")) {
                (Some("Wet Area"), true) => Ok("F1.7".to_string()),
                _ => Err(LookupError::NotFound),
            }
        }
    }

    #[test]
    fn test_fetch_compliance_code_stores_code() {
        let mut session = ready_session(1);
        select(&mut session, Tool::Count);
        click(&mut session, 1.0, 1.0);

        assert!(matches!(
            session.fetch_compliance_code(MeasurementRef::Row(0), &WetAreaLookup),
            Err(SessionError::Lookup(LookupError::NotFound))
        ));
        assert_eq!(session.document().measurements()[0].ncc_code(), None);

        for update in [
            MeasurementUpdate::area(Some("Wet Area".to_string())),
            MeasurementUpdate::materials(["Timber"]),
        ] {
            session
                .dispatch(Action::UpdateMeasurement {
                    measurement: MeasurementRef::Row(0),
                    update,
                })
                .unwrap();
        }
        let id = session.document().measurements()[0].id();
        assert_eq!(
            session
                .fetch_compliance_code(MeasurementRef::Row(0), &WetAreaLookup)
                .unwrap(),
            Outcome::MeasurementUpdated { id }
        );
        assert_eq!(session.document().measurements()[0].ncc_code(), Some("F1.7"));
        assert!(matches!(
            session.fetch_compliance_code(MeasurementRef::Row(3), &WetAreaLookup),
            Err(SessionError::RowOutOfRange(3))
        ));
    }

    #[test]
    fn test_update_cannot_forge_cost_link() {
        let mut session = ready_session(1);
        select(&mut session, Tool::Count);
        click(&mut session, 1.0, 1.0);

        let update = MeasurementUpdate {
            label: Some("Downlight".to_string()),
            linked_cost_item: Some(Some(CostItemId::new_v4())),
            ..MeasurementUpdate::default()
        };
        session
            .dispatch(Action::UpdateMeasurement {
                measurement: MeasurementRef::Row(0),
                update,
            })
            .unwrap();
        let m = &session.document().measurements()[0];
        assert_eq!(m.label(), "Downlight");
        assert_eq!(m.linked_cost_item(), None);

        assert!(matches!(
            session.dispatch(Action::DeleteMeasurement {
                measurement: MeasurementRef::Row(4)
            }),
            Err(SessionError::RowOutOfRange(4))
        ));
    }

    #[test]
    fn test_store_ops_track_the_live_set() {
        let mut session = ready_session(1);
        select(&mut session, Tool::Count);
        click(&mut session, 1.0, 1.0);
        let id = session.document().measurements()[0].id();

        let ops = session.take_store_ops();
        assert!(matches!(ops.as_slice(), [StoreOp::Upsert { measurement }] if measurement.id() == id));
        assert!(session.take_store_ops().is_empty());

        session
            .dispatch(Action::UpdateMeasurement {
                measurement: id.into(),
                update: MeasurementUpdate::validated(true),
            })
            .unwrap();
        assert_eq!(session.take_store_ops().len(), 1);

        // The edit is not a history step, so undo drops the added row
        session.dispatch(Action::Undo).unwrap();
        assert_eq!(session.take_store_ops(), vec![StoreOp::Delete { id }]);
        session.dispatch(Action::Undo).unwrap();
        assert!(session.take_store_ops().is_empty());

        session.dispatch(Action::Redo).unwrap();
        assert!(matches!(
            session.take_store_ops().as_slice(),
            [StoreOp::Upsert { measurement }] if measurement.id() == id && !measurement.is_validated()
        ));
    }

    #[test]
    fn test_tool_change_discards_shape() {
        let mut session = ready_session(1);
        calibrate(&mut session);
        select(&mut session, Tool::Line);
        pointer(&mut session, PointerKind::Down, 0.0, 0.0);
        pointer(&mut session, PointerKind::Move, 50.0, 0.0);
        assert!(session.preview().is_some());

        select(&mut session, Tool::Rectangle);
        assert!(session.preview().is_none());
        assert_eq!(
            pointer(&mut session, PointerKind::Up, 90.0, 0.0),
            Outcome::Unchanged
        );
        assert!(session.document().is_empty());
    }

    #[test]
    fn test_panning_moves_viewport() {
        let mut session = ready_session(1);
        pointer(&mut session, PointerKind::Down, 10.0, 10.0);
        let outcome = pointer(&mut session, PointerKind::Move, 40.0, 30.0);
        assert!(matches!(outcome, Outcome::ViewChanged { pan_x, pan_y, .. } if pan_x == 30.0 && pan_y == 20.0));
        pointer(&mut session, PointerKind::Up, 40.0, 30.0);

        // Panned view maps screen back to the same plan point
        calibrate(&mut session);
        let cal = session.current_calibration().unwrap();
        match cal.source() {
            crate::calibration::CalibrationSource::TwoPoint { a, b, .. } => {
                assert_eq!(*a, PlanPoint::new(-30.0, -20.0));
                assert_eq!(*b, PlanPoint::new(170.0, -20.0));
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = ready_session(2);
        calibrate(&mut session);
        select(&mut session, Tool::Line);
        drag(&mut session, (0.0, 0.0), (200.0, 0.0));
        let item_id = CostItemId::new_v4();
        session
            .dispatch(Action::UpsertCostItem {
                id: Some(item_id),
                description: "Skirting".to_string(),
                unit_cost: 8.0,
                waste_factor: None,
                labor_hours: 0.25,
            })
            .unwrap();
        session
            .dispatch(Action::LinkCost {
                measurement: MeasurementRef::Row(0),
                cost_item_id: item_id,
            })
            .unwrap();

        let restored =
            TakeoffSession::from_snapshot(TakeoffConfig::default(), session.snapshot()).unwrap();
        assert_eq!(restored.document().measurements(), session.document().measurements());
        assert_eq!(restored.calibrations(), session.calibrations());
        assert_eq!(restored.estimate_totals(), session.estimate_totals());
        assert!(!restored.document().can_undo());
        assert!(restored.clone().take_store_ops().is_empty());
    }

    #[test]
    fn test_script_actions_deserialize() {
        let script = r#"[
            { "action": "load_plan", "page_count": 2 },
            { "action": "begin_calibration", "real_distance": 10.0 },
            { "action": "pointer", "kind": "double_click", "x": 1.5, "y": 2.0 },
            { "action": "link_cost", "measurement": 0,
              "cost_item_id": "00000000-0000-0000-0000-000000000001" },
            { "action": "update_measurement", "measurement": 1,
              "update": { "label": "Wall", "area": null } },
            { "action": "undo" }
        ]"#;
        let actions: Vec<Action> = serde_json::from_str(script).unwrap();
        assert_eq!(actions.len(), 6);
        assert_eq!(
            actions[1],
            Action::BeginCalibration {
                real_distance: 10.0,
                unit: LengthUnit::Metre
            }
        );
        assert!(matches!(
            actions[3],
            Action::LinkCost {
                measurement: MeasurementRef::Row(0),
                ..
            }
        ));
        let Action::UpdateMeasurement { update, .. } = &actions[4] else {
            panic!("expected an update");
        };
        assert_eq!(update.label.as_deref(), Some("Wall"));
        assert_eq!(update.area, Some(None));
        assert_eq!(actions[5], Action::Undo);
    }
}
