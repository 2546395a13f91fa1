//! Plan Takeoff Core Library
//!
//! Calibration, measurement and costing engine for construction plan takeoff.

pub mod calculator;
pub mod calibration;
pub mod config;
pub mod cost_link;
pub mod csv_export;
pub mod document;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod measurement;
pub mod page_load;
pub mod persistence;
pub mod review;
pub mod session;
pub mod units;
pub mod viewport;

pub use calculator::MeasuredValue;
pub use calibration::{
    Calibration, CalibrationError, CalibrationMap, CalibrationSource, ScalePreset,
    STANDARD_PRESETS,
};
pub use config::{ConfigError, TakeoffConfig};
pub use cost_link::{CostBook, CostItem, CostItemId, EstimateTotals, LinkOutcome};
pub use csv_export::{
    export_cost_items_csv, export_measurements_csv, CsvExportConfig, CsvExportError,
    CsvExportResult,
};
pub use document::{DocumentError, DocumentResult, MeasurementDocument, ZoneQuantity};
pub use geometry::{PlanPoint, ScreenPoint};
pub use history::History;
pub use interaction::{
    transition, BlockReason, Effect, InteractionEvent, InteractionMachine, InteractionState,
    PointerInput, PreviewShape, ShapeDraft, Tool, Transition, TransitionContext,
};
pub use measurement::{
    Measurement, MeasurementError, MeasurementId, MeasurementKind, MeasurementUpdate,
};
pub use page_load::{Completion, PageLoadState, PageLoader, RasterInfo, RenderTicket};
pub use persistence::{
    diff_store_ops, load_session, save_session, PersistenceError, PersistenceResult,
    SessionSnapshot, StoreOp, SESSION_FORMAT_VERSION,
};
pub use review::{
    ComplianceLookup, EstimateError, EstimateSink, GroupedRows, LookupError, ReviewTable,
};
pub use session::{
    Action, MeasurementRef, Outcome, PointerKind, SessionError, SessionResult, TakeoffSession,
};
pub use units::{format_quantity, LengthUnit, QuantityUnit};
pub use viewport::{Rotation, Transform, ViewportController};
