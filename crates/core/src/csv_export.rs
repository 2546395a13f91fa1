//! CSV export for measurements and cost items
//!
//! Produces flat tables for spreadsheets and estimating tools.

use crate::cost_link::CostItem;
use crate::geometry::{self, PlanPoint};
use crate::measurement::Measurement;
use crate::units::format_quantity;
use std::io::Write;

/// Error types for CSV export
#[derive(Debug, thiserror::Error)]
pub enum CsvExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CsvExportResult<T> = Result<T, CsvExportError>;

/// Configuration for CSV export
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,

    /// CSV delimiter character
    pub delimiter: u8,

    /// Export only measurements from specific pages (None = all pages)
    pub page_filter: Option<Vec<usize>>,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            include_headers: true,
            delimiter: b',',
            page_filter: None,
        }
    }
}

/// Export measurements to CSV format
///
/// CSV columns:
/// - ID: Unique measurement identifier
/// - Page: Page index (0-based)
/// - Type: Line, Rectangle, Polygon or Count
/// - Label: Row label
/// - Area: Zone name (if any)
/// - Value: Real-world value (LM, M² or EA)
/// - Unit: Quantity unit code
/// - Formatted: Value with unit at display precision
/// - Deduction: Whether the row is subtracted from its zone
/// - Materials: Semicolon-separated material tags
/// - NCC Code: Compliance code (if any)
/// - Validated: Whether the row has been checked
/// - Depth: Extrusion depth in metres (if any)
/// - Volume: Area × depth in M³ (if any)
/// - Cost Item: Linked cost item id (if any)
/// - Geometry: Serialized outline
/// - Label Position X / Y: Where the value label is drawn
/// - BBox Min X / Min Y / Max X / Max Y: Outline bounds in plan units
/// - Created: Creation timestamp (Unix milliseconds)
pub fn export_measurements_csv<W: Write>(
    writer: W,
    measurements: &[Measurement],
    config: &CsvExportConfig,
) -> CsvExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record([
            "ID",
            "Page",
            "Type",
            "Label",
            "Area",
            "Value",
            "Unit",
            "Formatted",
            "Deduction",
            "Materials",
            "NCC Code",
            "Validated",
            "Depth",
            "Volume",
            "Cost Item",
            "Geometry",
            "Label Position X",
            "Label Position Y",
            "BBox Min X",
            "BBox Min Y",
            "BBox Max X",
            "BBox Max Y",
            "Created",
        ])?;
    }

    let rows = measurements.iter().filter(|m| match &config.page_filter {
        Some(pages) => pages.contains(&m.page_index()),
        None => true,
    });

    for measurement in rows {
        let label_pos = measurement.label_position();
        let (min_x, min_y, max_x, max_y) =
            geometry::bounding_box(measurement.points()).unwrap_or_default();

        csv_writer.write_record(&[
            measurement.id().to_string(),
            measurement.page_index().to_string(),
            measurement.kind().name().to_string(),
            measurement.label().to_string(),
            measurement.area().unwrap_or("").to_string(),
            measurement.real_value().to_string(),
            measurement.unit().label().to_string(),
            format_quantity(measurement.real_value(), measurement.unit()),
            measurement.is_deduction().to_string(),
            measurement
                .materials()
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(";"),
            measurement.ncc_code().unwrap_or("").to_string(),
            measurement.is_validated().to_string(),
            measurement
                .depth()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            measurement
                .volume()
                .map(|v| format!("{v:.3}"))
                .unwrap_or_default(),
            measurement
                .linked_cost_item()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            format_points(measurement.points()),
            label_pos.x.to_string(),
            label_pos.y.to_string(),
            min_x.to_string(),
            min_y.to_string(),
            max_x.to_string(),
            max_y.to_string(),
            measurement.timestamp().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Export cost items to CSV format
///
/// CSV columns:
/// - ID, Description, Quantity, Waste Factor, Unit Cost, Subtotal
/// - Labor Hours: Total hours for the current quantity
/// - Linked Measurements: Semicolon-separated measurement ids
pub fn export_cost_items_csv<W: Write>(
    writer: W,
    items: &[CostItem],
    config: &CsvExportConfig,
) -> CsvExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record([
            "ID",
            "Description",
            "Quantity",
            "Waste Factor",
            "Unit Cost",
            "Subtotal",
            "Labor Hours",
            "Linked Measurements",
        ])?;
    }

    for item in items {
        csv_writer.write_record(&[
            item.id.to_string(),
            item.description.clone(),
            format!("{:.2}", item.quantity),
            item.waste_factor.to_string(),
            format!("{:.2}", item.unit_cost),
            format!("{:.2}", item.subtotal),
            format!("{:.2}", item.total_labor_hours()),
            item.linked_measurements
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(";"),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Format an outline as a human-readable string
fn format_points(points: &[PlanPoint]) -> String {
    let inner = points
        .iter()
        .map(|p| format!("({:.2},{:.2})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{}]", inner)
}
