//! Length units for calibration and quantity units for measured values

use std::fmt;

/// Real-world length unit a calibration is expressed in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Millimetre,
    Centimetre,
    #[default]
    Metre,
    Inch,
    Foot,
    Yard,
}

/// Units offered by the calibration picker, in display order
pub const CALIBRATION_UNITS: [LengthUnit; 6] = [
    LengthUnit::Metre,
    LengthUnit::Millimetre,
    LengthUnit::Centimetre,
    LengthUnit::Foot,
    LengthUnit::Inch,
    LengthUnit::Yard,
];

impl LengthUnit {
    /// Number of metres in one of this unit
    pub fn metres(self) -> f64 {
        match self {
            LengthUnit::Millimetre => 0.001,
            LengthUnit::Centimetre => 0.01,
            LengthUnit::Metre => 1.0,
            LengthUnit::Inch => 0.0254,
            LengthUnit::Foot => 0.3048,
            LengthUnit::Yard => 0.9144,
        }
    }

    /// Short symbol (e.g. "m", "ft")
    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimetre => "mm",
            LengthUnit::Centimetre => "cm",
            LengthUnit::Metre => "m",
            LengthUnit::Inch => "in",
            LengthUnit::Foot => "ft",
            LengthUnit::Yard => "yd",
        }
    }

    /// Parse a unit symbol as typed into the calibration dialog
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        CALIBRATION_UNITS
            .iter()
            .copied()
            .find(|u| u.symbol().eq_ignore_ascii_case(symbol.trim()))
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unit of a measured quantity as surfaced to the estimate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum QuantityUnit {
    /// Linear metre
    #[serde(rename = "LM")]
    LinearMetre,
    /// Square metre
    #[serde(rename = "M2")]
    SquareMetre,
    /// Cubic metre
    #[serde(rename = "M3")]
    CubicMetre,
    /// Each (count)
    #[serde(rename = "EA")]
    Count,
}

impl QuantityUnit {
    /// Label shown to the user
    pub fn label(self) -> &'static str {
        match self {
            QuantityUnit::LinearMetre => "LM",
            QuantityUnit::SquareMetre => "M²",
            QuantityUnit::CubicMetre => "M³",
            QuantityUnit::Count => "EA",
        }
    }

    /// Suffix used in auto-generated labels ("Line 10.00m")
    pub fn short_suffix(self) -> &'static str {
        match self {
            QuantityUnit::LinearMetre => "m",
            QuantityUnit::SquareMetre => "m²",
            QuantityUnit::CubicMetre => "m³",
            QuantityUnit::Count => "",
        }
    }

    /// Decimal places used at presentation time
    pub fn display_precision(self) -> usize {
        match self {
            QuantityUnit::CubicMetre => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Format a stored value for display, e.g. "12.50 M²"
///
/// Stored values keep full precision; rounding happens only here.
pub fn format_quantity(value: f64, unit: QuantityUnit) -> String {
    format!(
        "{:.*} {}",
        unit.display_precision(),
        value,
        unit.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_unit_symbols() {
        for unit in CALIBRATION_UNITS {
            assert_eq!(LengthUnit::from_symbol(unit.symbol()), Some(unit));
        }
        assert_eq!(LengthUnit::from_symbol(" FT "), Some(LengthUnit::Foot));
        assert_eq!(LengthUnit::from_symbol("furlong"), None);
    }

    #[test]
    fn test_length_unit_metres() {
        assert_eq!(LengthUnit::Metre.metres(), 1.0);
        assert!((LengthUnit::Foot.metres() * 3.0 - LengthUnit::Yard.metres()).abs() < 1e-12);
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(10.0, QuantityUnit::LinearMetre), "10.00 LM");
        assert_eq!(format_quantity(12.5, QuantityUnit::SquareMetre), "12.50 M²");
        assert_eq!(format_quantity(1.23456, QuantityUnit::CubicMetre), "1.235 M³");
        assert_eq!(format_quantity(3.0, QuantityUnit::Count), "3.00 EA");
    }

    #[test]
    fn test_quantity_unit_serde_names() {
        let json = serde_json::to_string(&QuantityUnit::SquareMetre).unwrap();
        assert_eq!(json, "\"M2\"");
        let unit: QuantityUnit = serde_json::from_str("\"EA\"").unwrap();
        assert_eq!(unit, QuantityUnit::Count);
    }
}
