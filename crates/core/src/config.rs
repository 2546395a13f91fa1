//! Engine configuration
//!
//! Configuration can be loaded from a JSON file, from `TAKEOFF_*` environment
//! variables, or built programmatically. Missing keys fall back to defaults.

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::viewport::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for a takeoff session
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TakeoffConfig {
    /// Lower zoom bound
    pub min_zoom: f64,
    /// Upper zoom bound
    pub max_zoom: f64,
    /// Zoom change per wheel notch
    pub wheel_zoom_step: f64,
    /// Raster resolution in plan units per inch, used by preset scales
    pub render_dpi: f64,
    /// Snapshots kept for undo
    pub history_limit: usize,
    /// Screen distance within which clicking the first vertex closes a polygon
    pub polygon_close_tolerance_px: f64,
    pub reject_self_intersecting_polygons: bool,
    /// Waste factor given to new cost items
    pub default_waste_factor: f64,
}

impl Default for TakeoffConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            wheel_zoom_step: 0.1,
            render_dpi: 72.0,
            history_limit: DEFAULT_HISTORY_LIMIT,
            polygon_close_tolerance_px: 8.0,
            reject_self_intersecting_polygons: false,
            default_waste_factor: 1.0,
        }
    }
}

impl TakeoffConfig {
    pub fn with_zoom_bounds(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_render_dpi(mut self, dpi: f64) -> Self {
        self.render_dpi = dpi;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_polygon_close_tolerance(mut self, pixels: f64) -> Self {
        self.polygon_close_tolerance_px = pixels;
        self
    }

    pub fn with_reject_self_intersecting(mut self, reject: bool) -> Self {
        self.reject_self_intersecting_polygons = reject;
        self
    }

    pub fn with_default_waste_factor(mut self, factor: f64) -> Self {
        self.default_waste_factor = factor;
        self
    }

    /// Loads configuration from a JSON file and validates it.
    ///
    /// Expected file format:
    /// ```json
    /// { "render_dpi": 150.0, "history_limit": 50 }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TAKEOFF_MIN_ZOOM`, `TAKEOFF_MAX_ZOOM`
    /// - `TAKEOFF_WHEEL_ZOOM_STEP`
    /// - `TAKEOFF_RENDER_DPI`
    /// - `TAKEOFF_HISTORY_LIMIT`
    /// - `TAKEOFF_POLYGON_CLOSE_TOLERANCE_PX`
    /// - `TAKEOFF_REJECT_SELF_INTERSECTING` (`true`/`false`)
    /// - `TAKEOFF_DEFAULT_WASTE_FACTOR`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup` onto the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        read_var(&lookup, "TAKEOFF_MIN_ZOOM", &mut config.min_zoom)?;
        read_var(&lookup, "TAKEOFF_MAX_ZOOM", &mut config.max_zoom)?;
        read_var(&lookup, "TAKEOFF_WHEEL_ZOOM_STEP", &mut config.wheel_zoom_step)?;
        read_var(&lookup, "TAKEOFF_RENDER_DPI", &mut config.render_dpi)?;
        read_var(&lookup, "TAKEOFF_HISTORY_LIMIT", &mut config.history_limit)?;
        read_var(
            &lookup,
            "TAKEOFF_POLYGON_CLOSE_TOLERANCE_PX",
            &mut config.polygon_close_tolerance_px,
        )?;
        read_var(
            &lookup,
            "TAKEOFF_REJECT_SELF_INTERSECTING",
            &mut config.reject_self_intersecting_polygons,
        )?;
        read_var(
            &lookup,
            "TAKEOFF_DEFAULT_WASTE_FACTOR",
            &mut config.default_waste_factor,
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.min_zoom) {
            return Err(ConfigError::InvalidValue("min_zoom".to_string()));
        }
        if !positive(self.max_zoom) || self.max_zoom < self.min_zoom {
            return Err(ConfigError::InvalidValue("max_zoom".to_string()));
        }
        if !positive(self.wheel_zoom_step) {
            return Err(ConfigError::InvalidValue("wheel_zoom_step".to_string()));
        }
        if !positive(self.render_dpi) {
            return Err(ConfigError::InvalidValue("render_dpi".to_string()));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidValue("history_limit".to_string()));
        }
        if !(self.polygon_close_tolerance_px.is_finite() && self.polygon_close_tolerance_px >= 0.0)
        {
            return Err(ConfigError::InvalidValue(
                "polygon_close_tolerance_px".to_string(),
            ));
        }
        if !positive(self.default_waste_factor) {
            return Err(ConfigError::InvalidValue("default_waste_factor".to_string()));
        }
        Ok(())
    }
}

fn read_var<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
    }
    Ok(())
}
