//! Service configuration shared by the facade and the driver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults;

/// Bounds, steps and triggers for the threshold feedback controller.
///
/// The reference defaults are green 0.85 / yellow 0.60; the source systems
/// disagreed on the yellow floor, so both floors are configurable here
/// rather than hard-coded in the calibrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub initial_green: f64,
    pub initial_yellow: f64,
    pub green_floor: f64,
    pub yellow_floor: f64,
    pub green_ceiling: f64,
    pub yellow_ceiling: f64,
    pub tighten_step: f64,
    pub relax_step: f64,
    /// Rejection rate above which thresholds tighten.
    pub tighten_trigger: f64,
    /// Rejection rate below which thresholds relax toward the floors.
    pub relax_trigger: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            initial_green: defaults::DEFAULT_GREEN_THRESHOLD,
            initial_yellow: defaults::DEFAULT_YELLOW_THRESHOLD,
            green_floor: defaults::GREEN_THRESHOLD_FLOOR,
            yellow_floor: defaults::YELLOW_THRESHOLD_FLOOR,
            green_ceiling: defaults::GREEN_THRESHOLD_CEILING,
            yellow_ceiling: defaults::YELLOW_THRESHOLD_CEILING,
            tighten_step: defaults::TIGHTEN_STEP,
            relax_step: defaults::RELAX_STEP,
            tighten_trigger: defaults::TIGHTEN_TRIGGER_RATE,
            relax_trigger: defaults::RELAX_TRIGGER_RATE,
        }
    }
}

/// Canonical service configuration used by the facade and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Identity-resolution merge window in days.
    pub merge_window_days: i64,
    /// Driver loop cadence in seconds.
    pub driver_interval_secs: u64,
    /// Hours without an update before a lead counts as stale.
    pub stale_after_hours: i64,
    /// Optional path to a JSON policy rule set.
    pub rules_path: Option<PathBuf>,
    pub calibration: CalibrationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            merge_window_days: defaults::DEFAULT_MERGE_WINDOW_DAYS,
            driver_interval_secs: defaults::DEFAULT_DRIVER_INTERVAL_SECS,
            stale_after_hours: defaults::STALE_AFTER_HOURS,
            rules_path: None,
            calibration: CalibrationConfig::default(),
        }
    }
}
