//! Canonical default values shared across the pipeline.

/// Gate thresholds at process start (also the calibration floors).
pub const DEFAULT_GREEN_THRESHOLD: f64 = 0.85;
pub const DEFAULT_YELLOW_THRESHOLD: f64 = 0.60;

/// Calibration bounds and steps.
pub const GREEN_THRESHOLD_CEILING: f64 = 0.95;
pub const YELLOW_THRESHOLD_CEILING: f64 = 0.75;
pub const GREEN_THRESHOLD_FLOOR: f64 = 0.85;
pub const YELLOW_THRESHOLD_FLOOR: f64 = 0.60;
pub const TIGHTEN_STEP: f64 = 0.02;
pub const RELAX_STEP: f64 = 0.01;

/// Rejection-rate triggers for the feedback controller.
pub const TIGHTEN_TRIGGER_RATE: f64 = 0.10;
pub const RELAX_TRIGGER_RATE: f64 = 0.02;

/// Identity resolution merge window.
pub const DEFAULT_MERGE_WINDOW_DAYS: i64 = 90;

/// Initial-confidence scoring weights (data completeness).
pub const BASE_CONFIDENCE: f64 = 0.5;
pub const PRODUCT_INTEREST_BONUS: f64 = 0.15;
pub const BUDGET_BONUS: f64 = 0.15;
pub const EMAIL_BONUS: f64 = 0.05;

/// Driver cadence and the trailing windows it sweeps.
pub const DEFAULT_DRIVER_INTERVAL_SECS: u64 = 60;
pub const CALIBRATION_WINDOW_HOURS: i64 = 24;
pub const STALE_AFTER_HOURS: i64 = 24;

/// Confidence forced onto a lead when a human escalates it.
pub const ESCALATION_CONFIDENCE: f64 = 0.4;

/// Finance-linked commission structure.
pub const FINANCE_BASE_RATE: f64 = 0.04;
pub const FINANCE_TOP_UP_RATE: f64 = 0.01;
pub const COMMISSION_TAX_RATE: f64 = 0.10;
