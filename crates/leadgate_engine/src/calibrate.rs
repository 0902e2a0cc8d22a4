//! Threshold self-calibration.
//!
//! A clamped feedback controller over the trailing 24h correction record:
//! humans rejecting too many automated decisions tightens the gate
//! thresholds; a quiet correction log relaxes them back toward the
//! configured floors. The live state is published as a whole snapshot so a
//! concurrent classifier read can never observe half of an update.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use leadgate_protocol::{CalibrationConfig, CalibrationState};

/// One calibration cycle, as a pure function. Never errors: every numeric
/// edge case clamps, so the feedback loop cannot wedge the pipeline.
pub fn calibration_step(
    config: &CalibrationConfig,
    current: CalibrationState,
    corrections_24h: u64,
    leads_created_24h: u64,
    now: DateTime<Utc>,
) -> CalibrationState {
    let rejection_rate = corrections_24h as f64 / leads_created_24h.max(1) as f64;

    let mut next = current;
    next.rejection_rate_24h = rejection_rate;
    next.last_calibrated_at = now;

    if rejection_rate > config.tighten_trigger {
        // Too many false positives - tighten both thresholds.
        next.green_threshold =
            (current.green_threshold + config.tighten_step).min(config.green_ceiling);
        next.yellow_threshold =
            (current.yellow_threshold + config.tighten_step).min(config.yellow_ceiling);
        next.adjustment_count = current.adjustment_count + 1;
        info!(
            rejection_rate,
            green = next.green_threshold,
            yellow = next.yellow_threshold,
            "high rejection rate: tightened gate thresholds"
        );
    } else if rejection_rate < config.relax_trigger
        && (current.green_threshold > config.green_floor
            || current.yellow_threshold > config.yellow_floor)
    {
        next.green_threshold =
            (current.green_threshold - config.relax_step).max(config.green_floor);
        next.yellow_threshold =
            (current.yellow_threshold - config.relax_step).max(config.yellow_floor);
        info!(
            rejection_rate,
            green = next.green_threshold,
            yellow = next.yellow_threshold,
            "low rejection rate: relaxed gate thresholds"
        );
    } else {
        debug!(rejection_rate, "calibration cycle: no threshold change");
    }

    // Monotonic invariant holds by construction above, but re-assert before
    // publishing: a crossed pair must never escape the calibrator.
    next.yellow_threshold = next.yellow_threshold.min(next.green_threshold);
    next
}

/// Owner of the single live `CalibrationState`.
///
/// Writers replace the whole snapshot under the lock; readers copy it out.
/// Cloning the handle shares the same state.
#[derive(Clone)]
pub struct CalibrationHandle {
    config: CalibrationConfig,
    state: Arc<RwLock<CalibrationState>>,
}

impl CalibrationHandle {
    pub fn new(config: CalibrationConfig, now: DateTime<Utc>) -> Self {
        let state = CalibrationState {
            green_threshold: config.initial_green,
            yellow_threshold: config.initial_yellow.min(config.initial_green),
            rejection_rate_24h: 0.0,
            adjustment_count: 0,
            last_calibrated_at: now,
        };
        Self {
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// A consistent copy of the live state.
    pub fn snapshot(&self) -> CalibrationState {
        *self
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Run one cycle against the given 24h counts and publish the result.
    pub fn calibrate(
        &self,
        corrections_24h: u64,
        leads_created_24h: u64,
        now: DateTime<Utc>,
    ) -> CalibrationState {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        let next = calibration_step(&self.config, *guard, corrections_24h, leads_created_24h, now);
        *guard = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn handle() -> CalibrationHandle {
        CalibrationHandle::new(CalibrationConfig::default(), now())
    }

    #[test]
    fn test_high_rejection_rate_tightens() {
        let h = handle();
        // 12 corrections out of 100 leads = 12% rejection rate
        let state = h.calibrate(12, 100, now());
        assert!((state.green_threshold - 0.87).abs() < 1e-9);
        assert!((state.yellow_threshold - 0.62).abs() < 1e-9);
        assert_eq!(state.adjustment_count, 1);
        assert!((state.rejection_rate_24h - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_tightening_bounded_by_ceilings() {
        let h = handle();
        for _ in 0..20 {
            h.calibrate(50, 100, now());
        }
        let state = h.snapshot();
        assert!((state.green_threshold - 0.95).abs() < 1e-9);
        assert!((state.yellow_threshold - 0.75).abs() < 1e-9);
        assert_eq!(state.adjustment_count, 20);
    }

    #[test]
    fn test_low_rejection_relaxes_to_floor_only() {
        let h = handle();
        // Tighten away from the floors first
        h.calibrate(20, 100, now());
        // Then relax repeatedly
        for _ in 0..10 {
            h.calibrate(0, 100, now());
        }
        let state = h.snapshot();
        assert!((state.green_threshold - 0.85).abs() < 1e-9);
        assert!((state.yellow_threshold - 0.60).abs() < 1e-9);
    }

    #[test]
    fn test_at_floor_no_relaxation() {
        let h = handle();
        let before = h.snapshot();
        let after = h.calibrate(1, 100, now());
        assert_eq!(before.green_threshold, after.green_threshold);
        assert_eq!(before.yellow_threshold, after.yellow_threshold);
        assert_eq!(after.adjustment_count, 0);
    }

    #[test]
    fn test_mid_band_rate_is_stable() {
        let h = handle();
        let state = h.calibrate(5, 100, now());
        assert_eq!(state.green_threshold, 0.85);
        assert_eq!(state.yellow_threshold, 0.60);
        assert_eq!(state.adjustment_count, 0);
    }

    #[test]
    fn test_zero_leads_does_not_divide_by_zero() {
        let h = handle();
        let state = h.calibrate(3, 0, now());
        // 3 / max(0, 1) = 3.0 rejection rate -> tighten
        assert!(state.rejection_rate_24h > 1.0);
        assert_eq!(state.adjustment_count, 1);
    }

    #[test]
    fn test_invariant_for_any_cycle_sequence() {
        let h = handle();
        let cases: [(u64, u64); 7] = [
            (12, 100),
            (0, 100),
            (50, 50),
            (0, 0),
            (1, 100),
            (99, 100),
            (0, 1000),
        ];
        for (corrections, leads) in cases {
            let state = h.calibrate(corrections, leads, now());
            assert!(state.is_monotonic());
            assert!(state.green_threshold <= 0.95 && state.green_threshold >= 0.85);
            assert!(state.yellow_threshold <= 0.75 && state.yellow_threshold >= 0.60);
        }
    }

    #[test]
    fn test_snapshot_is_consistent_pair() {
        let h = handle();
        h.calibrate(12, 100, now());
        let snap = h.snapshot();
        assert!(snap.is_monotonic());
    }
}
