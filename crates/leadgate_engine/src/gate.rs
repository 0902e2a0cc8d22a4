//! Gate classification: confidence score -> traffic-light tier.

use leadgate_protocol::{CalibrationState, GateLevel};

/// Classify a confidence score against the live thresholds.
///
/// Pure and total: no side effects, never panics. A threshold pair that
/// violates the monotonic invariant is clamped (`yellow = min(yellow,
/// green)`) rather than rejected, and a NaN confidence falls through both
/// comparisons to Red, so a broken upstream can only ever make the system
/// more cautious.
pub fn classify(confidence: f64, calibration: &CalibrationState) -> GateLevel {
    let green = calibration.green_threshold;
    let yellow = calibration.yellow_threshold.min(green);

    if confidence >= green {
        GateLevel::Green
    } else if confidence >= yellow {
        GateLevel::Yellow
    } else {
        GateLevel::Red
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn calibration(green: f64, yellow: f64) -> CalibrationState {
        CalibrationState {
            green_threshold: green,
            yellow_threshold: yellow,
            rejection_rate_24h: 0.0,
            adjustment_count: 0,
            last_calibrated_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_bands_at_reference_defaults() {
        let cal = calibration(0.85, 0.60);
        assert_eq!(classify(0.92, &cal), GateLevel::Green);
        assert_eq!(classify(0.85, &cal), GateLevel::Green);
        assert_eq!(classify(0.72, &cal), GateLevel::Yellow);
        assert_eq!(classify(0.60, &cal), GateLevel::Yellow);
        assert_eq!(classify(0.45, &cal), GateLevel::Red);
    }

    #[test]
    fn test_monotonic_in_confidence() {
        let cal = calibration(0.85, 0.60);
        let mut last = GateLevel::Red;
        for step in 0..=100 {
            let gate = classify(step as f64 / 100.0, &cal);
            assert!(gate >= last, "gate dropped at confidence {}", step);
            last = gate;
        }
    }

    #[test]
    fn test_inverted_thresholds_clamped() {
        // yellow above green must not open a band where YELLOW outranks GREEN
        let cal = calibration(0.70, 0.90);
        assert_eq!(classify(0.80, &cal), GateLevel::Green);
        assert_eq!(classify(0.65, &cal), GateLevel::Red);
    }

    #[test]
    fn test_nan_classifies_red() {
        let cal = calibration(0.85, 0.60);
        assert_eq!(classify(f64::NAN, &cal), GateLevel::Red);
    }
}
