//! The heartbeat: periodic stale-lead sweep plus threshold calibration.
//!
//! The decision core never schedules anything itself; this loop is the
//! host-side driver that feeds it wall-clock time on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use leadgate_store::{AuditStore, CorrectionStore, LeadStore};

use crate::service::QualificationService;

/// Run driver cycles on the configured cadence. `max_cycles` bounds the
/// loop for demos and tests; `None` runs until the task is dropped.
pub async fn run_driver<S>(service: Arc<QualificationService<S>>, max_cycles: Option<u64>)
where
    S: LeadStore + CorrectionStore + AuditStore,
{
    let period = Duration::from_secs(service.config().driver_interval_secs);
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately: calibrate once at startup.
    let mut cycles = 0u64;

    loop {
        ticker.tick().await;
        let now = Utc::now();
        match service.drive(now) {
            Ok(report) => {
                info!(
                    stale = report.stale_leads,
                    green = report.calibration.green_threshold,
                    yellow = report.calibration.yellow_threshold,
                    rejection_rate = report.calibration.rejection_rate_24h,
                    adjustments = report.calibration.adjustment_count,
                    "driver cycle complete"
                );
            }
            // A failed cycle must not stop the heartbeat; the next tick
            // retries against fresh state.
            Err(err) => error!(%err, "driver cycle failed"),
        }

        cycles += 1;
        if let Some(max) = max_cycles {
            if cycles >= max {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leadgate_engine::PolicySet;
    use leadgate_protocol::ServiceConfig;
    use leadgate_store::MemoryStore;

    #[tokio::test]
    async fn test_driver_runs_bounded_cycles() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let config = ServiceConfig {
            driver_interval_secs: 1,
            ..Default::default()
        };
        let service = Arc::new(QualificationService::new(
            Arc::new(MemoryStore::new()),
            PolicySet::new(Vec::new()).unwrap(),
            config,
            now,
        ));

        // Paused time auto-advances through the interval ticks.
        tokio::time::pause();
        run_driver(Arc::clone(&service), Some(3)).await;

        // Three cycles ran; with no corrections the thresholds stay put.
        let snapshot = service.calibration().snapshot();
        assert_eq!(snapshot.adjustment_count, 0);
        assert!(snapshot.is_monotonic());
    }
}
