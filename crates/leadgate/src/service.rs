//! The qualification service: pipeline operations over a pluggable store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use leadgate_engine::{
    apply_explicit, calibration_step, classify, resolve, transition, CalibrationHandle,
    DiscountCheck, PolicyContext, PolicySet, Resolution, ResolveOptions, ResolvedPolicy,
    TransitionOutcome, TransitionRequest,
};
use leadgate_protocol::{
    defaults, AuditAction, AuditEvent, CalibrationState, CorrectionEvent, GateLevel, Lead, LeadId,
    LeadState, Result, ServiceConfig, TransitionAction, Urgency,
};
use leadgate_store::{AuditStore, CorrectionStore, LeadStore};

/// Gate distribution for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCounts {
    pub green: u64,
    pub yellow: u64,
    pub red: u64,
}

/// Dashboard statistics. Gate counts are derived from the live calibration
/// snapshot at call time, never from stored gate fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_leads: u64,
    pub by_gate: GateCounts,
    pub by_state: HashMap<LeadState, u64>,
    pub today_leads: u64,
    pub avg_confidence: f64,
    pub conversion_rate: f64,
}

/// Outcome of one driver cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveReport {
    pub stale_leads: u64,
    pub calibration: CalibrationState,
}

/// Facade over the decision core and a host-provided store.
///
/// Multi-step mutations (find-then-insert, read-modify-write) run under a
/// single write lock so concurrent requests against the same lead cannot
/// interleave; the store's optimistic `updated_at` check backs this up for
/// hosts that bypass the facade.
pub struct QualificationService<S> {
    store: Arc<S>,
    policy: PolicySet,
    calibration: CalibrationHandle,
    config: ServiceConfig,
    write_lock: Mutex<()>,
}

impl<S> QualificationService<S>
where
    S: LeadStore + CorrectionStore + AuditStore,
{
    pub fn new(store: Arc<S>, policy: PolicySet, config: ServiceConfig, now: DateTime<Utc>) -> Self {
        let calibration = CalibrationHandle::new(config.calibration, now);
        Self {
            store,
            policy,
            calibration,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn calibration(&self) -> &CalibrationHandle {
        &self.calibration
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Both correction and audit stores expose `append`; go through the
    // trait explicitly.
    fn audit(&self, event: AuditEvent) -> Result<()> {
        AuditStore::append(self.store.as_ref(), event)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Create-or-merge an inbound contact.
    pub fn resolve_identity(
        &self,
        contact_key: &str,
        attrs: leadgate_protocol::LeadAttrs,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        let _guard = self.lock_writes();
        let opts = ResolveOptions::new(now).with_window_days(self.config.merge_window_days);
        let resolution = resolve(self.store.as_ref(), contact_key, attrs, opts)?;

        let action = if resolution.merged {
            AuditAction::LeadMerged
        } else {
            AuditAction::LeadCreated
        };
        self.audit(AuditEvent::for_lead(
            action,
            resolution.lead.id,
            format!("contact key {}", resolution.lead.contact_key),
            now,
        ))?;
        Ok(resolution)
    }

    // ------------------------------------------------------------------
    // Gates and transitions
    // ------------------------------------------------------------------

    /// Gate for a raw confidence score against the live thresholds.
    pub fn classify_gate(&self, confidence: f64) -> GateLevel {
        classify(confidence, &self.calibration.snapshot())
    }

    /// Gate for a stored lead, recomputed on read.
    pub fn gate_of(&self, lead: &Lead) -> GateLevel {
        self.classify_gate(lead.confidence_score)
    }

    /// Run one classified inbound event through the state machine and, on
    /// a true green outcome, persist the advance.
    pub fn transition(
        &self,
        lead_id: LeadId,
        request: &TransitionRequest,
        ctx: &PolicyContext,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let _guard = self.lock_writes();
        let mut lead = self.store.get(lead_id)?;
        let resolved = self.policy.resolve(ctx);
        let outcome = transition(&lead, request, &resolved, &self.calibration.snapshot())?;

        if outcome.action == TransitionAction::AutoProceed {
            let seen_at = lead.updated_at;
            outcome.apply_to(&mut lead, now);
            self.store.update(lead.clone(), seen_at)?;
            if outcome.advances() {
                self.audit(AuditEvent::for_lead(
                    AuditAction::StateChanged,
                    lead.id,
                    format!(
                        "{} -> {} ({} gate, {:.0}%)",
                        outcome.previous_state,
                        outcome.proposed_state,
                        outcome.gate,
                        outcome.confidence * 100.0
                    ),
                    now,
                ))?;
            }
        }
        Ok(outcome)
    }

    /// Apply a caller-specified transition, rejecting anything not on the
    /// adjacency list.
    pub fn apply_explicit_transition(
        &self,
        lead_id: LeadId,
        to: LeadState,
        now: DateTime<Utc>,
    ) -> Result<Lead> {
        let _guard = self.lock_writes();
        let mut lead = self.store.get(lead_id)?;
        let from = lead.state;
        let seen_at = lead.updated_at;
        apply_explicit(&mut lead, to, now)?;
        self.store.update(lead.clone(), seen_at)?;

        let action = if to == LeadState::Archived {
            AuditAction::LeadArchived
        } else {
            AuditAction::StateChanged
        };
        self.audit(AuditEvent::for_lead(
            action,
            lead.id,
            format!("{} -> {} (explicit)", from, to),
            now,
        ))?;
        Ok(lead)
    }

    /// Soft-delete: move the lead to Archived.
    pub fn archive(&self, lead_id: LeadId, now: DateTime<Utc>) -> Result<Lead> {
        self.apply_explicit_transition(lead_id, LeadState::Archived, now)
    }

    /// Hand a lead to a human: force the confidence below the yellow floor
    /// so every downstream read gates Red, and nudge brand-new leads to
    /// Contacted so they land in a worked queue.
    pub fn escalate(
        &self,
        lead_id: LeadId,
        reason: &str,
        urgency: Urgency,
        now: DateTime<Utc>,
    ) -> Result<Lead> {
        let _guard = self.lock_writes();
        let mut lead = self.store.get(lead_id)?;
        let seen_at = lead.updated_at;
        lead.confidence_score = defaults::ESCALATION_CONFIDENCE;
        if lead.state == LeadState::New {
            lead.state = LeadState::Contacted;
        }
        lead.updated_at = now;
        self.store.update(lead.clone(), seen_at)?;

        warn!(lead_id = %lead.id, reason, urgency = %urgency, "lead escalated");
        self.audit(AuditEvent::for_lead(
            AuditAction::EscalationTriggered,
            lead.id,
            format!("Escalated: {} (urgency: {})", reason, urgency),
            now,
        ))?;
        Ok(lead)
    }

    // ------------------------------------------------------------------
    // Corrections and calibration
    // ------------------------------------------------------------------

    /// Record a human override of an automated decision.
    pub fn record_correction(
        &self,
        lead_id: LeadId,
        field: &str,
        proposed_value: &str,
        human_value: &str,
        now: DateTime<Utc>,
    ) -> Result<CorrectionEvent> {
        // Confirm the lead exists so the correction log stays referential.
        let lead = self.store.get(lead_id)?;
        let event = CorrectionEvent::new(lead.id, field, proposed_value, human_value, now);
        CorrectionStore::append(self.store.as_ref(), event.clone())?;
        AuditStore::append(
            self.store.as_ref(),
            AuditEvent::for_lead(
                AuditAction::CorrectionRecorded,
                lead.id,
                format!("field {}: '{}' -> '{}'", field, proposed_value, human_value),
                now,
            ),
        )?;
        Ok(event)
    }

    /// One calibration cycle over the trailing 24h counts.
    pub fn calibrate(&self, now: DateTime<Utc>) -> Result<CalibrationState> {
        let cutoff = now - Duration::hours(defaults::CALIBRATION_WINDOW_HOURS);
        let corrections = CorrectionStore::count_since(self.store.as_ref(), cutoff)?;
        let leads = self.store.count_created_since(cutoff)?;
        Ok(self.calibration.calibrate(corrections, leads, now))
    }

    /// A calibration step against explicit counts, without publishing -
    /// lets operators preview the controller's reaction.
    pub fn preview_calibration(
        &self,
        corrections: u64,
        leads: u64,
        now: DateTime<Utc>,
    ) -> CalibrationState {
        calibration_step(
            self.calibration.config(),
            self.calibration.snapshot(),
            corrections,
            leads,
            now,
        )
    }

    // ------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------

    pub fn resolve_policy(&self, ctx: &PolicyContext) -> ResolvedPolicy {
        self.policy.resolve(ctx)
    }

    pub fn validate_discount(&self, model: &str, percent: f64) -> DiscountCheck {
        self.policy.validate_discount(model, percent)
    }

    pub fn check_constraints(&self, ctx: &PolicyContext) -> Result<()> {
        self.policy.check_constraints(ctx)
    }

    // ------------------------------------------------------------------
    // Dashboards and the driver cycle
    // ------------------------------------------------------------------

    /// Dashboard statistics over all non-archived leads.
    pub fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let leads = self.store.list_non_archived()?;
        let snapshot = self.calibration.snapshot();

        let mut by_gate = GateCounts::default();
        let mut by_state: HashMap<LeadState, u64> = HashMap::new();
        let mut confidence_sum = 0.0;
        let mut closed_won = 0u64;

        for lead in &leads {
            confidence_sum += lead.confidence_score;
            *by_state.entry(lead.state).or_default() += 1;
            match classify(lead.confidence_score, &snapshot) {
                GateLevel::Green => by_gate.green += 1,
                GateLevel::Yellow => by_gate.yellow += 1,
                GateLevel::Red => by_gate.red += 1,
            }
            if lead.state == LeadState::ClosedWon {
                closed_won += 1;
            }
        }

        let total = leads.len() as u64;
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            .unwrap_or(now);

        Ok(DashboardStats {
            total_leads: total,
            by_gate,
            by_state,
            today_leads: self.store.count_created_since(midnight)?,
            avg_confidence: if total > 0 {
                confidence_sum / total as f64
            } else {
                0.0
            },
            conversion_rate: if total > 0 {
                closed_won as f64 / total as f64
            } else {
                0.0
            },
        })
    }

    /// One driver cycle: sweep stale leads for follow-up, then calibrate.
    pub fn drive(&self, now: DateTime<Utc>) -> Result<DriveReport> {
        let cutoff = now - Duration::hours(self.config.stale_after_hours);
        let stale = self.store.list_stale(cutoff)?;
        if !stale.is_empty() {
            info!(count = stale.len(), "stale leads flagged for follow-up");
            for lead in &stale {
                warn!(lead_id = %lead.id, state = %lead.state, "lead stale, needs follow-up");
            }
        }

        let calibration = self.calibrate(now)?;
        Ok(DriveReport {
            stale_leads: stale.len() as u64,
            calibration,
        })
    }

    /// Recent audit trail, newest first.
    pub fn audit_trail(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        Ok(AuditStore::recent(self.store.as_ref(), limit)?)
    }
}

impl<S> std::fmt::Debug for QualificationService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualificationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leadgate_protocol::{LeadAttrs, LeadGateError};
    use leadgate_store::MemoryStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn service() -> QualificationService<MemoryStore> {
        QualificationService::new(
            Arc::new(MemoryStore::new()),
            PolicySet::new(Vec::new()).unwrap(),
            ServiceConfig::default(),
            now(),
        )
    }

    #[test]
    fn test_gate_uses_live_snapshot() {
        let svc = service();
        assert_eq!(svc.classify_gate(0.86), GateLevel::Green);

        // Tighten: 20% rejection rate moves green to 0.87
        svc.calibration().calibrate(20, 100, now());
        assert_eq!(svc.classify_gate(0.86), GateLevel::Yellow);
    }

    #[test]
    fn test_stats_empty_store() {
        let svc = service();
        let stats = svc.stats(now()).unwrap();
        assert_eq!(stats.total_leads, 0);
        assert_eq!(stats.avg_confidence, 0.0);
        assert_eq!(stats.conversion_rate, 0.0);
    }

    #[test]
    fn test_record_correction_requires_lead() {
        let svc = service();
        let err = svc
            .record_correction(LeadId::new(), "budget", "15000", "1500000", now())
            .unwrap_err();
        assert!(matches!(err, LeadGateError::Store(_)));
    }

    #[test]
    fn test_preview_does_not_publish() {
        let svc = service();
        let preview = svc.preview_calibration(20, 100, now());
        assert_eq!(preview.adjustment_count, 1);
        assert_eq!(svc.calibration().snapshot().adjustment_count, 0);
    }

    #[test]
    fn test_resolve_writes_audit_trail() {
        let svc = service();
        svc.resolve_identity(
            "+919876543210",
            LeadAttrs {
                name: Some("Rahul".to_string()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

        let trail = svc.audit_trail(10).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::LeadCreated);
    }
}
