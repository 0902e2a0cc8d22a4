//! In-memory reference backend.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use leadgate_protocol::{AuditEvent, CorrectionEvent, Lead, LeadId, LeadState, StoreError};

use crate::{AuditStore, CorrectionStore, LeadStore, StoreResult};

#[derive(Default)]
struct Inner {
    leads: HashMap<LeadId, Lead>,
    corrections: Vec<CorrectionEvent>,
    audits: Vec<AuditEvent>,
}

/// Mutex-guarded in-memory store implementing every persistence trait.
///
/// Each trait method is atomic under the single lock. Multi-step flows
/// (find then insert) are serialized by the facade, not here.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-write; the store holds plain
        // data so continuing with the recovered guard is sound.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LeadStore for MemoryStore {
    fn insert(&self, lead: Lead) -> StoreResult<()> {
        let mut inner = self.lock();
        debug!(lead_id = %lead.id, contact_key = %lead.contact_key, "insert lead");
        inner.leads.insert(lead.id, lead);
        Ok(())
    }

    fn get(&self, id: LeadId) -> StoreResult<Lead> {
        let inner = self.lock();
        inner.leads.get(&id).cloned().ok_or(StoreError::NotFound {
            entity: "Lead",
            id: id.to_string(),
        })
    }

    fn update(&self, lead: Lead, expected_updated_at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.lock();
        let existing = inner.leads.get(&lead.id).ok_or(StoreError::NotFound {
            entity: "Lead",
            id: lead.id.to_string(),
        })?;
        if existing.updated_at != expected_updated_at {
            return Err(StoreError::Conflict {
                entity: "Lead",
                id: lead.id.to_string(),
            });
        }
        inner.leads.insert(lead.id, lead);
        Ok(())
    }

    fn find_recent_by_contact(
        &self,
        contact_key: &str,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Option<Lead>> {
        let inner = self.lock();
        Ok(inner
            .leads
            .values()
            .filter(|l| {
                l.contact_key == contact_key
                    && l.state != LeadState::Archived
                    && l.created_at >= cutoff
            })
            .max_by_key(|l| l.created_at)
            .cloned())
    }

    fn count_created_since(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let inner = self.lock();
        Ok(inner
            .leads
            .values()
            .filter(|l| l.created_at >= cutoff)
            .count() as u64)
    }

    fn list_non_archived(&self) -> StoreResult<Vec<Lead>> {
        let inner = self.lock();
        let mut leads: Vec<Lead> = inner
            .leads
            .values()
            .filter(|l| l.state != LeadState::Archived)
            .cloned()
            .collect();
        leads.sort_by_key(|l| std::cmp::Reverse(l.updated_at));
        Ok(leads)
    }

    fn list_stale(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Lead>> {
        let inner = self.lock();
        Ok(inner
            .leads
            .values()
            .filter(|l| !l.state.is_closed() && l.updated_at <= cutoff)
            .cloned()
            .collect())
    }
}

impl CorrectionStore for MemoryStore {
    fn append(&self, event: CorrectionEvent) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.corrections.push(event);
        Ok(())
    }

    fn count_since(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let inner = self.lock();
        Ok(inner
            .corrections
            .iter()
            .filter(|c| c.created_at >= cutoff)
            .count() as u64)
    }
}

impl AuditStore for MemoryStore {
    fn append(&self, event: AuditEvent) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.audits.push(event);
        Ok(())
    }

    fn recent(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let inner = self.lock();
        Ok(inner.audits.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use leadgate_protocol::Market;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn lead(contact_key: &str, created_at: DateTime<Utc>) -> Lead {
        Lead {
            id: LeadId::new(),
            contact_key: contact_key.to_string(),
            name: "Test Lead".to_string(),
            market: Market::In,
            product_interest: None,
            budget: None,
            email: None,
            confidence_score: 0.5,
            state: LeadState::New,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = MemoryStore::new();
        let l = lead("+911111", now());
        let id = l.id;
        store.insert(l).unwrap();
        assert_eq!(store.get(id).unwrap().contact_key, "+911111");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get(LeadId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_update_conflict_on_stale_version() {
        let store = MemoryStore::new();
        let mut l = lead("+911111", now());
        store.insert(l.clone()).unwrap();

        let seen_at = l.updated_at;
        l.updated_at = now() + Duration::seconds(5);
        store.update(l.clone(), seen_at).unwrap();

        // Second writer still holds the original version
        l.name = "Other Writer".to_string();
        let err = store.update(l, seen_at).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_find_recent_by_contact_respects_window() {
        let store = MemoryStore::new();
        let old = lead("+911111", now() - Duration::days(120));
        let recent = lead("+911111", now() - Duration::days(10));
        let recent_id = recent.id;
        store.insert(old).unwrap();
        store.insert(recent).unwrap();

        let cutoff = now() - Duration::days(90);
        let found = store.find_recent_by_contact("+911111", cutoff).unwrap();
        assert_eq!(found.unwrap().id, recent_id);

        let tight_cutoff = now() - Duration::days(5);
        assert!(store
            .find_recent_by_contact("+911111", tight_cutoff)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_recent_skips_archived() {
        let store = MemoryStore::new();
        let mut l = lead("+911111", now());
        l.state = LeadState::Archived;
        store.insert(l).unwrap();

        let cutoff = now() - Duration::days(90);
        assert!(store
            .find_recent_by_contact("+911111", cutoff)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_stale_excludes_closed() {
        let store = MemoryStore::new();
        let stale = lead("+911111", now() - Duration::days(3));
        let mut won = lead("+922222", now() - Duration::days(3));
        won.state = LeadState::ClosedWon;
        store.insert(stale).unwrap();
        store.insert(won).unwrap();

        let cutoff = now() - Duration::days(1);
        let stale_leads = store.list_stale(cutoff).unwrap();
        assert_eq!(stale_leads.len(), 1);
        assert_eq!(stale_leads[0].contact_key, "+911111");
    }

    #[test]
    fn test_corrections_counted_in_window() {
        let store = MemoryStore::new();
        let l = lead("+911111", now());
        let lead_id = l.id;
        store.insert(l).unwrap();

        CorrectionStore::append(
            &store,
            CorrectionEvent::new(lead_id, "budget", "15000", "1500000", now()),
        )
        .unwrap();
        CorrectionStore::append(
            &store,
            CorrectionEvent::new(
                lead_id,
                "budget",
                "15000",
                "1500000",
                now() - Duration::days(2),
            ),
        )
        .unwrap();

        let cutoff = now() - Duration::days(1);
        assert_eq!(store.count_since(cutoff).unwrap(), 1);
    }
}
