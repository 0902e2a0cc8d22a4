//! Persistence seam for the qualification pipeline.
//!
//! The decision core never talks to a database directly - it reads and
//! writes entities through the object-safe traits defined here. Hosts plug
//! in their own durable backends; `MemoryStore` is the reference
//! implementation used by tests and the demo binary.

use chrono::{DateTime, Utc};

use leadgate_protocol::{AuditEvent, CorrectionEvent, Lead, LeadId, StoreError};

mod memory;

pub use memory::MemoryStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable lead storage.
///
/// `update` performs an optimistic-version check: the caller passes the
/// `updated_at` it read, and the backend must reject the write with
/// `StoreError::Conflict` if the stored row has moved on. This is how
/// concurrent mutations of the same lead are surfaced instead of lost.
pub trait LeadStore: Send + Sync {
    fn insert(&self, lead: Lead) -> StoreResult<()>;

    fn get(&self, id: LeadId) -> StoreResult<Lead>;

    /// Replace the stored lead if `expected_updated_at` still matches.
    fn update(&self, lead: Lead, expected_updated_at: DateTime<Utc>) -> StoreResult<()>;

    /// Most recent non-archived lead with this contact key created at or
    /// after `cutoff`. This is the merge-window lookup.
    fn find_recent_by_contact(
        &self,
        contact_key: &str,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Option<Lead>>;

    /// Number of leads created at or after `cutoff` (calibration input).
    fn count_created_since(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    fn list_non_archived(&self) -> StoreResult<Vec<Lead>>;

    /// Leads last touched before `cutoff` that are not closed - the
    /// follow-up sweep input.
    fn list_stale(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Lead>>;
}

/// Append-only correction log. Corrections are immutable once recorded;
/// the calibrator only ever reads them in aggregate.
pub trait CorrectionStore: Send + Sync {
    fn append(&self, event: CorrectionEvent) -> StoreResult<()>;

    /// Number of corrections recorded at or after `cutoff`.
    fn count_since(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// Append-only audit trail.
pub trait AuditStore: Send + Sync {
    fn append(&self, event: AuditEvent) -> StoreResult<()>;

    /// Most recent entries, newest first.
    fn recent(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;
}
