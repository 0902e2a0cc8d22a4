//! Identity resolution: create-or-merge by contact key.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use leadgate_protocol::{defaults, Lead, LeadAttrs, LeadGateError, LeadId, LeadState, Result};
use leadgate_store::LeadStore;

/// Options for a resolution call.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Trailing window inside which an existing contact is a continuation.
    pub window_days: i64,
    /// When false, an in-window duplicate is a conflict instead of a merge.
    pub merge_enabled: bool,
    pub now: DateTime<Utc>,
}

impl ResolveOptions {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            window_days: defaults::DEFAULT_MERGE_WINDOW_DAYS,
            merge_enabled: true,
            now,
        }
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    pub fn without_merge(mut self) -> Self {
        self.merge_enabled = false;
        self
    }
}

/// Outcome of identity resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub lead: Lead,
    pub merged: bool,
}

/// Initial confidence from data completeness: base 0.5, plus bonuses for a
/// known product of interest, budget and email, capped at 1.0.
pub fn initial_confidence(attrs: &LeadAttrs) -> f64 {
    let mut score = defaults::BASE_CONFIDENCE;
    if attrs
        .product_interest
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty())
    {
        score += defaults::PRODUCT_INTEREST_BONUS;
    }
    if attrs.budget.is_some() {
        score += defaults::BUDGET_BONUS;
    }
    if attrs.email.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        score += defaults::EMAIL_BONUS;
    }
    score.min(1.0)
}

/// Resolve an inbound contact to a lead: merge onto the most recent
/// non-archived lead with the same contact key inside the window, or create
/// a fresh one in `New`.
///
/// Merge never touches identity or lifecycle state; it overlays non-empty
/// incoming fields and bumps `updated_at` (which is what re-prioritizes the
/// lead downstream). Callers serialize resolutions per contact key - that
/// plus the windowed lookup is what upholds the no-duplicate invariant.
pub fn resolve(
    store: &dyn LeadStore,
    contact_key: &str,
    attrs: LeadAttrs,
    opts: ResolveOptions,
) -> Result<Resolution> {
    let contact_key = contact_key.trim();
    if contact_key.is_empty() {
        return Err(LeadGateError::validation(
            "contact_key",
            "contact key must not be empty",
        ));
    }
    if opts.window_days < 0 {
        return Err(LeadGateError::validation(
            "window_days",
            "merge window must not be negative",
        ));
    }

    let cutoff = opts.now - Duration::days(opts.window_days);

    if let Some(mut existing) = store.find_recent_by_contact(contact_key, cutoff)? {
        if !opts.merge_enabled {
            return Err(LeadGateError::DuplicateIdentityConflict {
                contact_key: contact_key.to_string(),
            });
        }

        let seen_at = existing.updated_at;
        attrs.overlay_onto(&mut existing);
        existing.updated_at = opts.now;
        store.update(existing.clone(), seen_at)?;

        info!(lead_id = %existing.id, contact_key, "merged inbound contact onto existing lead");
        return Ok(Resolution {
            lead: existing,
            merged: true,
        });
    }

    let confidence = initial_confidence(&attrs);
    let lead = Lead {
        id: LeadId::new(),
        contact_key: contact_key.to_string(),
        name: attrs.name.clone().unwrap_or_default(),
        market: attrs.market.unwrap_or_default(),
        product_interest: attrs.product_interest.clone(),
        budget: attrs.budget,
        email: attrs.email.clone(),
        confidence_score: confidence,
        state: LeadState::New,
        created_at: opts.now,
        updated_at: opts.now,
    };
    store.insert(lead.clone())?;

    info!(lead_id = %lead.id, contact_key, confidence, "created new lead");
    Ok(Resolution {
        lead,
        merged: false,
    })
}
