//! Error taxonomy for the qualification pipeline.
//!
//! Library crates return `LeadGateError`; binaries wrap it in `anyhow` at
//! the edges. The classifier and the calibrator never error - numeric edge
//! cases clamp instead, so the feedback loop cannot wedge the pipeline.

use thiserror::Error;

use crate::rules::RuleLevel;
use crate::types::LeadState;

pub type Result<T> = std::result::Result<T, LeadGateError>;

/// Errors raised by the decision core. Each is fatal to the single
/// operation that raised it; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum LeadGateError {
    /// A lead with this contact key already exists inside the merge window
    /// and the caller explicitly disabled merging.
    #[error("duplicate identity for contact key '{contact_key}' inside the merge window")]
    DuplicateIdentityConflict { contact_key: String },

    /// An explicitly requested transition names a state unreachable from
    /// the current one. Inferred no-op transitions are NOT errors.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: LeadState, to: LeadState },

    /// A policy constraint was violated. Carries the specific rule so the
    /// caller can present it, never a generic rejection.
    #[error("policy violation at {level} level: {rule} ({detail})")]
    PolicyViolation {
        level: RuleLevel,
        rule: String,
        detail: String,
    },

    /// Malformed input: confidence outside [0, 1], unknown intent label,
    /// malformed rule payload.
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LeadGateError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by store backends behind the persistence traits.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Optimistic-version check failed: the row changed underneath the
    /// caller. The operation must be re-read and re-applied, not retried
    /// blindly.
    #[error("conflicting update for {entity} {id}")]
    Conflict { entity: &'static str, id: String },
}
