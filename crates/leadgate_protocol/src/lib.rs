//! Canonical types for the LeadGate qualification pipeline.
//!
//! Shared definitions for leads, gates, calibration state, policy rules and
//! the error taxonomy. Pure data - the decision logic lives in
//! `leadgate_engine`, persistence behind the traits in `leadgate_store`.

pub mod config;
pub mod defaults;
pub mod error;
pub mod rules;
pub mod types;

// Re-export types for convenience
pub use types::{
    AuditAction,
    AuditEvent,
    CalibrationState,
    CorrectionEvent,
    CorrectionId,
    // Canonical enums (use these everywhere)
    GateLevel,
    Guardrail,
    Intent,
    Lead,
    LeadAttrs,
    LeadId,
    LeadState,
    Market,
    TransitionAction,
    Urgency,
};

pub use rules::{PolicyRule, RuleAction, RuleKind, RuleLevel};

pub use config::{CalibrationConfig, ServiceConfig};

pub use error::{LeadGateError, Result, StoreError};
