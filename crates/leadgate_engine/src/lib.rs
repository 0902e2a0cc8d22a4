//! LeadGate decision core.
//!
//! Everything with genuine decision logic lives here: identity resolution,
//! gate classification, the lifecycle state machine with guardrails, the
//! threshold feedback controller, hierarchical policy resolution and deal
//! math. All of it is synchronous and bounded; persistence stays behind the
//! `leadgate_store` traits and scheduling belongs to the caller.

pub mod calibrate;
pub mod commission;
pub mod gate;
pub mod identity;
pub mod policy;
pub mod transition;

pub use calibrate::{calibration_step, CalibrationHandle};
pub use commission::{
    finance_commission, net_price, structure_deal, validate_proforma, CommissionBreakdown,
    DealSheet, ProformaCheck, ProformaQuote,
};
pub use gate::classify;
pub use identity::{initial_confidence, resolve, Resolution, ResolveOptions};
pub use policy::{DiscountCheck, PolicyContext, PolicySet, ResolvedPolicy};
pub use transition::{
    apply_explicit, next_state, transition, validate_explicit, TransitionOutcome,
    TransitionRequest,
};
