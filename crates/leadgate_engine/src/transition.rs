//! The lead lifecycle state machine.
//!
//! Two entry points with different failure semantics:
//! - `transition` is intent-driven. An unknown (state, intent) pair is a
//!   silent no-op, never an error; the gate and guardrails decide whether
//!   the proposed move may be applied autonomously.
//! - `validate_explicit` / `apply_explicit` handle caller-specified target
//!   states and reject anything not on the adjacency list with
//!   `InvalidStateTransition`.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use leadgate_protocol::{
    CalibrationState, GateLevel, Guardrail, Intent, Lead, LeadGateError, LeadState, Result,
    TransitionAction,
};

use crate::gate::classify;
use crate::policy::ResolvedPolicy;

// ============================================================================
// Transition tables
// ============================================================================

/// Intent-driven transition table. Absence means "stay put".
pub fn next_state(current: LeadState, intent: Intent) -> Option<LeadState> {
    use Intent::*;
    use LeadState::*;

    match (current, intent) {
        (New, GeneralInquiry) => Some(Contacted),
        (New, ProductInquiry) => Some(Contacted),
        (New, BookTestDrive) => Some(TestDriveScheduled),
        (New, ShowInterest) => Some(Interested),

        (Contacted, ShowInterest) => Some(Interested),
        (Contacted, RequestInfo) => Some(Qualified),
        (Contacted, BookTestDrive) => Some(TestDriveScheduled),

        (Qualified, ShowInterest) => Some(Interested),
        (Qualified, BookTestDrive) => Some(TestDriveScheduled),

        (Interested, BookTestDrive) => Some(TestDriveScheduled),
        (Interested, NegotiatePrice) => Some(Negotiating),

        (TestDriveScheduled, NegotiatePrice) => Some(Negotiating),
        (TestDriveScheduled, ConfirmPurchase) => Some(Negotiating),

        (Negotiating, ConfirmPurchase) => Some(ClosedWon),
        (Negotiating, Decline) => Some(ClosedLost),

        _ => None,
    }
}

/// States reachable from `from` by an explicit (caller-specified) request.
/// ClosedWon is terminal; ClosedLost and Archived may re-engage into New.
pub fn allowed_explicit(from: LeadState) -> &'static [LeadState] {
    use LeadState::*;
    match from {
        New => &[Contacted, Archived],
        Contacted => &[Qualified, Archived],
        Qualified => &[Interested, ClosedLost, Archived],
        Interested => &[TestDriveScheduled, ClosedLost, Archived],
        TestDriveScheduled => &[Negotiating, ClosedLost, Archived],
        Negotiating => &[ClosedWon, ClosedLost, Archived],
        ClosedWon => &[],
        ClosedLost => &[New],
        Archived => &[New],
    }
}

/// Reject explicit skip-level requests.
pub fn validate_explicit(from: LeadState, to: LeadState) -> Result<()> {
    if allowed_explicit(from).contains(&to) {
        Ok(())
    } else {
        Err(LeadGateError::InvalidStateTransition { from, to })
    }
}

/// Apply a validated explicit transition in place.
pub fn apply_explicit(lead: &mut Lead, to: LeadState, now: DateTime<Utc>) -> Result<()> {
    validate_explicit(lead.state, to)?;
    debug!(lead_id = %lead.id, from = %lead.state, to = %to, "explicit transition");
    lead.state = to;
    lead.updated_at = now;
    Ok(())
}

// ============================================================================
// Intent-driven transitions
// ============================================================================

/// One classified inbound event against a lead.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRequest {
    pub intent: Intent,
    /// Classifier certainty in [0, 1]. Anything else is a validation error.
    pub confidence: f64,
    /// Set when the classifier extracted a concrete finance commitment.
    pub commitment: bool,
}

impl TransitionRequest {
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence,
            commitment: false,
        }
    }

    pub fn with_commitment(mut self) -> Self {
        self.commitment = true;
        self
    }
}

/// Decision produced by the engine. Nothing is persisted here; callers
/// apply the outcome through the store (see `apply_to`).
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub gate: GateLevel,
    pub action: TransitionAction,
    pub previous_state: LeadState,
    pub proposed_state: LeadState,
    pub confidence: f64,
    pub recommendation: String,
    pub applied_guardrails: Vec<Guardrail>,
}

impl TransitionOutcome {
    /// Whether the lead actually moves.
    pub fn advances(&self) -> bool {
        self.action == TransitionAction::AutoProceed && self.proposed_state != self.previous_state
    }

    /// Apply a true-green outcome to the lead. A non-green outcome leaves
    /// the lead untouched.
    pub fn apply_to(&self, lead: &mut Lead, now: DateTime<Utc>) {
        if self.action != TransitionAction::AutoProceed {
            return;
        }
        lead.state = self.proposed_state;
        lead.confidence_score = self.confidence;
        lead.updated_at = now;
    }
}

/// Decide what the automation may do with this event.
///
/// Gate first, table second, guardrails last: a guardrail can only ever
/// downgrade, so no intent reaches `AutoProceed` through high confidence
/// alone when policy demands a human.
pub fn transition(
    lead: &Lead,
    request: &TransitionRequest,
    policy: &ResolvedPolicy,
    calibration: &CalibrationState,
) -> Result<TransitionOutcome> {
    if !request.confidence.is_finite() || !(0.0..=1.0).contains(&request.confidence) {
        return Err(LeadGateError::validation(
            "confidence",
            format!("confidence must be in [0, 1], got {}", request.confidence),
        ));
    }

    let mut gate = classify(request.confidence, calibration);
    let mut guardrails = Vec::new();

    let (mut action, mut proposed, mut recommendation) = match gate {
        GateLevel::Red => {
            guardrails.push(Guardrail::ConfidenceFloor);
            (
                TransitionAction::Escalate,
                lead.state,
                escalation_note(request),
            )
        }
        GateLevel::Yellow => {
            guardrails.push(Guardrail::HumanInTheLoop);
            (
                TransitionAction::ConfirmDetails,
                lead.state,
                clarifying_question(request.intent),
            )
        }
        GateLevel::Green => {
            let proposed = next_state(lead.state, request.intent).unwrap_or(lead.state);
            (
                TransitionAction::AutoProceed,
                proposed,
                auto_response(request.intent, lead),
            )
        }
    };

    // Guardrails: commercially sensitive intents can never auto-proceed.
    if request.intent.is_commercially_sensitive() && gate == GateLevel::Green {
        gate = GateLevel::Yellow;
        action = TransitionAction::ConfirmDetails;
        proposed = lead.state;
        recommendation =
            "Price discussions require manager review before committing.".to_string();
        guardrails.push(Guardrail::PriceCommitment);
        warn!(lead_id = %lead.id, intent = %request.intent, "price guardrail downgraded gate");
    }

    // Finance commitments need manual verification; an active finance-review
    // constraint in the resolved policy forces the same downgrade even
    // without an explicit commitment flag.
    if request.intent == Intent::FinanceInquiry
        && (request.commitment || policy.requires_finance_review())
        && gate != GateLevel::Red
    {
        gate = GateLevel::Yellow;
        action = TransitionAction::ConfirmDetails;
        proposed = lead.state;
        recommendation = "Finance commitments require manual verification.".to_string();
        guardrails.push(Guardrail::FinanceCommitment);
        warn!(lead_id = %lead.id, "finance guardrail downgraded gate");
    }

    debug!(
        lead_id = %lead.id,
        gate = %gate,
        action = %action,
        from = %lead.state,
        to = %proposed,
        "transition decided"
    );

    Ok(TransitionOutcome {
        gate,
        action,
        previous_state: lead.state,
        proposed_state: proposed,
        confidence: request.confidence,
        recommendation,
        applied_guardrails: guardrails,
    })
}

// ============================================================================
// Recommendation copy
// ============================================================================

fn escalation_note(request: &TransitionRequest) -> String {
    format!(
        "Escalate to a human owner for review. Classifier confidence {:.0}% is below the action floor (intent: {}).",
        request.confidence * 100.0,
        request.intent
    )
}

fn clarifying_question(intent: Intent) -> String {
    match intent {
        Intent::BookTestDrive => {
            "To confirm: you'd like a test drive. What location works best for you?".to_string()
        }
        Intent::ProductInquiry => {
            "Happy to help - could you specify which model you're interested in?".to_string()
        }
        Intent::NegotiatePrice | Intent::RequestDiscount => {
            "I understand you'd like to discuss pricing. May I know your budget range?".to_string()
        }
        Intent::GeneralInquiry => {
            "Thanks for reaching out! Could you tell me more about what you're looking for?"
                .to_string()
        }
        _ => "Could you share a few more details so we can assist you better?".to_string(),
    }
}

fn auto_response(intent: Intent, lead: &Lead) -> String {
    let product = lead.product_interest.as_deref().unwrap_or("our vehicles");
    match intent {
        Intent::BookTestDrive => format!(
            "Great news, {}! Your test drive has been scheduled. The team will confirm the exact time shortly.",
            lead.name
        ),
        Intent::ShowInterest => format!(
            "Wonderful, {}! Sending you the complete specifications for {}.",
            lead.name, product
        ),
        Intent::ProductInquiry => format!(
            "Here's the information about {}. Would you like to schedule a test drive?",
            product
        ),
        Intent::ConfirmAppointment => {
            "Your appointment has been confirmed. Looking forward to seeing you!".to_string()
        }
        _ => format!(
            "Thank you for your message, {}. Processing this right away.",
            lead.name
        ),
    }
}
