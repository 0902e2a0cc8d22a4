//! Organizational policy rules.
//!
//! Rules are read-only configuration resolved in authority order
//! Brand > Group > Dealer > Manager. The payload of each rule is a tagged
//! union keyed by the action name, so every action's parameters are
//! statically known.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LeadGateError;

// ============================================================================
// Rule hierarchy
// ============================================================================

/// Rule authority level. The derived ordering is evaluation order: Brand
/// rules are applied first and can never be loosened further down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleLevel {
    Brand,
    Group,
    Dealer,
    Manager,
}

impl RuleLevel {
    pub const ALL: [RuleLevel; 4] = [
        RuleLevel::Brand,
        RuleLevel::Group,
        RuleLevel::Dealer,
        RuleLevel::Manager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleLevel::Brand => "BRAND",
            RuleLevel::Group => "GROUP",
            RuleLevel::Dealer => "DEALER",
            RuleLevel::Manager => "MANAGER",
        }
    }
}

impl fmt::Display for RuleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a rule does to a proposed deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Hard limit; violation blocks the deal
    Constraint,
    /// Additive benefit; accumulates across levels
    Incentive,
    /// Workflow requirement; informational for the engine
    Process,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Constraint => "CONSTRAINT",
            RuleKind::Incentive => "INCENTIVE",
            RuleKind::Process => "PROCESS",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Rule actions - tagged payload union
// ============================================================================

/// Action payloads. The wire shape tags each payload with its action:
/// `{"action": "MAX_DISCOUNT", "payload": {"percent": 3.0, "model": "City"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    /// Mandated sales process with a fixed number of steps.
    EnforceSteps { steps: u32, name: String },
    /// Model-scoped maximum discount percentage.
    MaxDiscount { percent: f64, model: String },
    /// A lower-trim inquiry may be offered the named upsell path.
    UpsellAllowed { target: String },
    /// Flat bonus paid when the stated condition holds (e.g. "LOAN").
    SpiffBonus { amount: i64, condition: String },
    /// Leads from the named city are rejected at this dealer.
    GeoFence { reject_city: String },
    /// Stock older than this many days is offered first.
    StockPriority { age_days: u32 },
    /// Financing restricted to the named bank.
    FinanceLock { bank: String },
    /// Deals above this value need explicit manager approval.
    ApprovalRequired { threshold: i64 },
    /// Caps the accumulated incentive total for lower levels.
    IncentiveCap { amount: i64 },
}

impl RuleAction {
    /// The action label as it appears on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            RuleAction::EnforceSteps { .. } => "ENFORCE_STEPS",
            RuleAction::MaxDiscount { .. } => "MAX_DISCOUNT",
            RuleAction::UpsellAllowed { .. } => "UPSELL_ALLOWED",
            RuleAction::SpiffBonus { .. } => "SPIFF_BONUS",
            RuleAction::GeoFence { .. } => "GEO_FENCE",
            RuleAction::StockPriority { .. } => "STOCK_PRIORITY",
            RuleAction::FinanceLock { .. } => "FINANCE_LOCK",
            RuleAction::ApprovalRequired { .. } => "APPROVAL_REQUIRED",
            RuleAction::IncentiveCap { .. } => "INCENTIVE_CAP",
        }
    }

    /// The kind each action is defined for.
    pub fn expected_kind(&self) -> RuleKind {
        match self {
            RuleAction::EnforceSteps { .. } | RuleAction::ApprovalRequired { .. } => {
                RuleKind::Process
            }
            RuleAction::UpsellAllowed { .. } | RuleAction::SpiffBonus { .. } => RuleKind::Incentive,
            RuleAction::MaxDiscount { .. }
            | RuleAction::GeoFence { .. }
            | RuleAction::StockPriority { .. }
            | RuleAction::FinanceLock { .. }
            | RuleAction::IncentiveCap { .. } => RuleKind::Constraint,
        }
    }
}

// ============================================================================
// Policy rule
// ============================================================================

/// One configured rule: authority level, kind, and its typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub level: RuleLevel,
    pub kind: RuleKind,
    #[serde(flatten)]
    pub action: RuleAction,
}

impl PolicyRule {
    pub fn new(level: RuleLevel, kind: RuleKind, action: RuleAction) -> Self {
        Self {
            level,
            kind,
            action,
        }
    }

    /// Reject rules whose declared kind contradicts their action payload.
    pub fn validate(&self) -> Result<(), LeadGateError> {
        let expected = self.action.expected_kind();
        if self.kind != expected {
            return Err(LeadGateError::validation(
                "kind",
                format!(
                    "action {} requires kind {}, got {}",
                    self.action.label(),
                    expected,
                    self.kind
                ),
            ));
        }
        Ok(())
    }
}
