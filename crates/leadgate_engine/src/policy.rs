//! Hierarchical policy resolution.
//!
//! Rules resolve strictly in authority order Brand -> Group -> Dealer ->
//! Manager. Constraints can only ever narrow what a lower level may do;
//! incentives accumulate additively until a cap seen earlier in the
//! ordering stops them. Validation failures return the specific offending
//! rule, never a generic rejection.

use serde::{Deserialize, Serialize};
use tracing::debug;

use leadgate_protocol::{LeadGateError, PolicyRule, Result, RuleAction, RuleKind, RuleLevel};

/// Facts about the proposed deal that rules are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct PolicyContext {
    pub model: Option<String>,
    pub city: Option<String>,
    pub bank: Option<String>,
    pub has_loan: bool,
    pub discount_percent: Option<f64>,
    pub deal_value: Option<i64>,
}

/// Rules applicable to a context, grouped by kind, with the accumulated
/// incentive total.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub constraints: Vec<PolicyRule>,
    pub incentives: Vec<PolicyRule>,
    pub process: Vec<PolicyRule>,
    /// Sum of monetary incentives, after any `IncentiveCap`.
    pub incentive_total: i64,
}

impl ResolvedPolicy {
    /// True when the rule set demands human review of finance terms: a
    /// finance lock, or an approval threshold on the deal.
    pub fn requires_finance_review(&self) -> bool {
        self.constraints
            .iter()
            .any(|r| matches!(r.action, RuleAction::FinanceLock { .. }))
            || self
                .process
                .iter()
                .any(|r| matches!(r.action, RuleAction::ApprovalRequired { .. }))
    }
}

/// Outcome of a model-scoped discount check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "status")]
pub enum DiscountCheck {
    Ok,
    Rejected {
        level: RuleLevel,
        model: String,
        max_percent: f64,
        requested_percent: f64,
    },
}

impl DiscountCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, DiscountCheck::Ok)
    }

    /// Lift the structured rejection into the error taxonomy for callers
    /// that want to raise instead of branch.
    pub fn into_result(self) -> Result<()> {
        match self {
            DiscountCheck::Ok => Ok(()),
            DiscountCheck::Rejected {
                level,
                model,
                max_percent,
                requested_percent,
            } => Err(LeadGateError::PolicyViolation {
                level,
                rule: "MAX_DISCOUNT".to_string(),
                detail: format!(
                    "max discount for {} is {}%, requested {}%",
                    model, max_percent, requested_percent
                ),
            }),
        }
    }
}

/// The loaded, validated, level-ordered rule set.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    rules: Vec<PolicyRule>,
}

impl PolicySet {
    /// Validate every rule and fix the evaluation order. The sort is
    /// stable: rules keep their configured order within a level.
    pub fn new(mut rules: Vec<PolicyRule>) -> Result<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        rules.sort_by_key(|r| r.level);
        Ok(Self { rules })
    }

    /// Load a rule set from its JSON wire form.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let rules: Vec<PolicyRule> = serde_json::from_str(raw).map_err(|e| {
            LeadGateError::validation("rules", format!("malformed rule payload: {}", e))
        })?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Resolve the rules applicable to a context.
    pub fn resolve(&self, ctx: &PolicyContext) -> ResolvedPolicy {
        let mut constraints = Vec::new();
        let mut incentives = Vec::new();
        let mut process = Vec::new();
        let mut incentive_total: i64 = 0;
        let mut cap: Option<i64> = None;

        for rule in &self.rules {
            if !rule_applies(rule, ctx) {
                continue;
            }
            match rule.kind {
                RuleKind::Constraint => {
                    if let RuleAction::IncentiveCap { amount } = rule.action {
                        cap = Some(cap.map_or(amount, |c| c.min(amount)));
                        // A cap seen at this level bounds everything already
                        // accumulated and everything below it.
                        incentive_total = incentive_total.min(amount);
                    }
                    constraints.push(rule.clone());
                }
                RuleKind::Incentive => {
                    if let RuleAction::SpiffBonus { amount, .. } = &rule.action {
                        incentive_total += amount;
                        if let Some(cap) = cap {
                            incentive_total = incentive_total.min(cap);
                        }
                    }
                    incentives.push(rule.clone());
                }
                RuleKind::Process => process.push(rule.clone()),
            }
        }

        debug!(
            constraints = constraints.len(),
            incentives = incentives.len(),
            incentive_total,
            "resolved policy"
        );

        ResolvedPolicy {
            constraints,
            incentives,
            process,
            incentive_total,
        }
    }

    /// Check the context against every constraint, in level order. The
    /// first violation short-circuits with a reference to its rule.
    pub fn check_constraints(&self, ctx: &PolicyContext) -> Result<()> {
        for rule in &self.rules {
            if rule.kind != RuleKind::Constraint {
                continue;
            }
            if let Some(detail) = violation_detail(&rule.action, ctx) {
                return Err(LeadGateError::PolicyViolation {
                    level: rule.level,
                    rule: rule.action.label().to_string(),
                    detail,
                });
            }
        }
        Ok(())
    }

    /// Model-scoped maximum-discount check. Returns the offending rule's
    /// level and stated maximum on violation.
    pub fn validate_discount(&self, model: &str, percent: f64) -> DiscountCheck {
        for rule in &self.rules {
            if let RuleAction::MaxDiscount {
                percent: max_percent,
                model: rule_model,
            } = &rule.action
            {
                if rule_model == model && percent > *max_percent {
                    return DiscountCheck::Rejected {
                        level: rule.level,
                        model: model.to_string(),
                        max_percent: *max_percent,
                        requested_percent: percent,
                    };
                }
            }
        }
        DiscountCheck::Ok
    }
}

/// Whether a rule is in play for this context. Model-scoped rules only
/// apply to their model; everything else always applies (loan-conditioned
/// bonuses only accrue when a loan is present).
fn rule_applies(rule: &PolicyRule, ctx: &PolicyContext) -> bool {
    match &rule.action {
        RuleAction::MaxDiscount { model, .. } => {
            ctx.model.as_deref().map_or(true, |m| m == model.as_str())
        }
        RuleAction::SpiffBonus { condition, .. } => {
            condition != "LOAN" || ctx.has_loan
        }
        _ => true,
    }
}

/// A constraint's violation message for this context, if violated.
fn violation_detail(action: &RuleAction, ctx: &PolicyContext) -> Option<String> {
    match action {
        RuleAction::MaxDiscount { percent, model } => {
            let requested = ctx.discount_percent?;
            let matches = ctx.model.as_deref() == Some(model.as_str());
            (matches && requested > *percent).then(|| {
                format!(
                    "max discount for {} is {}%, requested {}%",
                    model, percent, requested
                )
            })
        }
        RuleAction::GeoFence { reject_city } => {
            (ctx.city.as_deref() == Some(reject_city.as_str()))
                .then(|| format!("leads from {} are not accepted", reject_city))
        }
        RuleAction::FinanceLock { bank } => match ctx.bank.as_deref() {
            Some(requested) if requested != bank => Some(format!(
                "financing is locked to {}, requested {}",
                bank, requested
            )),
            _ => None,
        },
        _ => None,
    }
}
