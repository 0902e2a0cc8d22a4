//! LeadGate Test Utilities
//!
//! Builders and fixtures shared by unit and integration tests: a lead
//! builder with sensible defaults, the demo policy rule set, and a fixed
//! clock so time-window assertions stay deterministic.

use chrono::{DateTime, TimeZone, Utc};

use leadgate_protocol::{
    Lead, LeadAttrs, LeadId, LeadState, Market, PolicyRule, RuleAction, RuleKind, RuleLevel,
};

/// A fixed instant for deterministic tests: 2025-06-01 12:00:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Builder for test leads. Defaults to a fresh Indian-market lead at the
/// fixed clock.
#[derive(Debug, Clone)]
pub struct LeadBuilder {
    lead: Lead,
}

impl LeadBuilder {
    pub fn new(contact_key: &str) -> Self {
        let now = fixed_now();
        Self {
            lead: Lead {
                id: LeadId::new(),
                contact_key: contact_key.to_string(),
                name: "Test Lead".to_string(),
                market: Market::In,
                product_interest: None,
                budget: None,
                email: None,
                confidence_score: 0.5,
                state: LeadState::New,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.lead.name = name.to_string();
        self
    }

    pub fn market(mut self, market: Market) -> Self {
        self.lead.market = market;
        self
    }

    pub fn state(mut self, state: LeadState) -> Self {
        self.lead.state = state;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.lead.confidence_score = confidence;
        self
    }

    pub fn product_interest(mut self, product: &str) -> Self {
        self.lead.product_interest = Some(product.to_string());
        self
    }

    pub fn budget(mut self, budget: i64) -> Self {
        self.lead.budget = Some(budget);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.lead.created_at = at;
        self.lead.updated_at = at;
        self
    }

    pub fn build(self) -> Lead {
        self.lead
    }
}

/// Inbound attributes with every qualification signal present, matching the
/// 0.85 initial-confidence case.
pub fn complete_attrs(name: &str) -> LeadAttrs {
    LeadAttrs {
        name: Some(name.to_string()),
        market: Some(Market::In),
        product_interest: Some("City".to_string()),
        budget: Some(1_500_000),
        email: Some("lead@example.com".to_string()),
    }
}

/// The demo rule hierarchy: one rule of every action the resolver handles,
/// spread across all four authority levels.
pub fn sample_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new(
            RuleLevel::Brand,
            RuleKind::Process,
            RuleAction::EnforceSteps {
                steps: 13,
                name: "Brand Way".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Brand,
            RuleKind::Constraint,
            RuleAction::MaxDiscount {
                percent: 3.0,
                model: "City".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Group,
            RuleKind::Incentive,
            RuleAction::UpsellAllowed {
                target: "Amaze -> City".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Group,
            RuleKind::Incentive,
            RuleAction::SpiffBonus {
                amount: 2000,
                condition: "LOAN".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Dealer,
            RuleKind::Constraint,
            RuleAction::GeoFence {
                reject_city: "Gurgaon".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Dealer,
            RuleKind::Constraint,
            RuleAction::StockPriority { age_days: 60 },
        ),
        PolicyRule::new(
            RuleLevel::Manager,
            RuleKind::Constraint,
            RuleAction::FinanceLock {
                bank: "HDFC".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Manager,
            RuleKind::Process,
            RuleAction::ApprovalRequired { threshold: 50_000 },
        ),
    ]
}
