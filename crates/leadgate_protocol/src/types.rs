//! Canonical entity and enum definitions shared across all crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::defaults;

// ============================================================================
// Lead ID - Newtype to prevent mixing with other IDs
// ============================================================================

/// Lead identifier (UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(Uuid);

impl LeadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Correction event identifier (UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectionId(Uuid);

impl CorrectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Gate level
// ============================================================================

/// Traffic-light access tier governing whether automation may act
/// unsupervised on a lead. Ordering is Red < Yellow < Green so that a
/// rising confidence score never lowers the gate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateLevel {
    /// Must escalate to a human owner
    Red,
    /// Requires human confirmation before acting
    Yellow,
    /// System may act autonomously
    Green,
}

impl GateLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateLevel::Red => "RED",
            GateLevel::Yellow => "YELLOW",
            GateLevel::Green => "GREEN",
        }
    }
}

impl fmt::Display for GateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GateLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RED" => Ok(GateLevel::Red),
            "YELLOW" => Ok(GateLevel::Yellow),
            "GREEN" => Ok(GateLevel::Green),
            _ => Err(format!(
                "Invalid gate level: '{}'. Expected: RED, YELLOW, or GREEN",
                s
            )),
        }
    }
}

// ============================================================================
// Lead lifecycle state - the canonical state machine vocabulary
// ============================================================================

/// Lead lifecycle state.
/// This is the CANONICAL definition - use this everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadState {
    /// First contact recorded, nothing qualified yet
    #[default]
    New,
    /// An agent has responded at least once
    Contacted,
    /// Enough detail gathered to qualify the lead
    Qualified,
    /// Lead expressed interest in a specific product
    Interested,
    /// A test drive is on the calendar
    TestDriveScheduled,
    /// Price/terms discussion in progress
    Negotiating,
    /// Deal closed successfully. Terminal - no outgoing edges.
    ClosedWon,
    /// Deal lost. May re-enter New on re-engagement.
    ClosedLost,
    /// Soft-deleted. May re-enter New on un-archive.
    Archived,
}

impl LeadState {
    pub const ALL: [LeadState; 9] = [
        LeadState::New,
        LeadState::Contacted,
        LeadState::Qualified,
        LeadState::Interested,
        LeadState::TestDriveScheduled,
        LeadState::Negotiating,
        LeadState::ClosedWon,
        LeadState::ClosedLost,
        LeadState::Archived,
    ];

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadState::New => "NEW",
            LeadState::Contacted => "CONTACTED",
            LeadState::Qualified => "QUALIFIED",
            LeadState::Interested => "INTERESTED",
            LeadState::TestDriveScheduled => "TEST_DRIVE_SCHEDULED",
            LeadState::Negotiating => "NEGOTIATING",
            LeadState::ClosedWon => "CLOSED_WON",
            LeadState::ClosedLost => "CLOSED_LOST",
            LeadState::Archived => "ARCHIVED",
        }
    }

    /// A state with no outgoing edges at all. Only ClosedWon qualifies:
    /// ClosedLost and Archived can re-enter New.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadState::ClosedWon)
    }

    /// States excluded from follow-up sweeps and dashboards.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            LeadState::ClosedWon | LeadState::ClosedLost | LeadState::Archived
        )
    }
}

impl fmt::Display for LeadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LeadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(LeadState::New),
            "CONTACTED" => Ok(LeadState::Contacted),
            "QUALIFIED" => Ok(LeadState::Qualified),
            "INTERESTED" => Ok(LeadState::Interested),
            "TEST_DRIVE_SCHEDULED" => Ok(LeadState::TestDriveScheduled),
            "NEGOTIATING" => Ok(LeadState::Negotiating),
            "CLOSED_WON" => Ok(LeadState::ClosedWon),
            "CLOSED_LOST" => Ok(LeadState::ClosedLost),
            "ARCHIVED" => Ok(LeadState::Archived),
            _ => Err(format!("Invalid lead state: '{}'", s)),
        }
    }
}

// ============================================================================
// Intent - the closed set of classifier labels
// ============================================================================

/// Intent label produced by the external classifier.
/// Unknown labels must be rejected at the boundary, not defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GeneralInquiry,
    ProductInquiry,
    BookTestDrive,
    ShowInterest,
    RequestInfo,
    NegotiatePrice,
    RequestDiscount,
    ConfirmPurchase,
    ConfirmAppointment,
    FinanceInquiry,
    Decline,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GeneralInquiry => "general_inquiry",
            Intent::ProductInquiry => "product_inquiry",
            Intent::BookTestDrive => "book_test_drive",
            Intent::ShowInterest => "show_interest",
            Intent::RequestInfo => "request_info",
            Intent::NegotiatePrice => "negotiate_price",
            Intent::RequestDiscount => "request_discount",
            Intent::ConfirmPurchase => "confirm_purchase",
            Intent::ConfirmAppointment => "confirm_appointment",
            Intent::FinanceInquiry => "finance_inquiry",
            Intent::Decline => "decline",
        }
    }

    /// Intents that touch price or finance terms. These can never be acted
    /// on autonomously regardless of classifier confidence.
    pub fn is_commercially_sensitive(&self) -> bool {
        matches!(self, Intent::NegotiatePrice | Intent::RequestDiscount)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general_inquiry" => Ok(Intent::GeneralInquiry),
            "product_inquiry" => Ok(Intent::ProductInquiry),
            "book_test_drive" => Ok(Intent::BookTestDrive),
            "show_interest" => Ok(Intent::ShowInterest),
            "request_info" => Ok(Intent::RequestInfo),
            "negotiate_price" => Ok(Intent::NegotiatePrice),
            "request_discount" => Ok(Intent::RequestDiscount),
            "confirm_purchase" => Ok(Intent::ConfirmPurchase),
            "confirm_appointment" => Ok(Intent::ConfirmAppointment),
            "finance_inquiry" => Ok(Intent::FinanceInquiry),
            "decline" => Ok(Intent::Decline),
            _ => Err(format!("Unknown intent label: '{}'", s)),
        }
    }
}

// ============================================================================
// Market
// ============================================================================

/// Market code for the dealership the lead belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Market {
    /// Indonesia
    #[default]
    #[serde(rename = "ID")]
    Id,
    /// India
    #[serde(rename = "IN")]
    In,
    /// Singapore
    #[serde(rename = "SG")]
    Sg,
    /// UAE
    #[serde(rename = "AE")]
    Ae,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Id => "ID",
            Market::In => "IN",
            Market::Sg => "SG",
            Market::Ae => "AE",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ID" => Ok(Market::Id),
            "IN" => Ok(Market::In),
            "SG" => Ok(Market::Sg),
            "AE" => Ok(Market::Ae),
            _ => Err(format!("Invalid market code: '{}'", s)),
        }
    }
}

// ============================================================================
// Lead - the core entity
// ============================================================================

/// A sales lead.
///
/// `gate_level` is intentionally NOT a field: it is always derived from
/// `confidence_score` and the live calibration snapshot at read time, so it
/// can never drift out of sync with either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    /// Identity key (contact handle, e.g. a phone number). Unique per
    /// merge window among non-archived leads.
    pub contact_key: String,
    pub name: String,
    pub market: Market,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Classifier certainty in [0, 1].
    pub confidence_score: f64,
    pub state: LeadState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incoming attributes for identity resolution.
///
/// Overlay precedence is total and explicit: a non-empty incoming field
/// replaces the stored value, an absent or empty incoming field preserves
/// it. Identity (`id`, `contact_key`) and `state` are never touched by an
/// overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<Market>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl LeadAttrs {
    /// Apply this overlay to an existing lead, returning whether anything
    /// changed. Empty strings count as absent.
    pub fn overlay_onto(&self, lead: &mut Lead) -> bool {
        let mut changed = false;
        if let Some(name) = non_empty(&self.name) {
            if lead.name != name {
                lead.name = name.to_string();
                changed = true;
            }
        }
        if let Some(market) = self.market {
            if lead.market != market {
                lead.market = market;
                changed = true;
            }
        }
        if let Some(product) = non_empty(&self.product_interest) {
            if lead.product_interest.as_deref() != Some(product) {
                lead.product_interest = Some(product.to_string());
                changed = true;
            }
        }
        if let Some(budget) = self.budget {
            if lead.budget != Some(budget) {
                lead.budget = Some(budget);
                changed = true;
            }
        }
        if let Some(email) = non_empty(&self.email) {
            if lead.email.as_deref() != Some(email) {
                lead.email = Some(email.to_string());
                changed = true;
            }
        }
        changed
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Correction event - the calibrator's feedback signal
// ============================================================================

/// A recorded instance of a human overriding an automated decision.
/// Immutable once created; consumed in aggregate by the calibrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionEvent {
    pub id: CorrectionId,
    pub lead_id: LeadId,
    /// Name of the corrected field (e.g. "budget").
    pub field: String,
    /// Value the automated classifier proposed.
    pub proposed_value: String,
    /// Value the human substituted.
    pub human_value: String,
    pub created_at: DateTime<Utc>,
}

impl CorrectionEvent {
    pub fn new(
        lead_id: LeadId,
        field: impl Into<String>,
        proposed_value: impl Into<String>,
        human_value: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CorrectionId::new(),
            lead_id,
            field: field.into(),
            proposed_value: proposed_value.into(),
            human_value: human_value.into(),
            created_at,
        }
    }
}

// ============================================================================
// Calibration state - singleton, published atomically
// ============================================================================

/// Live gate thresholds plus calibration bookkeeping.
///
/// Invariant: `yellow_threshold <= green_threshold` at all times. Exactly
/// one live instance exists per process, owned by a `CalibrationHandle` and
/// replaced as a whole snapshot so readers never see a torn pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub green_threshold: f64,
    pub yellow_threshold: f64,
    pub rejection_rate_24h: f64,
    pub adjustment_count: u64,
    pub last_calibrated_at: DateTime<Utc>,
}

impl CalibrationState {
    /// Initial state at process start, from the reference defaults.
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self {
            green_threshold: defaults::DEFAULT_GREEN_THRESHOLD,
            yellow_threshold: defaults::DEFAULT_YELLOW_THRESHOLD,
            rejection_rate_24h: 0.0,
            adjustment_count: 0,
            last_calibrated_at: now,
        }
    }

    pub fn is_monotonic(&self) -> bool {
        self.yellow_threshold <= self.green_threshold
    }
}

// ============================================================================
// Transition vocabulary
// ============================================================================

/// What the automation is allowed to do next with a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionAction {
    /// Green gate: act autonomously
    AutoProceed,
    /// Yellow gate: a human confirms details before acting
    ConfirmDetails,
    /// Red gate: hand the lead to a human owner
    Escalate,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::AutoProceed => "AUTO_PROCEED",
            TransitionAction::ConfirmDetails => "CONFIRM_DETAILS",
            TransitionAction::Escalate => "ESCALATE",
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A guardrail applied during a transition. Guardrails downgrade the gate
/// for specific intents regardless of raw confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Guardrail {
    /// Confidence below the yellow threshold - escalate
    ConfidenceFloor,
    /// Confidence in the yellow band - human in the loop
    HumanInTheLoop,
    /// Price discussions require manager review before committing
    PriceCommitment,
    /// Finance commitments require manual verification
    FinanceCommitment,
}

impl Guardrail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Guardrail::ConfidenceFloor => "CONFIDENCE_FLOOR",
            Guardrail::HumanInTheLoop => "HUMAN_IN_THE_LOOP",
            Guardrail::PriceCommitment => "PRICE_COMMITMENT",
            Guardrail::FinanceCommitment => "FINANCE_COMMITMENT",
        }
    }
}

impl fmt::Display for Guardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Escalation urgency, recorded on the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "LOW",
            Urgency::Medium => "MEDIUM",
            Urgency::High => "HIGH",
            Urgency::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Audit trail
// ============================================================================

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    LeadCreated,
    LeadMerged,
    StateChanged,
    EscalationTriggered,
    LeadArchived,
    CorrectionRecorded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LeadCreated => "LEAD_CREATED",
            AuditAction::LeadMerged => "LEAD_MERGED",
            AuditAction::StateChanged => "STATE_CHANGED",
            AuditAction::EscalationTriggered => "ESCALATION_TRIGGERED",
            AuditAction::LeadArchived => "LEAD_ARCHIVED",
            AuditAction::CorrectionRecorded => "CORRECTION_RECORDED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn for_lead(
        action: AuditAction,
        lead_id: LeadId,
        details: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            entity_type: "Lead".to_string(),
            entity_id: lead_id.to_string(),
            details: details.into(),
            created_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
