//! Session context and dialogue state
//!
//! A [`QueryContext`] belongs to exactly one conversation. The supervisor
//! mutates it in place across turns; callers serialize access per session.

use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agentic::RequestType;
use crate::clarify::{ClarificationField, ClarificationItem};
use crate::entity_linking::EntityMatch;
use crate::slots::{Period, PeriodLevel};

// ============================================================================
// Requirements
// ============================================================================

/// A slot that must be filled before a request can be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Property,
    SecondProperty,
    PropertySelection,
    Period,
    ComparisonPeriods,
    AggregationLevel,
    TenantName,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::Property => "property",
            Requirement::SecondProperty => "second_property",
            Requirement::PropertySelection => "property_selection",
            Requirement::Period => "period",
            Requirement::ComparisonPeriods => "comparison_periods",
            Requirement::AggregationLevel => "aggregation_level",
            Requirement::TenantName => "tenant_name",
        }
    }

    /// The question that fills this requirement
    pub fn field(&self) -> ClarificationField {
        match self {
            Requirement::Property | Requirement::SecondProperty => ClarificationField::PropertyName,
            Requirement::PropertySelection => ClarificationField::PropertySelection,
            Requirement::Period => ClarificationField::Period,
            Requirement::ComparisonPeriods => ClarificationField::ComparisonPeriods,
            Requirement::AggregationLevel => ClarificationField::AggregationLevel,
            Requirement::TenantName => ClarificationField::TenantName,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Aggregation level
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLevel {
    Tenant,
    Property,
    Combined,
}

impl AggregationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationLevel::Tenant => "tenant",
            AggregationLevel::Property => "property",
            AggregationLevel::Combined => "combined",
        }
    }

    /// Read a free-text answer by word prefix ("by property", "Portfolio total")
    pub fn from_answer(answer: &str) -> Option<Self> {
        answer
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .find_map(|word| {
                if word.starts_with("tenant") {
                    Some(AggregationLevel::Tenant)
                } else if word.starts_with("prop") {
                    Some(AggregationLevel::Property)
                } else if word.starts_with("comb") || word.starts_with("port") || word.starts_with("total") {
                    Some(AggregationLevel::Combined)
                } else {
                    None
                }
            })
    }
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Dialogue state
// ============================================================================

/// Either nothing is pending, or exactly one question is.
///
/// Serialized as the `clarifications` list (length 0 or 1) plus the
/// `awaiting_user_reply` flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "DialogueWire", try_from = "DialogueWire")]
pub enum DialogueState {
    #[default]
    New,
    AwaitingReply(ClarificationItem),
}

impl DialogueState {
    pub fn pending(&self) -> Option<&ClarificationItem> {
        match self {
            DialogueState::New => None,
            DialogueState::AwaitingReply(item) => Some(item),
        }
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self, DialogueState::AwaitingReply(_))
    }
}

#[derive(Serialize, Deserialize)]
struct DialogueWire {
    #[serde(default)]
    clarifications: Vec<ClarificationItem>,
    #[serde(default)]
    awaiting_user_reply: bool,
}

impl From<DialogueState> for DialogueWire {
    fn from(state: DialogueState) -> Self {
        match state {
            DialogueState::New => DialogueWire {
                clarifications: Vec::new(),
                awaiting_user_reply: false,
            },
            DialogueState::AwaitingReply(item) => DialogueWire {
                clarifications: vec![item],
                awaiting_user_reply: true,
            },
        }
    }
}

impl TryFrom<DialogueWire> for DialogueState {
    type Error = String;

    fn try_from(wire: DialogueWire) -> Result<Self, Self::Error> {
        let mut items = wire.clarifications;
        match (items.len(), wire.awaiting_user_reply) {
            (0, false) => Ok(DialogueState::New),
            (0, true) => Err("awaiting a reply without a pending clarification".to_string()),
            (1, _) => Ok(DialogueState::AwaitingReply(items.remove(0))),
            (n, _) => Err(format!("at most one clarification may be pending, found {n}")),
        }
    }
}

// ============================================================================
// Query context
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryContext {
    pub session_id: Uuid,
    /// Text that opened the request
    pub original_text: String,
    /// Most recent user message
    pub user_input: String,
    pub request_type: RequestType,
    pub measurement_id: String,

    pub addresses: Vec<String>,
    pub address_matches: Vec<EntityMatch>,
    pub suggested_addresses: Vec<String>,
    /// More explicit properties than the request can use
    pub property_candidates: Vec<String>,
    pub candidate_terms: Vec<String>,
    pub unresolved_terms: Vec<String>,
    pub missing_addresses: Vec<String>,
    pub missing_tenants: Vec<String>,
    pub notes: Vec<String>,

    pub period: Option<String>,
    pub period_level: Option<PeriodLevel>,
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub month: Option<u8>,
    pub comparison_periods: Vec<String>,

    pub property_name: Option<String>,
    pub tenant_name: Option<String>,
    pub entity_name: Option<String>,
    pub aggregation_level: Option<AggregationLevel>,

    pub missing_requirements: Vec<Requirement>,
    pub needs_clarification: bool,
    /// Answered questions, oldest first
    pub answered: Vec<ClarificationItem>,
    #[serde(flatten)]
    pub dialogue: DialogueState,
}

impl QueryContext {
    pub fn new(text: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            original_text: text.to_string(),
            user_input: text.to_string(),
            ..Default::default()
        }
    }

    /// Start a new request in the same session
    pub fn restart(&mut self, text: &str) {
        *self = Self {
            session_id: self.session_id,
            original_text: text.to_string(),
            user_input: text.to_string(),
            ..Default::default()
        };
    }

    pub fn pending(&self) -> Option<&ClarificationItem> {
        self.dialogue.pending()
    }

    pub fn awaiting_user_reply(&self) -> bool {
        self.dialogue.is_awaiting()
    }

    /// Zero or one pending items
    pub fn clarifications(&self) -> &[ClarificationItem] {
        match &self.dialogue {
            DialogueState::New => &[],
            DialogueState::AwaitingReply(item) => std::slice::from_ref(item),
        }
    }

    /// Replace whatever is pending with `item`
    pub fn ask(&mut self, item: ClarificationItem) {
        self.dialogue = DialogueState::AwaitingReply(item);
    }

    /// Remove the pending item, leaving the context in `New`
    pub fn take_pending(&mut self) -> Option<ClarificationItem> {
        match mem::take(&mut self.dialogue) {
            DialogueState::New => None,
            DialogueState::AwaitingReply(item) => Some(item),
        }
    }

    pub fn apply_period(&mut self, period: Period) {
        self.period = Some(period.to_string());
        self.period_level = Some(period.level());
        self.year = Some(period.year());
        (self.quarter, self.month) = match period {
            Period::Year(_) => (None, None),
            Period::Quarter { quarter, .. } => (Some(quarter), None),
            Period::Month { month, .. } => (None, Some(month)),
        };
    }

    pub fn set_request_type(&mut self, request_type: RequestType) {
        self.request_type = request_type;
        self.measurement_id = request_type.measurement_id().to_string();
    }

    pub fn push_note(&mut self, note: String) {
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    /// Add a resolved property unless it is already present
    pub fn add_match(&mut self, m: EntityMatch) {
        if self.addresses.contains(&m.address) {
            return;
        }
        self.addresses.push(m.address.clone());
        if self.property_name.is_none() {
            self.property_name = Some(m.label().to_string());
        }
        self.address_matches.push(m);
    }
}
