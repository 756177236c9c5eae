//! Intent Classifier
//!
//! Deterministic keyword rules produce a baseline [`ClassificationResult`].
//! An optional [`ClassificationEnhancer`] may then refine it:
//!
//! 1. Rule pass over the lowercased text (ordered keyword sets)
//! 2. Hard rule: P&L keyword + property/tenant + period forces `pnl`
//! 3. Optional suggestion, validated first, merged with rule entries winning
//!
//! The merge never propagates an error. Any enhancement failure leaves the
//! rule result untouched.

use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enhancer::{ClassificationEnhancer, ValidatedSuggestion};
use super::request_types::RequestType;
use crate::entity_linking::EntityCatalog;
use crate::patterns::{tenant_references, STREET_RE};
use crate::slots::{extract_addresses, extract_periods_at, extract_tenant_names, local_today};

/// Upper bound on address phrases carried by one classification
const MAX_ADDRESSES: usize = 4;

static PNL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bp\s*&\s*l\b|\bpnl\b|\bprofits?\b|\bloss(?:es)?\b|\brevenues?\b|\bexpenses?\b|\bnoi\b|\bincome\b|\bledger\b",
    )
    .unwrap()
});

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:prices?|priced|pricing|worth|values?|valued|valuations?)\b").unwrap()
});

static COMPARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:compare[sd]?|comparing|comparison|versus|vs|difference|between|against)\b")
        .unwrap()
});

static ASSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:details?|describe|tell me about|info|information|tenants?|list|occupancy|which properties)\b",
    )
    .unwrap()
});

static GENERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:what is|what's|what does|meaning of|definition|explain|how does|how is|help me understand)\b",
    )
    .unwrap()
});

/// Lexical signals behind a rule decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleSignals {
    pub has_pnl: bool,
    pub has_price: bool,
    pub has_compare: bool,
    pub has_asset_term: bool,
    /// An address phrase or a tenant was found
    pub has_property: bool,
    /// A period or a complete two-period comparison was found
    pub has_period: bool,
    pub general_question: bool,
}

impl RuleSignals {
    /// Highest-precedence rule in the system
    pub fn hard_rule(&self) -> bool {
        self.has_pnl && self.has_property && self.has_period
    }
}

/// Output of one classification call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub request_type: RequestType,
    /// Canonical addresses where known, raw phrases otherwise
    pub addresses: Vec<String>,
    /// Canonical period string
    pub period: Option<String>,
    /// Empty or exactly two canonical periods once validated
    pub comparison_periods: Vec<String>,
    pub missing_fields: Vec<String>,
    pub needs_clarification: bool,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub llm_used: bool,
    #[serde(skip)]
    pub signals: RuleSignals,
}

impl ClassificationResult {
    fn refresh_missing(&mut self) {
        self.missing_fields = missing_fields(self);
        self.needs_clarification =
            !self.missing_fields.is_empty() || self.request_type == RequestType::Clarification;
    }
}

/// Slots a classification still lacks, by request type
pub fn missing_fields(result: &ClassificationResult) -> Vec<String> {
    let mut missing: Vec<&str> = Vec::new();
    let comparison_invalid = !result.comparison_periods.is_empty() && result.comparison_periods.len() != 2;

    match result.request_type {
        RequestType::Pnl => {
            if result.period.is_none() && result.comparison_periods.len() != 2 {
                missing.push(if comparison_invalid { "comparison_periods" } else { "period" });
            }
        }
        RequestType::PriceComparison if result.addresses.len() < 2 => missing.push("second_property"),
        RequestType::AssetDetails if result.addresses.is_empty() => missing.push("property"),
        _ => {}
    }
    if comparison_invalid && !missing.contains(&"comparison_periods") {
        missing.push("comparison_periods");
    }
    missing.into_iter().map(String::from).collect()
}

/// Rule-based classifier with an optional model step
#[derive(Default, Clone)]
pub struct IntentClassifier {
    enhancer: Option<Arc<dyn ClassificationEnhancer>>,
    today: Option<NaiveDate>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn ClassificationEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Pin the date relative periods resolve against
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(local_today)
    }

    pub fn has_enhancer(&self) -> bool {
        self.enhancer.is_some()
    }

    /// Classify `text`, consulting the enhancer when one is configured
    pub async fn classify(&self, text: &str, catalog: &EntityCatalog) -> ClassificationResult {
        let baseline = self.classify_rules(text, catalog);
        let Some(enhancer) = &self.enhancer else {
            return baseline;
        };
        if text.trim().is_empty() {
            return baseline;
        }

        match enhancer.suggest(text).await {
            Ok(suggestion) => merge_suggestion(baseline, suggestion.validate()),
            Err(e) => {
                tracing::warn!(
                    enhancer = enhancer.name(),
                    reason = %e,
                    "classification enhancement unavailable, using rule result"
                );
                baseline
            }
        }
    }

    /// Rule pass only
    pub fn classify_rules(&self, text: &str, catalog: &EntityCatalog) -> ClassificationResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            let mut result = ClassificationResult {
                request_type: RequestType::Clarification,
                ..Default::default()
            };
            result.refresh_missing();
            return result;
        }

        let mut addresses: Vec<String> = extract_addresses(text, catalog, MAX_ADDRESSES)
            .iter()
            .map(|a| a.value().to_string())
            .collect();
        for m in STREET_RE.find_iter(text) {
            let street = m.as_str().trim().to_string();
            if addresses.len() < MAX_ADDRESSES && !addresses.iter().any(|a| a.eq_ignore_ascii_case(&street)) {
                addresses.push(street);
            }
        }

        let tenant_name = extract_tenant_names(text, catalog, 1).into_iter().next();
        let has_tenant_reference = tenant_name.is_some() || !tenant_references(text).is_empty();

        let periods: Vec<String> = extract_periods_at(text, self.today())
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        let has_compare = COMPARE_RE.is_match(text);
        let comparison_periods: Vec<String> = if has_compare && periods.len() >= 2 {
            periods[..2].to_vec()
        } else {
            Vec::new()
        };
        let period = if comparison_periods.is_empty() {
            periods.first().cloned()
        } else {
            None
        };

        let signals = RuleSignals {
            has_pnl: PNL_RE.is_match(text),
            has_price: PRICE_RE.is_match(text),
            has_compare,
            has_asset_term: ASSET_RE.is_match(text),
            has_property: !addresses.is_empty() || has_tenant_reference,
            has_period: period.is_some() || comparison_periods.len() == 2,
            general_question: GENERAL_RE.is_match(text),
        };

        let request_type = rule_request_type(&signals, addresses.len(), trimmed);
        let mut result = ClassificationResult {
            request_type,
            addresses,
            period,
            comparison_periods,
            tenant_name,
            signals,
            ..Default::default()
        };
        result.refresh_missing();

        tracing::debug!(
            request_type = %result.request_type,
            addresses = ?result.addresses,
            period = ?result.period,
            hard_rule = signals.hard_rule(),
            "rule classification"
        );
        result
    }
}

fn rule_request_type(signals: &RuleSignals, address_count: usize, text: &str) -> RequestType {
    if signals.hard_rule() {
        return RequestType::Pnl;
    }

    let general_only = signals.general_question && !signals.has_property && !signals.has_period;
    let any_signal = signals.has_pnl
        || signals.has_price
        || signals.has_compare
        || signals.has_asset_term
        || signals.has_property
        || signals.has_period
        || signals.general_question;

    if general_only {
        RequestType::General
    } else if signals.has_pnl {
        RequestType::Pnl
    } else if signals.has_compare && address_count >= 2 {
        RequestType::PriceComparison
    } else if signals.has_price {
        RequestType::PriceComparison
    } else if signals.has_asset_term && signals.has_property {
        RequestType::AssetDetails
    } else if !any_signal && text.split_whitespace().count() < 3 {
        RequestType::Clarification
    } else {
        RequestType::General
    }
}

fn union_into(target: &mut Vec<String>, incoming: Vec<String>) {
    for value in incoming {
        if !target.iter().any(|t| t.eq_ignore_ascii_case(&value)) {
            target.push(value);
        }
    }
}

/// Merge a validated suggestion into a rule result.
///
/// Rule entries win list conflicts; the suggested request type applies only
/// when the hard rule does not fire.
pub fn merge_suggestion(mut result: ClassificationResult, suggestion: ValidatedSuggestion) -> ClassificationResult {
    union_into(&mut result.addresses, suggestion.addresses);
    result.addresses.truncate(MAX_ADDRESSES);
    union_into(&mut result.notes, suggestion.notes);

    if result.comparison_periods.len() != 2 && suggestion.comparison_periods.len() == 2 {
        result.comparison_periods = suggestion.comparison_periods;
    }
    if result.comparison_periods.len() == 2 {
        result.period = None;
    } else if result.period.is_none() {
        result.period = suggestion.period;
    }
    result.tenant_name = result.tenant_name.or(suggestion.tenant_name);
    result.entity_name = result.entity_name.or(suggestion.entity_name);

    let hard_rule = result.signals.has_pnl
        && result.signals.has_property
        && (result.signals.has_period || result.comparison_periods.len() == 2);
    if hard_rule {
        result.request_type = RequestType::Pnl;
    } else if let Some(suggested) = suggestion.request_type {
        result.request_type = suggested;
    }

    result.llm_used = true;
    result.refresh_missing();
    result
}
