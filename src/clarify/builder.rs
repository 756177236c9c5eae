//! One question per missing slot
//!
//! [`build`] turns a single [`ClarificationField`] into the question the
//! supervisor stores as its pending item. The field decides the phrasing,
//! the answer kind and the options offered.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialogue::QueryContext;
use crate::slots::PeriodLevel;

/// Maximum number of suggested properties offered as options
pub const MAX_SUGGESTIONS: usize = 3;

pub const GRANULARITY_OPTIONS: [&str; 3] = ["month", "quarter", "year"];
pub const AGGREGATION_OPTIONS: [&str; 3] = ["tenant", "property", "combined"];

/// Slot a clarification question resolves
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClarificationField {
    PropertyName,
    PropertySelection,
    Period,
    TenantName,
    AggregationLevel,
    ComparisonPeriods,
    Other(String),
}

impl ClarificationField {
    pub fn as_str(&self) -> &str {
        match self {
            ClarificationField::PropertyName => "property_name",
            ClarificationField::PropertySelection => "property_selection",
            ClarificationField::Period => "period",
            ClarificationField::TenantName => "tenant_name",
            ClarificationField::AggregationLevel => "aggregation_level",
            ClarificationField::ComparisonPeriods => "comparison_periods",
            ClarificationField::Other(name) => name,
        }
    }

    /// Lower asks first
    pub fn priority(&self) -> u8 {
        match self {
            ClarificationField::PropertyName | ClarificationField::PropertySelection => 0,
            ClarificationField::Period => 1,
            ClarificationField::TenantName => 2,
            ClarificationField::AggregationLevel => 3,
            ClarificationField::ComparisonPeriods => 4,
            ClarificationField::Other(_) => 5,
        }
    }
}

impl fmt::Display for ClarificationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ClarificationField {
    fn from(value: String) -> Self {
        match value.as_str() {
            "property_name" | "property" | "second_property" => ClarificationField::PropertyName,
            "property_selection" => ClarificationField::PropertySelection,
            "period" => ClarificationField::Period,
            "tenant_name" => ClarificationField::TenantName,
            "aggregation_level" => ClarificationField::AggregationLevel,
            "comparison_periods" => ClarificationField::ComparisonPeriods,
            _ => ClarificationField::Other(value),
        }
    }
}

impl From<ClarificationField> for String {
    fn from(field: ClarificationField) -> Self {
        field.as_str().to_string()
    }
}

/// How an answer is expected to look
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationKind {
    /// Free text
    Value,
    /// One of `options`
    Choice,
    /// A period granularity word
    Granularity,
}

/// A single pending question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationItem {
    pub field: ClarificationField,
    pub question: String,
    pub kind: ClarificationKind,
    #[serde(default)]
    pub options: Vec<String>,
    /// The user's answer, once given
    #[serde(default)]
    pub value: Option<String>,
}

impl ClarificationItem {
    pub fn new(field: ClarificationField, kind: ClarificationKind, question: impl Into<String>) -> Self {
        Self {
            field,
            question: question.into(),
            kind,
            options: Vec::new(),
            value: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_answered(&self) -> bool {
        self.value.is_some()
    }
}

fn quoted_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

fn period_example(level: PeriodLevel, year: Option<i32>) -> String {
    let year = year.unwrap_or(2025);
    match level {
        PeriodLevel::Year => format!("Which year should I use? For example: {year}."),
        PeriodLevel::Quarter => format!("Which quarter should I use? For example: Q1 {year}."),
        PeriodLevel::Month => format!("Which month should I use? For example: March {year}."),
    }
}

/// Build the question for `field`.
///
/// `suggestions` are offered as options where the field takes a property or
/// tenant; at most [`MAX_SUGGESTIONS`] are kept.
pub fn build(field: &ClarificationField, ctx: &QueryContext, suggestions: &[String]) -> ClarificationItem {
    let offered = || suggestions.iter().take(MAX_SUGGESTIONS).cloned().collect::<Vec<_>>();

    match field {
        ClarificationField::PropertyName => {
            let question = if !ctx.missing_addresses.is_empty() {
                format!(
                    "I couldn't find {} in the portfolio. Which property did you mean?",
                    quoted_list(&ctx.missing_addresses)
                )
            } else if let Some(first) = ctx.addresses.first() {
                format!("Which property should I compare with {first}?")
            } else {
                "Which property are you asking about?".to_string()
            };
            ClarificationItem::new(field.clone(), ClarificationKind::Value, question).with_options(offered())
        }
        ClarificationField::PropertySelection => ClarificationItem::new(
            field.clone(),
            ClarificationKind::Choice,
            "I found more than two matching properties. Which two should I compare?",
        )
        .with_options(suggestions.iter().cloned()),
        ClarificationField::Period => match ctx.period_level {
            None => ClarificationItem::new(
                field.clone(),
                ClarificationKind::Granularity,
                "Which period should I use? You can answer with a month, a quarter or a year.",
            )
            .with_options(GRANULARITY_OPTIONS),
            Some(level) => {
                ClarificationItem::new(field.clone(), ClarificationKind::Value, period_example(level, ctx.year))
            }
        },
        ClarificationField::AggregationLevel => {
            let scope = match (&ctx.period, ctx.comparison_periods.as_slice(), ctx.addresses.first()) {
                (Some(period), _, Some(address)) => format!("the {period} total for {address}"),
                (Some(period), _, None) => format!("the {period} total"),
                (None, [a, b], Some(address)) => format!("the {a} and {b} totals for {address}"),
                _ => "the total".to_string(),
            };
            ClarificationItem::new(
                field.clone(),
                ClarificationKind::Choice,
                format!("Should {scope} be reported per tenant, per property or combined?"),
            )
            .with_options(AGGREGATION_OPTIONS)
        }
        ClarificationField::ComparisonPeriods => ClarificationItem::new(
            field.clone(),
            ClarificationKind::Value,
            "Which two periods should I compare? For example: Q1 2025 and Q2 2025.",
        ),
        ClarificationField::TenantName => {
            let question = if ctx.missing_tenants.is_empty() {
                "Which tenant are you asking about?".to_string()
            } else {
                format!(
                    "I couldn't find {} among the tenants. Which tenant did you mean?",
                    quoted_list(&ctx.missing_tenants)
                )
            };
            ClarificationItem::new(field.clone(), ClarificationKind::Value, question).with_options(offered())
        }
        ClarificationField::Other(name) => ClarificationItem::new(
            field.clone(),
            ClarificationKind::Value,
            format!("Please share the missing details ({}) so I can continue.", name.replace('_', " ")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_without_level_asks_granularity() {
        let item = build(&ClarificationField::Period, &QueryContext::default(), &[]);
        assert_eq!(item.kind, ClarificationKind::Granularity);
        assert_eq!(item.options, vec!["month", "quarter", "year"]);
        assert!(item.value.is_none());
    }

    #[test]
    fn test_period_with_level_asks_value() {
        let ctx = QueryContext {
            period_level: Some(PeriodLevel::Quarter),
            ..Default::default()
        };
        let item = build(&ClarificationField::Period, &ctx, &[]);
        assert_eq!(item.kind, ClarificationKind::Value);
        assert!(item.question.contains("Q1 2025"));
        assert!(item.options.is_empty());
    }

    #[test]
    fn test_property_question_lists_missing_and_caps_options() {
        let ctx = QueryContext {
            missing_addresses: vec!["Building 999".to_string(), "Building 998".to_string()],
            ..Default::default()
        };
        let suggestions: Vec<String> = (1..=5).map(|n| format!("Building {n}")).collect();
        let item = build(&ClarificationField::PropertyName, &ctx, &suggestions);
        assert_eq!(
            item.question,
            "I couldn't find 'Building 999' or 'Building 998' in the portfolio. Which property did you mean?"
        );
        assert_eq!(item.options.len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_second_property_question() {
        let ctx = QueryContext {
            addresses: vec!["Building 120".to_string()],
            ..Default::default()
        };
        let item = build(&ClarificationField::PropertyName, &ctx, &[]);
        assert_eq!(item.question, "Which property should I compare with Building 120?");
    }

    #[test]
    fn test_aggregation_choice() {
        let ctx = QueryContext {
            period: Some("2025".to_string()),
            addresses: vec!["Building 180".to_string()],
            ..Default::default()
        };
        let item = build(&ClarificationField::AggregationLevel, &ctx, &[]);
        assert_eq!(item.kind, ClarificationKind::Choice);
        assert_eq!(item.options, vec!["tenant", "property", "combined"]);
        assert!(item.question.contains("2025 total for Building 180"));
    }

    #[test]
    fn test_unknown_field_falls_back() {
        let field = ClarificationField::from("lease_term".to_string());
        let item = build(&field, &QueryContext::default(), &[]);
        assert_eq!(item.question, "Please share the missing details (lease term) so I can continue.");
    }

    #[test]
    fn test_field_serializes_as_name() {
        let json = serde_json::to_string(&ClarificationField::AggregationLevel).unwrap();
        assert_eq!(json, "\"aggregation_level\"");
        let field: ClarificationField = serde_json::from_str("\"second_property\"").unwrap();
        assert_eq!(field, ClarificationField::PropertyName);
        assert!(ClarificationField::PropertyName.priority() < ClarificationField::Period.priority());
    }
}
