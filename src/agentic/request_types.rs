//! Request types and their registry
//!
//! The set of request types is closed. Anything read from outside the
//! crate (model suggestions, API payloads) goes through
//! [`normalize_request_type`] or [`RequestType::from_str`] before it can
//! reach routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    PriceComparison,
    Pnl,
    AssetDetails,
    #[default]
    General,
    Clarification,
}

impl RequestType {
    pub const ALL: [RequestType; 5] = [
        RequestType::PriceComparison,
        RequestType::Pnl,
        RequestType::AssetDetails,
        RequestType::General,
        RequestType::Clarification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::PriceComparison => "price_comparison",
            RequestType::Pnl => "pnl",
            RequestType::AssetDetails => "asset_details",
            RequestType::General => "general",
            RequestType::Clarification => "clarification",
        }
    }

    pub fn definition(&self) -> &'static RequestDefinition {
        match self {
            RequestType::PriceComparison => &REGISTRY[0],
            RequestType::Pnl => &REGISTRY[1],
            RequestType::AssetDetails => &REGISTRY[2],
            RequestType::General => &REGISTRY[3],
            RequestType::Clarification => &REGISTRY[4],
        }
    }

    pub fn measurement_id(&self) -> &'static str {
        self.definition().measurement_id
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a request type string that is neither canonical nor an alias
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request type: {0}")]
pub struct ParseRequestTypeError(pub String);

impl FromStr for RequestType {
    type Err = ParseRequestTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        if let Some(t) = RequestType::ALL.iter().find(|t| t.as_str() == key) {
            return Ok(*t);
        }
        REQUEST_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, t)| *t)
            .ok_or_else(|| ParseRequestTypeError(s.to_string()))
    }
}

/// Loose spellings accepted for each request type
pub const REQUEST_ALIASES: &[(&str, RequestType)] = &[
    ("price", RequestType::PriceComparison),
    ("compare", RequestType::PriceComparison),
    ("comparison", RequestType::PriceComparison),
    ("valuation", RequestType::PriceComparison),
    ("p&l", RequestType::Pnl),
    ("profit", RequestType::Pnl),
    ("loss", RequestType::Pnl),
    ("details", RequestType::AssetDetails),
    ("asset", RequestType::AssetDetails),
    ("question", RequestType::Clarification),
];

/// Parse `value`, falling back to `default` for blank or unknown input
pub fn normalize_request_type(value: &str, default: RequestType) -> RequestType {
    value.parse().unwrap_or(default)
}

// ============================================================================
// Registry
// ============================================================================

/// Metadata describing how a request type behaves
#[derive(Debug, Clone, Serialize)]
pub struct RequestDefinition {
    pub request_type: RequestType,
    pub title: &'static str,
    pub description: &'static str,
    /// Phrases that suggest this type
    pub triggers: &'static [&'static str],
    /// Inputs a handler needs before it can run
    pub required_inputs: &'static [&'static str],
    /// Shown when the inputs cannot be collected
    pub fallback_hint: &'static str,
    /// Stable id attached to routed requests and log spans
    pub measurement_id: &'static str,
}

impl RequestDefinition {
    pub fn matches_text(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.triggers.iter().any(|t| lowered.contains(t))
    }
}

static REGISTRY: [RequestDefinition; 5] = [
    RequestDefinition {
        request_type: RequestType::PriceComparison,
        title: "Price Comparison",
        description: "Compare valuations between two properties.",
        triggers: &["compare", "comparison", "price", "value", "worth", "valuation", "versus", "vs"],
        required_inputs: &["address_a", "address_b"],
        fallback_hint: "Please mention two portfolio properties so I can compare them.",
        measurement_id: "M1",
    },
    RequestDefinition {
        request_type: RequestType::Pnl,
        title: "Profit & Loss",
        description: "Aggregate P&L (revenue, expenses, NOI) for a time period.",
        triggers: &["p&l", "pnl", "profit", "loss", "income", "revenue", "expense", "ledger", "noi"],
        required_inputs: &["timeframe"],
        fallback_hint: "Specify a month, quarter, or year so I can compute P&L.",
        measurement_id: "M2",
    },
    RequestDefinition {
        request_type: RequestType::AssetDetails,
        title: "Asset Details",
        description: "Return a snapshot for a single property.",
        triggers: &["detail", "describe", "tell me about", "info", "tenant", "occupancy", "list"],
        required_inputs: &["address"],
        fallback_hint: "Let me know which property you want details for.",
        measurement_id: "M3",
    },
    RequestDefinition {
        request_type: RequestType::General,
        title: "General Knowledge",
        description: "High-level questions: definitions, ledger explanations, how-to.",
        triggers: &["what is", "explain", "meaning of", "definition", "how does", "help me understand"],
        required_inputs: &[],
        fallback_hint: "Ask me something about the portfolio, metrics, or ledger codes.",
        measurement_id: "M4",
    },
    RequestDefinition {
        request_type: RequestType::Clarification,
        title: "Clarification",
        description: "Ask the user for more information.",
        triggers: &[],
        required_inputs: &[],
        fallback_hint: "Please share more context so I can help.",
        measurement_id: "M5",
    },
];

pub fn all_request_definitions() -> &'static [RequestDefinition] {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lines_up_with_types() {
        for t in RequestType::ALL {
            assert_eq!(t.definition().request_type, t);
        }
        assert_eq!(all_request_definitions().len(), RequestType::ALL.len());
        assert_eq!(RequestType::Pnl.measurement_id(), "M2");
        assert_eq!(RequestType::Clarification.measurement_id(), "M5");
    }

    #[test]
    fn test_parse_canonical_and_aliases() {
        assert_eq!("price_comparison".parse::<RequestType>(), Ok(RequestType::PriceComparison));
        assert_eq!(" P&L ".parse::<RequestType>(), Ok(RequestType::Pnl));
        assert_eq!("asset".parse::<RequestType>(), Ok(RequestType::AssetDetails));
        assert_eq!("question".parse::<RequestType>(), Ok(RequestType::Clarification));
        assert!("unsupported".parse::<RequestType>().is_err());
    }

    #[test]
    fn test_normalize_falls_back_to_default() {
        assert_eq!(normalize_request_type("", RequestType::General), RequestType::General);
        assert_eq!(
            normalize_request_type("weather", RequestType::Clarification),
            RequestType::Clarification
        );
        assert_eq!(normalize_request_type("compare", RequestType::General), RequestType::PriceComparison);
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&RequestType::AssetDetails).unwrap(),
            "\"asset_details\""
        );
        let t: RequestType = serde_json::from_str("\"pnl\"").unwrap();
        assert_eq!(t, RequestType::Pnl);
    }

    #[test]
    fn test_matches_text() {
        assert!(RequestType::Pnl.definition().matches_text("Show the NOI"));
        assert!(!RequestType::Clarification.definition().matches_text("anything"));
    }
}
