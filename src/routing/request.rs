//! Fully resolved requests handed to specialist handlers

use serde::{Deserialize, Serialize};

use crate::agentic::RequestType;
use crate::dialogue::{AggregationLevel, QueryContext};
use crate::error::RouteError;
use crate::slots::PeriodLevel;

/// Filters forwarded to the financial aggregation service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlFilters {
    /// Empty means the whole portfolio
    pub addresses: Vec<String>,
    pub tenant_name: Option<String>,
    /// Canonical period; `None` when a comparison pair is set
    pub period: Option<String>,
    pub period_level: Option<PeriodLevel>,
    pub comparison_periods: Option<(String, String)>,
    pub aggregation_level: Option<AggregationLevel>,
}

impl PnlFilters {
    /// Short human label, e.g. "Building 180, 2025-M03"
    pub fn label(&self) -> String {
        let scope = if self.addresses.is_empty() {
            "portfolio".to_string()
        } else {
            self.addresses.join(" + ")
        };
        let when = match (&self.comparison_periods, &self.period) {
            (Some((a, b)), _) => format!("{a} vs {b}"),
            (None, Some(period)) => period.clone(),
            (None, None) => "all periods".to_string(),
        };
        match &self.tenant_name {
            Some(tenant) => format!("{scope} ({tenant}), {when}"),
            None => format!("{scope}, {when}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum RoutedRequest {
    PriceComparison { addresses: [String; 2] },
    Pnl(PnlFilters),
    AssetDetails { address: String, tenant_name: Option<String> },
    General { question: String },
    Clarification { text: String },
}

impl RoutedRequest {
    pub fn request_type(&self) -> RequestType {
        match self {
            RoutedRequest::PriceComparison { .. } => RequestType::PriceComparison,
            RoutedRequest::Pnl(_) => RequestType::Pnl,
            RoutedRequest::AssetDetails { .. } => RequestType::AssetDetails,
            RoutedRequest::General { .. } => RequestType::General,
            RoutedRequest::Clarification { .. } => RequestType::Clarification,
        }
    }

    pub fn measurement_id(&self) -> &'static str {
        self.request_type().measurement_id()
    }

    /// Build from a context with no open requirements
    pub fn from_context(ctx: &QueryContext) -> Result<Self, RouteError> {
        if !ctx.missing_requirements.is_empty() {
            let missing: Vec<&str> = ctx.missing_requirements.iter().map(|r| r.as_str()).collect();
            return Err(RouteError::Incomplete(missing.join(", ")));
        }

        let request = match ctx.request_type {
            RequestType::PriceComparison => match ctx.addresses.as_slice() {
                [first, second, ..] => RoutedRequest::PriceComparison {
                    addresses: [first.clone(), second.clone()],
                },
                _ => return Err(RouteError::Incomplete("second_property".to_string())),
            },
            RequestType::Pnl => {
                let comparison_periods = match ctx.comparison_periods.as_slice() {
                    [a, b] => Some((a.clone(), b.clone())),
                    _ => None,
                };
                RoutedRequest::Pnl(PnlFilters {
                    addresses: ctx.addresses.clone(),
                    tenant_name: ctx.tenant_name.clone(),
                    period: if comparison_periods.is_some() { None } else { ctx.period.clone() },
                    period_level: ctx.period_level,
                    comparison_periods,
                    aggregation_level: ctx.aggregation_level,
                })
            }
            RequestType::AssetDetails => match ctx.addresses.first() {
                Some(address) => RoutedRequest::AssetDetails {
                    address: address.clone(),
                    tenant_name: ctx.tenant_name.clone(),
                },
                None => return Err(RouteError::Incomplete("property".to_string())),
            },
            RequestType::General => RoutedRequest::General {
                question: ctx.original_text.clone(),
            },
            RequestType::Clarification => RoutedRequest::Clarification {
                text: ctx.original_text.clone(),
            },
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Requirement;

    #[test]
    fn test_pnl_from_context() {
        let ctx = QueryContext {
            request_type: RequestType::Pnl,
            addresses: vec!["Building 180".to_string()],
            period: Some("2025-M03".to_string()),
            period_level: Some(PeriodLevel::Month),
            ..Default::default()
        };
        let routed = RoutedRequest::from_context(&ctx).unwrap();
        assert_eq!(routed.measurement_id(), "M2");
        let RoutedRequest::Pnl(filters) = &routed else {
            panic!("expected pnl route, got {routed:?}");
        };
        assert_eq!(filters.label(), "Building 180, 2025-M03");

        let json = serde_json::to_value(&routed).unwrap();
        assert_eq!(json["route"], "pnl");
        assert_eq!(json["period"], "2025-M03");
    }

    #[test]
    fn test_comparison_pair_replaces_period() {
        let ctx = QueryContext {
            request_type: RequestType::Pnl,
            period: Some("2025-Q1".to_string()),
            comparison_periods: vec!["2025-Q1".to_string(), "2025-Q2".to_string()],
            ..Default::default()
        };
        let RoutedRequest::Pnl(filters) = RoutedRequest::from_context(&ctx).unwrap() else {
            panic!("expected pnl route");
        };
        assert_eq!(filters.period, None);
        assert_eq!(filters.label(), "portfolio, 2025-Q1 vs 2025-Q2");
    }

    #[test]
    fn test_incomplete_context_is_rejected() {
        let ctx = QueryContext {
            request_type: RequestType::Pnl,
            missing_requirements: vec![Requirement::Period],
            ..Default::default()
        };
        assert!(matches!(
            RoutedRequest::from_context(&ctx),
            Err(RouteError::Incomplete(missing)) if missing == "period"
        ));

        let single = QueryContext {
            request_type: RequestType::PriceComparison,
            addresses: vec!["Building 120".to_string()],
            ..Default::default()
        };
        assert!(RoutedRequest::from_context(&single).is_err());
    }

    #[test]
    fn test_price_comparison_route() {
        let ctx = QueryContext {
            request_type: RequestType::PriceComparison,
            addresses: vec!["Building 120".to_string(), "Building 160".to_string()],
            ..Default::default()
        };
        assert_eq!(
            RoutedRequest::from_context(&ctx).unwrap(),
            RoutedRequest::PriceComparison {
                addresses: ["Building 120".to_string(), "Building 160".to_string()]
            }
        );
    }
}
