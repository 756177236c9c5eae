//! Missing-slot computation
//!
//! [`compute_missing`] is used on the opening turn and after every answer;
//! a request routes only when it comes back empty.

use super::types::{QueryContext, Requirement};
use crate::agentic::RequestType;
use crate::clarify::ClarificationField;
use crate::slots::{Period, PeriodLevel};

/// Requirements still open for `ctx`, in discovery order
pub fn compute_missing(ctx: &QueryContext) -> Vec<Requirement> {
    let mut missing: Vec<Requirement> = Vec::new();
    let mut require = |r: Requirement| {
        if !missing.contains(&r) {
            missing.push(r);
        }
    };

    match ctx.request_type {
        RequestType::PriceComparison => {
            if ctx.property_candidates.len() > 2 {
                require(Requirement::PropertySelection);
            } else if ctx.addresses.len() < 2 {
                require(Requirement::SecondProperty);
            }
        }
        RequestType::AssetDetails => {
            if ctx.addresses.is_empty() {
                require(Requirement::Property);
            }
            if needs_tenant(ctx) {
                require(Requirement::TenantName);
            }
        }
        RequestType::Pnl => {
            let has_pair = ctx.comparison_periods.len() == 2;
            if ctx.period.is_none() && !has_pair {
                if ctx.comparison_periods.is_empty() {
                    require(Requirement::Period);
                } else {
                    require(Requirement::ComparisonPeriods);
                }
            }
            // a named property that does not exist is not a portfolio-wide request
            if ctx.addresses.is_empty() && !ctx.missing_addresses.is_empty() {
                require(Requirement::Property);
            }
            if needs_tenant(ctx) {
                require(Requirement::TenantName);
            }
            if needs_aggregation_level(ctx) {
                require(Requirement::AggregationLevel);
            }
        }
        RequestType::General | RequestType::Clarification => {}
    }

    if !ctx.comparison_periods.is_empty() && ctx.comparison_periods.len() != 2 {
        require(Requirement::ComparisonPeriods);
    }
    missing
}

fn needs_tenant(ctx: &QueryContext) -> bool {
    ctx.tenant_name.is_none() && !ctx.missing_tenants.is_empty()
}

fn needs_aggregation_level(ctx: &QueryContext) -> bool {
    ctx.aggregation_level.is_none()
        && ctx.tenant_name.is_none()
        && !ctx.addresses.is_empty()
        && (year_period(ctx) || year_comparison(ctx))
}

fn year_period(ctx: &QueryContext) -> bool {
    ctx.period.is_some() && ctx.period_level == Some(PeriodLevel::Year)
}

/// Two whole years side by side, e.g. 2024 versus 2025
fn year_comparison(ctx: &QueryContext) -> bool {
    ctx.comparison_periods.len() == 2
        && ctx
            .comparison_periods
            .iter()
            .all(|p| matches!(p.parse::<Period>(), Ok(Period::Year(_))))
}

/// The requirement to ask about first
pub fn next_field(missing: &[Requirement]) -> Option<ClarificationField> {
    missing.iter().map(Requirement::field).min_by_key(ClarificationField::priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pnl() -> QueryContext {
        QueryContext {
            request_type: RequestType::Pnl,
            addresses: vec!["Building 180".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_pnl_needs_period() {
        assert_eq!(compute_missing(&pnl()), vec![Requirement::Period]);
    }

    #[test]
    fn test_pnl_month_is_complete() {
        let mut ctx = pnl();
        ctx.apply_period(crate::slots::Period::Month { year: 2025, month: 3 });
        assert!(compute_missing(&ctx).is_empty());
    }

    #[test]
    fn test_year_level_property_needs_aggregation() {
        let mut ctx = pnl();
        ctx.apply_period(crate::slots::Period::Year(2025));
        assert_eq!(compute_missing(&ctx), vec![Requirement::AggregationLevel]);

        ctx.tenant_name = Some("Tenant 14".to_string());
        assert!(compute_missing(&ctx).is_empty());

        ctx.tenant_name = None;
        ctx.addresses.clear();
        assert!(compute_missing(&ctx).is_empty());
    }

    #[test]
    fn test_year_comparison_needs_aggregation() {
        let mut ctx = pnl();
        ctx.comparison_periods = vec!["2024".to_string(), "2025".to_string()];
        assert_eq!(compute_missing(&ctx), vec![Requirement::AggregationLevel]);

        ctx.aggregation_level = Some(crate::dialogue::AggregationLevel::Combined);
        assert!(compute_missing(&ctx).is_empty());

        // quarters are already a breakdown
        ctx.aggregation_level = None;
        ctx.comparison_periods = vec!["2025-Q1".to_string(), "2025".to_string()];
        assert!(compute_missing(&ctx).is_empty());
    }

    #[test]
    fn test_granularity_alone_is_not_a_period() {
        let mut ctx = pnl();
        ctx.period_level = Some(PeriodLevel::Year);
        assert_eq!(compute_missing(&ctx), vec![Requirement::Period]);
    }

    #[test]
    fn test_comparison_shape() {
        let mut ctx = pnl();
        ctx.comparison_periods = vec!["2025-Q1".to_string(), "2025-Q2".to_string()];
        assert!(compute_missing(&ctx).is_empty());

        ctx.comparison_periods = vec!["2025-Q1".to_string()];
        assert_eq!(compute_missing(&ctx), vec![Requirement::ComparisonPeriods]);

        let general = QueryContext {
            comparison_periods: vec!["2025".to_string(); 3],
            ..Default::default()
        };
        assert_eq!(compute_missing(&general), vec![Requirement::ComparisonPeriods]);
    }

    #[test]
    fn test_price_comparison() {
        let mut ctx = QueryContext {
            request_type: RequestType::PriceComparison,
            addresses: vec!["Building 120".to_string()],
            ..Default::default()
        };
        assert_eq!(compute_missing(&ctx), vec![Requirement::SecondProperty]);

        ctx.addresses.push("Building 160".to_string());
        assert!(compute_missing(&ctx).is_empty());

        ctx.property_candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(compute_missing(&ctx), vec![Requirement::PropertySelection]);
    }

    #[test]
    fn test_asset_details_and_tenant() {
        let ctx = QueryContext {
            request_type: RequestType::AssetDetails,
            missing_tenants: vec!["Tenant 99".to_string()],
            ..Default::default()
        };
        assert_eq!(compute_missing(&ctx), vec![Requirement::Property, Requirement::TenantName]);
        assert_eq!(
            next_field(&compute_missing(&ctx)),
            Some(ClarificationField::PropertyName)
        );
    }

    #[test]
    fn test_next_field_priority() {
        let missing = [
            Requirement::ComparisonPeriods,
            Requirement::AggregationLevel,
            Requirement::TenantName,
            Requirement::Period,
        ];
        assert_eq!(next_field(&missing), Some(ClarificationField::Period));
        assert_eq!(next_field(&missing[..2]), Some(ClarificationField::AggregationLevel));
        assert_eq!(next_field(&[]), None);
    }

    #[test]
    fn test_general_has_no_requirements() {
        assert!(compute_missing(&QueryContext::default()).is_empty());
    }
}
