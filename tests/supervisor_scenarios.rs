//! End-to-end dialogue scenarios against the sample dataset
//!
//! Run with: cargo test --test supervisor_scenarios

mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use portfolio_router::agentic::{ClassificationEnhancer, ModelSuggestion};
use portfolio_router::clarify::{ClarificationField, ClarificationKind};
use portfolio_router::dialogue::{AggregationLevel, Requirement};
use portfolio_router::routing::PnlFilters;
use portfolio_router::slots::PeriodLevel;
use portfolio_router::{EnhancementError, IntentClassifier, RequestType, RoutedRequest, Supervisor};

#[tokio::test]
async fn test_pnl_with_property_and_month_routes() {
    let sup = helpers::supervisor();
    let (ctx, outcome) = sup.start("Show me the P&L for Building 180 for March 2025.").await;

    assert_eq!(ctx.request_type, RequestType::Pnl);
    assert_eq!(ctx.measurement_id, "M2");
    assert_eq!(ctx.addresses, vec!["Building 180"]);
    assert_eq!(ctx.period.as_deref(), Some("2025-M03"));
    assert_eq!((ctx.year, ctx.month), (Some(2025), Some(3)));
    assert!(ctx.missing_requirements.is_empty());
    assert!(!ctx.needs_clarification);
    assert!(!ctx.awaiting_user_reply());
    assert_eq!(
        outcome.routed(),
        Some(&RoutedRequest::Pnl(PnlFilters {
            addresses: vec!["Building 180".to_string()],
            period: Some("2025-M03".to_string()),
            period_level: Some(PeriodLevel::Month),
            ..Default::default()
        }))
    );
}

#[tokio::test]
async fn test_pnl_without_period_asks_granularity() {
    let sup = helpers::supervisor();
    let (ctx, outcome) = sup.start("Give me the P&L for Building 180.").await;

    assert_eq!(ctx.request_type, RequestType::Pnl);
    assert!(ctx.missing_requirements.contains(&Requirement::Period));
    assert!(ctx.awaiting_user_reply());

    let item = outcome.clarification().expect("a clarification");
    assert_eq!(item.field, ClarificationField::Period);
    assert_eq!(item.kind, ClarificationKind::Granularity);
    assert_eq!(item.options, vec!["month", "quarter", "year"]);
    assert_eq!(ctx.clarifications(), std::slice::from_ref(item));
}

#[tokio::test]
async fn test_two_known_buildings_compare_without_clarification() {
    let sup = helpers::supervisor();
    let (ctx, outcome) = sup.start("Compare Building 120 and Building 160.").await;

    assert_eq!(ctx.request_type, RequestType::PriceComparison);
    assert_eq!(ctx.addresses, vec!["Building 120", "Building 160"]);
    assert!(ctx.address_matches.iter().all(|m| m.confidence == 1.0));
    assert!(ctx.clarifications().is_empty());
    assert_eq!(
        outcome.routed(),
        Some(&RoutedRequest::PriceComparison {
            addresses: ["Building 120".to_string(), "Building 160".to_string()]
        })
    );
}

#[tokio::test]
async fn test_unknown_buildings_are_missing_not_fabricated() {
    let sup = helpers::supervisor();
    let (ctx, outcome) = sup.start("Compare Building 999 with Building 998").await;

    assert_eq!(ctx.request_type, RequestType::PriceComparison);
    assert!(ctx.addresses.is_empty());
    assert_eq!(ctx.missing_addresses, vec!["Building 999", "Building 998"]);
    assert!(ctx.notes.contains(&"No property found for 'Building 999'.".to_string()));
    assert!(ctx.notes.contains(&"No property found for 'Building 998'.".to_string()));
    assert!(!ctx.suggested_addresses.is_empty());
    assert!(ctx.suggested_addresses.len() <= 3);

    let item = outcome.clarification().expect("a clarification");
    assert_eq!(item.field, ClarificationField::PropertyName);
    assert!(item.question.contains("'Building 999' or 'Building 998'"));
    assert_eq!(item.options, ctx.suggested_addresses);
}

#[tokio::test]
async fn test_aggregation_answer_resolves_request() {
    let sup = helpers::supervisor();
    let (mut ctx, first) = sup.start("What was the P&L for Building 180 in 2025?").await;
    assert_eq!(ctx.request_type, RequestType::Pnl);
    assert_eq!(
        first.clarification().map(|i| &i.field),
        Some(&ClarificationField::AggregationLevel)
    );

    let outcome = sup.handle(&mut ctx, "property").await;
    assert_eq!(ctx.aggregation_level, Some(AggregationLevel::Property));
    assert!(!ctx.awaiting_user_reply());
    assert!(ctx.clarifications().is_empty());
    let Some(RoutedRequest::Pnl(filters)) = outcome.routed() else {
        panic!("expected a pnl route, got {outcome:?}");
    };
    assert_eq!(filters.period.as_deref(), Some("2025"));
    assert_eq!(filters.aggregation_level, Some(AggregationLevel::Property));
}

#[tokio::test]
async fn test_granularity_answer_narrows_question() {
    let sup = helpers::supervisor();
    let (mut ctx, first) = sup.start("Give me the P&L for Building 180.").await;
    let first = first.clarification().cloned().expect("a clarification");

    let outcome = sup.handle(&mut ctx, "year").await;
    assert_eq!(ctx.period_level, Some(PeriodLevel::Year));
    assert_eq!(ctx.period, None);
    assert!(ctx.missing_requirements.contains(&Requirement::Period));

    let second = outcome.clarification().expect("a narrower clarification");
    assert_eq!(second.field, ClarificationField::Period);
    assert_eq!(second.kind, ClarificationKind::Value);
    assert_ne!(second.question, first.question);
    assert_eq!(ctx.clarifications().len(), 1);

    // a concrete year then leads to the aggregation question
    let third = sup.handle(&mut ctx, "2024").await;
    assert_eq!(ctx.period.as_deref(), Some("2024"));
    assert_eq!(
        third.clarification().map(|i| &i.field),
        Some(&ClarificationField::AggregationLevel)
    );
}

#[tokio::test]
async fn test_missing_building_answer_with_alias() {
    let sup = helpers::supervisor();
    let (mut ctx, _) = sup.start("Compare Building 999 with Building 998").await;

    let outcome = sup.handle(&mut ctx, "the tower").await;
    assert_eq!(ctx.addresses, vec!["Building 180"]);
    assert!(ctx.missing_addresses.is_empty());
    let item = outcome.clarification().expect("still one property short");
    assert_eq!(item.question, "Which property should I compare with Building 180?");

    let outcome = sup.handle(&mut ctx, "Harbor Point").await;
    assert_eq!(
        outcome.routed(),
        Some(&RoutedRequest::PriceComparison {
            addresses: ["Building 180".to_string(), "55 Pier Road".to_string()]
        })
    );
}

#[tokio::test]
async fn test_both_missing_properties_named_in_one_answer() {
    let sup = helpers::supervisor();
    let (mut ctx, _) = sup.start("Compare Building 999 with Building 998").await;

    let outcome = sup.handle(&mut ctx, "Building 120 and Building 160").await;
    assert_eq!(ctx.addresses, vec!["Building 120", "Building 160"]);
    assert!(ctx.missing_addresses.is_empty());
    assert_eq!(
        outcome.routed(),
        Some(&RoutedRequest::PriceComparison {
            addresses: ["Building 120".to_string(), "Building 160".to_string()]
        })
    );
}

#[tokio::test]
async fn test_year_over_year_pnl_asks_aggregation() {
    let sup = helpers::supervisor();
    let (mut ctx, first) = sup
        .start("Compare the P&L for Building 180 in 2024 versus 2025")
        .await;
    assert_eq!(ctx.comparison_periods, vec!["2024", "2025"]);
    let item = first.clarification().expect("aggregation question");
    assert_eq!(item.field, ClarificationField::AggregationLevel);
    assert!(item.question.contains("2024 and 2025 totals for Building 180"));

    let outcome = sup.handle(&mut ctx, "combined").await;
    let Some(RoutedRequest::Pnl(filters)) = outcome.routed() else {
        panic!("expected a pnl route, got {outcome:?}");
    };
    assert_eq!(filters.comparison_periods, Some(("2024".to_string(), "2025".to_string())));
    assert_eq!(filters.aggregation_level, Some(AggregationLevel::Combined));
}

#[tokio::test]
async fn test_relative_comparison_periods() {
    let sup = helpers::supervisor();
    let (ctx, outcome) = sup
        .start("Compare the P&L of Building 160 for last quarter versus this quarter")
        .await;
    assert_eq!(ctx.request_type, RequestType::Pnl);
    assert_eq!(ctx.comparison_periods, vec!["2025-Q1", "2025-Q2"]);
    let Some(RoutedRequest::Pnl(filters)) = outcome.routed() else {
        panic!("expected a pnl route, got {outcome:?}");
    };
    assert_eq!(
        filters.comparison_periods,
        Some(("2025-Q1".to_string(), "2025-Q2".to_string()))
    );
    assert_eq!(filters.period, None);
}

#[tokio::test]
async fn test_general_question_routes_without_slots() {
    let sup = helpers::supervisor();
    let (ctx, outcome) = sup.start("What is net operating income?").await;
    assert_eq!(ctx.request_type, RequestType::General);
    assert_eq!(
        outcome.routed(),
        Some(&RoutedRequest::General {
            question: "What is net operating income?".to_string()
        })
    );
}

// ============================================================================
// Model enhancement
// ============================================================================

enum StubEnhancer {
    Suggest(ModelSuggestion),
    Unavailable,
}

#[async_trait]
impl ClassificationEnhancer for StubEnhancer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn suggest(&self, _text: &str) -> Result<ModelSuggestion, EnhancementError> {
        match self {
            StubEnhancer::Suggest(suggestion) => Ok(suggestion.clone()),
            StubEnhancer::Unavailable => Err(EnhancementError::Timeout(10)),
        }
    }
}

fn enhanced(stub: StubEnhancer) -> Supervisor {
    let classifier = IntentClassifier::new()
        .with_today(helpers::fixed_today())
        .with_enhancer(Arc::new(stub));
    Supervisor::new(helpers::sample_catalog()).with_classifier(classifier)
}

#[tokio::test]
async fn test_hard_rule_beats_model_suggestion() {
    let sup = enhanced(StubEnhancer::Suggest(ModelSuggestion {
        request_type: Some("general".to_string()),
        ..Default::default()
    }));
    let (ctx, _) = sup.start("What is my P&L for Building 180 in March 2025?").await;
    assert_eq!(ctx.request_type, RequestType::Pnl);
    assert_eq!(ctx.addresses, vec!["Building 180"]);
}

#[tokio::test]
async fn test_model_address_is_resolved_against_catalog() {
    let sup = enhanced(StubEnhancer::Suggest(ModelSuggestion {
        request_type: Some("asset_details".to_string()),
        addresses: vec!["Houston Tower".to_string()],
        notes: vec!["user refers to a landmark".to_string()],
        ..Default::default()
    }));
    let (ctx, outcome) = sup.start("Describe the landmark downtown").await;
    assert_eq!(ctx.request_type, RequestType::AssetDetails);
    assert_eq!(ctx.addresses, vec!["Building 180"]);
    assert!(ctx.notes.contains(&"user refers to a landmark".to_string()));
    assert_eq!(
        outcome.routed(),
        Some(&RoutedRequest::AssetDetails {
            address: "Building 180".to_string(),
            tenant_name: None
        })
    );
}

#[tokio::test]
async fn test_model_cannot_invent_properties() {
    let sup = enhanced(StubEnhancer::Suggest(ModelSuggestion {
        request_type: Some("asset_details".to_string()),
        addresses: vec!["Building 999".to_string()],
        ..Default::default()
    }));
    let (ctx, outcome) = sup.start("Describe the landmark downtown").await;
    assert!(ctx.addresses.is_empty());
    assert_eq!(
        outcome.clarification().map(|i| &i.field),
        Some(&ClarificationField::PropertyName)
    );
}

#[tokio::test]
async fn test_unavailable_model_falls_back_to_rules() {
    let sup = enhanced(StubEnhancer::Unavailable);
    let (ctx, outcome) = sup.start("Compare Building 120 and Building 160.").await;
    assert_eq!(ctx.request_type, RequestType::PriceComparison);
    assert!(outcome.routed().is_some());
}
