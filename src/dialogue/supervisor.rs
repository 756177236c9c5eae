//! Dialogue supervisor
//!
//! A context is either idle or waiting on exactly one question. An idle
//! context treats the next message as a new request: classify, extract,
//! resolve. A waiting context reads the next message strictly as the answer
//! to its pending question. Both paths finish in [`Supervisor::settle`],
//! which recomputes what is missing and either routes or asks again.

use std::sync::Arc;

use chrono::Datelike;

use super::requirements::{compute_missing, next_field};
use super::types::{AggregationLevel, QueryContext};
use crate::agentic::{ClassificationEnhancer, IntentClassifier, LlmEnhancer, RequestType};
use crate::clarify::{self, select_options, ClarificationField, ClarificationItem};
use crate::config::RouterConfig;
use crate::entity_linking::normalize::title_case;
use crate::entity_linking::resolver::alias_record_ids;
use crate::entity_linking::{CatalogHandle, EntityCatalog, EntityMatch, MentionResolver};
use crate::patterns::building_references;
use crate::routing::RoutedRequest;
use crate::slots::{
    extract_comparison_periods_at, extract_periods_at, extract_tenant_names,
    missing_tenant_references, parse_granularity, Period, PeriodLevel,
};

/// Suggested properties kept on the context
const SUGGESTION_COUNT: usize = 3;

/// What the caller should do after a turn
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorOutcome {
    /// Nothing is missing; hand the request to its handler
    Route(RoutedRequest),
    /// Show this question and feed the reply back through [`Supervisor::handle`]
    Clarify(ClarificationItem),
}

impl SupervisorOutcome {
    pub fn routed(&self) -> Option<&RoutedRequest> {
        match self {
            SupervisorOutcome::Route(request) => Some(request),
            SupervisorOutcome::Clarify(_) => None,
        }
    }

    pub fn clarification(&self) -> Option<&ClarificationItem> {
        match self {
            SupervisorOutcome::Clarify(item) => Some(item),
            SupervisorOutcome::Route(_) => None,
        }
    }
}

enum Answer {
    Applied,
    /// The reply could not be used; ask the same question again
    Reask(ClarificationItem),
}

pub struct Supervisor {
    classifier: IntentClassifier,
    resolver: MentionResolver,
    catalog: Arc<CatalogHandle>,
}

impl Supervisor {
    pub fn new(catalog: Arc<CatalogHandle>) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            resolver: MentionResolver::default(),
            catalog,
        }
    }

    /// Resolver gate and optional model enhancement from configuration
    pub fn from_config(config: &RouterConfig, catalog: Arc<CatalogHandle>) -> Self {
        let mut classifier = IntentClassifier::new();
        match LlmEnhancer::from_config(&config.enhancement) {
            Ok(enhancer) => {
                tracing::info!(model = enhancer.name(), "classification enhancement enabled");
                classifier = classifier.with_enhancer(Arc::new(enhancer));
            }
            Err(e) => tracing::info!(reason = %e, "classification enhancement off"),
        }
        Self {
            classifier,
            resolver: MentionResolver::with_min_confidence(f64::from(config.min_match_confidence)),
            catalog,
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_resolver(mut self, resolver: MentionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    /// Open a new session with `text`
    pub async fn start(&self, text: &str) -> (QueryContext, SupervisorOutcome) {
        let mut ctx = QueryContext::new(text);
        let outcome = self.handle(&mut ctx, text).await;
        (ctx, outcome)
    }

    /// Advance `ctx` by one user message
    pub async fn handle(&self, ctx: &mut QueryContext, text: &str) -> SupervisorOutcome {
        let catalog = self.catalog.snapshot();
        match ctx.take_pending() {
            None => self.open(ctx, text, &catalog).await,
            Some(item) => {
                ctx.user_input = text.to_string();
                if let Answer::Reask(item) = self.apply_answer(ctx, item, text, &catalog) {
                    tracing::debug!(field = %item.field, "reply not usable, asking again");
                    ctx.ask(item.clone());
                    ctx.needs_clarification = true;
                    return SupervisorOutcome::Clarify(item);
                }
            }
        }
        self.settle(ctx, &catalog)
    }

    // ========================================================================
    // Opening turn
    // ========================================================================

    async fn open(&self, ctx: &mut QueryContext, text: &str, catalog: &EntityCatalog) {
        ctx.restart(text);

        let classification = self.classifier.classify(text, catalog).await;
        let request_type = classification.request_type;
        ctx.set_request_type(request_type);
        ctx.tenant_name = classification.tenant_name.clone();
        ctx.entity_name = classification.entity_name.clone();
        ctx.comparison_periods = classification.comparison_periods.clone();
        if let Some(period) = classification.period.as_deref().and_then(|p| p.parse::<Period>().ok()) {
            ctx.apply_period(period);
        }
        for note in &classification.notes {
            ctx.push_note(note.clone());
        }

        let expected = expected_properties(request_type);
        let resolution = self.resolver.resolve(text, expected, catalog);

        ctx.missing_addresses = building_references(text)
            .into_iter()
            .filter(|reference| catalog.lookup_alias(reference).is_none())
            .map(|reference| title_case(&reference))
            .collect();
        for missing in ctx.missing_addresses.clone() {
            ctx.push_note(format!("No property found for '{missing}'."));
        }
        ctx.missing_tenants = missing_tenant_references(text, catalog);
        for missing in ctx.missing_tenants.clone() {
            ctx.push_note(format!("No tenant found for '{missing}'."));
        }

        // full-query fallbacks are only suggestions once a named property is missing
        let mut demoted: Vec<String> = Vec::new();
        for m in resolution.matches.iter().cloned() {
            if !ctx.missing_addresses.is_empty() && resolution.backfilled.contains(&m.address) {
                demoted.push(m.address);
            } else {
                ctx.add_match(m);
            }
        }
        for term in &classification.addresses {
            if ctx.addresses.len() >= expected {
                break;
            }
            if let Some(m) = self.resolver.resolve_candidate(term, catalog, &ctx.addresses).into_match() {
                ctx.add_match(m);
            }
        }
        ctx.candidate_terms = resolution.candidate_terms;
        ctx.unresolved_terms = resolution.unresolved_terms;

        if request_type == RequestType::PriceComparison {
            let explicit = alias_record_ids(text, catalog);
            if explicit.len() > 2 {
                ctx.property_candidates = explicit
                    .iter()
                    .filter_map(|id| catalog.get(*id))
                    .map(|record| record.address.clone())
                    .collect();
            }
        }

        let needs_property = matches!(request_type, RequestType::PriceComparison | RequestType::AssetDetails);
        if (needs_property && ctx.addresses.len() < expected) || !ctx.missing_addresses.is_empty() {
            ctx.suggested_addresses = suggest_addresses(text, demoted, &ctx.addresses, catalog);
        }

        tracing::info!(
            request_type = %ctx.request_type,
            measurement_id = %ctx.measurement_id,
            addresses = ?ctx.addresses,
            missing_addresses = ?ctx.missing_addresses,
            llm_used = classification.llm_used,
            "request opened"
        );
    }

    // ========================================================================
    // Replies
    // ========================================================================

    fn apply_answer(
        &self,
        ctx: &mut QueryContext,
        mut item: ClarificationItem,
        text: &str,
        catalog: &EntityCatalog,
    ) -> Answer {
        let answer = text.trim();
        if answer.is_empty() {
            return Answer::Reask(item);
        }

        match &item.field {
            ClarificationField::AggregationLevel => match AggregationLevel::from_answer(chosen(answer, &item)) {
                Some(level) => ctx.aggregation_level = Some(level),
                None => return Answer::Reask(item),
            },
            ClarificationField::Period => {
                if !self.apply_period_answer(ctx, chosen(answer, &item)) {
                    return Answer::Reask(item);
                }
            }
            ClarificationField::ComparisonPeriods => {
                let periods = extract_comparison_periods_at(answer, 2, self.classifier.today());
                if periods.len() != 2 {
                    return Answer::Reask(item);
                }
                ctx.comparison_periods = periods;
                ctx.period = None;
            }
            ClarificationField::PropertyName => {
                let needed = expected_properties(ctx.request_type).saturating_sub(ctx.addresses.len());
                let matches = self.property_answer_matches(answer, &item.options, needed, catalog);
                if matches.is_empty() {
                    let phrase = chosen(answer, &item);
                    ctx.missing_addresses = vec![phrase.to_string()];
                    ctx.push_note(format!("No property found for '{phrase}'."));
                } else {
                    ctx.missing_addresses = building_references(answer)
                        .into_iter()
                        .filter(|reference| catalog.lookup_alias(reference).is_none())
                        .map(|reference| title_case(&reference))
                        .collect();
                    for missing in ctx.missing_addresses.clone() {
                        ctx.push_note(format!("No property found for '{missing}'."));
                    }
                    for m in matches {
                        ctx.add_match(m);
                    }
                }
            }
            ClarificationField::PropertySelection => {
                let picked = select_options(answer, &item.options);
                let matches: Vec<EntityMatch> = if picked.is_empty() {
                    self.resolver.resolve(answer, 2, catalog).matches
                } else {
                    picked
                        .iter()
                        .filter_map(|option| self.resolver.resolve_answer(option, catalog))
                        .collect()
                };
                // keep the candidate list until something resolves
                if matches.is_empty() {
                    return Answer::Reask(item);
                }
                ctx.addresses.clear();
                ctx.address_matches.clear();
                ctx.property_name = None;
                ctx.property_candidates.clear();
                for m in matches {
                    ctx.add_match(m);
                }
            }
            ClarificationField::TenantName => {
                let answer = chosen(answer, &item);
                let known = extract_tenant_names(answer, catalog, 1).into_iter().next();
                ctx.tenant_name = Some(known.unwrap_or_else(|| answer.to_string()));
                ctx.missing_tenants.clear();
            }
            ClarificationField::Other(name) => {
                let note = format!("{name}: {answer}");
                ctx.push_note(note);
            }
        }

        item.value = Some(answer.to_string());
        ctx.answered.push(item);
        Answer::Applied
    }

    /// Properties named in a reply, at most `needed` of them.
    ///
    /// Several properties go through full-text resolution without the
    /// fuzzy backfill; a single one may be a weak match.
    fn property_answer_matches(
        &self,
        answer: &str,
        options: &[String],
        needed: usize,
        catalog: &EntityCatalog,
    ) -> Vec<EntityMatch> {
        let needed = needed.max(1);
        let picked = select_options(answer, options);
        if !picked.is_empty() {
            return picked
                .iter()
                .take(needed)
                .filter_map(|option| self.resolver.resolve_answer(option, catalog))
                .collect();
        }
        if needed > 1 {
            let resolution = self.resolver.resolve(answer, needed, catalog);
            let named: Vec<EntityMatch> = resolution
                .matches
                .into_iter()
                .filter(|m| !resolution.backfilled.contains(&m.address))
                .collect();
            if !named.is_empty() {
                return named;
            }
        }
        self.resolver.resolve_answer(answer, catalog).into_iter().collect()
    }

    /// A concrete period wins; a bare granularity word only narrows the next question
    fn apply_period_answer(&self, ctx: &mut QueryContext, answer: &str) -> bool {
        let today = self.classifier.today();
        if let Some(period) = extract_periods_at(answer, today).into_iter().next() {
            ctx.apply_period(period);
            return true;
        }
        if let Some(level) = parse_granularity(answer) {
            ctx.period = None;
            ctx.period_level = Some(level);
            return true;
        }
        // "March" or "Q2" alone: borrow the year already in play
        let year = ctx.year.unwrap_or_else(|| today.year());
        let with_year = format!("{answer} {year}");
        match extract_periods_at(&with_year, today).into_iter().next() {
            Some(period) if period.level() != PeriodLevel::Year => {
                ctx.apply_period(period);
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Settling
    // ========================================================================

    fn settle(&self, ctx: &mut QueryContext, catalog: &EntityCatalog) -> SupervisorOutcome {
        ctx.missing_requirements = compute_missing(ctx);
        ctx.needs_clarification = !ctx.missing_requirements.is_empty();

        let field = match next_field(&ctx.missing_requirements) {
            Some(field) => field,
            None => match RoutedRequest::from_context(ctx) {
                Ok(routed) => {
                    tracing::info!(
                        request_type = %ctx.request_type,
                        measurement_id = routed.measurement_id(),
                        addresses = ?ctx.addresses,
                        "request resolved"
                    );
                    return SupervisorOutcome::Route(routed);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "resolved context failed to route");
                    ctx.needs_clarification = true;
                    ClarificationField::Other("request_details".to_string())
                }
            },
        };

        let suggestions = match &field {
            ClarificationField::PropertyName if ctx.suggested_addresses.is_empty() => {
                first_records(catalog, &ctx.addresses)
            }
            ClarificationField::PropertyName => ctx.suggested_addresses.clone(),
            ClarificationField::PropertySelection => ctx.property_candidates.clone(),
            ClarificationField::TenantName => {
                catalog.known_tenants().iter().take(SUGGESTION_COUNT).cloned().collect()
            }
            _ => Vec::new(),
        };
        let item = clarify::build(&field, ctx, &suggestions);

        tracing::info!(
            request_type = %ctx.request_type,
            measurement_id = %ctx.measurement_id,
            field = %item.field,
            missing = ?ctx.missing_requirements,
            "asking for clarification"
        );
        ctx.ask(item.clone());
        SupervisorOutcome::Clarify(item)
    }
}

/// Demoted fallbacks, then full-query search, then the first records
fn expected_properties(request_type: RequestType) -> usize {
    if request_type == RequestType::PriceComparison {
        2
    } else {
        1
    }
}

/// The option a numbered reply points at, else the reply itself
fn chosen<'a>(answer: &'a str, item: &'a ClarificationItem) -> &'a str {
    select_options(answer, &item.options)
        .first()
        .and_then(|picked| item.options.iter().find(|option| option == &picked))
        .map(String::as_str)
        .unwrap_or(answer)
}

fn suggest_addresses(text: &str, demoted: Vec<String>, taken: &[String], catalog: &EntityCatalog) -> Vec<String> {
    let mut suggestions = demoted;
    for m in catalog.search(text, SUGGESTION_COUNT + taken.len()) {
        if !taken.contains(&m.address) && !suggestions.contains(&m.address) {
            suggestions.push(m.address);
        }
    }
    if suggestions.is_empty() {
        suggestions = first_records(catalog, taken);
    }
    suggestions.truncate(SUGGESTION_COUNT);
    suggestions
}

fn first_records(catalog: &EntityCatalog, taken: &[String]) -> Vec<String> {
    catalog
        .known_addresses()
        .filter(|address| !taken.iter().any(|t| t == address))
        .take(SUGGESTION_COUNT)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clarify::ClarificationKind;
    use crate::dataset::{DatasetProvider, InMemoryDataset};
    use crate::dialogue::Requirement;
    use chrono::NaiveDate;
    use serde_json::json;

    fn supervisor() -> Supervisor {
        let rows = InMemoryDataset::from_values(vec![
            json!({"address": "Building 120", "city": "Austin", "tenant_name": "Tenant 3", "price": 1000000.0}),
            json!({"address": "Building 160", "city": "Dallas", "tenant_name": "Tenant 7", "price": 2500000.0}),
            json!({"address": "Building 180", "city": "Houston", "tenant_name": "Tenant 14"}),
        ])
        .rows(None)
        .unwrap();
        let catalog = EntityCatalog::builder(rows).build();
        Supervisor::new(Arc::new(CatalogHandle::from_catalog(catalog)))
            .with_classifier(IntentClassifier::new().with_today(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()))
    }

    #[tokio::test]
    async fn test_blank_reply_reasks_same_item() {
        let sup = supervisor();
        let (mut ctx, first) = sup.start("Give me the P&L for Building 180.").await;
        let asked = first.clarification().cloned().unwrap();

        let again = sup.handle(&mut ctx, "   ").await;
        assert_eq!(again.clarification(), Some(&asked));
        assert_eq!(ctx.clarifications(), std::slice::from_ref(&asked));
        assert!(ctx.answered.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_aggregation_reasks() {
        let sup = supervisor();
        let (mut ctx, first) = sup.start("P&L for Building 180 in 2025").await;
        let asked = first.clarification().cloned().unwrap();
        assert_eq!(asked.field, ClarificationField::AggregationLevel);

        let again = sup.handle(&mut ctx, "no idea").await;
        assert_eq!(again.clarification(), Some(&asked));
        assert_eq!(ctx.aggregation_level, None);
        assert!(ctx.awaiting_user_reply());
    }

    #[tokio::test]
    async fn test_bare_month_answer_borrows_year() {
        let sup = supervisor();
        let (mut ctx, _) = sup.start("Give me the P&L for Building 180.").await;
        sup.handle(&mut ctx, "month").await;
        assert_eq!(ctx.pending().map(|i| i.kind), Some(ClarificationKind::Value));

        let outcome = sup.handle(&mut ctx, "March").await;
        assert!(outcome.routed().is_some());
        assert_eq!(ctx.period.as_deref(), Some("2025-M03"));
        assert_eq!(ctx.answered.len(), 2);
        assert_eq!(ctx.answered[1].value.as_deref(), Some("March"));
    }

    #[tokio::test]
    async fn test_second_property_answer() {
        let sup = supervisor();
        let (mut ctx, first) = sup.start("What is Building 120 worth compared to the rest?").await;
        assert_eq!(ctx.request_type, RequestType::PriceComparison);
        assert_eq!(ctx.missing_requirements, vec![Requirement::SecondProperty]);
        let item = first.clarification().unwrap();
        assert_eq!(item.question, "Which property should I compare with Building 120?");
        assert!(!item.options.contains(&"Building 120".to_string()));

        let outcome = sup.handle(&mut ctx, "building 160").await;
        assert_eq!(
            outcome.routed(),
            Some(&RoutedRequest::PriceComparison {
                addresses: ["Building 120".to_string(), "Building 160".to_string()]
            })
        );
        assert!(!ctx.awaiting_user_reply());
    }

    #[tokio::test]
    async fn test_property_selection_by_number() {
        let sup = supervisor();
        let (mut ctx, first) = sup
            .start("Compare Building 120, Building 160 and Building 180")
            .await;
        let item = first.clarification().unwrap();
        assert_eq!(item.field, ClarificationField::PropertySelection);
        assert_eq!(item.options, vec!["Building 120", "Building 160", "Building 180"]);

        let outcome = sup.handle(&mut ctx, "1 and 3").await;
        assert_eq!(
            outcome.routed(),
            Some(&RoutedRequest::PriceComparison {
                addresses: ["Building 120".to_string(), "Building 180".to_string()]
            })
        );
        assert!(ctx.property_candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_selection_keeps_candidates() {
        let sup = supervisor();
        let (mut ctx, first) = sup
            .start("Compare Building 120, Building 160 and Building 180")
            .await;
        let asked = first.clarification().cloned().unwrap();

        let again = sup.handle(&mut ctx, "hmm not sure").await;
        assert_eq!(again.clarification(), Some(&asked));
        assert_eq!(ctx.property_candidates, vec!["Building 120", "Building 160", "Building 180"]);
        assert!(ctx.answered.is_empty());

        let outcome = sup.handle(&mut ctx, "2 and 3").await;
        assert_eq!(
            outcome.routed(),
            Some(&RoutedRequest::PriceComparison {
                addresses: ["Building 160".to_string(), "Building 180".to_string()]
            })
        );
    }

    #[tokio::test]
    async fn test_numbered_choice_answers() {
        let sup = supervisor();
        let (mut ctx, _) = sup.start("P&L for Building 180 in 2025").await;
        let outcome = sup.handle(&mut ctx, "2").await;
        assert_eq!(ctx.aggregation_level, Some(AggregationLevel::Property));
        assert!(outcome.routed().is_some());

        let (mut ctx, first) = sup.start("Give me the P&L for Building 180.").await;
        assert_eq!(first.clarification().map(|i| i.kind), Some(ClarificationKind::Granularity));
        sup.handle(&mut ctx, "3").await;
        assert_eq!(ctx.period_level, Some(PeriodLevel::Year));
        assert_eq!(ctx.answered[0].value.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_unknown_tenant_asks_and_accepts_raw_answer() {
        let sup = supervisor();
        let (mut ctx, first) = sup.start("P&L for Tenant 99 in March 2025").await;
        assert_eq!(ctx.missing_tenants, vec!["Tenant 99"]);
        assert!(ctx.notes.contains(&"No tenant found for 'Tenant 99'.".to_string()));
        let item = first.clarification().unwrap();
        assert_eq!(item.field, ClarificationField::TenantName);
        assert_eq!(item.options, vec!["Tenant 14", "Tenant 3", "Tenant 7"]);

        let outcome = sup.handle(&mut ctx, "tenant 7").await;
        assert!(outcome.routed().is_some());
        assert_eq!(ctx.tenant_name.as_deref(), Some("Tenant 7"));
    }

    #[tokio::test]
    async fn test_new_request_after_route_restarts_context() {
        let sup = supervisor();
        let (mut ctx, first) = sup.start("Compare Building 120 and Building 160.").await;
        assert!(first.routed().is_some());
        let session = ctx.session_id;

        sup.handle(&mut ctx, "Give me the P&L for Building 180.").await;
        assert_eq!(ctx.session_id, session);
        assert_eq!(ctx.request_type, RequestType::Pnl);
        assert_eq!(ctx.addresses, vec!["Building 180"]);
    }
}
