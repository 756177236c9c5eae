//! Specialist handlers and dispatch
//!
//! The supervisor only produces [`RoutedRequest`]s. Computing anything from
//! them is the job of the collaborators registered here; a request whose
//! handler is not registered fails with [`RouteError::NoHandler`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::format::{build_response_payload, format_currency};
use super::request::{PnlFilters, RoutedRequest};
use crate::agentic::RequestType;
use crate::entity_linking::{CatalogHandle, EntityRecord};
use crate::error::{ErrorKind, HandlerError, RouteError};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Handler output: a JSON payload plus an optional message for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub payload: Value,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlStatus {
    Ok,
    NoData,
}

/// Totals returned by the financial aggregation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_operating_income: f64,
    pub status: PnlStatus,
}

// ============================================================================
// Collaborator traits
// ============================================================================

#[async_trait]
pub trait FinancialAggregator: Send + Sync {
    async fn aggregate(&self, filters: &PnlFilters) -> Result<PnlSummary, HandlerError>;
}

#[async_trait]
pub trait ValuationHandler: Send + Sync {
    async fn compare(&self, first: &str, second: &str) -> Result<HandlerResponse, HandlerError>;
}

#[async_trait]
pub trait DescriptionHandler: Send + Sync {
    async fn describe(&self, address: &str, tenant_name: Option<&str>) -> Result<HandlerResponse, HandlerError>;
}

#[async_trait]
pub trait KnowledgeHandler: Send + Sync {
    async fn answer(&self, question: &str) -> Result<HandlerResponse, HandlerError>;
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    aggregator: Option<Arc<dyn FinancialAggregator>>,
    valuation: Option<Arc<dyn ValuationHandler>>,
    description: Option<Arc<dyn DescriptionHandler>>,
    knowledge: Option<Arc<dyn KnowledgeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn FinancialAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_valuation(mut self, valuation: Arc<dyn ValuationHandler>) -> Self {
        self.valuation = Some(valuation);
        self
    }

    pub fn with_description(mut self, description: Arc<dyn DescriptionHandler>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeHandler>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Both catalog-backed handlers over `catalog`
    pub fn with_catalog_handlers(self, catalog: Arc<CatalogHandle>) -> Self {
        self.with_valuation(Arc::new(CatalogValuation::new(catalog.clone())))
            .with_description(Arc::new(CatalogDescription::new(catalog)))
    }

    pub fn handles(&self, request_type: RequestType) -> bool {
        match request_type {
            RequestType::PriceComparison => self.valuation.is_some(),
            RequestType::Pnl => self.aggregator.is_some(),
            RequestType::AssetDetails => self.description.is_some(),
            RequestType::General => self.knowledge.is_some(),
            RequestType::Clarification => true,
        }
    }

    pub async fn dispatch(&self, request: &RoutedRequest) -> Result<HandlerResponse, RouteError> {
        let request_type = request.request_type();
        tracing::info!(
            request_type = %request_type,
            measurement_id = request.measurement_id(),
            "dispatching routed request"
        );

        let missing = || RouteError::NoHandler(request_type.as_str());
        let response = match request {
            RoutedRequest::PriceComparison { addresses: [first, second] } => {
                self.valuation.as_ref().ok_or_else(missing)?.compare(first, second).await?
            }
            RoutedRequest::Pnl(filters) => {
                let aggregator = self.aggregator.as_ref().ok_or_else(missing)?;
                let summary = aggregator.aggregate(filters).await?;
                pnl_response(filters, &summary)
            }
            RoutedRequest::AssetDetails { address, tenant_name } => {
                self.description
                    .as_ref()
                    .ok_or_else(missing)?
                    .describe(address, tenant_name.as_deref())
                    .await?
            }
            RoutedRequest::General { question } => {
                self.knowledge.as_ref().ok_or_else(missing)?.answer(question).await?
            }
            RoutedRequest::Clarification { .. } => HandlerResponse {
                payload: build_response_payload(Value::Null, None),
                message: Some(RequestType::Clarification.definition().fallback_hint.to_string()),
            },
        };
        Ok(response)
    }
}

fn pnl_response(filters: &PnlFilters, summary: &PnlSummary) -> HandlerResponse {
    let message = match summary.status {
        PnlStatus::Ok => format!(
            "Net operating income for {}: {}",
            filters.label(),
            format_currency(summary.net_operating_income, DEFAULT_CURRENCY)
        ),
        PnlStatus::NoData => format!("No P&L data found for {}.", filters.label()),
    };
    HandlerResponse {
        payload: build_response_payload(
            json!(summary),
            Some(json!({
                "measurement_id": RequestType::Pnl.measurement_id(),
                "filters": filters,
            })),
        ),
        message: Some(message),
    }
}

// ============================================================================
// Catalog-backed handlers
// ============================================================================

fn find_record(catalog: &crate::entity_linking::EntityCatalog, address: &str) -> Result<EntityRecord, HandlerError> {
    catalog
        .record_by_address(address)
        .or_else(|| catalog.lookup_alias(address).map(|(_, record)| record))
        .cloned()
        .ok_or_else(|| {
            HandlerError::new(ErrorKind::UnknownProperty, format!("Address '{address}' not found."))
                .with_details(json!({ "address": address }))
        })
}

/// Compares the `price` of two catalog records
pub struct CatalogValuation {
    catalog: Arc<CatalogHandle>,
}

impl CatalogValuation {
    pub fn new(catalog: Arc<CatalogHandle>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ValuationHandler for CatalogValuation {
    async fn compare(&self, first: &str, second: &str) -> Result<HandlerResponse, HandlerError> {
        let catalog = self.catalog.snapshot();
        let a = find_record(&catalog, first)?;
        let b = find_record(&catalog, second)?;

        let price = |record: &EntityRecord| {
            record.price.ok_or_else(|| {
                HandlerError::new(
                    ErrorKind::DataUnavailable,
                    format!("No valuation recorded for {}.", record.label()),
                )
            })
        };
        let (price_a, price_b) = (price(&a)?, price(&b)?);
        let difference = price_a - price_b;

        tracing::info!(
            property_a = %a.address,
            property_b = %b.address,
            delta = difference,
            "price comparison complete"
        );

        let (higher, lower) = if difference >= 0.0 { (&a, &b) } else { (&b, &a) };
        Ok(HandlerResponse {
            payload: build_response_payload(
                json!({
                    "property_a": { "address": a.address, "price": price_a },
                    "property_b": { "address": b.address, "price": price_b },
                    "difference": difference,
                }),
                Some(json!({ "measurement_id": RequestType::PriceComparison.measurement_id() })),
            ),
            message: Some(format!(
                "{} is valued {} above {}.",
                higher.label(),
                format_currency(difference.abs(), DEFAULT_CURRENCY),
                lower.label()
            )),
        })
    }
}

/// Returns the catalog record for a property
pub struct CatalogDescription {
    catalog: Arc<CatalogHandle>,
}

impl CatalogDescription {
    pub fn new(catalog: Arc<CatalogHandle>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl DescriptionHandler for CatalogDescription {
    async fn describe(&self, address: &str, tenant_name: Option<&str>) -> Result<HandlerResponse, HandlerError> {
        let catalog = self.catalog.snapshot();
        let record = find_record(&catalog, address)?;

        if let Some(tenant) = tenant_name {
            let matches = record
                .tenant_name
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(tenant));
            if !matches {
                return Err(HandlerError::new(
                    ErrorKind::UnknownProperty,
                    format!("{} has no tenant named {tenant}.", record.label()),
                ));
            }
        }

        let mut summary = record.label().to_string();
        if let (Some(city), Some(state)) = (&record.city, &record.state) {
            summary.push_str(&format!(" in {city}, {state}"));
        }
        if let Some(tenant) = &record.tenant_name {
            summary.push_str(&format!(", leased to {tenant}"));
        }
        if let Some(price) = record.price {
            summary.push_str(&format!(", valued at {}", format_currency(price, DEFAULT_CURRENCY)));
        }
        summary.push('.');

        Ok(HandlerResponse {
            payload: build_response_payload(
                json!(record),
                Some(json!({ "measurement_id": RequestType::AssetDetails.measurement_id() })),
            ),
            message: Some(summary),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetProvider, InMemoryDataset};
    use crate::entity_linking::EntityCatalog;

    fn handle() -> Arc<CatalogHandle> {
        let rows = InMemoryDataset::from_values(vec![
            json!({"address": "Building 120", "city": "Austin", "state": "TX", "tenant_name": "Tenant 3", "price": 1000000.0}),
            json!({"address": "Building 160", "city": "Dallas", "state": "TX", "price": 2500000.0}),
            json!({"address": "Building 180"}),
        ])
        .rows(None)
        .unwrap();
        Arc::new(CatalogHandle::from_catalog(EntityCatalog::builder(rows).build()))
    }

    struct FixedAggregator(PnlSummary);

    #[async_trait]
    impl FinancialAggregator for FixedAggregator {
        async fn aggregate(&self, _filters: &PnlFilters) -> Result<PnlSummary, HandlerError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_valuation_compares_prices() {
        let registry = HandlerRegistry::new().with_catalog_handlers(handle());
        let request = RoutedRequest::PriceComparison {
            addresses: ["Building 120".to_string(), "Building 160".to_string()],
        };
        let response = registry.dispatch(&request).await.unwrap();
        assert_eq!(response.payload["result"]["difference"], -1500000.0);
        assert_eq!(response.payload["metadata"]["measurement_id"], "M1");
        assert_eq!(
            response.message.as_deref(),
            Some("Building 160 is valued USD 1,500,000.00 above Building 120.")
        );
    }

    #[tokio::test]
    async fn test_valuation_without_price() {
        let result = CatalogValuation::new(handle()).compare("Building 120", "Building 180").await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::DataUnavailable);
    }

    #[tokio::test]
    async fn test_description() {
        let response = CatalogDescription::new(handle())
            .describe("building 120", Some("Tenant 3"))
            .await
            .unwrap();
        assert_eq!(
            response.message.as_deref(),
            Some("Building 120 in Austin, TX, leased to Tenant 3, valued at USD 1,000,000.00.")
        );

        let wrong_tenant = CatalogDescription::new(handle()).describe("Building 120", Some("Tenant 9")).await;
        assert_eq!(wrong_tenant.unwrap_err().kind, ErrorKind::UnknownProperty);
    }

    #[tokio::test]
    async fn test_pnl_dispatch() {
        let summary = PnlSummary {
            total_revenue: 500.0,
            total_expenses: 200.0,
            net_operating_income: 300.0,
            status: PnlStatus::Ok,
        };
        let registry = HandlerRegistry::new().with_aggregator(Arc::new(FixedAggregator(summary)));
        let request = RoutedRequest::Pnl(PnlFilters {
            addresses: vec!["Building 180".to_string()],
            period: Some("2025-M03".to_string()),
            ..Default::default()
        });
        let response = registry.dispatch(&request).await.unwrap();
        assert_eq!(response.payload["result"]["status"], "ok");
        assert_eq!(response.payload["metadata"]["filters"]["period"], "2025-M03");
        assert_eq!(
            response.message.as_deref(),
            Some("Net operating income for Building 180, 2025-M03: USD 300.00")
        );
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let registry = HandlerRegistry::new();
        assert!(!registry.handles(RequestType::General));
        let result = registry
            .dispatch(&RoutedRequest::General {
                question: "What is NOI?".to_string(),
            })
            .await;
        assert!(matches!(result, Err(RouteError::NoHandler("general"))));

        let clarification = registry
            .dispatch(&RoutedRequest::Clarification { text: "hm".to_string() })
            .await
            .unwrap();
        assert_eq!(
            clarification.message.as_deref(),
            Some("Please share more context so I can help.")
        );
    }
}
