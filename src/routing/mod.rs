//! Routing of resolved requests
//!
//! - `request`: [`RoutedRequest`] built from a context with nothing missing
//! - `handlers`: collaborator traits, the registry and catalog-backed handlers
//! - `format`: currency and payload helpers

pub mod format;
pub mod handlers;
pub mod request;

pub use format::{build_response_payload, format_currency};
pub use handlers::{
    CatalogDescription, CatalogValuation, DescriptionHandler, FinancialAggregator, HandlerRegistry,
    HandlerResponse, KnowledgeHandler, PnlStatus, PnlSummary, ValuationHandler,
};
pub use request::{PnlFilters, RoutedRequest};
