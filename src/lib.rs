//! Portfolio Router - request understanding and clarification dialogue
//!
//! Turns free-text questions about a property portfolio into fully
//! resolved requests for specialist handlers, asking one clarification
//! question at a time when something is missing.
//!
//! ## Flow
//! Text -> Intent Classifier + Slot Extractors + Mention Resolver
//!      -> Supervisor (missing requirements) -> Route | Clarify
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use portfolio_router::dataset::JsonFileDataset;
//! use portfolio_router::entity_linking::{CatalogHandle, CatalogSource};
//! use portfolio_router::dialogue::{Supervisor, SupervisorOutcome};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = CatalogSource::new(Arc::new(JsonFileDataset::new("data/assets.json")));
//! let catalog = Arc::new(CatalogHandle::load(source)?);
//! let supervisor = Supervisor::new(catalog);
//!
//! let (mut ctx, outcome) = supervisor.start("Give me the P&L for Building 180.").await;
//! if let SupervisorOutcome::Clarify(item) = outcome {
//!     println!("{}", item.question);
//!     let _next = supervisor.handle(&mut ctx, "March 2025").await;
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling and configuration
pub mod config;
pub mod error;

// Dataset and alias providers
pub mod dataset;

// Shared regex patterns
pub mod patterns;

// Catalog, TF-IDF space and mention resolution
pub mod entity_linking;

// Stateless slot extractors
pub mod slots;

// Intent classification with optional model enhancement
pub mod agentic;

// Clarification questions
pub mod clarify;

// Session context and supervisor
pub mod dialogue;

// Routed requests and specialist handlers
pub mod routing;

pub use agentic::{ClassificationResult, IntentClassifier, RequestType};
pub use clarify::{render_clarification, ClarificationItem};
pub use config::RouterConfig;
pub use dialogue::{QueryContext, Supervisor, SupervisorOutcome};
pub use entity_linking::{CatalogHandle, CatalogSource, EntityCatalog, MentionResolver};
pub use error::{CatalogError, ConfigError, EnhancementError, HandlerError, RouteError};
pub use routing::{HandlerRegistry, RoutedRequest};
