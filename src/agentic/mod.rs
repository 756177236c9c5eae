//! Request understanding
//!
//! - `request_types`: the closed set of request types and their registry
//! - `intent_classifier`: rule-based classification with the hard P&L rule
//! - `enhancer`: optional model suggestion, validated then merged

pub mod enhancer;
pub mod intent_classifier;
pub mod request_types;

pub use enhancer::{ClassificationEnhancer, LlmEnhancer, ModelSuggestion, ValidatedSuggestion};
pub use intent_classifier::{ClassificationResult, IntentClassifier, RuleSignals};
pub use request_types::{normalize_request_type, RequestDefinition, RequestType};
