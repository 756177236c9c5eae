//! Optional model-backed classification enhancement
//!
//! The model only ever *suggests*. A suggestion is parsed in one piece and
//! validated into [`ValidatedSuggestion`] before the classifier merges it;
//! any transport error, timeout or malformed payload discards the whole
//! suggestion and the rule result stands.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portfolio_llm::{create_llm_client, LlmClient};
use serde::{Deserialize, Deserializer};

use super::request_types::RequestType;
use crate::config::EnhancementConfig;
use crate::error::EnhancementError;
use crate::slots::normalize_period_string;

const SYSTEM_PROMPT: &str = "You classify a single request for a real-estate portfolio assistant. \
Respond ONLY with a JSON object using keys: \
request_type (one of price_comparison, pnl, asset_details, general, clarification), \
addresses (array of property phrases exactly as written), \
period (\"YYYY\", \"YYYY-Q#\", \"YYYY-M##\" or null), \
comparison_periods (array of exactly two periods, or empty), \
tenant_name (string or null), entity_name (string or null), \
notes (array of short observations). Never invent properties or periods.";

/// Source of advisory classification suggestions
#[async_trait]
pub trait ClassificationEnhancer: Send + Sync {
    fn name(&self) -> &str;

    async fn suggest(&self, text: &str) -> Result<ModelSuggestion, EnhancementError>;
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw suggestion as returned by the model
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelSuggestion {
    pub request_type: Option<String>,
    #[serde(alias = "address_terms", deserialize_with = "null_as_default")]
    pub addresses: Vec<String>,
    pub period: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub comparison_periods: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: Vec<String>,
    pub tenant_name: Option<String>,
    pub entity_name: Option<String>,
}

/// A suggestion reduced to values the rule result can represent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedSuggestion {
    pub request_type: Option<RequestType>,
    pub addresses: Vec<String>,
    pub period: Option<String>,
    /// Empty or exactly two canonical periods
    pub comparison_periods: Vec<String>,
    pub notes: Vec<String>,
    pub tenant_name: Option<String>,
    pub entity_name: Option<String>,
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            out.push(value.to_string());
        }
    }
    out
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

impl ModelSuggestion {
    pub fn validate(self) -> ValidatedSuggestion {
        let request_type = self.request_type.as_deref().and_then(|value| {
            let parsed = value.parse::<RequestType>().ok();
            if parsed.is_none() {
                tracing::debug!(value, "model suggested an unknown request type");
            }
            parsed
        });

        let mut comparison_periods: Vec<String> = Vec::new();
        for value in &self.comparison_periods {
            if let Some(period) = normalize_period_string(value) {
                if !comparison_periods.contains(&period) {
                    comparison_periods.push(period);
                }
            }
            if comparison_periods.len() == 2 {
                break;
            }
        }
        if comparison_periods.len() != 2 {
            comparison_periods.clear();
        }

        ValidatedSuggestion {
            request_type,
            addresses: clean_list(self.addresses),
            period: self.period.as_deref().and_then(normalize_period_string),
            comparison_periods,
            notes: clean_list(self.notes),
            tenant_name: clean_text(self.tenant_name),
            entity_name: clean_text(self.entity_name),
        }
    }
}

/// Strip a Markdown code fence some models wrap JSON in
fn json_body(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Enhancer backed by an [`LlmClient`] with a hard timeout
pub struct LlmEnhancer {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl LlmEnhancer {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Build from configuration; `Disabled` when switched off or without a key
    pub fn from_config(config: &EnhancementConfig) -> Result<Self, EnhancementError> {
        if !config.is_usable() {
            return Err(EnhancementError::Disabled);
        }
        let api_key = config.api_key.clone().ok_or(EnhancementError::Disabled)?;
        let client = create_llm_client(config.backend, api_key, config.model.as_deref(), config.timeout);
        Ok(Self::new(client, config.timeout))
    }
}

#[async_trait]
impl ClassificationEnhancer for LlmEnhancer {
    fn name(&self) -> &str {
        self.client.model_name()
    }

    async fn suggest(&self, text: &str) -> Result<ModelSuggestion, EnhancementError> {
        let user_prompt = format!("User query: ```{}```\nRespond ONLY with JSON.", text.trim());
        let raw = tokio::time::timeout(self.timeout, self.client.chat_json(SYSTEM_PROMPT, &user_prompt))
            .await
            .map_err(|_| EnhancementError::Timeout(self.timeout.as_millis() as u64))??;

        let suggestion: ModelSuggestion = serde_json::from_str(json_body(&raw))?;
        tracing::debug!(
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            "classification suggestion received"
        );
        Ok(suggestion)
    }
}
