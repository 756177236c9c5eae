//! Client factory

use std::sync::Arc;
use std::time::Duration;

use super::anthropic_client::AnthropicClient;
use super::backend::LlmBackend;
use super::llm_client::LlmClient;
use super::openai_client::OpenAiClient;

/// Build the client for `backend`; `model` falls back to the backend default.
pub fn create_llm_client(
    backend: LlmBackend,
    api_key: String,
    model: Option<&str>,
    request_timeout: Duration,
) -> Arc<dyn LlmClient> {
    let model = model.unwrap_or(backend.default_model());
    let client: Arc<dyn LlmClient> = match backend {
        LlmBackend::OpenAi => {
            Arc::new(OpenAiClient::with_model(api_key, model).with_request_timeout(request_timeout))
        }
        LlmBackend::Anthropic => {
            Arc::new(AnthropicClient::with_model(api_key, model).with_request_timeout(request_timeout))
        }
    };
    tracing::info!(
        provider = client.provider_name(),
        model = client.model_name(),
        timeout_ms = request_timeout.as_millis() as u64,
        "classification client ready"
    );
    client
}
