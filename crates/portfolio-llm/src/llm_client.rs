//! Provider-neutral classification client
//!
//! Both backends send one system prompt and one user turn at temperature 0
//! and hand back the raw reply text. Parsing the reply is the caller's job.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Per-request bound when the caller does not supply one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-turn completion, raw text back
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Single-turn completion constrained to one JSON object.
    ///
    /// Providers enforce this differently; the reply is still text and may
    /// fail to parse.
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &str;
}

/// HTTP client with a whole-request timeout.
///
/// Builder failure only happens when the TLS backend cannot initialise; the
/// default client is used then and the timeout is lost.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!(%error, "falling back to default HTTP client");
            reqwest::Client::new()
        }
    }
}
