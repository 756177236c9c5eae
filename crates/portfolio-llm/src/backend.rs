//! Backend selection for the classification model

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::{anthropic_client, openai_client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    OpenAi,
    Anthropic,
}

#[derive(Debug, Error)]
#[error("unknown classifier backend '{0}' (expected openai, gpt, anthropic or claude)")]
pub struct ParseBackendError(String);

impl LlmBackend {
    pub fn name(&self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "OpenAI",
            LlmBackend::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding this backend's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmBackend::OpenAi => openai_client::DEFAULT_MODEL,
            LlmBackend::Anthropic => anthropic_client::DEFAULT_MODEL,
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        match key.as_str() {
            "openai" | "gpt" => Ok(LlmBackend::OpenAi),
            "anthropic" | "claude" => Ok(LlmBackend::Anthropic),
            _ => Err(ParseBackendError(key)),
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
