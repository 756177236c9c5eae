//! LLM clients for advisory request classification
//!
//! Wraps the chat-completion APIs that enhance rule-based classification.
//! No dataset dependencies: catalog, slot extraction and dialogue handling
//! stay in portfolio-router.
//!
//! Backends: `openai` (default) and `anthropic`. The caller picks one and
//! supplies the key, model override and request timeout.

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;

pub use backend::{LlmBackend, ParseBackendError};
pub use client_factory::create_llm_client;
pub use llm_client::LlmClient;
