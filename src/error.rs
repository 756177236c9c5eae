//! Error types for the request router
//!
//! User-input ambiguity never shows up here: unresolved and ambiguous
//! references travel through the clarification loop instead. These errors
//! cover operator-facing configuration problems and collaborator failures.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while loading the dataset or building the entity catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("dataset produced no property records; check the dataset source")]
    EmptyDataset,

    #[error("dataset provider failed: {0}")]
    DatasetUnavailable(String),

    #[error("failed to parse alias file {path}: {source}")]
    AliasFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse dataset file {path}: {source}")]
    DatasetFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid environment configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("classifier backend: {0}")]
    Backend(String),
}

/// Why an external classification suggestion was not applied
#[derive(Error, Debug)]
pub enum EnhancementError {
    #[error("classification enhancement disabled")]
    Disabled,

    #[error("classification enhancement timed out after {0} ms")]
    Timeout(u64),

    #[error("classification enhancement call failed: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("malformed classification suggestion: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure categories a specialist handler can report back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownProperty,
    MissingProperty,
    MissingTimeframe,
    DataUnavailable,
    Unsupported,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownProperty => "unknown_property",
            ErrorKind::MissingProperty => "missing_property",
            ErrorKind::MissingTimeframe => "missing_timeframe",
            ErrorKind::DataUnavailable => "data_unavailable",
            ErrorKind::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by a specialist handler
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct HandlerError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Render as the `{message, error_type, details?}` payload shown to users
    pub fn to_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "message": self.message,
            "error_type": self.kind.as_str(),
        });
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

/// Errors raised while dispatching a routed request
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("no handler registered for {0}")]
    NoHandler(&'static str),

    #[error("request is not ready to route, missing: {0}")]
    Incomplete(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}
