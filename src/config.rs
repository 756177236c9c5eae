//! Router configuration
//!
//! Everything is read from the process environment. Binaries call
//! `dotenvy::dotenv().ok()` first so a local `.env` file can supply values.

use std::path::PathBuf;
use std::time::Duration;

use portfolio_llm::LlmBackend;

use crate::error::ConfigError;

pub const DEFAULT_ALIAS_FILE: &str = "data/address_aliases.json";
pub const DEFAULT_ASSETS_FILE: &str = "data/assets.json";
pub const DEFAULT_MIN_MATCH_CONFIDENCE: f32 = 0.12;
pub const DEFAULT_ENHANCEMENT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Settings for the optional model-backed classification step
#[derive(Debug, Clone)]
pub struct EnhancementConfig {
    pub enabled: bool,
    pub backend: LlmBackend,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: LlmBackend::default(),
            model: None,
            api_key: None,
            timeout: DEFAULT_ENHANCEMENT_TIMEOUT,
        }
    }
}

impl EnhancementConfig {
    /// Enabled and holding a credential
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub enhancement: EnhancementConfig,
    pub alias_file: PathBuf,
    pub assets_file: PathBuf,
    pub min_match_confidence: f32,
    pub log_level: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enhancement: EnhancementConfig::default(),
            alias_file: PathBuf::from(DEFAULT_ALIAS_FILE),
            assets_file: PathBuf::from(DEFAULT_ASSETS_FILE),
            min_match_confidence: DEFAULT_MIN_MATCH_CONFIDENCE,
            log_level: "info".to_string(),
        }
    }
}

impl RouterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backend = match get("CLASSIFIER_BACKEND") {
            Some(raw) => raw
                .parse::<LlmBackend>()
                .map_err(|e| ConfigError::Backend(e.to_string()))?,
            None => LlmBackend::default(),
        };
        let api_key = get(backend.api_key_var());
        let enabled = match get("CLASSIFIER_ENABLED") {
            Some(raw) => parse_bool("CLASSIFIER_ENABLED", &raw)?,
            None => api_key.is_some(),
        };
        let timeout = match get("CLASSIFIER_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue {
                    var: "CLASSIFIER_TIMEOUT_MS",
                    value: raw.clone(),
                    expected: "milliseconds as an unsigned integer",
                }
            })?),
            None => DEFAULT_ENHANCEMENT_TIMEOUT,
        };
        let min_match_confidence = match get("MIN_MATCH_CONFIDENCE") {
            Some(raw) => match raw.trim().parse::<f32>() {
                Ok(v) if (0.0..=1.0).contains(&v) => v,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "MIN_MATCH_CONFIDENCE",
                        value: raw,
                        expected: "a number between 0 and 1",
                    })
                }
            },
            None => defaults.min_match_confidence,
        };

        Ok(Self {
            enhancement: EnhancementConfig {
                enabled,
                backend,
                model: get("CLASSIFIER_MODEL"),
                api_key,
                timeout,
            },
            alias_file: get("ADDRESS_ALIAS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.alias_file),
            assets_file: get("ASSETS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_file),
            min_match_confidence,
            log_level: get("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            expected: "true/false",
        }),
    }
}
