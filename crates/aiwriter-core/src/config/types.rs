//! Sub-configuration structs with defaults matching the production setup.

use serde::{Deserialize, Serialize};

/// Text-completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Chat completions endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Text model identifier
    pub model: String,

    /// Image model identifier
    pub image_model: String,

    /// Output token budget per article
    pub max_output_tokens: u32,

    /// Sampling temperature. Fixed-temperature models silently drop
    /// non-default values; see `OpenAiClient`.
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            image_model: "gpt-image-1".to_string(),
            max_output_tokens: 1800,
            temperature: 1.0,
        }
    }
}

/// Image sourcing settings (stock search + generative fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Stock photo search endpoint (Pexels-shaped API)
    pub stock_endpoint: String,

    /// Stock photo API key (supports ${ENV_VAR} syntax)
    pub stock_api_key: String,

    /// Generated image size
    pub size: String,

    /// Generated image quality
    pub quality: String,

    /// Fixed charge per attached AI image, in cents
    pub cost_cents_per_image: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            stock_endpoint: "https://api.pexels.com/v1/search".to_string(),
            stock_api_key: "${PEXELS_API_KEY}".to_string(),
            size: "1024x1024".to_string(),
            quality: "high".to_string(),
            cost_cents_per_image: 4,
        }
    }
}

/// Publish webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Route appended to the destination domain
    pub route: String,

    /// Delivery timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            route: "/wp-json/aiwriter/v1/publish".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Per-call timeouts for external providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Text completion timeout in milliseconds
    pub completion_timeout_ms: u64,

    /// Image synthesis timeout in milliseconds
    pub image_timeout_ms: u64,

    /// Stock photo search timeout in milliseconds
    pub stock_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: 120_000,
            image_timeout_ms: 60_000,
            stock_timeout_ms: 10_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
