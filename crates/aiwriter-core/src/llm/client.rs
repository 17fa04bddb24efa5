//! Text-completion client trait and request types.
//!
//! Defines the interface the pipeline talks to, so tests and alternative
//! providers can stand in for the hosted API.

use crate::error::GenerationResult;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// One role-tagged prompt turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Requested output shape of a completion call.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /// Free-form text, no envelope
    Free,
    /// Best-effort JSON object mode
    JsonObject,
    /// Schema-validated JSON with the given schema
    JsonSchema(Value),
}

/// Per-call completion options.
///
/// `temperature` is a request, not a guarantee: the client omits it when
/// the target model only accepts its default.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub mode: OutputMode,
    pub max_output_tokens: u32,
    pub temperature: Option<f64>,
}

impl CompletionOptions {
    pub fn free(max_output_tokens: u32) -> Self {
        Self {
            mode: OutputMode::Free,
            max_output_tokens,
            temperature: None,
        }
    }

    pub fn json_object(max_output_tokens: u32) -> Self {
        Self {
            mode: OutputMode::JsonObject,
            max_output_tokens,
            temperature: None,
        }
    }

    pub fn json_schema(schema: Value, max_output_tokens: u32) -> Self {
        Self {
            mode: OutputMode::JsonSchema(schema),
            max_output_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for text-completion and image-synthesis providers.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the pipeline holds an `Arc<dyn TextCompletionClient>`).
///
/// Implementations never retry internally and never reject merely-malformed
/// JSON; both are the orchestration layer's concern.
#[async_trait]
pub trait TextCompletionClient: Send + Sync {
    /// Provider name for logging (e.g., "openai").
    fn name(&self) -> &str;

    /// Run one completion call and return the raw text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> GenerationResult<String>;

    /// Synthesize one image and return its URL. Single attempt.
    async fn generate_image(
        &self,
        prompt: &str,
        size: &str,
        quality: &str,
    ) -> GenerationResult<String>;
}
