//! OpenAI completion client using the Chat Completions and Images APIs.
//!
//! Absorbs model parameter quirks so callers never branch on the model:
//! the token-budget field is `max_completion_tokens` for current models and
//! `max_tokens` for legacy ones, and fixed-temperature models only accept
//! their default sampling temperature.

use super::client::{ChatMessage, CompletionOptions, OutputMode, TextCompletionClient};
use crate::config::{resolve_env_var, CompletionConfig, LimitsConfig};
use crate::error::{ConfigError, GenerationError, GenerationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// OpenAI-backed implementation of [`TextCompletionClient`].
pub struct OpenAiClient {
    api_key: String,
    model: String,
    image_model: String,
    endpoint: String,
    client: reqwest::Client,
    completion_timeout: Duration,
    image_timeout: Duration,
}

impl OpenAiClient {
    /// Build a client from configuration, resolving the `${ENV_VAR}` key.
    pub fn from_config(
        completion: &CompletionConfig,
        limits: &LimitsConfig,
    ) -> Result<Self, ConfigError> {
        let api_key = resolve_env_var(&completion.api_key).ok_or_else(|| {
            ConfigError::ValidationError(
                "OpenAI API key not set. Set OPENAI_API_KEY env var.".to_string(),
            )
        })?;
        Ok(Self::new(
            &api_key,
            &completion.model,
            &completion.image_model,
            &completion.endpoint,
            limits,
        ))
    }

    pub fn new(
        api_key: &str,
        model: &str,
        image_model: &str,
        endpoint: &str,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            image_model: image_model.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            completion_timeout: Duration::from_millis(limits.completion_timeout_ms),
            image_timeout: Duration::from_millis(limits.image_timeout_ms),
        }
    }

    fn map_send_error(e: reqwest::Error) -> GenerationError {
        GenerationError::ProviderUnavailable(e.to_string())
    }
}

/// Whether the model takes `max_completion_tokens` instead of `max_tokens`.
fn uses_completion_token_field(model: &str) -> bool {
    model.starts_with("gpt-5") || model.starts_with("gpt-4o")
}

/// Whether the model only accepts its default sampling temperature.
fn has_fixed_temperature(model: &str) -> bool {
    model.starts_with("gpt-5")
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: Value,
    strict: bool,
}

/// Assemble the request body, applying the model's parameter quirks.
fn chat_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    options: &CompletionOptions,
) -> ChatRequest<'a> {
    let (max_tokens, max_completion_tokens) = if uses_completion_token_field(model) {
        (None, Some(options.max_output_tokens))
    } else {
        (Some(options.max_output_tokens), None)
    };

    let temperature = match options.temperature {
        Some(t) if has_fixed_temperature(model) && (t - 1.0).abs() > f64::EPSILON => {
            tracing::debug!(model, temperature = t, "Omitting unsupported temperature");
            None
        }
        other => other,
    };

    let response_format = match &options.mode {
        OutputMode::Free => None,
        OutputMode::JsonObject => Some(ResponseFormat::JsonObject),
        OutputMode::JsonSchema(schema) => Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: "article".to_string(),
                schema: schema.clone(),
                strict: true,
            },
        }),
    };

    ChatRequest {
        model,
        messages,
        max_tokens,
        max_completion_tokens,
        temperature,
        response_format,
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[async_trait]
impl TextCompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> GenerationResult<String> {
        let body = chat_request(&self.model, messages, options);
        tracing::debug!(model = %self.model, mode = ?options.mode, "Requesting completion");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(self.completion_timeout)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: Some(status.as_u16()),
                message: text,
            });
        }

        let chat_resp: ChatResponse =
            resp.json().await.map_err(|e| GenerationError::Provider {
                status: None,
                message: format!("Failed to parse completion response: {e}"),
            })?;

        let text = chat_resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        Ok(text)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        size: &str,
        quality: &str,
    ) -> GenerationResult<String> {
        tracing::debug!(model = %self.image_model, "Requesting image synthesis");

        let body = serde_json::json!({
            "model": self.image_model,
            "prompt": prompt,
            "size": size,
            "quality": quality,
            "n": 1,
        });

        let resp = self
            .client
            .post(format!("{}/images/generations", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(self.image_timeout)
            .send()
            .await
            .map_err(|e| GenerationError::ImageGeneration(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::ImageGeneration(format!(
                "HTTP {status}: {text}"
            )));
        }

        let image_resp: ImageResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::ImageGeneration(e.to_string()))?;

        image_resp
            .data
            .first()
            .and_then(|d| d.url.clone())
            .ok_or_else(|| {
                GenerationError::ImageGeneration("Provider returned no image URL".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> CompletionOptions {
        CompletionOptions::json_object(1800).with_temperature(0.7)
    }

    fn body_for(model: &str, options: &CompletionOptions) -> Value {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("user")];
        serde_json::to_value(chat_request(model, &messages, options)).unwrap()
    }

    #[test]
    fn test_current_models_use_completion_token_field() {
        for model in ["gpt-5", "gpt-4o", "gpt-4o-mini"] {
            let body = body_for(model, &options());
            assert_eq!(body["max_completion_tokens"], 1800, "model {model}");
            assert!(body.get("max_tokens").is_none(), "model {model}");
        }
    }

    #[test]
    fn test_legacy_models_use_max_tokens() {
        let body = body_for("gpt-4", &options());
        assert_eq!(body["max_tokens"], 1800);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_fixed_temperature_model_omits_non_default() {
        let body = body_for("gpt-5", &options());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_fixed_temperature_model_keeps_default() {
        let body = body_for("gpt-5", &CompletionOptions::json_object(1800).with_temperature(1.0));
        assert_eq!(body["temperature"], 1.0);
    }

    #[test]
    fn test_flexible_model_keeps_temperature() {
        let body = body_for("gpt-4o", &options());
        assert_eq!(body["temperature"], json!(0.7));
    }

    #[test]
    fn test_free_mode_has_no_response_format() {
        let body = body_for("gpt-4o", &CompletionOptions::free(48));
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_json_object_mode_response_format() {
        let body = body_for("gpt-4o", &CompletionOptions::json_object(1800));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_json_schema_mode_response_format() {
        let schema = json!({"type": "object", "required": ["article_html"]});
        let body = body_for("gpt-4o", &CompletionOptions::json_schema(schema.clone(), 1800));
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"], schema);
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_message_order_preserved() {
        let body = body_for("gpt-4o", &options());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
    }
}
