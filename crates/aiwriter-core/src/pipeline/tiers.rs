//! The tiered generation chain.
//!
//! Three strategies are tried in a fixed order of decreasing structure:
//! schema-validated JSON, best-effort JSON object, plain HTML. Every tier
//! funnels its output through the same normalizer, so downstream code
//! sees one shape regardless of which tier produced it.

use crate::error::{GenerationError, GenerationResult};
use crate::llm::{CompletionOptions, TextCompletionClient};
use crate::normalize::{clean_completion_text, normalize, parse_model_json, NormalizedArticle};
use crate::pipeline::prompt;
use crate::types::GenerationRequest;
use serde_json::json;

/// One strategy in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTier {
    StrictSchema,
    JsonObject,
    PlainHtml,
}

/// Tiers in the order they are attempted.
pub const TIER_ORDER: [GenerationTier; 3] = [
    GenerationTier::StrictSchema,
    GenerationTier::JsonObject,
    GenerationTier::PlainHtml,
];

impl GenerationTier {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationTier::StrictSchema => "strict_schema",
            GenerationTier::JsonObject => "json_object",
            GenerationTier::PlainHtml => "plain_html",
        }
    }
}

/// Run a single tier attempt: one completion call, one normalization.
pub async fn attempt_tier(
    client: &dyn TextCompletionClient,
    tier: GenerationTier,
    request: &GenerationRequest,
    max_output_tokens: u32,
    temperature: f64,
) -> GenerationResult<NormalizedArticle> {
    let raw = match tier {
        GenerationTier::StrictSchema => {
            let messages = prompt::build_messages(request);
            let options = CompletionOptions::json_schema(prompt::article_schema(), max_output_tokens)
                .with_temperature(temperature);
            let text = client.complete(&messages, &options).await?;
            parse_model_json(&text)?
        }
        GenerationTier::JsonObject => {
            let messages = prompt::build_messages(request);
            let options =
                CompletionOptions::json_object(max_output_tokens).with_temperature(temperature);
            let text = client.complete(&messages, &options).await?;
            parse_model_json(&text)?
        }
        GenerationTier::PlainHtml => {
            let messages = prompt::build_plain_html_messages(request);
            let options =
                CompletionOptions::free(max_output_tokens).with_temperature(temperature);
            let text = client.complete(&messages, &options).await?;
            // Last-resort tier: the raw HTML becomes a minimal object and
            // the normalizer synthesizes title, meta and schema around it.
            json!({ "article_html": clean_completion_text(&text) })
        }
    };

    normalize(&raw, &request.topic, &request.language)
}

/// Walk the chain until a tier produces a normalized article. Errors with
/// the last tier's failure once every tier is spent.
pub async fn run_tier_chain(
    client: &dyn TextCompletionClient,
    request: &GenerationRequest,
    max_output_tokens: u32,
    temperature: f64,
) -> GenerationResult<NormalizedArticle> {
    let mut last: Option<GenerationError> = None;

    for tier in TIER_ORDER {
        match attempt_tier(client, tier, request, max_output_tokens, temperature).await {
            Ok(article) => {
                tracing::info!(tier = tier.label(), provider = client.name(), "Tier succeeded");
                return Ok(article);
            }
            Err(e) => {
                tracing::warn!(tier = tier.label(), error = %e, "Tier failed");
                last = Some(e);
            }
        }
    }

    Err(GenerationError::Exhausted {
        last: Box::new(last.unwrap_or(GenerationError::EmptyCompletion)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, OutputMode};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const ARTICLE_JSON: &str = r#"{
        "title": "Zelte für Wintercamping",
        "article_html": "<h2>Zelte</h2><p>Text</p>",
        "meta": {"title": "Winterzelte", "description": "Alles über Winterzelte."},
        "faq": [{"q": "Welches Zelt?", "a": "Ein Geodät."}]
    }"#;

    /// Scripted client: one canned result per completion call, recorded
    /// with the output mode it was asked for.
    struct ScriptedClient {
        script: Vec<GenerationResult<String>>,
        calls: AtomicU32,
        modes: Mutex<Vec<&'static str>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<GenerationResult<String>>) -> Self {
            Self {
                script,
                calls: AtomicU32::new(0),
                modes: Mutex::new(Vec::new()),
            }
        }

        fn modes(&self) -> Vec<&'static str> {
            self.modes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextCompletionClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            options: &CompletionOptions,
        ) -> GenerationResult<String> {
            self.modes.lock().unwrap().push(match options.mode {
                OutputMode::Free => "free",
                OutputMode::JsonObject => "json_object",
                OutputMode::JsonSchema(_) => "json_schema",
            });
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.script.get(n) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(_)) => Err(GenerationError::EmptyCompletion),
                None => panic!("unexpected completion call {n}"),
            }
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            _size: &str,
            _quality: &str,
        ) -> GenerationResult<String> {
            Err(GenerationError::ImageGeneration("not scripted".into()))
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("Zelte für Wintercamping", "de")
    }

    #[tokio::test]
    async fn test_first_tier_success_stops_the_chain() {
        let client = ScriptedClient::new(vec![Ok(ARTICLE_JSON.to_string())]);
        let article = run_tier_chain(&client, &request(), 1800, 1.0).await.unwrap();
        assert_eq!(article.title, "Zelte für Wintercamping");
        assert_eq!(client.modes(), vec!["json_schema"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_json_object_on_provider_error() {
        let client = ScriptedClient::new(vec![
            Err(GenerationError::EmptyCompletion),
            Ok(ARTICLE_JSON.to_string()),
        ]);
        let article = run_tier_chain(&client, &request(), 1800, 1.0).await.unwrap();
        assert_eq!(article.faq.len(), 1);
        assert_eq!(client.modes(), vec!["json_schema", "json_object"]);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_through_to_plain_html() {
        let client = ScriptedClient::new(vec![
            Ok("not json at all".to_string()),
            Ok("still { not json".to_string()),
            Ok("<h2>Zelte im Winter</h2><p>Text</p>".to_string()),
        ]);
        let article = run_tier_chain(&client, &request(), 1800, 1.0).await.unwrap();
        // Plain-HTML tier: title recovered from the first heading
        assert_eq!(article.title, "Zelte im Winter");
        assert_eq!(client.modes(), vec!["json_schema", "json_object", "free"]);
    }

    #[tokio::test]
    async fn test_plain_html_strips_markdown_fences() {
        let client = ScriptedClient::new(vec![
            Err(GenerationError::EmptyCompletion),
            Err(GenerationError::EmptyCompletion),
            Ok("```\n<h2>Zelte</h2><p>Text</p>\n```".to_string()),
        ]);
        let article = run_tier_chain(&client, &request(), 1800, 1.0).await.unwrap();
        assert!(article.article_html.starts_with("<h2>"));
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_failure() {
        let client = ScriptedClient::new(vec![
            Err(GenerationError::EmptyCompletion),
            Err(GenerationError::EmptyCompletion),
            Ok(String::new()),
        ]);
        let err = run_tier_chain(&client, &request(), 1800, 1.0).await.unwrap_err();
        match err {
            GenerationError::Exhausted { last } => {
                assert!(matches!(*last, GenerationError::Normalization(_)));
            }
            other => panic!("expected exhaustion, got {other}"),
        }
    }

    #[test]
    fn test_tier_order_is_strict_first() {
        assert_eq!(TIER_ORDER[0], GenerationTier::StrictSchema);
        assert_eq!(TIER_ORDER[2], GenerationTier::PlainHtml);
    }
}
