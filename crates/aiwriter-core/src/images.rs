//! Image sourcing with a two-provider fallback chain.
//!
//! Illustration is strictly advisory: the chain is stock-photo search
//! first, generative synthesis second, and every failure is caught
//! locally. The only externally visible failure mode is "no image".

use crate::config::{resolve_env_var, ImagesConfig, LimitsConfig};
use crate::llm::{ChatMessage, CompletionOptions, TextCompletionClient};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const PHRASE_SYSTEM_PROMPT: &str = "You are a content assistant. Given an article topic, \
    respond with a short, descriptive phrase that best represents a good photo for this \
    topic. Respond with only the phrase.";

const PHRASE_MAX_TOKENS: u32 = 48;
const PHRASE_TEMPERATURE: f64 = 0.4;

/// Fixed, topic-parameterized prompt for the generative fallback.
fn illustration_prompt(topic: &str) -> String {
    format!(
        "Sachliche, moderne Titelillustration zum Thema „{topic}“, \
         flache Illustration, kein Text, neutraler Hintergrund."
    )
}

// --- Stock search response types (Pexels-shaped) ---

#[derive(Deserialize)]
struct StockSearchResponse {
    #[serde(default)]
    photos: Vec<StockPhoto>,
}

#[derive(Deserialize)]
struct StockPhoto {
    #[serde(default)]
    src: StockRenditions,
}

#[derive(Deserialize, Default)]
struct StockRenditions {
    large: Option<String>,
    medium: Option<String>,
    original: Option<String>,
}

impl StockRenditions {
    /// Largest available rendition, preferring display-sized over original.
    fn best(self) -> Option<String> {
        self.large.or(self.medium).or(self.original)
    }
}

/// Sources article images: stock search with a generative fallback.
pub struct ImageSourcer {
    completion: Arc<dyn TextCompletionClient>,
    http: reqwest::Client,
    config: ImagesConfig,
    stock_api_key: Option<String>,
    stock_timeout: Duration,
}

impl ImageSourcer {
    pub fn new(
        completion: Arc<dyn TextCompletionClient>,
        images: &ImagesConfig,
        limits: &LimitsConfig,
    ) -> Self {
        let stock_api_key = resolve_env_var(&images.stock_api_key);
        if stock_api_key.is_none() {
            tracing::warn!("Stock photo API key not set; falling back to image synthesis only");
        }
        Self {
            completion,
            http: reqwest::Client::new(),
            config: images.clone(),
            stock_api_key,
            stock_timeout: Duration::from_millis(limits.stock_timeout_ms),
        }
    }

    /// Derive a short visual-search phrase from the topic. Best-effort:
    /// on any failure the topic itself is used verbatim.
    async fn search_phrase(&self, topic: &str) -> String {
        let messages = [
            ChatMessage::system(PHRASE_SYSTEM_PROMPT),
            ChatMessage::user(topic),
        ];
        let options =
            CompletionOptions::free(PHRASE_MAX_TOKENS).with_temperature(PHRASE_TEMPERATURE);

        match self.completion.complete(&messages, &options).await {
            Ok(phrase) => phrase.trim_matches(['"', '\'', ' ']).to_string(),
            Err(e) => {
                tracing::warn!(topic, error = %e, "Falling back to original topic for image");
                topic.to_string()
            }
        }
    }

    /// Query the stock provider for up to `count` photos.
    async fn stock_photos(&self, phrase: &str, count: u32) -> Vec<String> {
        let Some(api_key) = &self.stock_api_key else {
            return Vec::new();
        };

        let response = self
            .http
            .get(&self.config.stock_endpoint)
            .header("Authorization", api_key)
            .query(&[("query", phrase), ("per_page", &count.to_string())])
            .timeout(self.stock_timeout)
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(phrase, status = %r.status(), "Stock photo request failed");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(phrase, error = %e, "Error fetching stock photos");
                return Vec::new();
            }
        };

        match response.json::<StockSearchResponse>().await {
            Ok(parsed) => parsed
                .photos
                .into_iter()
                .filter_map(|p| p.src.best())
                .collect(),
            Err(e) => {
                tracing::warn!(phrase, error = %e, "Malformed stock photo response");
                Vec::new()
            }
        }
    }

    /// Source a single image for the topic, or `None` if every provider
    /// came up empty. Never errors.
    pub async fn source_image(&self, topic: &str) -> Option<String> {
        self.source_images(topic, 1).await.into_iter().next()
    }

    /// Source up to `count` images: stock photos first, topped up with
    /// generative synthesis. Duplicates are dropped, order preserved.
    pub async fn source_images(&self, topic: &str, count: u32) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }

        let phrase = self.search_phrase(topic).await;
        tracing::info!(topic, phrase, "Derived image search phrase");

        let mut urls: Vec<String> = Vec::new();
        for url in self.stock_photos(&phrase, count).await {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }

        while (urls.len() as u32) < count {
            match self
                .completion
                .generate_image(
                    &illustration_prompt(topic),
                    &self.config.size,
                    &self.config.quality,
                )
                .await
            {
                Ok(url) => {
                    if urls.contains(&url) {
                        break;
                    }
                    tracing::info!(topic, "Generated fallback image");
                    urls.push(url);
                }
                Err(e) => {
                    tracing::warn!(topic, error = %e, "Image generation failed after stock fallback");
                    break;
                }
            }
        }

        urls.truncate(count as usize);
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, GenerationResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Mock completion client: configurable phrase result and a sequence
    /// of image URLs (or failure).
    struct MockClient {
        phrase: GenerationResult<String>,
        image_fails: bool,
        image_calls: AtomicU32,
    }

    impl MockClient {
        fn working() -> Self {
            Self {
                phrase: Ok("snow tent".to_string()),
                image_fails: false,
                image_calls: AtomicU32::new(0),
            }
        }

        fn phrase_fails() -> Self {
            Self {
                phrase: Err(GenerationError::EmptyCompletion),
                image_fails: false,
                image_calls: AtomicU32::new(0),
            }
        }

        fn all_fail() -> Self {
            Self {
                phrase: Err(GenerationError::EmptyCompletion),
                image_fails: true,
                image_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TextCompletionClient for MockClient {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> GenerationResult<String> {
            assert_eq!(messages[0].role, "system");
            match &self.phrase {
                Ok(p) => Ok(p.clone()),
                Err(_) => Err(GenerationError::EmptyCompletion),
            }
        }

        async fn generate_image(
            &self,
            prompt: &str,
            _size: &str,
            _quality: &str,
        ) -> GenerationResult<String> {
            assert!(prompt.contains("Titelillustration"));
            let n = self.image_calls.fetch_add(1, Ordering::SeqCst);
            if self.image_fails {
                Err(GenerationError::ImageGeneration("quota".to_string()))
            } else {
                Ok(format!("https://img.example/gen-{n}.png"))
            }
        }
    }

    fn sourcer(client: MockClient) -> ImageSourcer {
        // Empty stock key disables stock search so tests never hit the network
        let images = ImagesConfig {
            stock_api_key: String::new(),
            ..ImagesConfig::default()
        };
        ImageSourcer::new(Arc::new(client), &images, &LimitsConfig::default())
    }

    #[tokio::test]
    async fn test_generative_fallback_produces_requested_count() {
        let s = sourcer(MockClient::working());
        let urls = s.source_images("Zelte", 2).await;
        assert_eq!(urls.len(), 2);
        assert_ne!(urls[0], urls[1]);
    }

    #[tokio::test]
    async fn test_source_image_none_when_everything_fails() {
        let s = sourcer(MockClient::all_fail());
        assert_eq!(s.source_image("Zelte").await, None);
    }

    #[tokio::test]
    async fn test_phrase_failure_does_not_block_sourcing() {
        let s = sourcer(MockClient::phrase_fails());
        let urls = s.source_images("Zelte", 1).await;
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_count_short_circuits() {
        let s = sourcer(MockClient::all_fail());
        assert!(s.source_images("Zelte", 0).await.is_empty());
    }

    #[test]
    fn test_rendition_preference() {
        let r = StockRenditions {
            large: Some("L".into()),
            medium: Some("M".into()),
            original: Some("O".into()),
        };
        assert_eq!(r.best().as_deref(), Some("L"));

        let r = StockRenditions {
            large: None,
            medium: Some("M".into()),
            original: Some("O".into()),
        };
        assert_eq!(r.best().as_deref(), Some("M"));

        let r = StockRenditions::default();
        assert_eq!(r.best(), None);
    }

    #[test]
    fn test_stock_response_tolerates_missing_fields() {
        let parsed: StockSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.photos.is_empty());

        let parsed: StockSearchResponse =
            serde_json::from_str(r#"{"photos": [{"src": {"large": "https://x/l.jpg"}}]}"#)
                .unwrap();
        assert_eq!(parsed.photos.len(), 1);
    }

    #[test]
    fn test_illustration_prompt_embeds_topic() {
        let prompt = illustration_prompt("Wintercamping");
        assert!(prompt.contains("„Wintercamping“"));
        assert!(prompt.contains("kein Text"));
    }
}
