//! Delivery of finished bundles to the destination site.
//!
//! The payload is signed with HMAC-SHA256 over its canonical JSON
//! serialization, keyed by the per-site secret, so the receiving plugin
//! can verify origin before creating the post.

use crate::error::{GenerationError, GenerationResult};
use crate::store::Site;
use crate::config::DispatchConfig;
use crate::types::{ArticleBundle, FaqEntry, MetaTags};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// The signed payload delivered to the destination site.
///
/// `featured_image` is serialized even when absent; the receiving plugin
/// relies on a fixed field set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishPayload {
    pub title: String,
    pub content_html: String,
    pub meta: MetaTags,
    pub faq: Vec<FaqEntry>,
    pub schema: Value,
    pub featured_image: Option<String>,
    pub content_images: Vec<String>,
    pub category: Option<u32>,
    pub tags: Option<String>,
    pub include_faq: bool,
}

impl PublishPayload {
    pub fn from_bundle(bundle: &ArticleBundle, include_faq: bool) -> Self {
        Self {
            title: bundle.title.clone(),
            content_html: bundle.article_html.clone(),
            meta: bundle.meta.clone(),
            faq: bundle.faq.clone(),
            schema: bundle.schema.clone(),
            featured_image: bundle.featured_image.clone(),
            content_images: bundle.content_images.clone(),
            category: bundle.category,
            tags: bundle.tags.clone(),
            include_faq,
        }
    }
}

/// Canonical (sorted-key) JSON serialization of the payload.
///
/// Going through `serde_json::Value` sorts object keys (its map is
/// BTree-backed), which is what makes the signature reproducible on the
/// receiving side.
pub fn canonical_json(payload: &PublishPayload) -> GenerationResult<String> {
    let value = serde_json::to_value(payload)
        .map_err(|e| GenerationError::Dispatch(format!("Payload serialization failed: {e}")))?;
    serde_json::to_string(&value)
        .map_err(|e| GenerationError::Dispatch(format!("Payload serialization failed: {e}")))
}

/// HMAC-SHA256 signature (lowercase hex) over the canonical payload JSON.
pub fn sign_payload(payload: &PublishPayload, secret: &str) -> GenerationResult<String> {
    let canonical = canonical_json(payload)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GenerationError::Dispatch(format!("Invalid signing key: {e}")))?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Serialize)]
struct SignedEnvelope<'a> {
    payload: &'a PublishPayload,
    signature: &'a str,
}

#[derive(Deserialize)]
struct PublishAck {
    post_id: Option<i64>,
}

/// Trait for delivering a finished bundle to its destination.
#[async_trait]
pub trait PublishDispatcher: Send + Sync {
    /// Deliver the payload and return the destination-assigned post id.
    async fn deliver(&self, site: &Site, payload: &PublishPayload) -> GenerationResult<i64>;
}

/// HTTPS webhook dispatcher posting to the site's publish route.
pub struct WebhookDispatcher {
    http: reqwest::Client,
    route: String,
    timeout: Duration,
}

impl WebhookDispatcher {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            route: config.route.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

#[async_trait]
impl PublishDispatcher for WebhookDispatcher {
    async fn deliver(&self, site: &Site, payload: &PublishPayload) -> GenerationResult<i64> {
        let signature = sign_payload(payload, &site.secret)?;
        let url = format!("https://{}{}", site.domain, self.route);
        tracing::info!(domain = %site.domain, "Dispatching article");

        let resp = self
            .http
            .post(&url)
            .json(&SignedEnvelope {
                payload,
                signature: &signature,
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GenerationError::Dispatch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Dispatch(format!("HTTP {status}: {text}")));
        }

        let ack: PublishAck = resp
            .json()
            .await
            .map_err(|e| GenerationError::Dispatch(format!("Malformed publish response: {e}")))?;

        ack.post_id.ok_or_else(|| {
            GenerationError::Dispatch("Destination returned no post id".to_string())
        })
    }
}
