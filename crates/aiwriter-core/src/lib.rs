//! Aiwriter Core - Embeddable article generation library.
//!
//! Aiwriter turns a topic into a complete, SEO-ready article bundle and
//! delivers it to a WordPress site via a signed webhook.
//!
//! # Architecture
//!
//! ```text
//! Job → Claim → Tiered completion → Normalize → Images → Bundle → Signed dispatch
//! ```
//!
//! The tier chain degrades gracefully: schema-validated JSON first, then
//! best-effort JSON object, then plain HTML that the normalizer wraps.
//! All three converge on the same [`types::ArticleBundle`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use aiwriter_core::{ArticleGenerator, Config};
//! use aiwriter_core::llm::OpenAiClient;
//!
//! #[tokio::main]
//! async fn main() -> aiwriter_core::Result<()> {
//!     let config = Config::load()?;
//!     let client = OpenAiClient::from_config(&config.completion, &config.limits)?;
//!     // wire up store, quota, dispatcher, then:
//!     // generator.generate(job_id).await;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod dispatch;
pub mod error;
pub mod images;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod planner;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use dispatch::{PublishDispatcher, PublishPayload, WebhookDispatcher};
pub use error::{AiwriterError, ConfigError, GenerationError, GenerationResult, Result};
pub use images::ImageSourcer;
pub use normalize::NormalizedArticle;
pub use pipeline::{ArticleGenerator, GenerationTier};
pub use planner::{PlannedTitle, TitlePlanner};
pub use store::{Article, ArticleStore, Job, MemoryStore, QuotaGate, Site};
pub use types::{ArticleBundle, GenerationRequest, LengthTier, MetaTags};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
