//! The `aiwriter generate` command: one article, end to end.
//!
//! Runs the full pipeline against an in-memory job store. The finished
//! bundle is written to the output directory; with `--domain` it is also
//! delivered to the site's publish webhook.

use aiwriter_core::dispatch::sign_payload;
use aiwriter_core::llm::OpenAiClient;
use aiwriter_core::store::Job;
use aiwriter_core::{
    ArticleGenerator, ArticleStore, Config, GenerationRequest, GenerationResult, ImageSourcer,
    LengthTier, MemoryStore, PublishDispatcher, PublishPayload, QuotaGate, Site,
    WebhookDispatcher,
};
use anyhow::Context;
use async_trait::async_trait;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Topic of the article
    #[arg(required = true)]
    pub topic: String,

    /// Language code for the article content
    #[arg(short, long, default_value = "de")]
    pub language: String,

    /// Target length (short, medium, long)
    #[arg(long, default_value = "medium")]
    pub length: LengthTier,

    /// Free-text context for the prompt
    #[arg(long)]
    pub context: Option<String>,

    /// Skip the FAQ block
    #[arg(long)]
    pub no_faq: bool,

    /// Target URL for the call-to-action block
    #[arg(long)]
    pub cta_url: Option<String>,

    /// Number of AI-sourced images
    #[arg(long, default_value = "0")]
    pub images: u32,

    /// Use these image URLs verbatim instead of AI sourcing (repeatable)
    #[arg(long = "image-url")]
    pub image_urls: Vec<String>,

    /// Destination category id
    #[arg(long)]
    pub category: Option<u32>,

    /// Destination tag string
    #[arg(long)]
    pub tags: Option<String>,

    /// Destination site domain; omit to skip webhook delivery
    #[arg(long)]
    pub domain: Option<String>,

    /// Webhook signing secret of the destination site
    #[arg(long, env = "AIWRITER_SITE_SECRET", default_value = "dev-secret")]
    pub secret: String,

    /// Directory for article.json and article.html
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Stand-in dispatcher for local runs: signs the payload like the real
/// webhook would, then stops short of the network.
struct LocalDispatcher;

#[async_trait]
impl PublishDispatcher for LocalDispatcher {
    async fn deliver(&self, site: &Site, payload: &PublishPayload) -> GenerationResult<i64> {
        let signature = sign_payload(payload, &site.secret)?;
        tracing::info!(signature, "Local run; skipping webhook delivery");
        Ok(0)
    }
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs, config: Config) -> anyhow::Result<()> {
    let client: Arc<dyn aiwriter_core::llm::TextCompletionClient> = Arc::new(
        OpenAiClient::from_config(&config.completion, &config.limits)
            .context("Completion provider setup failed")?,
    );
    let sourcer = ImageSourcer::new(Arc::clone(&client), &config.images, &config.limits);

    let request = GenerationRequest {
        topic: args.topic.clone(),
        language: args.language,
        length: args.length,
        context: args.context,
        include_faq: !args.no_faq,
        cta_url: args.cta_url,
        requested_images: args.images,
        supplied_images: args.image_urls,
        category: args.category,
        tags: args.tags,
    };

    // One-shot run: seed an in-memory store with a single site and job
    let store = Arc::new(MemoryStore::new());
    store.insert_site(Site {
        id: 1,
        domain: args.domain.clone().unwrap_or_else(|| "localhost".to_string()),
        secret: args.secret,
        max_images_per_article: args.images,
    });
    store.insert_job(Job::pending(1, 1, request));

    let dispatcher: Arc<dyn PublishDispatcher> = match &args.domain {
        Some(_) => Arc::new(WebhookDispatcher::new(&config.dispatch)),
        None => Arc::new(LocalDispatcher),
    };

    let generator = ArticleGenerator::new(
        client,
        sourcer,
        Arc::clone(&store) as Arc<dyn ArticleStore>,
        Arc::clone(&store) as Arc<dyn QuotaGate>,
        dispatcher,
        &config,
    );

    let delivered = generator.generate(1).await;
    let article = store.article_for_job(1).await?;

    let Some(bundle) = &article.bundle else {
        let job = store.job(1).await?;
        anyhow::bail!(
            "Generation failed: {}",
            job.error.unwrap_or_else(|| "unknown error".to_string())
        );
    };

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Cannot create output directory {}", args.output.display()))?;

    let json_path = args.output.join("article.json");
    let html_path = args.output.join("article.html");
    std::fs::write(&json_path, serde_json::to_string_pretty(bundle)?)?;
    std::fs::write(&html_path, &bundle.article_html)?;

    println!("Title:          {}", bundle.title);
    println!("Meta title:     {}", bundle.meta.title);
    println!("FAQ entries:    {}", bundle.faq.len());
    if let Some(url) = &bundle.featured_image {
        println!("Featured image: {url}");
    }
    println!("Image cost:     {} ct", article.image_cost_cents);
    println!("Bundle:         {}", json_path.display());
    println!("HTML:           {}", html_path.display());

    if !delivered {
        let job = store.job(1).await?;
        anyhow::bail!(
            "Article generated but not delivered: {}",
            job.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    if let Some(post_id) = article.post_id {
        if post_id > 0 {
            println!("Published:      post {post_id}");
        }
    }

    Ok(())
}
