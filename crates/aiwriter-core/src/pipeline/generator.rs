//! The generation orchestrator.
//!
//! `ArticleGenerator::generate` drives one job end to end: claim, draft,
//! tiered text generation, image policy, post-processing, persistence,
//! signed dispatch, completion bookkeeping. Every failure path lands in
//! the store so callers can poll job state instead of holding a handle.

use crate::config::Config;
use crate::dispatch::{PublishDispatcher, PublishPayload};
use crate::error::{GenerationError, GenerationResult};
use crate::images::ImageSourcer;
use crate::llm::TextCompletionClient;
use crate::pipeline::prompt::cta_block;
use crate::pipeline::tiers::run_tier_chain;
use crate::store::{ArticleStore, Job, QuotaGate, Site};
use crate::types::ArticleBundle;
use std::sync::Arc;

/// Split a sourced image list into featured image and in-body images.
///
/// The first image becomes the featured image; the rest flow into the
/// body. The featured URL never repeats in the body list.
pub(crate) fn split_images(urls: Vec<String>) -> (Option<String>, Vec<String>) {
    let mut iter = urls.into_iter();
    let featured = iter.next();
    let content = iter.filter(|url| Some(url) != featured.as_ref()).collect();
    (featured, content)
}

/// Generation-time knobs lifted out of the config.
#[derive(Debug, Clone)]
struct GeneratorOptions {
    max_output_tokens: u32,
    temperature: f64,
    image_cost_cents: u32,
}

/// Drives one generation job from claim to dispatched article.
pub struct ArticleGenerator {
    completion: Arc<dyn TextCompletionClient>,
    images: ImageSourcer,
    store: Arc<dyn ArticleStore>,
    quota: Arc<dyn QuotaGate>,
    dispatcher: Arc<dyn PublishDispatcher>,
    options: GeneratorOptions,
}

impl ArticleGenerator {
    pub fn new(
        completion: Arc<dyn TextCompletionClient>,
        images: ImageSourcer,
        store: Arc<dyn ArticleStore>,
        quota: Arc<dyn QuotaGate>,
        dispatcher: Arc<dyn PublishDispatcher>,
        config: &Config,
    ) -> Self {
        Self {
            completion,
            images,
            store,
            quota,
            dispatcher,
            options: GeneratorOptions {
                max_output_tokens: config.completion.max_output_tokens,
                temperature: config.completion.temperature,
                image_cost_cents: config.images.cost_cents_per_image,
            },
        }
    }

    /// Process one job. Returns whether the article was generated and
    /// delivered; every failure is recorded on the job before returning.
    pub async fn generate(&self, job_id: i64) -> bool {
        match self.run(job_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(job_id, error = %e, "Generation failed");
                let record = match &e {
                    // The job was never claimed by this execution; its
                    // state belongs to whoever holds it.
                    GenerationError::JobNotFound(_) | GenerationError::JobNotClaimable { .. } => {
                        Ok(())
                    }
                    // Bundle is finished and stored; only the job failed.
                    GenerationError::Dispatch(_) => {
                        self.store.fail_job(job_id, &e.to_string()).await
                    }
                    _ => self.store.fail(job_id, &e.to_string()).await,
                };
                if let Err(store_err) = record {
                    tracing::error!(job_id, error = %store_err, "Could not record job failure");
                }
                false
            }
        }
    }

    async fn run(&self, job_id: i64) -> GenerationResult<()> {
        let job = self.store.claim_job(job_id).await?;
        let site = self.store.site(job.site_id).await?;
        tracing::info!(job_id, site_id = site.id, topic = %job.request.topic, "Claimed job");

        let article = self.store.create_draft(&job).await?;

        let normalized = run_tier_chain(
            self.completion.as_ref(),
            &job.request,
            self.options.max_output_tokens,
            self.options.temperature,
        )
        .await?;

        let (featured_image, content_images, ai_images, image_cost_cents) =
            self.resolve_images(&job, &site).await;

        let mut article_html = normalized.article_html;
        if let Some(url) = &job.request.cta_url {
            article_html.push_str(&cta_block(url));
        }

        // FAQ toggle is authoritative over whatever the model returned
        let faq = if job.request.include_faq {
            normalized.faq
        } else {
            Vec::new()
        };

        let bundle = ArticleBundle {
            title: normalized.title,
            article_html,
            meta: normalized.meta,
            faq,
            schema: normalized.schema,
            featured_image,
            content_images,
            category: job.request.category,
            tags: job.request.tags.clone(),
        };

        self.store
            .store_bundle(article.id, &bundle, &normalized.outline, image_cost_cents)
            .await?;

        let payload = PublishPayload::from_bundle(&bundle, job.request.include_faq);
        let post_id = self.dispatcher.deliver(&site, &payload).await?;

        self.store.record_post_id(article.id, post_id).await?;
        self.store.complete_job(job.id).await?;
        self.quota
            .charge_article(site.id, ai_images, image_cost_cents)
            .await;

        tracing::info!(job_id, post_id, "Job completed");
        Ok(())
    }

    /// Apply the image policy: caller-supplied URLs are used verbatim and
    /// free of charge; otherwise AI sourcing runs up to the smaller of the
    /// requested count and the site's plan allowance.
    async fn resolve_images(
        &self,
        job: &Job,
        site: &Site,
    ) -> (Option<String>, Vec<String>, u32, u32) {
        let request = &job.request;

        if !request.supplied_images.is_empty() {
            let (featured, content) = split_images(request.supplied_images.clone());
            return (featured, content, 0, 0);
        }

        if request.requested_images == 0 {
            return (None, Vec::new(), 0, 0);
        }

        let allowance = self.quota.image_allowance(site.id).await;
        let count = request.requested_images.min(allowance);
        if count == 0 {
            tracing::info!(
                site_id = site.id,
                requested = request.requested_images,
                "Image allowance exhausted; skipping illustration"
            );
            return (None, Vec::new(), 0, 0);
        }

        let urls = self.images.source_images(&request.topic, count).await;
        let sourced = urls.len() as u32;
        let (featured, content) = split_images(urls);
        (
            featured,
            content,
            sourced,
            sourced * self.options.image_cost_cents,
        )
    }
}
