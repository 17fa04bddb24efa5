//! Job and article records plus the persistence contract of the pipeline.
//!
//! The pipeline exclusively owns the `Job.status` and `Article.status`
//! transitions; each job id is claimed by exactly one execution, and no
//! store lock is ever held across a provider call. `MemoryStore` backs
//! tests and the CLI; a relational implementation can slot in behind the
//! same trait.

use crate::error::{GenerationError, GenerationResult};
use crate::types::{ArticleBundle, GenerationRequest, Outline};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Lifecycle of one generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Lifecycle of one article row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Ready,
    Failed,
}

/// A destination WordPress site with its per-site webhook secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub domain: String,
    pub secret: String,
    /// Plan-level cap on AI images per article
    pub max_images_per_article: u32,
}

/// One generation request tracked through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub site_id: i64,
    pub request: GenerationRequest,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh pending job, as the caller-facing layer would create it.
    pub fn pending(id: i64, site_id: i64, request: GenerationRequest) -> Self {
        Self {
            id,
            site_id,
            request,
            status: JobStatus::Pending,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// One generation attempt, 1:1 with a job. Created as `draft` when
/// generation starts, updated in place, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub job_id: i64,
    pub topic: String,
    pub language: String,
    pub status: ArticleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<ArticleBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    pub image_cost_cents: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence contract of the pipeline.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Atomically move a pending job to `processing` and return it.
    /// Errors if the job is missing or not pending, so each job is
    /// processed by exactly one execution.
    async fn claim_job(&self, job_id: i64) -> GenerationResult<Job>;

    /// Look up the destination site of a job.
    async fn site(&self, site_id: i64) -> GenerationResult<Site>;

    /// Create the draft article row for a claimed job.
    async fn create_draft(&self, job: &Job) -> GenerationResult<Article>;

    /// Persist the finished bundle and mark the article `ready`.
    async fn store_bundle(
        &self,
        article_id: i64,
        bundle: &ArticleBundle,
        outline: &Outline,
        image_cost_cents: u32,
    ) -> GenerationResult<()>;

    /// Mark the job `completed` with a completion timestamp.
    async fn complete_job(&self, job_id: i64) -> GenerationResult<()>;

    /// Mark the job `failed` with a human-readable message; the article,
    /// if one was created, is marked `failed` too.
    async fn fail(&self, job_id: i64, message: &str) -> GenerationResult<()>;

    /// Mark only the job `failed`, leaving the article untouched. Used
    /// when the bundle is finished but delivery failed: the article stays
    /// `ready` for a later re-dispatch.
    async fn fail_job(&self, job_id: i64, message: &str) -> GenerationResult<()>;

    /// Record the destination-assigned post id after dispatch.
    async fn record_post_id(&self, article_id: i64, post_id: i64) -> GenerationResult<()>;

    /// Read a job.
    async fn job(&self, job_id: i64) -> GenerationResult<Job>;

    /// Read the article tied to a job.
    async fn article_for_job(&self, job_id: i64) -> GenerationResult<Article>;
}

/// Quota surface consulted by the image policy and charged after success.
#[async_trait]
pub trait QuotaGate: Send + Sync {
    /// How many AI images the site's plan allows per article.
    async fn image_allowance(&self, site_id: i64) -> u32;

    /// Charge one finished article against the site's monthly counter.
    /// Called only after confirmed success.
    async fn charge_article(&self, site_id: i64, images: u32, image_cost_cents: u32);
}

#[derive(Default)]
struct MemoryInner {
    sites: HashMap<i64, Site>,
    jobs: HashMap<i64, Job>,
    articles: HashMap<i64, Article>,
    articles_charged: HashMap<i64, u32>,
    next_article_id: i64,
}

/// In-memory store for tests and the one-shot CLI.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&self, site: Site) {
        self.inner.lock().unwrap().sites.insert(site.id, site);
    }

    pub fn insert_job(&self, job: Job) {
        self.inner.lock().unwrap().jobs.insert(job.id, job);
    }

    /// Articles charged against a site so far (test observability).
    pub fn charged_articles(&self, site_id: i64) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .articles_charged
            .get(&site_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn claim_job(&self, job_id: i64) -> GenerationResult<Job> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(GenerationError::JobNotFound(job_id))?;
        if job.status != JobStatus::Pending {
            return Err(GenerationError::JobNotClaimable {
                id: job_id,
                status: job.status.to_string(),
            });
        }
        job.status = JobStatus::Processing;
        Ok(job.clone())
    }

    async fn site(&self, site_id: i64) -> GenerationResult<Site> {
        self.inner
            .lock()
            .unwrap()
            .sites
            .get(&site_id)
            .cloned()
            .ok_or(GenerationError::SiteNotFound(site_id))
    }

    async fn create_draft(&self, job: &Job) -> GenerationResult<Article> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_article_id += 1;
        let article = Article {
            id: inner.next_article_id,
            job_id: job.id,
            topic: job.request.topic.clone(),
            language: job.request.language.clone(),
            status: ArticleStatus::Draft,
            bundle: None,
            outline: None,
            image_cost_cents: 0,
            post_id: None,
            updated_at: Utc::now(),
        };
        inner.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn store_bundle(
        &self,
        article_id: i64,
        bundle: &ArticleBundle,
        outline: &Outline,
        image_cost_cents: u32,
    ) -> GenerationResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let article = inner
            .articles
            .get_mut(&article_id)
            .ok_or(GenerationError::ArticleNotFound(article_id))?;
        article.topic = bundle.title.clone();
        article.bundle = Some(bundle.clone());
        article.outline = Some(outline.clone());
        article.image_cost_cents = image_cost_cents;
        article.status = ArticleStatus::Ready;
        article.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_job(&self, job_id: i64) -> GenerationResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(GenerationError::JobNotFound(job_id))?;
        job.status = JobStatus::Completed;
        job.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: i64, message: &str) -> GenerationResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(GenerationError::JobNotFound(job_id))?;
        job.status = JobStatus::Failed;
        job.error = Some(message.to_string());
        job.finished_at = Some(Utc::now());

        if let Some(article) = inner.articles.values_mut().find(|a| a.job_id == job_id) {
            article.status = ArticleStatus::Failed;
            article.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn fail_job(&self, job_id: i64, message: &str) -> GenerationResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(GenerationError::JobNotFound(job_id))?;
        job.status = JobStatus::Failed;
        job.error = Some(message.to_string());
        job.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn record_post_id(&self, article_id: i64, post_id: i64) -> GenerationResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let article = inner
            .articles
            .get_mut(&article_id)
            .ok_or(GenerationError::ArticleNotFound(article_id))?;
        article.post_id = Some(post_id);
        article.updated_at = Utc::now();
        Ok(())
    }

    async fn job(&self, job_id: i64) -> GenerationResult<Job> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(GenerationError::JobNotFound(job_id))
    }

    async fn article_for_job(&self, job_id: i64) -> GenerationResult<Article> {
        self.inner
            .lock()
            .unwrap()
            .articles
            .values()
            .find(|a| a.job_id == job_id)
            .cloned()
            .ok_or(GenerationError::ArticleNotFound(job_id))
    }
}

#[async_trait]
impl QuotaGate for MemoryStore {
    async fn image_allowance(&self, site_id: i64) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .sites
            .get(&site_id)
            .map(|s| s.max_images_per_article)
            .unwrap_or(0)
    }

    async fn charge_article(&self, site_id: i64, images: u32, image_cost_cents: u32) {
        let mut inner = self.inner.lock().unwrap();
        *inner.articles_charged.entry(site_id).or_insert(0) += 1;
        tracing::debug!(site_id, images, image_cost_cents, "Charged article");
    }
}
