//! Error types for the aiwriter generation pipeline.
//!
//! Errors are organized by concern: configuration errors surface at startup,
//! generation errors follow the tiered fallback policy (one tier's failure
//! triggers the next tier, image failures never escalate, only exhaustion
//! and dispatch failure reach the job record).

use thiserror::Error;

/// Top-level error type for aiwriter operations.
#[derive(Error, Debug)]
pub enum AiwriterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Article generation errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors produced while turning a topic into a published article.
///
/// The variants mirror the fallback policy: `ProviderUnavailable`,
/// `Provider`, `EmptyCompletion` and `Normalization` are recoverable per
/// tier; `Exhausted` and `Dispatch` are terminal for the attempt.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The provider could not be reached (network error or timeout)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider answered with a non-2xx status
    #[error("Provider error (HTTP {status:?}): {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// The provider returned no usable text
    #[error("Provider returned an empty completion")]
    EmptyCompletion,

    /// Model output could not be coerced into an article bundle
    #[error("Normalization failed: {0}")]
    Normalization(String),

    /// Every fallback tier failed; carries the last underlying error
    #[error("All generation tiers failed: {last}")]
    Exhausted {
        #[source]
        last: Box<GenerationError>,
    },

    /// Image synthesis failed (never escalates past image sourcing)
    #[error("Image generation failed: {0}")]
    ImageGeneration(String),

    /// The finished bundle could not be delivered to the destination site
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// The job id does not exist in the store
    #[error("Job {0} not found")]
    JobNotFound(i64),

    /// The job is not in a claimable state (already processed or in flight)
    #[error("Job {id} is not pending (status: {status})")]
    JobNotClaimable { id: i64, status: String },

    /// The article row tied to a job is missing
    #[error("Article for job {0} not found")]
    ArticleNotFound(i64),

    /// The site referenced by a job does not exist
    #[error("Site {0} not found")]
    SiteNotFound(i64),
}

impl GenerationError {
    /// Whether this error is terminal for the whole attempt rather than
    /// for a single tier.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationError::Exhausted { .. }
                | GenerationError::Dispatch(_)
                | GenerationError::JobNotFound(_)
                | GenerationError::JobNotClaimable { .. }
                | GenerationError::ArticleNotFound(_)
                | GenerationError::SiteNotFound(_)
        )
    }
}

/// Convenience type alias for aiwriter results.
pub type Result<T> = std::result::Result<T, AiwriterError>;

/// Convenience type alias for generation-specific results.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
