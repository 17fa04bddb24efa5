//! The article generation pipeline.
//!
//! `prompt` builds the model-facing messages, `tiers` runs the fallback
//! chain, and `generator` orchestrates one job end to end.

pub mod generator;
pub mod prompt;
pub mod tiers;

pub use generator::ArticleGenerator;
pub use tiers::{GenerationTier, TIER_ORDER};
