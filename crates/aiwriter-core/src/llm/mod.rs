//! Text-completion and image-synthesis provider integration.

mod client;
mod openai;

pub use client::{ChatMessage, CompletionOptions, OutputMode, TextCompletionClient};
pub use openai::OpenAiClient;
