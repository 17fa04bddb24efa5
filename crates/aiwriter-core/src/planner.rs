//! Topic planning: proposes article titles for a site ahead of time.
//!
//! Sits in front of the pipeline: each planned title becomes the topic of
//! a later generation job.

use crate::error::{GenerationError, GenerationResult};
use crate::llm::{ChatMessage, CompletionOptions, TextCompletionClient};
use crate::normalize::parse_model_json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PLANNER_SYSTEM_PROMPT: &str = "Du bist ein Content-Stratege für SEO-Blogartikel. \
    Entwickle konkrete, suchmaschinenfreundliche Artikeltitel, die sich nicht überschneiden. \
    Antworte ausschließlich als gültiges JSON-Objekt ohne zusätzliche Erklärungen.";

const PLANNER_MAX_TOKENS: u32 = 900;
const PLANNER_TEMPERATURE: f64 = 0.8;

/// One proposed article, ready to be turned into a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedTitle {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Plans article titles for a site theme.
pub struct TitlePlanner {
    completion: Arc<dyn TextCompletionClient>,
}

impl TitlePlanner {
    pub fn new(completion: Arc<dyn TextCompletionClient>) -> Self {
        Self { completion }
    }

    fn user_prompt(theme: &str, language: &str, count: u32, existing: &[String]) -> String {
        let mut prompt = format!(
            "Sprache: {language}\nWebsite-Thema: {theme}\n\nSchlage {count} neue Artikeltitel vor.\n"
        );

        if !existing.is_empty() {
            prompt.push_str("\nBereits vorhandene Artikel (keine Dubletten):\n");
            for title in existing {
                prompt.push_str(&format!("- {title}\n"));
            }
        }

        prompt.push_str(
            r#"
Gib EIN JSON-Objekt mit dieser Struktur zurück:
{
  "titles": [
    {"title": "string", "description": "string (1–2 Sätze)", "keywords": ["string"]}
  ]
}
"#,
        );
        prompt
    }

    /// Propose up to `count` titles; already-published titles are passed
    /// in so the model avoids near-duplicates.
    pub async fn plan(
        &self,
        theme: &str,
        language: &str,
        count: u32,
        existing: &[String],
    ) -> GenerationResult<Vec<PlannedTitle>> {
        let messages = [
            ChatMessage::system(PLANNER_SYSTEM_PROMPT),
            ChatMessage::user(Self::user_prompt(theme, language, count, existing)),
        ];
        let options =
            CompletionOptions::json_object(PLANNER_MAX_TOKENS).with_temperature(PLANNER_TEMPERATURE);

        let text = self.completion.complete(&messages, &options).await?;
        let value = parse_model_json(&text)?;

        let list = value
            .get("titles")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                GenerationError::Normalization("Planner response lacks a titles array".to_string())
            })?;

        let mut titles: Vec<PlannedTitle> = list
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .filter(|t: &PlannedTitle| !t.title.trim().is_empty())
            .collect();

        if titles.is_empty() {
            return Err(GenerationError::Normalization(
                "Planner returned no usable titles".to_string(),
            ));
        }

        titles.truncate(count as usize);
        tracing::info!(theme, count = titles.len(), "Planned article titles");
        Ok(titles)
    }
}
