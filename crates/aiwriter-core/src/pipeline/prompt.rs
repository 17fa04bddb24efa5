//! Prompt construction for the article payload.
//!
//! The system prompt pins the editorial register; the user prompt carries
//! the structure template the normalizer expects. Wording is German
//! because the product targets German SEO articles, but the requested
//! language is injected so the model writes the content itself in it.

use crate::llm::ChatMessage;
use crate::types::GenerationRequest;
use chrono::Utc;
use serde_json::{json, Value};

pub const ARTICLE_SYSTEM_PROMPT: &str = "Du bist ein deutscher SEO-Redakteur. Der Artikel muss \
    als sauberes HTML mit H2/H3-Struktur, kurzen Absätzen (≤120 Wörter) und sinnvollen Listen \
    verfasst sein. Nutze einen professionellen Ton, verzichte auf übertriebene Sprache sowie \
    Inline-CSS oder Skripte. Antworte ausschließlich als gültiges JSON-Objekt ohne zusätzliche \
    Erklärungen.";

const PLAIN_HTML_SYSTEM_PROMPT: &str = "Du bist ein deutscher SEO-Redakteur. Schreibe den \
    vollständigen Artikel als sauberes HTML mit H2/H3-Struktur, kurzen Absätzen (≤120 Wörter) \
    und sinnvollen Listen. Beginne mit einer <h2>-Überschrift. Gib NUR HTML zurück, kein JSON, \
    kein Markdown, keine Erklärungen.";

/// JSON schema for the strict-schema tier. Only `article_html` is
/// required; everything else the normalizer can synthesize.
pub fn article_schema() -> Value {
    json!({
        "type": "object",
        "required": ["article_html"],
        "properties": {
            "title": {"type": "string"},
            "article_html": {"type": "string"},
            "meta": {
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                },
            },
            "faq": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["q", "a"],
                    "properties": {
                        "q": {"type": "string"},
                        "a": {"type": "string"},
                    },
                },
            },
            "schema": {"type": "object"},
        },
    })
}

/// Build the system+user prompt pair for the JSON tiers.
pub fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let published = Utc::now().to_rfc3339();
    let faq_rule = if request.include_faq {
        "- 3–5 FAQ-Einträge."
    } else {
        "- Kein FAQ-Abschnitt; gib \"faq\": [] zurück."
    };

    let mut user_prompt = format!(
        "Sprache: {language}\nThema: {topic}\nLänge: {hint}\n",
        language = request.language,
        topic = request.topic,
        hint = request.length.hint(),
    );

    if let Some(context) = &request.context {
        user_prompt.push_str(&format!("\nZusätzlicher Kontext:\n{context}\n"));
    }

    user_prompt.push_str(&format!(
        r#"
Gib EIN JSON-Objekt mit dieser Struktur zurück:
{{
  "title": "string (Artikel-Titel)",
  "article_html": "string (vollständiger HTML-Artikel mit <h2>/<h3>, <p>, <ul>/<ol> wo sinnvoll)",
  "meta": {{
    "title": "string (≤60 Zeichen)",
    "description": "string (≤155 Zeichen)"
  }},
  "faq": [
    {{"q": "string", "a": "string (80–100 Wörter)"}}
  ],
  "schema": {{
    "@context": "https://schema.org",
    "@type": "Article",
    "headline": "string",
    "datePublished": "{published}",
    "inLanguage": "{language}"
  }}
}}

Regeln:
- Gib ausschließlich JSON zurück.
- `article_html` muss fertiges, sauberes HTML sein (ohne Inline-CSS/Script/iframe).
- `meta.title` ≤ 60 Zeichen, `meta.description` ≤ 155 Zeichen.
{faq_rule}
"#,
        language = request.language,
    ));

    vec![
        ChatMessage::system(ARTICLE_SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ]
}

/// Build the prompt pair for the plain-HTML tier (no JSON envelope).
pub fn build_plain_html_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut user_prompt = format!(
        "Sprache: {language}\nThema: {topic}\nLänge: {hint}\n",
        language = request.language,
        topic = request.topic,
        hint = request.length.hint(),
    );

    if let Some(context) = &request.context {
        user_prompt.push_str(&format!("\nZusätzlicher Kontext:\n{context}\n"));
    }

    vec![
        ChatMessage::system(PLAIN_HTML_SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ]
}

/// Fixed call-to-action block appended after normalization, so the
/// normalizer never has to parse injected markup.
pub fn cta_block(url: &str) -> String {
    format!(
        "\n<p class=\"aiwriter-cta\"><a href=\"{url}\">Jetzt unverbindlich informieren</a></p>"
    )
}
