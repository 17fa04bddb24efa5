//! Coercion of arbitrary model output into the canonical article shape.
//!
//! The model's JSON is untyped and frequently cosmetically wrong: wrapped
//! one level deep under a generic container key, using different casing or
//! German field names, fenced in Markdown code blocks, or missing optional
//! fields entirely. Everything here recovers silently except one case: an
//! absent or empty article body is a hard [`GenerationError::Normalization`].

use crate::error::{GenerationError, GenerationResult};
use crate::types::{
    minimal_article_schema, truncate_chars, FaqEntry, MetaTags, Outline, OutlineSection,
    META_TITLE_MAX,
};
use chrono::Utc;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{Map, Value};

/// Candidate wrapper keys, checked in order; the first dict-typed match is
/// unwrapped (at most one level).
pub const WRAPPER_KEYS: [&str; 5] = ["article", "result", "data", "payload", "content"];

/// Accepted key spellings per logical field, consulted case-insensitively
/// in order.
pub const FIELD_SYNONYMS: &[(&str, &[&str])] = &[
    ("title", &["title", "titel", "headline"]),
    ("article_html", &["article_html", "html", "content"]),
    ("meta", &["meta", "metadata"]),
    ("faq", &["faq", "faqs"]),
    ("schema", &["schema", "jsonld"]),
];

/// Keys under which a dict-wrapped FAQ may hide its list.
const FAQ_LIST_KEYS: [&str; 3] = ["items", "list", "entries"];

/// The normalizer's output: the bundle fields it owns plus the extracted
/// outline. Images and taxonomy are attached later by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedArticle {
    pub title: String,
    pub article_html: String,
    pub meta: MetaTags,
    pub faq: Vec<FaqEntry>,
    pub schema: Value,
    pub outline: Outline,
}

/// Strip Markdown code fences and `<pre>` wrappers some models put around
/// their JSON, then trim.
pub fn clean_completion_text(raw: &str) -> String {
    let mut content = raw.trim();

    if let Some(start) = content.find("```json") {
        let inner = &content[start + 7..];
        if let Some(end) = inner.find("```") {
            content = inner[..end].trim();
        }
    } else if let Some(start) = content.find("```") {
        let inner = &content[start + 3..];
        if let Some(end) = inner.find("```") {
            content = inner[..end].trim();
        }
    } else if let Some(start) = content.find("<pre>") {
        let inner = &content[start + 5..];
        if let Some(end) = inner.find("</pre>") {
            content = inner[..end].trim();
        }
    }

    content.replace("<pre>", "").replace("</pre>", "").trim().to_string()
}

/// Parse cleaned completion text as JSON.
pub fn parse_model_json(raw_text: &str) -> GenerationResult<Value> {
    let cleaned = clean_completion_text(raw_text);
    if cleaned.is_empty() {
        return Err(GenerationError::Normalization(
            "Empty content after cleaning".to_string(),
        ));
    }
    serde_json::from_str(&cleaned).map_err(|e| {
        let snippet = truncate_chars(&cleaned, 200);
        GenerationError::Normalization(format!("Invalid JSON ({e}): {snippet}"))
    })
}

/// Case-insensitive, synonym-aware field lookup.
fn resolve_field<'a>(obj: &'a Map<String, Value>, canonical: &str) -> Option<&'a Value> {
    let synonyms = FIELD_SYNONYMS
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, syns)| *syns)?;
    for synonym in synonyms {
        if let Some((_, value)) = obj
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(synonym))
        {
            return Some(value);
        }
    }
    None
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract the text of the first H1 (or, failing that, H2) heading.
pub fn extract_first_heading(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    for tag in ["h1", "h2"] {
        let selector = Selector::parse(tag).expect("static selector");
        if let Some(element) = fragment.select(&selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Build the H2/H3 section tree of the article body, in document order.
/// H3 headings before the first H2 are dropped, matching the editor preview.
pub fn extract_outline(html: &str) -> Outline {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("h2, h3").expect("static selector");

    let mut sections: Vec<OutlineSection> = Vec::new();
    for element in fragment.select(&selector) {
        let text = element.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            continue;
        }
        match element.value().name() {
            "h2" => sections.push(OutlineSection {
                h2: text,
                h3s: Vec::new(),
            }),
            "h3" => {
                if let Some(current) = sections.last_mut() {
                    current.h3s.push(text);
                }
            }
            _ => {}
        }
    }

    Outline { sections }
}

/// Coerce whatever the model put under `faq` into a flat entry list.
fn coerce_faq(value: Option<&Value>) -> Vec<FaqEntry> {
    let items: Option<&Vec<Value>> = match value {
        Some(Value::Array(items)) => Some(items),
        Some(Value::Object(obj)) => FAQ_LIST_KEYS.iter().find_map(|key| {
            obj.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .and_then(|(_, v)| v.as_array())
        }),
        _ => None,
    };

    items
        .map(|items| items.iter().filter_map(faq_entry).collect())
        .unwrap_or_default()
}

fn faq_entry(item: &Value) -> Option<FaqEntry> {
    let obj = item.as_object()?;
    let field = |names: [&str; 2]| {
        names.iter().find_map(|name| {
            obj.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
    };
    Some(FaqEntry {
        q: field(["q", "question"])?.to_string(),
        a: field(["a", "answer"])?.to_string(),
    })
}

/// Coerce raw model output into the canonical article shape.
///
/// Only the irrecoverable absence of article body text is an error; every
/// other defect (wrong nesting, wrong casing, missing optional fields) is
/// repaired or synthesized.
pub fn normalize(
    raw: &Value,
    topic_fallback: &str,
    language: &str,
) -> GenerationResult<NormalizedArticle> {
    let root = raw.as_object().ok_or_else(|| {
        GenerationError::Normalization("Model did not return a JSON object".to_string())
    })?;

    // Unwrap at most one level of container nesting
    let candidate = WRAPPER_KEYS
        .iter()
        .find_map(|key| root.get(*key).and_then(Value::as_object))
        .unwrap_or(root);

    let article_html = non_empty_str(resolve_field(candidate, "article_html"))
        .ok_or_else(|| {
            GenerationError::Normalization("Missing or invalid 'article_html'".to_string())
        })?
        .to_string();

    let title = non_empty_str(resolve_field(candidate, "title"))
        .map(str::to_string)
        .or_else(|| extract_first_heading(&article_html))
        .unwrap_or_else(|| topic_fallback.to_string());

    let meta_obj = resolve_field(candidate, "meta").and_then(Value::as_object);
    let meta_title = meta_obj
        .and_then(|m| non_empty_str(m.get("title")))
        .map(str::to_string)
        .unwrap_or_else(|| truncate_chars(&title, META_TITLE_MAX));
    let meta_description = meta_obj
        .and_then(|m| non_empty_str(m.get("description")))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Erfahren Sie alles über {title}."));
    let meta = MetaTags::capped(&meta_title, &meta_description);

    let faq = coerce_faq(resolve_field(candidate, "faq"));

    let schema = match resolve_field(candidate, "schema") {
        Some(value @ Value::Object(_)) => value.clone(),
        _ => minimal_article_schema(&title, language, Utc::now()),
    };

    let outline = extract_outline(&article_html);

    Ok(NormalizedArticle {
        title,
        article_html,
        meta,
        faq,
        schema,
        outline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::META_DESCRIPTION_MAX;
    use serde_json::json;

    const HTML: &str = "<h2>Zelte im Winter</h2><p>Robuste Zelte halten Schnee aus.</p>\
                        <h3>Material</h3><p>Polyester.</p><h2>Pflege</h2><p>Trocknen.</p>";

    fn full_output() -> Value {
        json!({
            "title": "Zelte für Wintercamping",
            "article_html": HTML,
            "meta": {"title": "Winterzelte", "description": "Die besten Zelte für den Winter."},
            "faq": [{"q": "Welches Zelt?", "a": "Ein Geodät."}],
            "schema": {"@context": "https://schema.org", "@type": "Article", "headline": "Zelte"}
        })
    }

    #[test]
    fn test_normalize_full_output() {
        let result = normalize(&full_output(), "Fallback", "de").unwrap();
        assert_eq!(result.title, "Zelte für Wintercamping");
        assert_eq!(result.meta.title, "Winterzelte");
        assert_eq!(result.faq.len(), 1);
        assert_eq!(result.schema["@type"], "Article");
        assert_eq!(result.outline.sections.len(), 2);
        assert_eq!(result.outline.sections[0].h3s, vec!["Material"]);
    }

    #[test]
    fn test_wrapper_keys_all_unwrap_to_same_bundle() {
        let flat = normalize(&full_output(), "Fallback", "de").unwrap();
        for key in WRAPPER_KEYS {
            let wrapped = json!({ key: full_output() });
            let result = normalize(&wrapped, "Fallback", "de").unwrap();
            assert_eq!(result.title, flat.title, "wrapper {key}");
            assert_eq!(result.article_html, flat.article_html, "wrapper {key}");
        }
    }

    #[test]
    fn test_wrapper_key_ignored_when_not_object() {
        // "content" as a string is the article body, not a wrapper
        let raw = json!({"content": HTML});
        let result = normalize(&raw, "Fallback", "de").unwrap();
        assert_eq!(result.article_html, HTML);
    }

    #[test]
    fn test_field_synonyms_and_casing() {
        let raw = json!({"Titel": "Mein Titel", "HTML": HTML, "FAQs": [{"q": "F?", "a": "A."}]});
        let result = normalize(&raw, "Fallback", "de").unwrap();
        assert_eq!(result.title, "Mein Titel");
        assert_eq!(result.article_html, HTML);
        assert_eq!(result.faq.len(), 1);
    }

    #[test]
    fn test_missing_body_is_hard_failure() {
        for raw in [
            json!({"title": "T"}),
            json!({"title": "T", "article_html": ""}),
            json!({"title": "T", "article_html": "   "}),
            json!({"title": "T", "article_html": 42}),
        ] {
            let err = normalize(&raw, "Fallback", "de").unwrap_err();
            assert!(matches!(err, GenerationError::Normalization(_)), "{raw}");
        }
    }

    #[test]
    fn test_title_falls_back_to_first_heading() {
        let raw = json!({"article_html": "<p>Intro</p><h2>Foo</h2><p>Text</p>"});
        let result = normalize(&raw, "Thema", "de").unwrap();
        assert_eq!(result.title, "Foo");
    }

    #[test]
    fn test_title_prefers_h1_over_h2() {
        let raw = json!({"article_html": "<h2>Zweit</h2><h1>Haupt</h1>"});
        let result = normalize(&raw, "Thema", "de").unwrap();
        assert_eq!(result.title, "Haupt");
    }

    #[test]
    fn test_title_falls_back_to_topic_without_headings() {
        let raw = json!({"article_html": "<p>Nur Absätze.</p>"});
        let result = normalize(&raw, "Mein Thema", "de").unwrap();
        assert_eq!(result.title, "Mein Thema");
    }

    #[test]
    fn test_heading_markup_is_stripped() {
        let raw = json!({"article_html": "<h2><strong>Fett</strong> und kursiv</h2>"});
        let result = normalize(&raw, "Thema", "de").unwrap();
        assert_eq!(result.title, "Fett und kursiv");
    }

    #[test]
    fn test_meta_synthesized_and_capped() {
        let long_title = "T".repeat(200);
        let raw = json!({"title": long_title, "article_html": HTML});
        let result = normalize(&raw, "Fallback", "de").unwrap();
        assert_eq!(result.meta.title.chars().count(), META_TITLE_MAX);
        assert!(result.meta.description.chars().count() <= META_DESCRIPTION_MAX);
        assert!(result.meta.description.starts_with("Erfahren Sie alles über"));
    }

    #[test]
    fn test_meta_respects_caps_even_when_supplied() {
        let raw = json!({
            "article_html": HTML,
            "meta": {"title": "x".repeat(100), "description": "y".repeat(400)}
        });
        let result = normalize(&raw, "Fallback", "de").unwrap();
        assert_eq!(result.meta.title.chars().count(), META_TITLE_MAX);
        assert_eq!(result.meta.description.chars().count(), META_DESCRIPTION_MAX);
    }

    #[test]
    fn test_faq_coercion_variants() {
        // Absent
        let result = normalize(&json!({"article_html": HTML}), "F", "de").unwrap();
        assert!(result.faq.is_empty());

        // Not a list
        let raw = json!({"article_html": HTML, "faq": "keine"});
        assert!(normalize(&raw, "F", "de").unwrap().faq.is_empty());

        // Dict-wrapped under items/list/entries
        for key in ["items", "list", "entries"] {
            let raw = json!({
                "article_html": HTML,
                "faq": { key: [{"question": "F?", "answer": "A."}] }
            });
            let faq = normalize(&raw, "F", "de").unwrap().faq;
            assert_eq!(faq.len(), 1, "key {key}");
            assert_eq!(faq[0].q, "F?");
        }

        // Unusable entries are skipped, usable ones kept
        let raw = json!({
            "article_html": HTML,
            "faq": [{"q": "F?", "a": "A."}, {"q": "nur Frage"}, "kein Objekt"]
        });
        assert_eq!(normalize(&raw, "F", "de").unwrap().faq.len(), 1);
    }

    #[test]
    fn test_schema_synthesized_when_missing_or_wrong_type() {
        for raw in [
            json!({"title": "T", "article_html": HTML}),
            json!({"title": "T", "article_html": HTML, "schema": "kein Objekt"}),
        ] {
            let result = normalize(&raw, "F", "de").unwrap();
            assert_eq!(result.schema["@type"], "Article");
            assert_eq!(result.schema["headline"], "T");
            assert_eq!(result.schema["inLanguage"], "de");
            assert!(result.schema["datePublished"].as_str().is_some());
        }
    }

    #[test]
    fn test_model_schema_kept_verbatim() {
        let result = normalize(&full_output(), "F", "de").unwrap();
        assert_eq!(result.schema["headline"], "Zelte");
        assert!(result.schema.get("datePublished").is_none());
    }

    #[test]
    fn test_normalization_is_a_fixed_point() {
        let first = normalize(&full_output(), "Fallback", "de").unwrap();
        let as_value = serde_json::to_value(&first).unwrap();
        let second = normalize(&as_value, "Fallback", "de").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_object_root_fails() {
        let err = normalize(&json!(["not", "an", "object"]), "F", "de").unwrap_err();
        assert!(matches!(err, GenerationError::Normalization(_)));
    }

    #[test]
    fn test_clean_completion_text_strips_json_fence() {
        let raw = "Hier ist das Ergebnis:\n```json\n{\"title\": \"T\"}\n```";
        assert_eq!(clean_completion_text(raw), "{\"title\": \"T\"}");
    }

    #[test]
    fn test_clean_completion_text_strips_bare_fence_and_pre() {
        assert_eq!(clean_completion_text("```\n{}\n```"), "{}");
        assert_eq!(clean_completion_text("<pre>{\"a\": 1}</pre>"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_model_json_rejects_garbage() {
        let err = parse_model_json("Leider kann ich kein JSON liefern.").unwrap_err();
        assert!(matches!(err, GenerationError::Normalization(_)));
        let err = parse_model_json("").unwrap_err();
        assert!(matches!(err, GenerationError::Normalization(_)));
    }

    #[test]
    fn test_extract_outline_orphan_h3_dropped() {
        let outline = extract_outline("<h3>Verloren</h3><h2>Erst</h2><h3>Unter</h3>");
        assert_eq!(outline.sections.len(), 1);
        assert_eq!(outline.sections[0].h3s, vec!["Unter"]);
    }
}
