//! Core data types for the article generation pipeline.
//!
//! `GenerationRequest` is the immutable input of one generation attempt;
//! `ArticleBundle` is its canonical output. The bundle's JSON shape is part
//! of the wire contract with the destination site and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Maximum length of `meta.title` in characters.
pub const META_TITLE_MAX: usize = 60;

/// Maximum length of `meta.description` in characters.
pub const META_DESCRIPTION_MAX: usize = 155;

/// Target section/word-count band for the generated article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthTier {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthTier {
    /// Human-readable guidance injected into the prompt.
    pub fn hint(&self) -> &'static str {
        match self {
            LengthTier::Short => "3–4 H2-Abschnitte, 600–800 Wörter",
            LengthTier::Medium => "5–6 H2-Abschnitte, 900–1.300 Wörter",
            LengthTier::Long => "7–8 H2-Abschnitte, 1.400–1.800 Wörter",
        }
    }
}

impl std::str::FromStr for LengthTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "short" => Ok(LengthTier::Short),
            "medium" => Ok(LengthTier::Medium),
            "long" => Ok(LengthTier::Long),
            other => Err(format!("unknown length tier: {other}")),
        }
    }
}

/// Everything the caller supplies for one article. Immutable once
/// generation starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Topic of the article (non-empty)
    pub topic: String,

    /// Language code ("de", "en", ...)
    pub language: String,

    /// Requested length band
    pub length: LengthTier,

    /// Free-text context appended to the prompt as its own section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Whether the article should carry a FAQ block
    pub include_faq: bool,

    /// Target URL of the call-to-action block; `None` disables the CTA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,

    /// Number of AI-sourced images requested (0 disables illustration)
    pub requested_images: u32,

    /// Caller-supplied image URLs; when non-empty these are used verbatim
    /// instead of AI sourcing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplied_images: Vec<String>,

    /// Destination category id, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u32>,

    /// Destination tag string, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl GenerationRequest {
    /// Minimal request with defaults matching the original plugin form.
    pub fn new(topic: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            language: language.into(),
            length: LengthTier::Medium,
            context: None,
            include_faq: true,
            cta_url: None,
            requested_images: 0,
            supplied_images: Vec::new(),
            category: None,
            tags: None,
        }
    }
}

/// SEO meta tags. Lengths are capped at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTags {
    pub title: String,
    pub description: String,
}

impl MetaTags {
    /// Build meta tags, truncating both fields to their caps.
    pub fn capped(title: &str, description: &str) -> Self {
        Self {
            title: truncate_chars(title, META_TITLE_MAX),
            description: truncate_chars(description, META_DESCRIPTION_MAX),
        }
    }
}

/// One FAQ entry. The `q`/`a` key names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub q: String,
    pub a: String,
}

/// One H2 section with its H3 sub-headings, extracted from the article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub h2: String,
    #[serde(default)]
    pub h3s: Vec<String>,
}

/// Heading tree of the article body, kept on the article record for the
/// editor preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
}

/// The canonical, fully-normalized output of one generation attempt.
///
/// Invariants: `article_html` is non-empty; `meta` respects its caps; `faq`
/// is always present (possibly empty); `featured_image` never appears in
/// `content_images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleBundle {
    pub title: String,
    pub article_html: String,
    pub meta: MetaTags,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
    /// Structured-data object. Model-supplied objects are kept verbatim;
    /// otherwise a minimal Article schema is synthesized.
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub content_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Synthesize the minimal structured-data object for an article.
pub fn minimal_article_schema(title: &str, language: &str, published: DateTime<Utc>) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": title,
        "datePublished": published.to_rfc3339(),
        "inLanguage": language,
    })
}

/// Truncate a string to at most `max` characters on a char boundary.
///
/// German meta text regularly carries umlauts, so byte slicing is not safe.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_tier_hints() {
        assert!(LengthTier::Short.hint().contains("3–4"));
        assert!(LengthTier::Medium.hint().contains("900"));
        assert!(LengthTier::Long.hint().contains("7–8"));
    }

    #[test]
    fn test_length_tier_parse() {
        assert_eq!("short".parse::<LengthTier>().unwrap(), LengthTier::Short);
        assert!("epic".parse::<LengthTier>().is_err());
    }

    #[test]
    fn test_truncate_chars_respects_umlauts() {
        let s = "Über".repeat(40);
        let capped = truncate_chars(&s, META_TITLE_MAX);
        assert_eq!(capped.chars().count(), 60);
    }

    #[test]
    fn test_meta_tags_capped() {
        let long = "x".repeat(500);
        let meta = MetaTags::capped(&long, &long);
        assert_eq!(meta.title.chars().count(), META_TITLE_MAX);
        assert_eq!(meta.description.chars().count(), META_DESCRIPTION_MAX);
    }

    #[test]
    fn test_faq_entry_wire_keys() {
        let entry = FaqEntry {
            q: "Was kostet das?".into(),
            a: "Das hängt vom Tarif ab.".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"q\":"));
        assert!(json.contains("\"a\":"));
    }

    #[test]
    fn test_minimal_article_schema_keys() {
        let schema = minimal_article_schema("Zelte", "de", Utc::now());
        assert_eq!(schema["@type"], "Article");
        assert_eq!(schema["inLanguage"], "de");
        assert!(schema["datePublished"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_bundle_serializes_exact_field_set() {
        let bundle = ArticleBundle {
            title: "Zelte".into(),
            article_html: "<h2>Zelte</h2><p>Text</p>".into(),
            meta: MetaTags::capped("Zelte", "Alles über Zelte."),
            faq: vec![],
            schema: minimal_article_schema("Zelte", "de", Utc::now()),
            featured_image: None,
            content_images: vec![],
            category: None,
            tags: None,
        };
        let value = serde_json::to_value(&bundle).unwrap();
        let obj = value.as_object().unwrap();
        // Optional fields are omitted when absent; faq stays present even empty
        assert!(obj.contains_key("faq"));
        assert!(!obj.contains_key("featured_image"));
        assert!(!obj.contains_key("category"));
    }
}
