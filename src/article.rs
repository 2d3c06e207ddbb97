//! Canonical and ranked article types shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::{ArticleRecord, FetchOrigin};

/// A merged article with defaulted fields and a best-effort parsed timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CanonicalArticle {
    pub source: String,
    pub title: String,
    pub url: String,
    pub published_at: String,
    pub description: String,
    pub content: String,
    pub fetched_from: FetchOrigin,
    /// `None` when `published_at` could not be parsed. Sorts last.
    pub published_at_parsed: Option<DateTime<Utc>>,
}

impl CanonicalArticle {
    /// Text embedded for ranking: `"{title}. {description}. "`.
    pub fn combined_text(&self) -> String {
        format!("{}. {}. ", self.title, self.description)
    }
}

impl From<CanonicalArticle> for ArticleRecord {
    fn from(a: CanonicalArticle) -> Self {
        ArticleRecord {
            source: Some(a.source),
            title: Some(a.title),
            url: Some(a.url),
            published_at: Some(a.published_at),
            description: Some(a.description),
            content: Some(a.content),
            fetched_from: Some(a.fetched_from),
        }
    }
}

/// A canonical article scored against the ranking query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedArticle {
    #[serde(flatten)]
    pub article: CanonicalArticle,
    pub combined_text: String,
    /// Cosine similarity in `[-1, 1]`.
    pub relevance_score: f32,
}

/// A ranked article after the summarization step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigestEntry {
    #[serde(flatten)]
    pub ranked: RankedArticle,
    pub summary: String,
}
