// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Which fetcher produced a record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FetchOrigin {
    NewsApi,
    Gdelt,
    #[default]
    #[serde(other)]
    Unknown,
}

impl FetchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOrigin::NewsApi => "newsapi",
            FetchOrigin::Gdelt => "gdelt",
            FetchOrigin::Unknown => "unknown",
        }
    }

    /// Inverse of [`FetchOrigin::as_str`]; anything unrecognised is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "newsapi" => FetchOrigin::NewsApi,
            "gdelt" => FetchOrigin::Gdelt,
            _ => FetchOrigin::Unknown,
        }
    }
}

/// Raw article as handed over by a fetcher. Every key may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArticleRecord {
    pub source: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub fetched_from: Option<FetchOrigin>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<ArticleRecord>>;
    fn name(&self) -> &'static str;
}
