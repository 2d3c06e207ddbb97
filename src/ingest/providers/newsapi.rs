// src/ingest/providers/newsapi.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{chunk_terms, collect_chunks, http_client, ChunkResult, FetchWindow, DEFAULT_CHUNK_SIZE};
use crate::ingest::types::{ArticleRecord, FetchOrigin, SourceProvider};

pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    source: Option<ItemSource>,
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    name: Option<String>,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        base_url: String,
        api_key: String,
    },
}

/// NewsAPI `/v2/everything` fetcher.
pub struct NewsApiProvider {
    mode: Mode,
    terms: Vec<String>,
    window: FetchWindow,
    chunk_size: usize,
    page_size: u32,
}

impl NewsApiProvider {
    /// Serve a canned response body instead of calling the API.
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            terms: Vec::new(),
            window: FetchWindow::last_days(7),
            chunk_size: DEFAULT_CHUNK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        terms: Vec<String>,
        window: FetchWindow,
    ) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                client: http_client()?,
                base_url: base_url.into(),
                api_key: api_key.into(),
            },
            terms,
            window,
            chunk_size: DEFAULT_CHUNK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Reads `NEWSAPI_KEY`.
    pub fn from_env(base_url: &str, terms: Vec<String>, window: FetchWindow) -> Result<Self> {
        let key = std::env::var("NEWSAPI_KEY").context("NEWSAPI_KEY is not set")?;
        Self::new(base_url, key, terms, window)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// `"a" OR "b c"`: every term quoted.
    pub fn build_query(terms: &[String]) -> String {
        terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    pub fn parse_response(body: &str) -> Result<Vec<ArticleRecord>> {
        let resp: Response = serde_json::from_str(body).context("parsing newsapi json")?;
        if resp.status.as_deref() == Some("error") {
            anyhow::bail!(
                "newsapi returned error: {}",
                resp.message.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(resp
            .articles
            .into_iter()
            .map(|it| ArticleRecord {
                source: it.source.and_then(|s| s.name),
                title: Some(it.title.unwrap_or_default()),
                url: it.url,
                published_at: it.published_at,
                description: Some(it.description.unwrap_or_default()),
                content: Some(it.content.unwrap_or_default()),
                fetched_from: Some(FetchOrigin::NewsApi),
            })
            .collect())
    }

    async fn fetch_chunk(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        api_key: &str,
        chunk: &[String],
    ) -> ChunkResult {
        let page_size = self.page_size.to_string();
        let from = self.window.from.to_string();
        let to = self.window.to.to_string();
        let q = Self::build_query(chunk);
        let resp = client
            .get(base_url)
            .query(&[
                ("q", q.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("language", DEFAULT_LANGUAGE),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("newsapi request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("newsapi .text()")?;
        if !status.is_success() {
            anyhow::bail!("newsapi returned {}: {}", status, body);
        }
        Self::parse_response(&body)
    }

    /// One result per chunk of query terms.
    pub async fn fetch_chunks(&self) -> Vec<ChunkResult> {
        let (client, base_url, api_key) = match &self.mode {
            Mode::Fixture(body) => return vec![Self::parse_response(body)],
            Mode::Http {
                client,
                base_url,
                api_key,
            } => (client, base_url, api_key),
        };

        tracing::info!(
            target: "ingest",
            from = %self.window.from,
            to = %self.window.to,
            "fetching newsapi"
        );
        let mut out = Vec::new();
        for chunk in chunk_terms(&self.terms, self.chunk_size) {
            out.push(self.fetch_chunk(client, base_url, api_key, &chunk).await);
        }
        out
    }
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<ArticleRecord>> {
        let results = self.fetch_chunks().await;
        Ok(collect_chunks(self.name(), results))
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
