// src/ingest/providers/gdelt.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{chunk_terms, collect_chunks, http_client, ChunkResult, FetchWindow, DEFAULT_CHUNK_SIZE};
use crate::ingest::types::{ArticleRecord, FetchOrigin, SourceProvider};

pub const DEFAULT_MAX_RECORDS: u32 = 50;

#[derive(Debug, Default, Deserialize)]
struct Response {
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    url: Option<String>,
    title: Option<String>,
    domain: Option<String>,
    seendate: Option<String>,
    seentime: Option<String>,
}

/// `seendate` + `seentime` → ISO-8601. Without `seentime` the raw `seendate`
/// (usually compact `YYYYMMDDTHHMMSSZ`) is passed through for the date parser.
fn published_at(seendate: Option<&str>, seentime: Option<&str>) -> String {
    let Some(date) = seendate.filter(|d| !d.is_empty()) else {
        return String::new();
    };
    if let Some(time) = seentime.filter(|t| !t.is_empty()) {
        if let (Some(y), Some(m), Some(d), Some(hh), Some(mm), Some(ss)) = (
            date.get(0..4),
            date.get(4..6),
            date.get(6..8),
            time.get(0..2),
            time.get(2..4),
            time.get(4..6),
        ) {
            return format!("{y}-{m}-{d}T{hh}:{mm}:{ss}Z");
        }
    }
    date.to_string()
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        endpoint: String,
    },
}

/// GDELT DOC 2.0 `ArtList` fetcher.
pub struct GdeltProvider {
    mode: Mode,
    terms: Vec<String>,
    window: FetchWindow,
    chunk_size: usize,
    max_records: u32,
}

impl GdeltProvider {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            terms: Vec::new(),
            window: FetchWindow::last_days(7),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    pub fn new(endpoint: impl Into<String>, terms: Vec<String>, window: FetchWindow) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                client: http_client()?,
                endpoint: endpoint.into(),
            },
            terms,
            window,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_records: DEFAULT_MAX_RECORDS,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_records(mut self, max_records: u32) -> Self {
        self.max_records = max_records;
        self
    }

    /// `(a OR "b c")`: only multi-word terms are quoted.
    pub fn build_query(terms: &[String]) -> String {
        let quoted = terms
            .iter()
            .map(|t| {
                if t.contains(' ') {
                    format!("\"{t}\"")
                } else {
                    t.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("({quoted})")
    }

    pub fn parse_response(body: &str) -> Result<Vec<ArticleRecord>> {
        // GDELT answers an empty body when nothing matched.
        let resp: Response = if body.trim().is_empty() {
            Response::default()
        } else {
            serde_json::from_str(body).context("parsing gdelt json")?
        };

        Ok(resp
            .articles
            .into_iter()
            .map(|it| {
                let domain = it.domain.unwrap_or_default();
                let source = if domain.is_empty() {
                    "GDELT".to_string()
                } else {
                    domain.clone()
                };
                ArticleRecord {
                    source: Some(source),
                    title: Some(it.title.unwrap_or_default()),
                    url: it.url,
                    published_at: Some(published_at(
                        it.seendate.as_deref(),
                        it.seentime.as_deref(),
                    )),
                    description: Some(domain),
                    content: Some(it.seendate.unwrap_or_default()),
                    fetched_from: Some(FetchOrigin::Gdelt),
                }
            })
            .collect())
    }

    async fn fetch_chunk(&self, client: &reqwest::Client, endpoint: &str, chunk: &[String]) -> ChunkResult {
        let start = format!("{}000000", self.window.from.format("%Y%m%d"));
        let end = format!("{}235959", self.window.to.format("%Y%m%d"));
        let max_records = self.max_records.to_string();
        let query = Self::build_query(chunk);

        let resp = client
            .get(endpoint)
            .query(&[
                ("query", query.as_str()),
                ("mode", "ArtList"),
                ("maxrecords", max_records.as_str()),
                ("format", "json"),
                ("startdatetime", start.as_str()),
                ("enddatetime", end.as_str()),
            ])
            .send()
            .await
            .context("gdelt request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("gdelt .text()")?;
        if !status.is_success() {
            anyhow::bail!("gdelt returned {}: {}", status, body);
        }
        Self::parse_response(&body)
    }

    /// One result per chunk of query terms.
    pub async fn fetch_chunks(&self) -> Vec<ChunkResult> {
        let (client, endpoint) = match &self.mode {
            Mode::Fixture(body) => return vec![Self::parse_response(body)],
            Mode::Http { client, endpoint } => (client, endpoint),
        };

        tracing::info!(
            target: "ingest",
            from = %self.window.from,
            to = %self.window.to,
            "fetching gdelt"
        );
        let mut out = Vec::new();
        for chunk in chunk_terms(&self.terms, self.chunk_size) {
            out.push(self.fetch_chunk(client, endpoint, &chunk).await);
        }
        out
    }
}

#[async_trait]
impl SourceProvider for GdeltProvider {
    async fn fetch_latest(&self) -> Result<Vec<ArticleRecord>> {
        let results = self.fetch_chunks().await;
        Ok(collect_chunks(self.name(), results))
    }

    fn name(&self) -> &'static str {
        "gdelt"
    }
}
