// src/ingest/providers/mod.rs
//! Fetchers for external article APIs.
//!
//! Each provider splits its query terms into chunks, issues one request per
//! chunk and reports one `Result` per chunk through `fetch_chunks`. The
//! `SourceProvider::fetch_latest` impls log and skip failed chunks.

pub mod gdelt;
pub mod newsapi;

use chrono::{Duration, NaiveDate, Utc};
use metrics::counter;

use crate::ingest::types::ArticleRecord;

pub const DEFAULT_CHUNK_SIZE: usize = 6;

/// Outcome of one chunked request.
pub type ChunkResult = anyhow::Result<Vec<ArticleRecord>>;

/// Inclusive date range for the article search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl FetchWindow {
    /// `[today - days, today]` in UTC.
    pub fn last_days(days: i64) -> Self {
        let to = Utc::now().date_naive();
        Self {
            from: to - Duration::days(days.max(0)),
            to,
        }
    }
}

/// Split `terms` into runs of at most `size` (a zero size is treated as 1).
pub fn chunk_terms(terms: &[String], size: usize) -> Vec<Vec<String>> {
    terms.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}

/// Flatten chunk outcomes, logging and counting the failed ones.
pub(crate) fn collect_chunks(provider: &'static str, results: Vec<ChunkResult>) -> Vec<ArticleRecord> {
    let mut out = Vec::new();
    for (idx, r) in results.into_iter().enumerate() {
        match r {
            Ok(mut items) => {
                tracing::debug!(target: "ingest", provider, chunk = idx, count = items.len(), "chunk fetched");
                out.append(&mut items);
            }
            Err(e) => {
                tracing::error!(target: "ingest", provider, chunk = idx, error = ?e, "chunk failed; skipping");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }
    tracing::info!(target: "ingest", provider, total = out.len(), "provider articles fetched");
    out
}

pub(crate) fn http_client() -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .user_agent(concat!("newsrank/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}
