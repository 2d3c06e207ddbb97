//! Summarizer: provider abstraction, Gemini provider, disabled fallback.
//!
//! A summarizer never fails: any provider problem is logged and the article
//! gets [`DEFAULT_SUMMARY`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::article::{DigestEntry, RankedArticle};

pub const DEFAULT_SUMMARY: &str = "Summary not available.";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, article: &RankedArticle) -> String;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Prompt asking for three short, metric-heavy takeaways.
pub fn build_prompt(article: &RankedArticle) -> String {
    let a = &article.article;
    format!(
        "Please summarize the following article concisely but thoroughly, with a focus on \
the takeaways relevant to a data startup. Focus on three main points, preferably \
with a detailed sentence for each. Sentences should be no longer than 20 words but \
no shorter than 10. Try to include key metrics such as percentages, statistics, or \
any numerical data of importance. Do not provide any additional commentary or \
trailing newline characters.

Article Details:
- Source: {}
- Title: {}
- Description: {}

Full Content:
{}

---
Summary:
",
        a.source, a.title, a.description, a.content
    )
}

/// Returns [`DEFAULT_SUMMARY`] for every article.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _article: &RankedArticle) -> String {
        DEFAULT_SUMMARY.to_string()
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Google Gemini `generateContent` provider.
pub struct GeminiSummarizer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
}
#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<RespContent>,
}
#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}

impl GeminiSummarizer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;
        let http = reqwest::Client::builder()
            .user_agent(concat!("newsrank/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Reads `GEMINI_API_KEY`.
    pub fn from_env(model: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        let key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
        Self::new(GEMINI_BASE_URL, key, model)
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let resp = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("gemini returned {}: {}", status, body);
        }

        let body: Resp = resp.json().await?;
        let text = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim().to_string();
        Ok(if text.is_empty() { None } else { Some(text) })
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, article: &RankedArticle) -> String {
        let title = &article.article.title;
        match self.generate(&build_prompt(article)).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!(target: "digest", %title, "no summary generated");
                DEFAULT_SUMMARY.to_string()
            }
            Err(e) => {
                tracing::error!(target: "digest", %title, error = ?e, "summarization failed");
                DEFAULT_SUMMARY.to_string()
            }
        }
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Summarize every ranked article, keeping order.
pub async fn summarize_all(summarizer: &dyn Summarizer, ranked: Vec<RankedArticle>) -> Vec<DigestEntry> {
    let mut out = Vec::with_capacity(ranked.len());
    for (i, r) in ranked.into_iter().enumerate() {
        tracing::debug!(target: "digest", index = i, provider = summarizer.provider_name(), "summarizing");
        let summary = summarizer.summarize(&r).await;
        out.push(DigestEntry { ranked: r, summary });
    }
    out
}
