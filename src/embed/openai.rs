//! OpenAI-compatible `/embeddings` client.
//!
//! Works against api.openai.com and any server exposing the same schema
//! (local inference servers, proxies). Inputs are sent in `batch_size` chunks,
//! in order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EmbeddingError, EmbeddingProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Deserialize)]
struct Resp {
    data: Vec<Datum>,
}

#[derive(Deserialize)]
struct Datum {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: Option<u32>,
    batch_size: usize,
    name: String,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("newsrank/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        let model = model.into();
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            name: format!("openai:{model}"),
            model,
            dimensions: None,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Key from `EMBEDDING_API_KEY`, falling back to `OPENAI_API_KEY`.
    pub fn from_env(base_url: &str, model: &str) -> Result<Self, EmbeddingError> {
        let key = std::env::var("EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                EmbeddingError::NotConfigured(
                    "EMBEDDING_API_KEY or OPENAI_API_KEY must be set".to_string(),
                )
            })?;
        Self::new(base_url, key, model)
    }

    pub fn with_dimensions(mut self, dimensions: Option<u32>) -> Self {
        self.dimensions = dimensions;
        if let Some(d) = dimensions {
            self.name = format!("openai:{}:{d}", self.model);
        }
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let req = Req {
            model: &self.model,
            input: chunk,
            dimensions: self.dimensions,
        };
        let resp = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut body: Resp = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;
        if body.data.len() != chunk.len() {
            return Err(EmbeddingError::Decode(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                body.data.len()
            )));
        }
        body.data.sort_by_key(|d| d.index);
        if body.data.iter().enumerate().any(|(i, d)| d.index != i) {
            return Err(EmbeddingError::Decode(
                "embedding indices are not contiguous".to_string(),
            ));
        }
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::NotConfigured("empty api key".to_string()));
        }
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            tracing::debug!(target: "relevance", model = %self.model, size = chunk.len(), "embedding chunk");
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
