// src/relevance.rs
//! Relevance ranking: embed articles and a query with one provider, score by
//! cosine similarity, keep the top N.
//!
//! - Scores are computed in f64 and stored as f32 clamped to `[-1, 1]`.
//! - A zero-norm vector on either side scores `0.0`.
//! - Sorting is stable: equal scores keep input order.
//! - Empty input (or `top_n == 0`) never reaches the embedding backend.
//! - Backend failures and malformed vectors are errors, never zero scores.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::article::{CanonicalArticle, RankedArticle};
use crate::embed::{DynEmbedder, EmbeddingError, EmbeddingProvider};

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_QUERY: &str = "data procurement and data acquisition";

#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("embedding backend `{backend}` unavailable: {source}")]
    EmbeddingBackendUnavailable {
        backend: String,
        #[source]
        source: EmbeddingError,
    },
    #[error("embedding backend `{backend}` returned malformed vectors: {detail}")]
    MalformedEmbedding { backend: String, detail: String },
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "relevance_embed_calls_total",
            "Calls made to the embedding backend."
        );
        describe_counter!("relevance_errors_total", "Ranking runs that failed.");
        describe_histogram!("relevance_rank_ms", "Ranking time in milliseconds.");
    });
}

/// Cosine similarity of two equal-length vectors. Zero norm, empty or
/// mismatched input gives `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

pub struct RelevanceRanker {
    embedder: DynEmbedder,
}

impl RelevanceRanker {
    pub fn new(embedder: DynEmbedder) -> Self {
        Self { embedder }
    }

    pub fn backend(&self) -> &str {
        self.embedder.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RankError> {
        counter!("relevance_embed_calls_total").increment(1);
        self.embedder
            .embed_batch(texts)
            .await
            .map_err(|source| RankError::EmbeddingBackendUnavailable {
                backend: self.backend().to_string(),
                source,
            })
    }

    fn malformed(&self, detail: String) -> RankError {
        RankError::MalformedEmbedding {
            backend: self.backend().to_string(),
            detail,
        }
    }

    /// Shape checks before any score is computed.
    fn validate(&self, articles: &[Vec<f32>], query: &[Vec<f32>], expected: usize) -> Result<(), RankError> {
        if articles.len() != expected {
            return Err(self.malformed(format!(
                "expected {expected} article vectors, got {}",
                articles.len()
            )));
        }
        let [q] = query else {
            return Err(self.malformed(format!("expected 1 query vector, got {}", query.len())));
        };
        if q.is_empty() {
            return Err(self.malformed("query vector is empty".to_string()));
        }
        for (i, v) in articles.iter().chain(std::iter::once(q)).enumerate() {
            if v.len() != q.len() {
                return Err(self.malformed(format!(
                    "vector {i} has dimension {}, query has {}",
                    v.len(),
                    q.len()
                )));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(self.malformed(format!("vector {i} has non-finite components")));
            }
        }
        Ok(())
    }

    /// Rank `articles` by similarity to `query`; returns at most `top_n`.
    pub async fn get_relevant_articles(
        &self,
        articles: &[CanonicalArticle],
        query: &str,
        top_n: usize,
    ) -> Result<Vec<RankedArticle>, RankError> {
        ensure_metrics_described();

        if articles.is_empty() || top_n == 0 {
            tracing::warn!(
                target: "relevance",
                articles = articles.len(),
                top_n,
                "nothing to rank"
            );
            return Ok(Vec::new());
        }

        let t0 = Instant::now();
        let result = self.rank(articles, query, top_n).await;
        histogram!("relevance_rank_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(ranked) => tracing::info!(
                target: "relevance",
                backend = self.backend(),
                candidates = articles.len(),
                returned = ranked.len(),
                top_score = ranked.first().map(|r| r.relevance_score).unwrap_or_default(),
                "ranked articles"
            ),
            Err(e) => {
                counter!("relevance_errors_total").increment(1);
                tracing::error!(target: "relevance", error = %e, "ranking failed");
            }
        }
        result
    }

    async fn rank(
        &self,
        articles: &[CanonicalArticle],
        query: &str,
        top_n: usize,
    ) -> Result<Vec<RankedArticle>, RankError> {
        let texts: Vec<String> = articles.iter().map(|a| a.combined_text()).collect();

        tracing::info!(target: "relevance", backend = self.backend(), count = texts.len(), "generating article embeddings");
        let article_vecs = self.embed(&texts).await?;
        let query_vecs = self.embed(&[query.to_string()]).await?;
        self.validate(&article_vecs, &query_vecs, articles.len())?;
        let q = &query_vecs[0];

        let mut ranked: Vec<RankedArticle> = articles
            .iter()
            .zip(texts)
            .zip(&article_vecs)
            .map(|((a, combined_text), v)| RankedArticle {
                article: a.clone(),
                combined_text,
                relevance_score: cosine_similarity(v, q),
            })
            .collect();

        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        ranked.truncate(top_n);
        Ok(ranked)
    }
}
