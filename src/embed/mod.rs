//! Embedding backends: provider abstraction, concrete providers, file cache.
//!
//! Every provider must return exactly one vector per input text, in input
//! order, and a text's vector must not depend on which batch it was sent in.

pub mod cache;
pub mod hashing;
pub mod minilm;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

pub use cache::CachingEmbedder;
pub use hashing::HashingEmbedder;
pub use minilm::MiniLmEmbedder;
pub use openai::OpenAiEmbedder;

/// Failures reported by an embedding backend.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding backend not configured: {0}")]
    NotConfigured(String),
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding response could not be decoded: {0}")]
    Decode(String),
    #[error("embedding model error: {0}")]
    Model(String),
    #[error("embedding cache error: {0}")]
    Cache(#[from] std::io::Error),
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per text, same order as `texts`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Stable identifier; part of cache keys.
    fn name(&self) -> &str;
}

/// Convenient alias used by callers.
pub type DynEmbedder = Arc<dyn EmbeddingProvider>;

#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
