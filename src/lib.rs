// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod archive;
pub mod article;
pub mod cli;
pub mod config;
pub mod digest;
pub mod embed;
pub mod filter;
pub mod ingest;
pub mod pipeline;
pub mod relevance;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::article::{CanonicalArticle, DigestEntry, RankedArticle};
pub use crate::embed::{DynEmbedder, EmbeddingError, EmbeddingProvider};
pub use crate::filter::filter_articles;
pub use crate::ingest::types::{ArticleRecord, FetchOrigin, SourceProvider};
pub use crate::ingest::{dedup_and_sort, normalize_and_merge};
pub use crate::relevance::{RankError, RelevanceRanker};
