// src/config.rs
//! Application configuration: `config/newsrank.toml` plus environment secrets.
//!
//! Every section and key is optional; missing values fall back to built-in
//! defaults. API keys never live in the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::embed::{
    minilm, openai, CachingEmbedder, DynEmbedder, EmbeddingProvider, HashingEmbedder,
    MiniLmEmbedder, OpenAiEmbedder,
};
use crate::filter::default_blocklist;
use crate::ingest::config::{load_blocklist_default, load_blocklist_from};
use crate::ingest::providers::{gdelt, newsapi, DEFAULT_CHUNK_SIZE};
use crate::relevance::{DEFAULT_QUERY, DEFAULT_TOP_N};
use crate::summarize::{DisabledSummarizer, DynSummarizer, GeminiSummarizer, DEFAULT_GEMINI_MODEL};

pub const DEFAULT_CONFIG_PATH: &str = "config/newsrank.toml";
pub const ENV_CONFIG_PATH: &str = "NEWSRANK_CONFIG_PATH";
pub const ENV_GDELT_ENDPOINT: &str = "GDELT_API_ENDPOINT";
pub const DEFAULT_GDELT_ENDPOINT: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ranking: RankingConfig,
    pub fetch: FetchConfig,
    pub filter: FilterConfig,
    pub embedding: EmbeddingConfig,
    pub summarizer: SummarizerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    pub query: String,
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueryTermSet {
    #[default]
    Short,
    Long,
}

impl QueryTermSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryTermSet::Short => "short",
            QueryTermSet::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub days: i64,
    pub chunk_size: usize,
    pub query_terms: QueryTermSet,
    /// Directory holding `query_terms_{short|long}.json`.
    pub query_terms_dir: PathBuf,
    pub page_size: u32,
    pub max_records: u32,
    pub newsapi_endpoint: String,
    /// `GDELT_API_ENDPOINT` wins over this value when set.
    pub gdelt_endpoint: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            days: 6,
            chunk_size: DEFAULT_CHUNK_SIZE,
            query_terms: QueryTermSet::Short,
            query_terms_dir: PathBuf::from("config"),
            page_size: newsapi::DEFAULT_PAGE_SIZE,
            max_records: gdelt::DEFAULT_MAX_RECORDS,
            newsapi_endpoint: newsapi::NEWSAPI_BASE_URL.to_string(),
            gdelt_endpoint: DEFAULT_GDELT_ENDPOINT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn query_terms_path(&self, set: QueryTermSet) -> PathBuf {
        self.query_terms_dir
            .join(format!("query_terms_{}.json", set.as_str()))
    }

    pub fn resolved_gdelt_endpoint(&self) -> String {
        std::env::var(ENV_GDELT_ENDPOINT)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.gdelt_endpoint.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub excluded_sources: Option<Vec<String>>,
    pub blocklist_path: Option<PathBuf>,
}

impl FilterConfig {
    /// `blocklist_path`, then `excluded_sources`, then `$NEWSRANK_BLOCKLIST_PATH`
    /// or `config/blocklist.{toml,json}`, then the built-in list.
    pub fn resolve_blocklist(&self) -> Result<Vec<String>> {
        if let Some(p) = &self.blocklist_path {
            return load_blocklist_from(p);
        }
        if let Some(list) = &self.excluded_sources {
            let mut out: Vec<String> = Vec::with_capacity(list.len());
            for s in list.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                if !out.iter().any(|x| x == s) {
                    out.push(s.to_string());
                }
            }
            return Ok(out);
        }
        Ok(load_blocklist_default()?.unwrap_or_else(default_blocklist))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local `all-MiniLM-L6-v2` on ONNX Runtime.
    #[default]
    MiniLm,
    OpenAi,
    /// Word-overlap hashing; tests and offline smoke runs only.
    Hashing,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    pub model: String,
    pub base_url: String,
    /// Vector size. Optional for `openai`, required-with-default for `hashing`.
    pub dimensions: Option<u32>,
    pub batch_size: usize,
    /// Pre-downloaded `model.onnx` for `minilm`; both paths or neither.
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
    /// On-disk embedding cache for `minilm` and `openai`. Entries are never
    /// evicted; the directory can be deleted at any time.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::MiniLm,
            model: openai::DEFAULT_MODEL.to_string(),
            base_url: openai::DEFAULT_BASE_URL.to_string(),
            dimensions: None,
            batch_size: openai::DEFAULT_BATCH_SIZE,
            model_path: None,
            tokenizer_path: None,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    fn cached<P: EmbeddingProvider + 'static>(&self, e: P) -> DynEmbedder {
        match &self.cache_dir {
            Some(dir) => Arc::new(CachingEmbedder::new(e, dir)),
            None => Arc::new(e),
        }
    }

    fn load_minilm(&self) -> Result<MiniLmEmbedder> {
        let e = match (&self.model_path, &self.tokenizer_path) {
            (Some(model), Some(tokenizer)) => MiniLmEmbedder::load(model, tokenizer)?,
            (None, None) => MiniLmEmbedder::download_and_load()?,
            _ => anyhow::bail!("embedding.model_path and embedding.tokenizer_path must be set together"),
        };
        Ok(e.with_batch_size(self.batch_size.min(minilm::DEFAULT_BATCH_SIZE)))
    }

    pub fn build(&self) -> Result<DynEmbedder> {
        let embedder: DynEmbedder = match self.provider {
            EmbeddingBackend::MiniLm => {
                let e = self.load_minilm().context("configuring minilm embedder")?;
                self.cached(e)
            }
            EmbeddingBackend::OpenAi => {
                let e = OpenAiEmbedder::from_env(&self.base_url, &self.model)
                    .context("configuring openai embedder")?
                    .with_dimensions(self.dimensions)
                    .with_batch_size(self.batch_size);
                self.cached(e)
            }
            EmbeddingBackend::Hashing => {
                if self.cache_dir.is_some() {
                    tracing::warn!(target: "pipeline", "cache_dir ignored for the hashing embedder");
                }
                let dims = self
                    .dimensions
                    .map(|d| d as usize)
                    .unwrap_or(crate::embed::hashing::DEFAULT_DIMENSIONS);
                Arc::new(HashingEmbedder::new(dims))
            }
        };
        tracing::info!(target: "pipeline", backend = embedder.name(), "embedding backend ready");
        Ok(embedder)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    #[default]
    Gemini,
    Disabled,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,
    pub provider: SummarizerBackend,
    pub model: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: SummarizerBackend::Gemini,
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl SummarizerConfig {
    /// A Gemini summarizer without `GEMINI_API_KEY` degrades to disabled.
    pub fn build(&self) -> DynSummarizer {
        if !self.enabled || self.provider == SummarizerBackend::Disabled {
            return Arc::new(DisabledSummarizer);
        }
        match GeminiSummarizer::from_env(&self.model) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::warn!(target: "pipeline", error = %e, "summarizer unavailable; using default summaries");
                Arc::new(DisabledSummarizer)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub archive_dir: PathBuf,
    pub html_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("archives_all_articles"),
            html_dir: PathBuf::from("html_digests"),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing newsrank config")?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// `explicit` path, then `$NEWSRANK_CONFIG_PATH`, then the default path.
    /// A missing default file yields built-in defaults; a missing explicit
    /// path is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(default);
        }
        tracing::debug!(target: "pipeline", "no config file; using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn empty_toml_is_all_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.ranking.top_n, 10);
        assert_eq!(cfg.fetch.days, 6);
        assert_eq!(cfg.fetch.chunk_size, 6);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [ranking]
            query = "data brokers"
            top_n = 3

            [fetch]
            query_terms = "long"

            [embedding]
            provider = "openai"
            dimensions = 256

            [summarizer]
            provider = "disabled"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ranking.query, "data brokers");
        assert_eq!(cfg.ranking.top_n, 3);
        assert_eq!(cfg.fetch.query_terms, QueryTermSet::Long);
        assert_eq!(cfg.fetch.days, 6);
        assert_eq!(cfg.embedding.provider, EmbeddingBackend::OpenAi);
        assert_eq!(cfg.embedding.dimensions, Some(256));
        assert_eq!(cfg.summarizer.provider, SummarizerBackend::Disabled);
        assert_eq!(
            cfg.fetch.query_terms_path(QueryTermSet::Long),
            Path::new("config/query_terms_long.json")
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(AppConfig::from_toml_str("[embedding]\nprovider = \"word2vec\"").is_err());
    }

    #[test]
    #[serial]
    fn blocklist_resolution_order() {
        std::env::remove_var("NEWSRANK_BLOCKLIST_PATH");
        let f = FilterConfig::default();
        assert_eq!(f.resolve_blocklist().unwrap(), default_blocklist());

        let f = FilterConfig {
            excluded_sources: Some(vec![" A ".into(), "".into(), "A".into(), "B".into()]),
            blocklist_path: None,
        };
        assert_eq!(f.resolve_blocklist().unwrap(), vec!["A", "B"]);

        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("bl.json");
        std::fs::write(&p, r#"["C"]"#).unwrap();
        let f = FilterConfig {
            excluded_sources: Some(vec!["A".into()]),
            blocklist_path: Some(p),
        };
        assert_eq!(f.resolve_blocklist().unwrap(), vec!["C"]);
    }

    #[test]
    #[serial]
    fn env_path_must_exist() {
        std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
        let res = AppConfig::load(None);
        std::env::remove_var(ENV_CONFIG_PATH);
        assert!(res.is_err());
    }

    #[test]
    #[serial]
    fn env_path_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("c.toml");
        std::fs::write(&p, "[ranking]\ntop_n = 4\n").unwrap();
        std::env::set_var(ENV_CONFIG_PATH, &p);
        let res = AppConfig::load(None);
        std::env::remove_var(ENV_CONFIG_PATH);
        assert_eq!(res.unwrap().ranking.top_n, 4);
    }

    #[test]
    fn hashing_embedder_uses_configured_dimensions() {
        let cfg = EmbeddingConfig {
            provider: EmbeddingBackend::Hashing,
            dimensions: Some(32),
            ..Default::default()
        };
        assert_eq!(cfg.build().unwrap().name(), "hashing:32");
    }

    #[test]
    fn local_model_is_the_default_backend() {
        assert_eq!(EmbeddingConfig::default().provider, EmbeddingBackend::MiniLm);
        let cfg = AppConfig::from_toml_str("[embedding]\nprovider = \"minilm\"").unwrap();
        assert_eq!(cfg.embedding.provider, EmbeddingBackend::MiniLm);
    }

    #[tokio::test]
    async fn hashing_embedder_is_never_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("cache");
        let cfg = EmbeddingConfig {
            provider: EmbeddingBackend::Hashing,
            dimensions: Some(16),
            cache_dir: Some(dir.clone()),
            ..Default::default()
        };
        let e = cfg.build().unwrap();
        assert_eq!(e.name(), "hashing:16");
        e.embed_batch(&["data brokers".to_string()]).await.unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn minilm_needs_both_model_paths() {
        let cfg = EmbeddingConfig {
            model_path: Some("model.onnx".into()),
            ..Default::default()
        };
        let err = cfg.build().err().unwrap();
        assert!(format!("{err:#}").contains("must be set together"));
    }

    #[test]
    fn minilm_missing_files_fail_without_download() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = EmbeddingConfig {
            model_path: Some(tmp.path().join("model.onnx")),
            tokenizer_path: Some(tmp.path().join("tokenizer.json")),
            ..Default::default()
        };
        let err = cfg.build().err().unwrap();
        assert!(format!("{err:#}").contains("model file not found"));
    }
}
