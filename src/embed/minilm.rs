//! Local sentence embeddings with `all-MiniLM-L6-v2` on ONNX Runtime.
//!
//! ```text
//! text → tokenizer → ONNX model → mean-pool → L2-normalize → 384-dim f32
//! ```
//!
//! Model files are fetched from the HuggingFace Hub on first use and cached
//! by `hf-hub`, or loaded from explicit paths for offline hosts. Inference is
//! CPU-bound and runs on the blocking pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;

use super::{EmbeddingError, EmbeddingProvider};

pub const REPO_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

pub const EMBEDDING_DIM: usize = 384;
const MAX_TOKENS: usize = 256;
pub const DEFAULT_BATCH_SIZE: usize = 32;

struct Engine {
    session: Session,
    tokenizer: tokenizers::Tokenizer,
}

fn model_err(what: &str, e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::Model(format!("{what}: {e}"))
}

impl Engine {
    fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self, EmbeddingError> {
        for p in [model_path, tokenizer_path] {
            if !p.exists() {
                return Err(EmbeddingError::NotConfigured(format!(
                    "model file not found: {}",
                    p.display()
                )));
            }
        }

        tracing::info!(target: "relevance", path = %model_path.display(), "loading embedding model");
        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(2)?))
            .and_then(|mut b| b.commit_from_file(model_path))
            .map_err(|e| model_err("embedding model load failed", e))?;

        let mut tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
            .map_err(|e| model_err("embedding tokenizer load failed", e))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| model_err("tokenizer truncation config failed", e))?;
        tokenizer.with_padding(None);

        Ok(Self { session, tokenizer })
    }

    /// One padded forward pass over `texts`.
    fn embed_chunk(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| model_err("tokenization failed", e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batch = texts.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .max(1);

        let mut ids = vec![0i64; batch * max_len];
        let mut mask = vec![0i64; batch * max_len];
        let mut types = vec![0i64; batch * max_len];
        for (i, enc) in encodings.iter().enumerate() {
            let offset = i * max_len;
            for (j, &id) in enc.get_ids().iter().enumerate() {
                ids[offset + j] = id as i64;
            }
            for (j, &m) in enc.get_attention_mask().iter().enumerate() {
                mask[offset + j] = m as i64;
            }
            for (j, &t) in enc.get_type_ids().iter().enumerate() {
                types[offset + j] = t as i64;
            }
        }

        let ids_tensor = Tensor::from_array(([batch, max_len], ids))
            .map_err(|e| model_err("input_ids tensor", e))?;
        let mask_tensor = Tensor::from_array(([batch, max_len], mask.clone()))
            .map_err(|e| model_err("attention_mask tensor", e))?;
        let type_tensor = Tensor::from_array(([batch, max_len], types))
            .map_err(|e| model_err("token_type_ids tensor", e))?;

        let mut feed: HashMap<String, SessionInputValue> = HashMap::new();
        feed.insert("input_ids".to_owned(), ids_tensor.into());
        feed.insert("attention_mask".to_owned(), mask_tensor.into());
        feed.insert("token_type_ids".to_owned(), type_tensor.into());

        let outputs = self
            .session
            .run(SessionInputs::from(feed))
            .map_err(|e| model_err("ONNX inference failed", e))?;

        // [batch, max_len, 384] token embeddings
        let (_shape, data) = outputs[0_usize]
            .try_extract_tensor::<f32>()
            .map_err(|e| model_err("output extraction failed", e))?;
        if data.len() != batch * max_len * EMBEDDING_DIM {
            return Err(EmbeddingError::Decode(format!(
                "model output has {} values, expected {}",
                data.len(),
                batch * max_len * EMBEDDING_DIM
            )));
        }

        Ok((0..batch)
            .map(|i| {
                let start = i * max_len * EMBEDDING_DIM;
                let tokens = &data[start..start + max_len * EMBEDDING_DIM];
                let m = &mask[i * max_len..(i + 1) * max_len];
                l2_normalize(mean_pool(tokens, m, EMBEDDING_DIM))
            })
            .collect())
    }
}

/// Average the token rows whose mask is set. All-masked input gives zeros.
fn mean_pool(flat: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut count = 0.0f32;
    for (t, &m) in mask.iter().enumerate() {
        if m != 0 {
            for (p, &f) in pooled.iter_mut().zip(&flat[t * dim..(t + 1) * dim]) {
                *p += f;
            }
            count += 1.0;
        }
    }
    if count > 0.0 {
        for p in &mut pooled {
            *p /= count;
        }
    }
    pooled
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm >= 1e-12 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// `all-MiniLM-L6-v2` behind [`EmbeddingProvider`].
pub struct MiniLmEmbedder {
    engine: Arc<Mutex<Engine>>,
    batch_size: usize,
    name: String,
}

impl MiniLmEmbedder {
    /// Load from pre-downloaded `model.onnx` and `tokenizer.json`.
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self, EmbeddingError> {
        let engine = Engine::load(model_path, tokenizer_path)?;
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            batch_size: DEFAULT_BATCH_SIZE,
            name: format!("minilm:{REPO_ID}"),
        })
    }

    /// Fetch the model files from the HuggingFace Hub (cached after the first
    /// call). Returns `(model_path, tokenizer_path)`.
    pub fn download_model() -> Result<(PathBuf, PathBuf), EmbeddingError> {
        tracing::info!(target: "relevance", repo = REPO_ID, "resolving embedding model");
        let api = hf_hub::api::sync::Api::new().map_err(|e| model_err("HF Hub API init failed", e))?;
        let repo = api.model(REPO_ID.to_owned());
        let model = repo
            .get(MODEL_FILE)
            .map_err(|e| model_err(&format!("failed to download {MODEL_FILE}"), e))?;
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .map_err(|e| model_err(&format!("failed to download {TOKENIZER_FILE}"), e))?;
        Ok((model, tokenizer))
    }

    pub fn download_and_load() -> Result<Self, EmbeddingError> {
        let (model, tokenizer) = Self::download_model()?;
        Self::load(&model, &tokenizer)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for MiniLmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let engine = Arc::clone(&self.engine);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| EmbeddingError::Model("embedding engine lock poisoned".into()))?;
            let mut out = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(batch_size) {
                tracing::debug!(target: "relevance", size = chunk.len(), "embedding chunk");
                out.extend(engine.embed_chunk(chunk)?);
            }
            Ok::<_, EmbeddingError>(out)
        })
        .await
        .map_err(|e| model_err("embedding task failed", e))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
