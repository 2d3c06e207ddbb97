//! Offline feature-hashing embedder.
//!
//! Tokens (and adjacent-token bigrams) are hashed with SHA-256 into a signed
//! bucket of a fixed-size vector, which is then L2-normalised. No network, no
//! model weights, fully deterministic. It only captures word overlap, so it is
//! a test and offline double, not a ranker: select it explicitly with
//! `provider = "hashing"`.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{EmbeddingError, EmbeddingProvider};
use crate::ingest::normalize_text;

pub const DEFAULT_DIMENSIONS: usize = 384;

pub struct HashingEmbedder {
    dimensions: usize,
    name: String,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

/// Lowercased word tokens of the normalized text.
fn tokens(text: &str) -> Vec<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?u)\b\w+\b").expect("tokenizer regex"));
    let norm = normalize_text(text).to_lowercase();
    re.find_iter(&norm).map(|m| m.as_str().to_string()).collect()
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            name: format!("hashing:{dimensions}"),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let idx = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
            % self.dimensions;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }

    /// Embed a single text.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let toks = tokens(text);
        let mut v = vec![0.0f32; self.dimensions];

        for t in &toks {
            let (i, s) = self.bucket(t);
            v[i] += s;
        }
        for pair in toks.windows(2) {
            let (i, s) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            v[i] += 0.5 * s;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
