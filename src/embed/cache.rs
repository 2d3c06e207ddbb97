//! Per-text file cache in front of any embedding provider.
//!
//! Cache keys are SHA-256 of `(provider name, text)`, so switching model or
//! dimensions never serves stale vectors. Misses go to the inner provider in
//! one batch. Writes are atomic (temp file + rename) and best-effort.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{EmbeddingError, EmbeddingProvider};

pub struct CachingEmbedder<P: EmbeddingProvider> {
    inner: P,
    cache_dir: PathBuf,
}

impl<P: EmbeddingProvider> CachingEmbedder<P> {
    pub fn new(inner: P, cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            tracing::warn!(target: "relevance", error = %e, dir = %cache_dir.display(), "cannot create embedding cache dir");
        }
        Self { inner, cache_dir }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.name().as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<Vec<f32>> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &[f32]) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachingEmbedder<P> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let keys: Vec<String> = texts.iter().map(|t| self.key(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = keys
            .iter()
            .map(|k| read_cache_file(&self.cache_dir, k))
            .collect();

        let miss_idx: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        tracing::debug!(
            target: "relevance",
            hits = texts.len() - miss_idx.len(),
            misses = miss_idx.len(),
            "embedding cache lookup"
        );

        if !miss_idx.is_empty() {
            let miss_texts: Vec<String> = miss_idx.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&miss_texts).await?;
            if fresh.len() != miss_texts.len() {
                return Err(EmbeddingError::Decode(format!(
                    "expected {} embeddings, got {}",
                    miss_texts.len(),
                    fresh.len()
                )));
            }
            for (&i, v) in miss_idx.iter().zip(fresh) {
                if let Err(e) = write_cache_file(&self.cache_dir, &keys[i], &v) {
                    tracing::warn!(target: "relevance", error = %e, "embedding cache write failed");
                }
                out[i] = Some(v);
            }
        }

        Ok(out.into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: HashingEmbedder,
        texts_seen: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for Counting {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn second_call_is_served_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let emb = CachingEmbedder::new(
            Counting {
                inner: HashingEmbedder::new(16),
                texts_seen: AtomicUsize::new(0),
            },
            tmp.path(),
        );
        let texts: Vec<String> = vec!["a b".into(), "c d".into()];

        let first = emb.embed_batch(&texts).await.unwrap();
        let second = emb.embed_batch(&texts).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(emb.inner().texts_seen.load(Ordering::SeqCst), 2);

        // Only the new text reaches the backend; order is preserved.
        let mixed: Vec<String> = vec!["c d".into(), "e f".into(), "a b".into()];
        let got = emb.embed_batch(&mixed).await.unwrap();
        assert_eq!(emb.inner().texts_seen.load(Ordering::SeqCst), 3);
        assert_eq!(got[0], first[1]);
        assert_eq!(got[2], first[0]);
    }

    #[test]
    fn keys_depend_on_provider_name() {
        let tmp = tempfile::tempdir().unwrap();
        let a = CachingEmbedder::new(HashingEmbedder::new(16), tmp.path());
        let b = CachingEmbedder::new(HashingEmbedder::new(32), tmp.path());
        assert_ne!(a.key("same"), b.key("same"));
        assert_eq!(a.key("same").len(), 64);
    }
}
