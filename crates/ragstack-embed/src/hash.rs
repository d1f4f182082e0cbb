use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use ragstack_core::traits::Embedder;
use ragstack_core::{Error, Result};

/// Deterministic bag-of-tokens embedder. Each whitespace token is hashed into
/// one bucket; the result is L2-normalised. Needs no model files, which makes
/// it the default for offline runs and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    model_name: String,
    dim: usize,
}

impl HashEmbedder {
    pub fn new(model_name: impl Into<String>, dim: usize) -> Result<Self> {
        let model_name = model_name.into();
        if dim == 0 {
            return Err(Error::validation("embedding dimension must be positive"));
        }
        if model_name.trim().is_empty() {
            return Err(Error::validation("embedding model name must not be empty"));
        }
        Ok(Self { model_name, dim })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
