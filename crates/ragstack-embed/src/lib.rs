//! Embedder implementations and the factory that picks one from config.

mod hash;
mod http;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use ragstack_core::config::{EmbeddingConfig, EmbeddingProvider};
use ragstack_core::traits::{Embedder, EmbedderFactory};
use ragstack_core::{Error, Result};

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

/// Forces the hashing embedder regardless of the configured provider.
pub const FAKE_EMBEDDINGS_ENV: &str = "RAGSTACK_USE_FAKE_EMBEDDINGS";

fn use_fake() -> bool {
    std::env::var(FAKE_EMBEDDINGS_ENV).ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Builds embedders for any (model, dimension) pair using the configured
/// provider settings.
#[derive(Debug, Clone)]
pub struct DefaultEmbedderFactory {
    config: EmbeddingConfig,
}

impl DefaultEmbedderFactory {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

impl EmbedderFactory for DefaultEmbedderFactory {
    fn create(&self, model_name: &str, dimension: usize) -> Result<Arc<dyn Embedder>> {
        if use_fake() || self.config.provider == EmbeddingProvider::Hash {
            return Ok(Arc::new(HashEmbedder::new(model_name, dimension)?));
        }
        let endpoint = self
            .config
            .endpoint
            .clone()
            .ok_or_else(|| Error::unavailable("embedding.endpoint is not configured"))?;
        let embedder = HttpEmbedder::new(
            endpoint,
            self.config.api_key.clone(),
            model_name,
            dimension,
            Duration::from_secs(self.config.timeout_secs),
        )?;
        Ok(Arc::new(embedder))
    }
}

/// The embedder named by the configuration.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder = DefaultEmbedderFactory::new(config.clone()).create(&config.model, config.dimension)?;
    info!(model = %embedder.model_name(), dim = embedder.dim(), "embedder ready");
    Ok(embedder)
}
