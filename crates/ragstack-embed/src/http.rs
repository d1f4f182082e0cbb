use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragstack_core::traits::Embedder;
use ragstack_core::{Error, Result};

const SERVICE: &str = "embedding";

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model_name: String,
    dim: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model_name: impl Into<String>,
        dim: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::validation("embedding dimension must be positive"));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::unavailable(format!("cannot build http client: {e}")))?;
        Ok(Self { client, endpoint: endpoint.into(), api_key, model_name: model_name.into(), dim })
    }

    fn order_vectors(&self, expected: usize, mut items: Vec<EmbeddingItem>) -> Result<Vec<Vec<f32>>> {
        if items.len() != expected {
            return Err(Error::external(
                SERVICE,
                format!("expected {expected} embeddings, got {}", items.len()),
            ));
        }
        if items.iter().all(|i| i.index.is_some()) {
            items.sort_by_key(|i| i.index);
        }
        let vectors: Vec<Vec<f32>> = items.into_iter().map(|i| i.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::external(
                SERVICE,
                format!("model {} returned {} dims, expected {}", self.model_name, bad.len(), self.dim),
            ));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest { model: &self.model_name, input: texts });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| Error::external(SERVICE, e))?;
        let response = response.error_for_status().map_err(|e| Error::external(SERVICE, e))?;
        let body: EmbeddingResponse = response.json().await.map_err(|e| Error::external(SERVICE, e))?;
        debug!(model = %self.model_name, texts = texts.len(), "embedded batch over http");
        self.order_vectors(texts.len(), body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> HttpEmbedder {
        HttpEmbedder::new("http://localhost:9/embeddings", None, "m", 2, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn vectors_follow_reported_index() {
        let items = vec![
            EmbeddingItem { index: Some(1), embedding: vec![0.0, 1.0] },
            EmbeddingItem { index: Some(0), embedding: vec![1.0, 0.0] },
        ];
        let v = embedder().order_vectors(2, items).unwrap();
        assert_eq!(v[0], vec![1.0, 0.0]);
    }

    #[test]
    fn wrong_count_or_dimension_is_external_error() {
        let short = vec![EmbeddingItem { index: None, embedding: vec![1.0, 0.0] }];
        assert!(matches!(embedder().order_vectors(2, short), Err(Error::ExternalService { .. })));
        let wide = vec![EmbeddingItem { index: None, embedding: vec![1.0, 0.0, 0.0] }];
        assert!(matches!(embedder().order_vectors(1, wide), Err(Error::ExternalService { .. })));
    }
}
