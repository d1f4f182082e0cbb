//! Relevance scoring against Cohere-style `/rerank` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragstack_core::traits::RelevanceScorer;
use ragstack_core::{Error, Result};

const SERVICE: &str = "rerank";

#[derive(Debug, Clone)]
pub struct HttpRelevanceScorer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

impl HttpRelevanceScorer {
    pub fn new(endpoint: String, model: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), endpoint, model, api_key, timeout }
    }
}

/// Map results reported in relevance order back onto input positions.
fn align_scores(expected: usize, results: Vec<RerankResult>) -> Result<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for r in results {
        let slot = scores
            .get_mut(r.index)
            .ok_or_else(|| Error::external(SERVICE, format!("result index {} out of range", r.index)))?;
        *slot = Some(r.relevance_score);
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| Error::external(SERVICE, format!("no score for document {i}"))))
        .collect()
}

#[async_trait]
impl RelevanceScorer for HttpRelevanceScorer {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Err(Error::external(SERVICE, "no api key configured"));
        };
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let body = RerankRequest { model: &self.model, query, documents, top_n: documents.len() };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, e))?
            .error_for_status()
            .map_err(|e| Error::external(SERVICE, e))?;
        let parsed: RerankResponse = response.json().await.map_err(|e| Error::external(SERVICE, e))?;
        debug!(model = %self.model, documents = documents.len(), "relevance scores received");
        align_scores(documents.len(), parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, relevance_score: f32) -> RerankResult {
        RerankResult { index, relevance_score }
    }

    #[test]
    fn scores_return_to_input_order() {
        let aligned = align_scores(3, vec![result(2, 0.9), result(0, 0.5), result(1, 0.1)]).unwrap();
        assert_eq!(aligned, vec![0.5, 0.1, 0.9]);
    }

    #[test]
    fn missing_or_stray_indices_fail() {
        assert!(align_scores(2, vec![result(0, 0.5)]).is_err());
        assert!(align_scores(1, vec![result(0, 0.5), result(4, 0.2)]).is_err());
    }

    #[test]
    fn response_body_parses() {
        let raw = r#"{"id":"x","results":[{"index":1,"relevance_score":0.7},{"index":0,"relevance_score":0.2}]}"#;
        let parsed: RerankResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(align_scores(2, parsed.results).unwrap(), vec![0.2, 0.7]);
    }

    #[tokio::test]
    async fn missing_key_is_external_error() {
        let scorer = HttpRelevanceScorer::new("http://127.0.0.1:9/rerank".into(), "m".into(), None, Duration::from_secs(1));
        let err = scorer.score("q", &["doc".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::ExternalService { .. }));
    }
}
