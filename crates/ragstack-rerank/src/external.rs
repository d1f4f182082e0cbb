use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use ragstack_core::traits::{RelevanceScorer, Reranker};
use ragstack_core::types::Retrieved;
use ragstack_core::{Error, Result};

use crate::simple::SimpleScoreReranker;
use crate::sort_by_score;

/// Replaces similarity scores with an external relevance signal. Any scorer
/// failure degrades to score ordering of the original items.
pub struct ExternalRelevanceReranker {
    scorer: Arc<dyn RelevanceScorer>,
}

impl ExternalRelevanceReranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    async fn rescore(&self, query: &str, items: &[Retrieved]) -> Result<Vec<f32>> {
        let documents: Vec<String> = items.iter().map(|r| r.chunk.text.clone()).collect();
        let scores = self.scorer.score(query, &documents).await?;
        if scores.len() != items.len() {
            return Err(Error::external(
                "rerank",
                format!("scorer returned {} values for {} documents", scores.len(), items.len()),
            ));
        }
        Ok(scores)
    }
}

#[async_trait]
impl Reranker for ExternalRelevanceReranker {
    fn name(&self) -> &'static str {
        "external"
    }

    async fn rerank(&self, query: &str, items: Vec<Retrieved>) -> Vec<Retrieved> {
        if items.is_empty() {
            return items;
        }
        match self.rescore(query, &items).await {
            Ok(scores) => {
                let mut items = items;
                for (item, score) in items.iter_mut().zip(scores) {
                    item.score = score;
                }
                sort_by_score(&mut items);
                debug!(candidates = items.len(), "external rerank applied");
                items
            }
            Err(e) => {
                warn!(error = %e, "external rerank failed, falling back to score order");
                SimpleScoreReranker::apply(items)
            }
        }
    }
}
