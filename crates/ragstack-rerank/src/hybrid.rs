//! Weighted blend of the semantic, BM25 and simple scores of each candidate.

use async_trait::async_trait;
use tracing::debug;

use ragstack_core::config::HybridWeights;
use ragstack_core::traits::Reranker;
use ragstack_core::types::Retrieved;

use crate::bm25::Bm25Reranker;
use crate::sort_by_score;

#[derive(Debug, Clone, Copy)]
pub struct HybridReranker {
    weights: HybridWeights,
    bm25: Bm25Reranker,
}

impl Default for HybridReranker {
    fn default() -> Self {
        Self::new(HybridWeights::default())
    }
}

impl HybridReranker {
    /// Weights are scaled to sum to one. All-zero weights fall back to the
    /// defaults.
    pub fn new(weights: HybridWeights) -> Self {
        let total = weights.semantic + weights.bm25 + weights.simple;
        let weights = if total > 0.0 && total.is_finite() {
            HybridWeights { semantic: weights.semantic / total, bm25: weights.bm25 / total, simple: weights.simple / total }
        } else {
            HybridWeights::default()
        };
        Self { weights, bm25: Bm25Reranker::default() }
    }

    pub fn weights(&self) -> HybridWeights {
        self.weights
    }
}

#[async_trait]
impl Reranker for HybridReranker {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    async fn rerank(&self, query: &str, mut items: Vec<Retrieved>) -> Vec<Retrieved> {
        if items.is_empty() {
            return items;
        }
        // Without query terms the BM25 part is the plain similarity.
        let lexical = self
            .bm25
            .blended(query, &items)
            .unwrap_or_else(|| items.iter().map(|r| r.score).collect());
        let w = self.weights;
        for (item, bm25) in items.iter_mut().zip(lexical) {
            let similarity = item.score;
            item.score = w.semantic * similarity + w.bm25 * bm25 + w.simple * similarity;
        }
        sort_by_score(&mut items);
        debug!(candidates = items.len(), top = items.first().map(|r| r.score), "hybrid rerank");
        items
    }
}
