//! Candidate rerankers. Every reranker returns the same members it was given,
//! only the order (and for scoring rerankers the scores) change.

pub mod bm25;
pub mod external;
pub mod http;
pub mod hybrid;
pub mod simple;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use ragstack_core::config::{RerankerConfig, RerankerKind};
use ragstack_core::traits::Reranker;
use ragstack_core::types::Retrieved;

pub use bm25::Bm25Reranker;
pub use external::ExternalRelevanceReranker;
pub use http::HttpRelevanceScorer;
pub use hybrid::HybridReranker;
pub use simple::{IdentityReranker, SimpleScoreReranker};

/// Stable descending sort on `score`. NaN compares equal so it never moves
/// other items around.
pub fn sort_by_score(items: &mut [Retrieved]) {
    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

pub fn build_reranker(config: &RerankerConfig) -> Arc<dyn Reranker> {
    let reranker: Arc<dyn Reranker> = match config.kind {
        RerankerKind::Identity => Arc::new(IdentityReranker),
        RerankerKind::Simple => Arc::new(SimpleScoreReranker),
        RerankerKind::Bm25 => Arc::new(Bm25Reranker::default()),
        RerankerKind::Hybrid => Arc::new(HybridReranker::new(config.hybrid_weights)),
        RerankerKind::External => {
            let scorer = HttpRelevanceScorer::new(
                config.endpoint.clone(),
                config.model.clone(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            );
            Arc::new(ExternalRelevanceReranker::new(Arc::new(scorer)))
        }
    };
    info!(reranker = reranker.name(), "reranker ready");
    reranker
}
