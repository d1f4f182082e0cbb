use async_trait::async_trait;

use ragstack_core::traits::Reranker;
use ragstack_core::types::Retrieved;

use crate::sort_by_score;

/// Leaves the retrieval order alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityReranker;

#[async_trait]
impl Reranker for IdentityReranker {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn rerank(&self, _query: &str, items: Vec<Retrieved>) -> Vec<Retrieved> {
        items
    }
}

/// Orders by the similarity score retrieval already produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleScoreReranker;

impl SimpleScoreReranker {
    pub fn apply(mut items: Vec<Retrieved>) -> Vec<Retrieved> {
        sort_by_score(&mut items);
        items
    }
}

#[async_trait]
impl Reranker for SimpleScoreReranker {
    fn name(&self) -> &'static str {
        "simple"
    }

    async fn rerank(&self, _query: &str, items: Vec<Retrieved>) -> Vec<Retrieved> {
        Self::apply(items)
    }
}
