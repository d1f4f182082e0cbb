//! Collaborator contracts. Implementations live in the embed, vector and
//! rerank crates, or in the caller for services the workspace does not ship.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, Namespace, NamespaceInfo, NamespaceStats, Retrieved};

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize {
        512
    }
    /// One vector per input text, each of length `dim()`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Builds the embedder that serves a (model, dimension) pair.
pub trait EmbedderFactory: Send + Sync {
    fn create(&self, model_name: &str, dimension: usize) -> Result<Arc<dyn Embedder>>;
}

/// Namespace-scoped chunk/vector storage.
///
/// The `*_in` methods act on an explicit namespace; the unsuffixed ones act
/// on the namespace active at call time.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn active(&self) -> Namespace;

    async fn add_in(&self, ns: &Namespace, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize>;
    async fn count_in(&self, ns: &Namespace) -> Result<usize>;
    async fn clear_in(&self, ns: &Namespace) -> Result<()>;
    async fn search_in(&self, ns: &Namespace, query: &[f32], k: usize) -> Result<Vec<Retrieved>>;
    async fn delete_document_in(&self, ns: &Namespace, doc_id: &str) -> Result<usize>;

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>>;
    /// Resolves (and creates if needed) the target before moving the active
    /// pointer. On error the active namespace is unchanged.
    async fn switch_active(&self, model_name: &str, dimension: usize) -> Result<Namespace>;

    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        let ns = self.active();
        self.add_in(&ns, chunks, vectors).await
    }

    async fn count(&self) -> Result<usize> {
        let ns = self.active();
        self.count_in(&ns).await
    }

    async fn clear(&self) -> Result<()> {
        let ns = self.active();
        self.clear_in(&ns).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Retrieved>> {
        let ns = self.active();
        self.search_in(&ns, query, k).await
    }

    async fn delete_document(&self, doc_id: &str) -> Result<usize> {
        let ns = self.active();
        self.delete_document_in(&ns, doc_id).await
    }

    async fn stats(&self) -> Result<NamespaceStats> {
        let ns = self.active();
        let count = self.count_in(&ns).await?;
        Ok(NamespaceStats { id: ns.id, model_name: ns.model_name, dimension: ns.dimension, count })
    }
}

/// Reorders candidates. Output has the same members as the input.
#[async_trait]
pub trait Reranker: Send + Sync {
    fn name(&self) -> &'static str;
    async fn rerank(&self, query: &str, items: Vec<Retrieved>) -> Vec<Retrieved>;
}

/// External relevance signal, one value per document in input order.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// Answer generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String>;
}
