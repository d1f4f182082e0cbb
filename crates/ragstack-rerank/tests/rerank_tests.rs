use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ragstack_core::traits::{RelevanceScorer, Reranker};
use ragstack_core::types::{Chunk, Meta, Retrieved};
use ragstack_core::{Error, Result};
use ragstack_core::config::HybridWeights;
use ragstack_rerank::{
    Bm25Reranker, ExternalRelevanceReranker, HttpRelevanceScorer, HybridReranker, IdentityReranker,
    SimpleScoreReranker,
};

fn item(id: &str, text: &str, score: f32) -> Retrieved {
    Retrieved {
        chunk: Chunk { id: id.to_string(), doc_id: "d".into(), ordinal: 0, text: text.to_string(), metadata: Meta::new() },
        score,
    }
}

fn ids(items: &[Retrieved]) -> Vec<&str> {
    items.iter().map(|r| r.chunk.id.as_str()).collect()
}

fn sample() -> Vec<Retrieved> {
    vec![
        item("a", "tokio runtime", 0.2),
        item("b", "rust ownership rules", 0.9),
        item("c", "borrow checker", 0.5),
        item("d", "lifetimes in rust", 0.5),
        item("e", "cargo workspaces", 0.7),
    ]
}

struct FailingScorer;

#[async_trait]
impl RelevanceScorer for FailingScorer {
    async fn score(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        Err(Error::external("rerank", "connection reset"))
    }
}

struct ShortScorer;

#[async_trait]
impl RelevanceScorer for ShortScorer {
    async fn score(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        Ok(vec![1.0])
    }
}

/// Scores by text length, so the longest text ranks first.
struct LengthScorer;

#[async_trait]
impl RelevanceScorer for LengthScorer {
    async fn score(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        Ok(documents.iter().map(|d| d.len() as f32).collect())
    }
}

#[tokio::test]
async fn identity_keeps_order() {
    let out = IdentityReranker.rerank("q", sample()).await;
    assert_eq!(ids(&out), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn simple_is_descending_and_stable() {
    let out = SimpleScoreReranker.rerank("q", sample()).await;
    assert_eq!(ids(&out), vec!["b", "e", "c", "d", "a"]);
    assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn external_failures_fall_back_to_score_order() {
    let expected = SimpleScoreReranker.rerank("q", sample()).await;

    let failing = ExternalRelevanceReranker::new(Arc::new(FailingScorer));
    assert_eq!(failing.rerank("q", sample()).await, expected);

    let short = ExternalRelevanceReranker::new(Arc::new(ShortScorer));
    assert_eq!(short.rerank("q", sample()).await, expected);

    let no_key = HttpRelevanceScorer::new("http://127.0.0.1:9/rerank".into(), "m".into(), None, Duration::from_millis(200));
    let unconfigured = ExternalRelevanceReranker::new(Arc::new(no_key));
    assert_eq!(unconfigured.rerank("q", sample()).await, expected);
}

#[tokio::test]
async fn external_scores_replace_similarity() {
    let out = ExternalRelevanceReranker::new(Arc::new(LengthScorer)).rerank("q", sample()).await;
    assert_eq!(ids(&out), vec!["b", "d", "e", "c", "a"]);
    assert_eq!(out[0].score, "rust ownership rules".len() as f32);
}

#[tokio::test]
async fn bm25_promotes_lexical_matches() {
    let items = vec![item("x", "garbage collection", 0.5), item("y", "rust ownership", 0.5)];
    let out = Bm25Reranker::default().rerank("Rust", items).await;
    assert_eq!(ids(&out), vec!["y", "x"]);
    assert_eq!(out.len(), 2);
}

#[tokio::test]
async fn bm25_without_query_sorts_by_score() {
    let expected = SimpleScoreReranker.rerank("", sample()).await;
    assert_eq!(Bm25Reranker::default().rerank("   ", sample()).await, expected);
}

#[tokio::test]
async fn rerankers_keep_members() {
    let rerankers: Vec<Box<dyn Reranker>> = vec![
        Box::new(IdentityReranker),
        Box::new(SimpleScoreReranker),
        Box::new(Bm25Reranker::default()),
        Box::new(ExternalRelevanceReranker::new(Arc::new(LengthScorer))),
    ];
    for reranker in rerankers {
        let mut out = ids(&reranker.rerank("rust", sample()).await).into_iter().map(String::from).collect::<Vec<_>>();
        out.sort();
        assert_eq!(out, vec!["a", "b", "c", "d", "e"], "{} changed membership", reranker.name());
    }
}

#[tokio::test]
async fn hybrid_blends_lexical_and_similarity_scores() {
    let out = HybridReranker::default().rerank("rust", sample()).await;
    // "d" mentions rust, so it overtakes "c" despite the equal similarity.
    assert_eq!(ids(&out), vec!["b", "e", "d", "c", "a"]);
    let d = out.iter().find(|r| r.chunk.id == "d").map(|r| r.score).unwrap_or_default();
    assert!((d - 0.56).abs() < 1e-4, "0.7 * 0.5 + 0.3 * (0.6 * 0.5 + 0.4), got {d}");
}

#[tokio::test]
async fn hybrid_with_only_bm25_weight_matches_bm25() {
    let lexical_only = HybridReranker::new(HybridWeights { semantic: 0.0, bm25: 3.0, simple: 0.0 });
    let hybrid = lexical_only.rerank("rust", sample()).await;
    let bm25 = Bm25Reranker::default().rerank("rust", sample()).await;
    assert_eq!(ids(&hybrid), ids(&bm25));
    assert_eq!(ids(&hybrid), vec!["b", "d", "e", "c", "a"]);
}

#[tokio::test]
async fn hybrid_without_query_terms_keeps_score_order() {
    let out = HybridReranker::default().rerank("   ", sample()).await;
    assert_eq!(ids(&out), vec!["b", "e", "c", "d", "a"]);
    assert!(HybridReranker::default().rerank("rust", Vec::new()).await.is_empty());
}
