//! Okapi BM25 over the candidate set itself. The corpus statistics come from
//! the retrieved items, not the whole namespace.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use ragstack_core::traits::Reranker;
use ragstack_core::types::Retrieved;

use crate::simple::SimpleScoreReranker;
use crate::sort_by_score;

/// Share of the final score kept from vector similarity.
const SIMILARITY_WEIGHT: f32 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct Bm25Reranker {
    k1: f32,
    b: f32,
}

impl Default for Bm25Reranker {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

impl Bm25Reranker {
    pub fn new(k1: f32, b: f32) -> Self {
        Self { k1, b }
    }

    /// Raw BM25 score of every document against the query tokens.
    pub fn scores(&self, query: &[String], documents: &[Vec<String>]) -> Vec<f32> {
        if documents.is_empty() {
            return Vec::new();
        }
        let n = documents.len() as f32;
        let avgdl = documents.iter().map(Vec::len).sum::<usize>() as f32 / n;
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let mut seen: Vec<&str> = doc.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        documents
            .iter()
            .map(|doc| {
                let len = doc.len() as f32;
                query
                    .iter()
                    .filter_map(|term| doc_freq.get(term.as_str()).map(|df| (term, *df as f32)))
                    .map(|(term, df)| {
                        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                        let tf = doc.iter().filter(|t| *t == term).count() as f32;
                        let norm = if avgdl > 0.0 { len / avgdl } else { 0.0 };
                        idf * tf * (self.k1 + 1.0) / (tf + self.k1 * (1.0 - self.b + self.b * norm))
                    })
                    .sum()
            })
            .collect()
    }

    /// Similarity blended with the max-normalised BM25 score, one value per
    /// item in input order. `None` when the query has no terms.
    pub fn blended(&self, query: &str, items: &[Retrieved]) -> Option<Vec<f32>> {
        let query = tokenize(query);
        if query.is_empty() || items.is_empty() {
            return None;
        }
        let documents: Vec<Vec<String>> = items.iter().map(|r| tokenize(&r.chunk.text)).collect();
        let scores = self.scores(&query, &documents);
        let max = scores.iter().copied().fold(0.0f32, f32::max);
        Some(
            items
                .iter()
                .zip(&scores)
                .map(|(item, raw)| {
                    let lexical = if max > 0.0 { raw / max } else { 0.0 };
                    SIMILARITY_WEIGHT * item.score + (1.0 - SIMILARITY_WEIGHT) * lexical
                })
                .collect(),
        )
    }
}

#[async_trait]
impl Reranker for Bm25Reranker {
    fn name(&self) -> &'static str {
        "bm25"
    }

    async fn rerank(&self, query: &str, mut items: Vec<Retrieved>) -> Vec<Retrieved> {
        let Some(blended) = self.blended(query, &items) else {
            return SimpleScoreReranker::apply(items);
        };
        for (item, score) in items.iter_mut().zip(blended) {
            item.score = score;
        }
        sort_by_score(&mut items);
        debug!(candidates = items.len(), top = items.first().map(|r| r.score), "bm25 rerank");
        items
    }
}
