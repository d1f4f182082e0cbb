use std::collections::HashMap;
use std::time::Duration;

use ragstack_core::config::RetrievalConfig;
use ragstack_core::types::Retrieved;

const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalPolicy {
    /// Result count for `ask` when the caller gives no hint.
    pub retrieve_k: usize,
    /// How many reranked chunks `answer` hands to the generator.
    pub rerank_k: usize,
    pub max_context_chars: usize,
    pub ask_timeout: Duration,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl RetrievalPolicy {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            retrieve_k: config.retrieve_k,
            rerank_k: config.rerank_k,
            max_context_chars: config.max_context_chars,
            ask_timeout: Duration::from_secs(config.ask_timeout_secs),
        }
    }
}

/// Keep the best-scoring hit per chunk id, preserving first-seen order.
pub fn dedup_best(hits: Vec<Retrieved>) -> Vec<Retrieved> {
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(hits.len());
    let mut out: Vec<Retrieved> = Vec::with_capacity(hits.len());
    for hit in hits {
        match slot.get(&hit.chunk.id) {
            Some(&i) => {
                if hit.score > out[i].score {
                    out[i] = hit;
                }
            }
            None => {
                slot.insert(hit.chunk.id.clone(), out.len());
                out.push(hit);
            }
        }
    }
    out
}

/// Join chunk texts with blank lines, stopping at `max_chars` characters.
/// The chunk that crosses the budget is cut on a char boundary.
pub fn compress_context(items: &[Retrieved], max_chars: usize) -> String {
    let mut out = String::new();
    let mut remaining = max_chars;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            if remaining <= SEPARATOR.len() {
                break;
            }
            out.push_str(SEPARATOR);
            remaining -= SEPARATOR.len();
        }
        let len = item.chunk.text.chars().count();
        if len <= remaining {
            out.push_str(&item.chunk.text);
            remaining -= len;
        } else {
            out.extend(item.chunk.text.chars().take(remaining));
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragstack_core::types::{Chunk, Meta};

    fn hit(id: &str, text: &str, score: f32) -> Retrieved {
        Retrieved {
            chunk: Chunk { id: id.into(), doc_id: "d".into(), ordinal: 0, text: text.into(), metadata: Meta::new() },
            score,
        }
    }

    #[test]
    fn dedup_keeps_best_score() {
        let out = dedup_best(vec![hit("a", "x", 0.2), hit("b", "y", 0.5), hit("a", "x", 0.9)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk.id, "a");
        assert_eq!(out[0].score, 0.9);
    }

    #[test]
    fn context_fits_budget() {
        let items = vec![hit("a", "hello", 1.0), hit("b", "world wide", 0.5)];
        assert_eq!(compress_context(&items, 100), "hello\n\nworld wide");
        assert_eq!(compress_context(&items, 12), "hello\n\nworld");
        assert_eq!(compress_context(&items, 7), "hello");
        assert_eq!(compress_context(&items, 3), "hel");
        assert_eq!(compress_context(&[], 10), "");
    }

    #[test]
    fn context_cuts_on_char_boundaries() {
        let items = vec![hit("a", "가나다라", 1.0)];
        assert_eq!(compress_context(&items, 2), "가나");
    }
}
