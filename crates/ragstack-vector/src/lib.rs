//! Namespace-isolated vector storage: the namespace manager plus an
//! in-process store and a LanceDB-backed store.

pub mod lance;
pub mod memory;
pub mod namespace;
pub mod schema;
pub mod table;

use std::collections::HashSet;

use ragstack_core::types::{Chunk, Namespace};
use ragstack_core::{Error, Result};

pub use lance::LanceStore;
pub use memory::MemoryStore;
pub use namespace::{NamespaceManager, ParsedNamespace};

/// Reject a batch before anything is written: lengths must pair up, every
/// vector must match the namespace dimension, ids must be unique and texts
/// non-empty.
pub fn check_batch(ns: &Namespace, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != vectors.len() {
        return Err(Error::validation(format!(
            "{} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )));
    }
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != ns.dimension) {
        return Err(Error::validation(format!(
            "vector {i} has dimension {}, namespace {} expects {}",
            v.len(),
            ns.id,
            ns.dimension
        )));
    }
    let mut seen = HashSet::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.text.trim().is_empty() {
            return Err(Error::validation(format!("chunk {} has empty text", chunk.id)));
        }
        if !seen.insert(chunk.id.as_str()) {
            return Err(Error::validation(format!("chunk id {} repeated in batch", chunk.id)));
        }
    }
    Ok(())
}

pub fn check_query(ns: &Namespace, query: &[f32]) -> Result<()> {
    if query.len() == ns.dimension {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "query has dimension {}, namespace {} expects {}",
            query.len(),
            ns.id,
            ns.dimension
        )))
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
