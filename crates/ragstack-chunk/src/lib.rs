//! Document chunking: the closed set of strategies and the registry that
//! holds the active one.

mod adaptive;
mod paragraph;
mod sentence;
mod window;

pub mod registry;
pub mod strategy;

pub use registry::{ChunkingSnapshot, StrategyInfo, StrategyRegistry};
pub use strategy::ChunkingStrategy;

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Join neighbouring pieces until each reaches `min_len` chars. A short piece
/// is carried into the one after it; a short tail is appended to the last
/// emitted piece.
pub(crate) fn merge_short<'a, I>(pieces: I, min_len: usize, joiner: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = Vec::new();
    let mut pending = String::new();
    for piece in pieces {
        if !pending.is_empty() {
            pending.push_str(joiner);
        }
        pending.push_str(piece);
        if char_len(&pending) >= min_len {
            out.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        match out.last_mut() {
            Some(last) => {
                last.push_str(joiner);
                last.push_str(&pending);
            }
            None => out.push(pending),
        }
    }
    out
}
