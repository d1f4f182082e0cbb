use ragstack_core::types::ChunkingParams;

use crate::strategy::ChunkingStrategy;
use crate::{char_len, paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Choice {
    /// The whole document becomes a single chunk.
    Whole,
    Delegate(ChunkingStrategy),
}

/// Rules are checked in order; the first match wins.
pub(crate) fn choose(text: &str, params: &ChunkingParams) -> Choice {
    let len = char_len(text);
    if len < params.sentence_min_len {
        return Choice::Whole;
    }
    let breaks = paragraph::count_breaks(text);
    if breaks >= params.paragraph_break_threshold {
        Choice::Delegate(ChunkingStrategy::Paragraph)
    } else if breaks == 0 && len > params.window_size {
        Choice::Delegate(ChunkingStrategy::SlidingWindow)
    } else {
        Choice::Delegate(ChunkingStrategy::Sentence)
    }
}
