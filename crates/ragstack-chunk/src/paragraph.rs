use std::sync::LazyLock;

use regex::Regex;

use ragstack_core::types::ChunkingParams;

use crate::{char_len, merge_short, sentence, window};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n\s*\n").expect("static paragraph pattern"));

// Rough chars-per-token ratio used to decide a paragraph is too long.
pub(crate) const CHARS_PER_TOKEN: usize = 4;

pub(crate) fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK.split(text).map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Breaks between non-empty paragraphs. Leading and trailing blank lines
/// do not count.
pub(crate) fn count_breaks(text: &str) -> usize {
    split_paragraphs(text).len().saturating_sub(1)
}

pub(crate) fn split(text: &str, params: &ChunkingParams) -> Vec<String> {
    let long_limit = params.max_tokens.saturating_mul(CHARS_PER_TOKEN);
    merge_short(split_paragraphs(text), params.paragraph_min_len, "\n\n")
        .into_iter()
        .flat_map(|p| if char_len(&p) > long_limit { pack_sentences(&p, params) } else { vec![p] })
        .collect()
}

/// Re-split an oversized paragraph into runs of whole sentences no longer
/// than `window_size` chars. A single sentence above the limit is cut into
/// plain windows.
fn pack_sentences(paragraph: &str, params: &ChunkingParams) -> Vec<String> {
    let limit = params.window_size;
    let mut out = Vec::new();
    let mut current = String::new();
    for s in sentence::split_sentences(paragraph, &params.language) {
        let s_len = char_len(s);
        if s_len > limit {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.extend(window::sliding(s, limit, 0, false).into_iter().map(|w| w.text));
            continue;
        }
        if !current.is_empty() && char_len(&current) + 1 + s_len > limit {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(s);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
