use std::sync::LazyLock;

use regex::Regex;

use ragstack_core::types::ChunkingParams;

use crate::merge_short;

// Terminators in CJK text are not always followed by whitespace.
static CJK_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。！？]+\s*|\n\s*\n").expect("static sentence pattern"));
static LATIN_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n\s*\n").expect("static sentence pattern"));

fn is_cjk(language: &str) -> bool {
    let primary = language.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    matches!(primary.as_str(), "ko" | "ja" | "zh")
}

/// Sentences in source order, trimmed, terminators attached.
pub(crate) fn split_sentences<'a>(text: &'a str, language: &str) -> Vec<&'a str> {
    let boundary = if is_cjk(language) { &*CJK_BOUNDARY } else { &*LATIN_BOUNDARY };
    let mut out = Vec::new();
    let mut last = 0;
    for m in boundary.find_iter(text) {
        let piece = text[last..m.end()].trim();
        if !piece.is_empty() {
            out.push(piece);
        }
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

pub(crate) fn split(text: &str, params: &ChunkingParams) -> Vec<String> {
    merge_short(split_sentences(text, &params.language), params.sentence_min_len, " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_needs_whitespace_after_terminator() {
        let s = split_sentences("Version 3.14 shipped. It works! Does it?", "en");
        assert_eq!(s, vec!["Version 3.14 shipped.", "It works!", "Does it?"]);
    }

    #[test]
    fn korean_splits_on_bare_terminators() {
        let s = split_sentences("안녕하세요.반갑습니다。 좋아요", "ko");
        assert_eq!(s, vec!["안녕하세요.", "반갑습니다。", "좋아요"]);
    }

    #[test]
    fn blank_lines_end_sentences() {
        let s = split_sentences("Heading without stop\n\nBody text here", "en");
        assert_eq!(s, vec!["Heading without stop", "Body text here"]);
    }
}
