use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use ragstack_core::types::{Chunk, ChunkingParams, Document, Meta};
use ragstack_core::{Error, Result};

use crate::adaptive::{self, Choice};
use crate::{char_len, paragraph, sentence, window};

/// The closed set of chunking strategies.
///
/// Every variant is a pure function of (document, params): the same input
/// always yields the same chunks, and blank input yields none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkingStrategy {
    #[serde(rename = "sentence")]
    Sentence,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "sliding_window")]
    SlidingWindow,
    #[serde(rename = "adaptive")]
    Adaptive,
    #[serde(rename = "simple_overlap")]
    Overlap,
}

struct Piece {
    text: String,
    position: Option<usize>,
}

impl Piece {
    fn plain(text: String) -> Self {
        Self { text, position: None }
    }
}

impl ChunkingStrategy {
    pub const ALL: [Self; 5] = [Self::Sentence, Self::Paragraph, Self::SlidingWindow, Self::Adaptive, Self::Overlap];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::SlidingWindow => "sliding_window",
            Self::Adaptive => "adaptive",
            Self::Overlap => "simple_overlap",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Sentence => "Split text into individual sentences. Best for Q&A and chat-like content.",
            Self::Paragraph => "Split text by paragraphs. Ideal for structured documents and manuals.",
            Self::SlidingWindow => "Use fixed-size sliding windows. Good for long narratives and novels.",
            Self::Adaptive => "Automatically choose the best strategy based on text characteristics.",
            Self::Overlap => "Fixed-size chunks with overlap. Simple and predictable chunking.",
        }
    }

    pub fn chunk(self, document: &Document, params: &ChunkingParams) -> Vec<Chunk> {
        let text = document.text.as_str();
        if text.trim().is_empty() {
            return Vec::new();
        }
        let (pieces, delegate) = match self {
            Self::Adaptive => match adaptive::choose(text, params) {
                Choice::Whole => (cap_pieces(vec![Piece::plain(text.trim().to_string())], params), None),
                Choice::Delegate(inner) => (cap_pieces(inner.pieces(text, params), params), Some(inner)),
            },
            other => (other.pieces(text, params), None),
        };

        pieces
            .into_iter()
            .filter(|p| !p.text.is_empty())
            .enumerate()
            .map(|(ordinal, piece)| {
                let mut metadata = Meta::new();
                metadata.insert("strategy".into(), json!(self.name()));
                metadata.insert("chunk_index".into(), json!(ordinal));
                metadata.insert("doc_title".into(), json!(document.title));
                metadata.insert("doc_source".into(), json!(document.source));
                if let Some(inner) = delegate {
                    metadata.insert("delegate".into(), json!(inner.name()));
                }
                if let Some(position) = piece.position {
                    metadata.insert("position".into(), json!(position));
                }
                Chunk {
                    id: format!("{}:{}", document.id, ordinal),
                    doc_id: document.id.clone(),
                    ordinal,
                    text: piece.text,
                    metadata,
                }
            })
            .collect()
    }

    fn pieces(self, text: &str, params: &ChunkingParams) -> Vec<Piece> {
        match self {
            Self::Sentence => sentence::split(text, params).into_iter().map(Piece::plain).collect(),
            Self::Paragraph => paragraph::split(text, params).into_iter().map(Piece::plain).collect(),
            Self::SlidingWindow => window::sliding(text, params.window_size, params.overlap, true)
                .into_iter()
                .map(|w| Piece { text: w.text, position: Some(w.start) })
                .collect(),
            Self::Overlap => {
                let size = params.max_tokens.max(1);
                window::sliding(text, size, params.overlap.min(size - 1), false)
                    .into_iter()
                    .map(|w| Piece { text: w.text, position: Some(w.start) })
                    .collect()
            }
            // Adaptive never delegates to itself.
            Self::Adaptive => Self::Sentence.pieces(text, params),
        }
    }
}

/// Re-split pieces longer than `max_tokens` worth of chars into plain char
/// windows. Positions stay relative to the source text when known.
fn cap_pieces(pieces: Vec<Piece>, params: &ChunkingParams) -> Vec<Piece> {
    let limit = params.max_tokens.saturating_mul(paragraph::CHARS_PER_TOKEN).max(1);
    pieces
        .into_iter()
        .flat_map(|piece| {
            if char_len(&piece.text) <= limit {
                return vec![piece];
            }
            window::sliding(&piece.text, limit, 0, false)
                .into_iter()
                .map(|w| Piece { text: w.text, position: piece.position.map(|p| p + w.start) })
                .collect()
        })
        .collect()
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|s| s.name()).collect();
                Error::validation(format!("unknown chunking strategy '{s}' (known: {})", known.join(", ")))
            })
    }
}
