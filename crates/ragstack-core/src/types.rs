//! Domain types shared by the chunking, storage and retrieval crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type ChunkId = String;
/// Chunk metadata. Ordered so serialisation is deterministic.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// A source document handed to ingestion. Never mutated once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self { title: id.clone(), source: String::new(), id, text: text.into() }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// A contiguous span of one document, the unit of retrieval.
///
/// - `id`: unique within a namespace (`{doc_id}:{ordinal}`)
/// - `doc_id`: back-reference to the source `Document`
/// - `ordinal`: position within the document, contiguous from 0
/// - `text`: never empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub ordinal: usize,
    pub text: String,
    #[serde(default)]
    pub metadata: Meta,
}

/// Options understood by every chunking strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingParams {
    #[serde(alias = "maxTokens")]
    pub max_tokens: usize,
    #[serde(alias = "windowSize")]
    pub window_size: usize,
    pub overlap: usize,
    #[serde(alias = "semanticThreshold")]
    pub semantic_threshold: f32,
    pub language: String,
    #[serde(alias = "sentenceMinLen")]
    pub sentence_min_len: usize,
    #[serde(alias = "paragraphMinLen")]
    pub paragraph_min_len: usize,
    /// Paragraph breaks needed before the adaptive strategy picks paragraphs.
    #[serde(alias = "paragraphBreakThreshold")]
    pub paragraph_break_threshold: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            window_size: 1200,
            overlap: 200,
            semantic_threshold: 0.82,
            language: "ko".to_string(),
            sentence_min_len: 10,
            paragraph_min_len: 50,
            paragraph_break_threshold: 3,
        }
    }
}

impl ChunkingParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::validation("maxTokens must be at least 1"));
        }
        if self.window_size == 0 {
            return Err(Error::validation("windowSize must be at least 1"));
        }
        if self.overlap >= self.window_size {
            return Err(Error::validation(format!(
                "overlap ({}) must be smaller than windowSize ({})",
                self.overlap, self.window_size
            )));
        }
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(Error::validation(format!(
                "semanticThreshold must be within 0..=1, got {}",
                self.semantic_threshold
            )));
        }
        if self.language.trim().is_empty() {
            return Err(Error::validation("language must not be empty"));
        }
        if self.paragraph_break_threshold == 0 {
            return Err(Error::validation("paragraphBreakThreshold must be at least 1"));
        }
        Ok(())
    }

    /// Apply a partial update. The result is validated as a whole and `self`
    /// is left untouched on failure.
    pub fn merged(&self, update: &ParamsUpdate) -> Result<Self> {
        let mut next = self.clone();
        if let Some(v) = update.max_tokens {
            next.max_tokens = non_negative("maxTokens", v)?;
        }
        if let Some(v) = update.window_size {
            next.window_size = non_negative("windowSize", v)?;
        }
        if let Some(v) = update.overlap {
            next.overlap = non_negative("overlap", v)?;
        }
        if let Some(v) = update.semantic_threshold {
            if !v.is_finite() {
                return Err(Error::validation("semanticThreshold must be a finite number"));
            }
            #[allow(clippy::cast_possible_truncation)]
            {
                next.semantic_threshold = v as f32;
            }
        }
        if let Some(v) = &update.language {
            next.language = v.trim().to_string();
        }
        if let Some(v) = update.sentence_min_len {
            next.sentence_min_len = non_negative("sentenceMinLen", v)?;
        }
        if let Some(v) = update.paragraph_min_len {
            next.paragraph_min_len = non_negative("paragraphMinLen", v)?;
        }
        if let Some(v) = update.paragraph_break_threshold {
            next.paragraph_break_threshold = non_negative("paragraphBreakThreshold", v)?;
        }
        next.validate()?;
        Ok(next)
    }
}

fn non_negative(key: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::validation(format!("{key} must be non-negative, got {value}")))
}

/// Partial parameter update. Absent keys keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ParamsUpdate {
    #[serde(alias = "max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(alias = "window_size", skip_serializing_if = "Option::is_none")]
    pub window_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<i64>,
    #[serde(alias = "semantic_threshold", skip_serializing_if = "Option::is_none")]
    pub semantic_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(alias = "sentence_min_len", skip_serializing_if = "Option::is_none")]
    pub sentence_min_len: Option<i64>,
    #[serde(alias = "paragraph_min_len", skip_serializing_if = "Option::is_none")]
    pub paragraph_min_len: Option<i64>,
    #[serde(alias = "paragraph_break_threshold", skip_serializing_if = "Option::is_none")]
    pub paragraph_break_threshold: Option<i64>,
}

impl ParamsUpdate {
    /// Parse an update from a JSON object. Unknown keys are rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::validation(format!("malformed parameters: {e}")))
    }
}

/// An isolated storage partition for one (model, dimension) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub model_name: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
}

/// A namespace as seen by discovery. `model_name` falls back to the
/// sanitised form when the original name cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub id: String,
    pub model_name: String,
    pub dimension: Option<usize>,
    pub count: usize,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub id: String,
    pub model_name: String,
    pub dimension: usize,
    pub count: usize,
}

/// A retrieval candidate. Higher `score` is better. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieved {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub doc_id: String,
    pub error: String,
}

/// Outcome of one ingest call. Failed documents contribute no chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_count: usize,
    pub ingested_chunks: usize,
    pub failures: Vec<DocumentFailure>,
}

impl IngestReport {
    pub fn succeeded(&self) -> usize {
        self.document_count - self.failures.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResult {
    pub context_ids: Vec<ChunkId>,
    pub retrieved: Vec<Retrieved>,
    pub latency_ms: u64,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub context_ids: Vec<ChunkId>,
    pub latency_ms: u64,
}
