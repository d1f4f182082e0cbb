//! Namespace ids for (embedding model, dimension) pairs.
//!
//! Layout: `{base}_{sanitized model}_{dimension}_{hash8}`. The hash covers the
//! unsanitised model name and the dimension, so two pairs that sanitise to the
//! same text still get distinct ids. Ids are pure functions of their inputs
//! and therefore stable across restarts.

use chrono::Utc;

use ragstack_core::types::Namespace;
use ragstack_core::{Error, Result};

pub const DEFAULT_BASE: &str = "rag_documents";
pub const MAX_MODEL_CHARS: usize = 30;
const HASH_CHARS: usize = 8;
const SEPARATORS: [char; 4] = ['-', '_', '/', '.'];
// Bounds the candidate search when recovering a model name.
const MAX_RECOVERABLE_SEPARATORS: usize = 6;

/// Lower-case, map path and word separators to `_`, drop anything else that
/// is not ASCII alphanumeric, cap at `MAX_MODEL_CHARS`.
pub fn sanitize_model(model_name: &str) -> String {
    let mut out: String = model_name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '/' | '\\' | '-' | '.' | ':' | ' ' | '_' => Some('_'),
            _ => None,
        })
        .take(MAX_MODEL_CHARS)
        .collect();
    if out.is_empty() {
        out.push_str("model");
    }
    out
}

fn signature_hash(model_name: &str, dimension: usize) -> String {
    let digest = blake3::hash(format!("{}|{dimension}", model_name.trim()).as_bytes());
    digest.to_hex()[..HASH_CHARS].to_string()
}

/// What can be read back out of a namespace id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNamespace {
    pub sanitized: String,
    pub dimension: usize,
    /// The exact model name when it could be verified against the hash,
    /// otherwise the sanitised form.
    pub model_name: String,
}

#[derive(Debug, Clone)]
pub struct NamespaceManager {
    base: String,
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self { base: DEFAULT_BASE.to_string() }
    }
}

impl NamespaceManager {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let base = base.into();
        if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::validation(format!("invalid collection base name '{base}'")));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn derive_id(&self, model_name: &str, dimension: usize) -> Result<String> {
        if model_name.trim().is_empty() {
            return Err(Error::validation("model name must not be empty"));
        }
        if dimension == 0 {
            return Err(Error::validation("dimension must be positive"));
        }
        Ok(format!(
            "{}_{}_{}_{}",
            self.base,
            sanitize_model(model_name),
            dimension,
            signature_hash(model_name, dimension)
        ))
    }

    /// A fresh namespace descriptor. Stores keep the first `created_at` they
    /// recorded for an id.
    pub fn resolve(&self, model_name: &str, dimension: usize) -> Result<Namespace> {
        Ok(Namespace {
            id: self.derive_id(model_name, dimension)?,
            model_name: model_name.trim().to_string(),
            dimension,
            created_at: Utc::now(),
        })
    }

    /// Reverse an id produced by this manager. Returns `None` for names that
    /// do not follow the layout or belong to another base.
    pub fn parse(&self, id: &str) -> Option<ParsedNamespace> {
        let rest = id.strip_prefix(&self.base)?.strip_prefix('_')?;
        let (rest, hash) = rest.rsplit_once('_')?;
        if hash.len() != HASH_CHARS || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let (sanitized, dim) = rest.rsplit_once('_')?;
        let dimension: usize = dim.parse().ok()?;
        if sanitized.is_empty() {
            return None;
        }
        let model_name = recover_model(sanitized, dimension, hash).unwrap_or_else(|| sanitized.to_string());
        Some(ParsedNamespace { sanitized: sanitized.to_string(), dimension, model_name })
    }
}

/// Try every separator choice for each `_` and keep the candidate whose hash
/// matches. Case and dropped characters cannot be recovered, so this only
/// succeeds for lower-case names that were not truncated.
fn recover_model(sanitized: &str, dimension: usize, hash: &str) -> Option<String> {
    let slots: Vec<usize> = sanitized.match_indices('_').map(|(i, _)| i).collect();
    if slots.len() > MAX_RECOVERABLE_SEPARATORS {
        return None;
    }
    let mut bytes = sanitized.as_bytes().to_vec();
    let combos = SEPARATORS.len().pow(u32::try_from(slots.len()).ok()?);
    for combo in 0..combos {
        let mut n = combo;
        for &slot in &slots {
            bytes[slot] = SEPARATORS[n % SEPARATORS.len()] as u8;
            n /= SEPARATORS.len();
        }
        let candidate = std::str::from_utf8(&bytes).ok()?;
        if signature_hash(candidate, dimension) == hash {
            return Some(candidate.to_string());
        }
    }
    None
}
