//! The registry holding the active chunking strategy and its parameters.
//!
//! Strategy and params live together in one immutable snapshot that is
//! swapped under a lock, so readers never see a strategy paired with another
//! strategy's params. The lock guards the swap only; chunking and persistence
//! run on a cloned snapshot outside it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ragstack_core::config::{expand_path, ChunkingConfig};
use ragstack_core::types::{Chunk, ChunkingParams, Document, ParamsUpdate};
use ragstack_core::Result;

use crate::strategy::ChunkingStrategy;

/// An explicit chunking configuration that can be carried per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingSnapshot {
    pub strategy: ChunkingStrategy,
    pub params: ChunkingParams,
}

impl ChunkingSnapshot {
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.strategy.chunk(document, &self.params)
    }
}

impl Default for ChunkingSnapshot {
    fn default() -> Self {
        Self { strategy: ChunkingStrategy::Adaptive, params: ChunkingParams::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    pub active: bool,
}

pub struct StrategyRegistry {
    state: RwLock<Arc<ChunkingSnapshot>>,
    state_file: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::from_snapshot(ChunkingSnapshot::default(), None)
    }

    pub fn with_state(strategy: ChunkingStrategy, params: ChunkingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::from_snapshot(ChunkingSnapshot { strategy, params }, None))
    }

    /// Build from configuration. A readable state file overrides the
    /// configured strategy and params.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        let strategy: ChunkingStrategy = config.strategy.parse()?;
        config.params.validate()?;
        let mut snapshot = ChunkingSnapshot { strategy, params: config.params.clone() };
        let state_file = config.state_file.as_deref().map(expand_path);
        if let Some(path) = &state_file {
            if let Some(saved) = load_state(path) {
                info!(path = %path.display(), strategy = %saved.strategy, "restored chunking state");
                snapshot = saved;
            }
        }
        Ok(Self::from_snapshot(snapshot, state_file))
    }

    fn from_snapshot(snapshot: ChunkingSnapshot, state_file: Option<PathBuf>) -> Self {
        Self { state: RwLock::new(Arc::new(snapshot)), state_file, persist_lock: Mutex::new(()) }
    }

    pub fn snapshot(&self) -> Arc<ChunkingSnapshot> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn list_strategies(&self) -> Vec<StrategyInfo> {
        let active = self.snapshot().strategy;
        ChunkingStrategy::ALL
            .into_iter()
            .map(|s| StrategyInfo { name: s.name().to_string(), description: s.description().to_string(), active: s == active })
            .collect()
    }

    pub fn active_strategy(&self) -> ChunkingStrategy {
        self.snapshot().strategy
    }

    pub fn set_strategy(&self, name: &str) -> Result<ChunkingStrategy> {
        let strategy: ChunkingStrategy = name.parse()?;
        self.replace(|current| Ok(ChunkingSnapshot { strategy, params: current.params.clone() }))?;
        info!(strategy = %strategy, "chunking strategy switched");
        Ok(strategy)
    }

    pub fn params(&self) -> ChunkingParams {
        self.snapshot().params.clone()
    }

    /// Merge a partial update into the active params. Nothing changes when
    /// the merged params are invalid.
    pub fn set_params(&self, update: &ParamsUpdate) -> Result<ChunkingParams> {
        let next = self.replace(|current| {
            let params = current.params.merged(update)?;
            Ok(ChunkingSnapshot { strategy: current.strategy, params })
        })?;
        info!(?update, "chunking params updated");
        Ok(next.params.clone())
    }

    pub fn reset(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(ChunkingSnapshot::default());
        self.persist();
        info!("chunking strategy and params reset to defaults");
    }

    /// Chunk with whatever snapshot is active at call time.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let snapshot = self.snapshot();
        let chunks = snapshot.chunk(document);
        debug!(doc_id = %document.id, strategy = %snapshot.strategy, chunks = chunks.len(), "chunked document");
        chunks
    }

    fn replace<F>(&self, build: F) -> Result<Arc<ChunkingSnapshot>>
    where
        F: FnOnce(&ChunkingSnapshot) -> Result<ChunkingSnapshot>,
    {
        let next = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(build(&guard)?);
            *guard = Arc::clone(&next);
            next
        };
        self.persist();
        Ok(next)
    }

    // Always writes the latest snapshot, so concurrent writers cannot leave
    // an older state on disk.
    fn persist(&self) {
        let Some(path) = &self.state_file else { return };
        let _guard = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.snapshot();
        if let Err(e) = save_state(path, &snapshot) {
            warn!(path = %path.display(), error = %e, "failed to persist chunking state");
        }
    }
}

fn load_state(path: &Path) -> Option<ChunkingSnapshot> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read chunking state");
            return None;
        }
    };
    match serde_json::from_str::<ChunkingSnapshot>(&raw) {
        Ok(snapshot) => match snapshot.params.validate() {
            Ok(()) => Some(snapshot),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid chunking state");
                None
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed chunking state");
            None
        }
    }
}

fn save_state(path: &Path, snapshot: &ChunkingSnapshot) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(snapshot).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)
}
