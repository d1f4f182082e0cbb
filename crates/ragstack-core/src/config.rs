//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `RAGSTACK_*` env vars (`__` separates nested keys). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base
//! directory.

use std::env;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ChunkingParams;

pub const ENV_PREFIX: &str = "RAGSTACK_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Lance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub uri: String,
    pub base_collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            uri: "data/lancedb".to_string(),
            base_collection: "rag_documents".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    Hash,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            model: "hash-embedder".to_string(),
            dimension: 384,
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: String,
    pub params: ChunkingParams,
    /// Where the registry persists its active strategy and params.
    pub state_file: Option<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { strategy: "adaptive".to_string(), params: ChunkingParams::default(), state_file: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub retrieve_k: usize,
    pub rerank_k: usize,
    pub max_context_chars: usize,
    pub ask_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { retrieve_k: 20, rerank_k: 5, max_context_chars: 12_000, ask_timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerKind {
    Identity,
    Simple,
    Bm25,
    Hybrid,
    External,
}

/// Blend weights for the hybrid reranker. They are normalised to sum to one
/// before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub semantic: f32,
    pub bm25: f32,
    pub simple: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self { semantic: 0.5, bm25: 0.3, simple: 0.2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub kind: RerankerKind,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub hybrid_weights: HybridWeights,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            kind: RerankerKind::Simple,
            endpoint: "https://api.cohere.com/v2/rerank".to_string(),
            model: "rerank-multilingual-v3.0".to_string(),
            api_key: None,
            timeout_secs: 15,
            hybrid_weights: HybridWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub reranker: RerankerConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

pub struct Config {
    figment: Figment,
    app: AppConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = Self::from_figment(figment)?;
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let app: AppConfig = figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let config = Self { figment, app };
        config.validate()?;
        Ok(config)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    fn validate(&self) -> Result<()> {
        let app = &self.app;
        if app.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if app.embedding.model.trim().is_empty() {
            return Err(Error::InvalidConfig("embedding.model must not be empty".into()));
        }
        if app.embedding.provider == EmbeddingProvider::Http && app.embedding.endpoint.is_none() {
            return Err(Error::InvalidConfig("embedding.endpoint is required for the http provider".into()));
        }
        if app.storage.base_collection.trim().is_empty() {
            return Err(Error::InvalidConfig("storage.base_collection must not be empty".into()));
        }
        if app.retrieval.retrieve_k == 0 || app.retrieval.rerank_k == 0 {
            return Err(Error::InvalidConfig("retrieval.retrieve_k and rerank_k must be positive".into()));
        }
        let w = app.reranker.hybrid_weights;
        let weights = [w.semantic, w.bm25, w.simple];
        if weights.iter().any(|x| !x.is_finite() || *x < 0.0) || weights.iter().sum::<f32>() <= 0.0 {
            return Err(Error::InvalidConfig("reranker.hybrid_weights must be non-negative and not all zero".into()));
        }
        app.chunking
            .params
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("chunking.params: {e}")))
    }

    fn validate_for_env(&self, env: &str) -> Result<()> {
        if matches!(env, "prod" | "production") && self.app.storage.backend == StorageBackend::Memory {
            tracing::warn!("memory storage backend in production: data will not survive a restart");
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
