//! The orchestrator tying chunking, embedding, storage and reranking
//! together.
//!
//! The embedder and the namespace it populates are held together in one
//! binding that is swapped atomically, so an ingest or ask call always embeds
//! with the model that owns the namespace it reads or writes.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ragstack_chunk::{ChunkingSnapshot, ChunkingStrategy, StrategyInfo, StrategyRegistry};
use ragstack_core::config::{AppConfig, StorageBackend};
use ragstack_core::traits::{Embedder, EmbedderFactory, Generator, Reranker, VectorStore};
use ragstack_core::types::{
    Answer, AskResult, ChunkingParams, Document, DocumentFailure, IngestReport, Namespace, NamespaceInfo,
    NamespaceStats, ParamsUpdate,
};
use ragstack_core::{Error, Result};
use ragstack_embed::DefaultEmbedderFactory;
use ragstack_rerank::build_reranker;
use ragstack_vector::{LanceStore, MemoryStore, NamespaceManager};

use crate::context::{compress_context, dedup_best, RetrievalPolicy};
use crate::generate::HttpGenerator;

struct Binding {
    embedder: Arc<dyn Embedder>,
    namespace: Namespace,
}

pub struct Pipeline {
    registry: Arc<StrategyRegistry>,
    store: Arc<dyn VectorStore>,
    factory: Arc<dyn EmbedderFactory>,
    reranker: Arc<dyn Reranker>,
    generator: Option<Arc<dyn Generator>>,
    policy: RetrievalPolicy,
    binding: RwLock<Arc<Binding>>,
    switch_lock: Mutex<()>,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl Pipeline {
    /// Bind `embedder` to the store's active namespace. Their dimensions must
    /// agree.
    pub fn new(
        registry: Arc<StrategyRegistry>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        factory: Arc<dyn EmbedderFactory>,
        reranker: Arc<dyn Reranker>,
        policy: RetrievalPolicy,
    ) -> Result<Self> {
        let namespace = store.active();
        if embedder.dim() != namespace.dimension {
            return Err(Error::validation(format!(
                "embedder {} produces {} dims, namespace {} holds {}",
                embedder.model_name(),
                embedder.dim(),
                namespace.id,
                namespace.dimension
            )));
        }
        Ok(Self {
            registry,
            store,
            factory,
            reranker,
            generator: None,
            policy,
            binding: RwLock::new(Arc::new(Binding { embedder, namespace })),
            switch_lock: Mutex::new(()),
        })
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Assemble every collaborator from configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = Arc::new(StrategyRegistry::from_config(&config.chunking)?);
        let factory = Arc::new(DefaultEmbedderFactory::new(config.embedding.clone()));
        let (model, dimension) = (config.embedding.model.as_str(), config.embedding.dimension);
        let manager = NamespaceManager::new(config.storage.base_collection.clone())?;
        let store: Arc<dyn VectorStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new(manager, model, dimension)?),
            StorageBackend::Lance => {
                let uri = ragstack_core::config::expand_path(&config.storage.uri);
                Arc::new(LanceStore::open(&uri.to_string_lossy(), manager, model, dimension).await?)
            }
        };
        // A persisted switch may leave another namespace active than configured.
        let active = store.active();
        let embedder = factory.create(&active.model_name, active.dimension)?;
        let reranker = build_reranker(&config.reranker);
        let policy = RetrievalPolicy::from_config(&config.retrieval);
        let mut pipeline = Self::new(registry, store, embedder, factory, reranker, policy)?;
        if let Some(generator) = HttpGenerator::from_config(&config.generation, policy.ask_timeout)? {
            pipeline = pipeline.with_generator(Arc::new(generator));
        }
        Ok(pipeline)
    }

    fn binding(&self) -> Arc<Binding> {
        Arc::clone(&self.binding.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn namespace(&self) -> Namespace {
        self.binding().namespace.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.binding().embedder)
    }

    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }

    /// Chunk, embed and store each document with the configuration active
    /// when the call started. Failures are reported per document.
    pub async fn ingest(&self, documents: &[Document]) -> IngestReport {
        self.ingest_until(documents, None).await
    }

    /// Like `ingest`, but documents not finished by `timeout` are reported as
    /// failed. Documents already stored stay stored.
    pub async fn ingest_with_timeout(&self, documents: &[Document], timeout: Duration) -> IngestReport {
        self.ingest_until(documents, Some(timeout)).await
    }

    async fn ingest_until(&self, documents: &[Document], timeout: Option<Duration>) -> IngestReport {
        let deadline = timeout.map(|t| (tokio::time::Instant::now() + t, t));
        let snapshot = self.registry.snapshot();
        let binding = self.binding();
        let mut report = IngestReport { document_count: documents.len(), ..Default::default() };

        for (i, document) in documents.iter().enumerate() {
            let outcome = match deadline {
                Some((at, timeout)) => match tokio::time::timeout_at(at, self.ingest_document(&snapshot, &binding, document)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(remaining = documents.len() - i, "ingest deadline passed");
                        for skipped in &documents[i..] {
                            report.failures.push(DocumentFailure {
                                doc_id: skipped.id.clone(),
                                error: Error::Timeout(timeout).to_string(),
                            });
                        }
                        break;
                    }
                },
                None => self.ingest_document(&snapshot, &binding, document).await,
            };
            match outcome {
                Ok(added) => report.ingested_chunks += added,
                Err(e) => {
                    warn!(doc_id = %document.id, error = %e, "document ingest failed");
                    report.failures.push(DocumentFailure { doc_id: document.id.clone(), error: e.to_string() });
                }
            }
        }

        info!(
            namespace = %binding.namespace.id,
            strategy = %snapshot.strategy,
            documents = report.document_count,
            chunks = report.ingested_chunks,
            failed = report.failures.len(),
            "ingest finished"
        );
        report
    }

    /// One document is one store batch: it is stored completely or not at
    /// all.
    async fn ingest_document(&self, snapshot: &ChunkingSnapshot, binding: &Binding, document: &Document) -> Result<usize> {
        let chunks = snapshot.chunk(document);
        if chunks.is_empty() {
            debug!(doc_id = %document.id, "document produced no chunks");
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = binding.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::external(
                "embedding",
                format!("{} vectors returned for {} chunks", vectors.len(), chunks.len()),
            ));
        }
        self.store.add_in(&binding.namespace, &chunks, &vectors).await
    }

    /// Embed the question, retrieve `k` (or the policy default) nearest
    /// chunks and rerank them.
    pub async fn ask(&self, question: &str, k: Option<usize>) -> Result<AskResult> {
        let timeout = self.policy.ask_timeout;
        tokio::time::timeout(timeout, self.retrieve(question, k))
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn retrieve(&self, question: &str, k: Option<usize>) -> Result<AskResult> {
        let start = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        let k = k.unwrap_or(self.policy.retrieve_k);
        if k == 0 {
            return Err(Error::validation("k must be positive"));
        }
        let binding = self.binding();
        let query = binding
            .embedder
            .embed_batch(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::external("embedding", "no vector returned for the question"))?;
        let hits = dedup_best(self.store.search_in(&binding.namespace, &query, k).await?);
        let candidates = hits.len();
        let retrieved = self.reranker.rerank(question, hits).await;
        let latency_ms = elapsed_ms(start);
        debug!(
            namespace = %binding.namespace.id,
            candidates,
            reranker = self.reranker.name(),
            latency_ms,
            "ask finished"
        );
        Ok(AskResult {
            context_ids: retrieved.iter().map(|r| r.chunk.id.clone()).collect(),
            retrieved,
            latency_ms,
            namespace: binding.namespace.id.clone(),
        })
    }

    /// Retrieve, keep the top `rerank_k`, compress them into a context and
    /// hand it to the generator. One `ask_timeout` deadline covers it all.
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let generator = self.generator.clone().ok_or_else(|| Error::unavailable("no generator configured"))?;
        let start = Instant::now();
        let timeout = self.policy.ask_timeout;
        let (text, retrieved) = tokio::time::timeout(timeout, async {
            let mut asked = self.retrieve(question, k).await?;
            asked.retrieved.truncate(self.policy.rerank_k);
            let context = compress_context(&asked.retrieved, self.policy.max_context_chars);
            let text = generator.generate(question.trim(), &context).await.map_err(|e| match e {
                Error::ExternalService { .. } | Error::Timeout(_) => e,
                other => Error::external("generation", other),
            })?;
            Ok::<_, Error>((text, asked.retrieved))
        })
        .await
        .map_err(|_| Error::Timeout(timeout))??;
        Ok(Answer {
            text,
            context_ids: retrieved.iter().map(|r| r.chunk.id.clone()).collect(),
            latency_ms: elapsed_ms(start),
        })
    }

    /// Move to the namespace of (model, dimension). The new embedder is built
    /// and the store switched before the binding changes; on any error the
    /// pipeline keeps its current model and namespace.
    pub async fn switch_namespace(&self, model_name: &str, dimension: usize) -> Result<Namespace> {
        let _switching = self.switch_lock.lock().await;
        let embedder = self.factory.create(model_name, dimension)?;
        if embedder.dim() != dimension {
            return Err(Error::validation(format!(
                "embedder for {model_name} produces {} dims, requested {dimension}",
                embedder.dim()
            )));
        }
        let namespace = self.store.switch_active(model_name, dimension).await?;
        *self.binding.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(Binding { embedder, namespace: namespace.clone() });
        info!(namespace = %namespace.id, model = model_name, dim = dimension, "pipeline switched namespace");
        Ok(namespace)
    }

    pub fn list_strategies(&self) -> Vec<StrategyInfo> {
        self.registry.list_strategies()
    }

    pub fn active_strategy(&self) -> ChunkingStrategy {
        self.registry.active_strategy()
    }

    pub fn set_strategy(&self, name: &str) -> Result<ChunkingStrategy> {
        self.registry.set_strategy(name)
    }

    pub fn params(&self) -> ChunkingParams {
        self.registry.params()
    }

    pub fn set_params(&self, update: &ParamsUpdate) -> Result<ChunkingParams> {
        self.registry.set_params(update)
    }

    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        self.store.list_namespaces().await
    }

    pub async fn clear(&self) -> Result<()> {
        let binding = self.binding();
        self.store.clear_in(&binding.namespace).await
    }

    pub async fn stats(&self) -> Result<NamespaceStats> {
        let binding = self.binding();
        let count = self.store.count_in(&binding.namespace).await?;
        Ok(NamespaceStats {
            id: binding.namespace.id.clone(),
            model_name: binding.namespace.model_name.clone(),
            dimension: binding.namespace.dimension,
            count,
        })
    }

    pub async fn delete_document(&self, doc_id: &str) -> Result<usize> {
        let binding = self.binding();
        self.store.delete_document_in(&binding.namespace, doc_id).await
    }
}
