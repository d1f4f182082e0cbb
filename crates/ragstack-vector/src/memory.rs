//! In-process store. Contents live only as long as the process.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock as AsyncRwLock};
use tracing::{debug, info};

use ragstack_core::traits::VectorStore;
use ragstack_core::types::{Chunk, Namespace, NamespaceInfo, Retrieved};
use ragstack_core::{Error, Result};

use crate::namespace::NamespaceManager;
use crate::{check_batch, check_query, cosine_similarity};

struct Partition {
    namespace: Namespace,
    ids: HashSet<String>,
    rows: Vec<(Chunk, Vec<f32>)>,
}

impl Partition {
    fn new(namespace: Namespace) -> Self {
        Self { namespace, ids: HashSet::new(), rows: Vec::new() }
    }
}

pub struct MemoryStore {
    manager: NamespaceManager,
    partitions: AsyncRwLock<HashMap<String, Partition>>,
    active: RwLock<Arc<Namespace>>,
    switch_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new(manager: NamespaceManager, model_name: &str, dimension: usize) -> Result<Self> {
        let namespace = manager.resolve(model_name, dimension)?;
        let mut partitions = HashMap::new();
        partitions.insert(namespace.id.clone(), Partition::new(namespace.clone()));
        Ok(Self {
            manager,
            partitions: AsyncRwLock::new(partitions),
            active: RwLock::new(Arc::new(namespace)),
            switch_lock: Mutex::new(()),
        })
    }

    fn active_id(&self) -> String {
        self.active.read().unwrap_or_else(PoisonError::into_inner).id.clone()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn active(&self) -> Namespace {
        self.active.read().unwrap_or_else(PoisonError::into_inner).as_ref().clone()
    }

    async fn add_in(&self, ns: &Namespace, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        check_batch(ns, chunks, vectors)?;
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .get_mut(&ns.id)
            .ok_or_else(|| Error::NotFound(format!("namespace {}", ns.id)))?;
        if partition.namespace.dimension != ns.dimension {
            return Err(Error::validation(format!("namespace {} has dimension {}", ns.id, partition.namespace.dimension)));
        }
        if let Some(dup) = chunks.iter().find(|c| partition.ids.contains(&c.id)) {
            return Err(Error::validation(format!("chunk id {} already stored in {}", dup.id, ns.id)));
        }
        for (chunk, vector) in chunks.iter().zip(vectors) {
            partition.ids.insert(chunk.id.clone());
            partition.rows.push((chunk.clone(), vector.clone()));
        }
        debug!(namespace = %ns.id, added = chunks.len(), total = partition.rows.len(), "memory add");
        Ok(chunks.len())
    }

    async fn count_in(&self, ns: &Namespace) -> Result<usize> {
        let partitions = self.partitions.read().await;
        partitions
            .get(&ns.id)
            .map(|p| p.rows.len())
            .ok_or_else(|| Error::NotFound(format!("namespace {}", ns.id)))
    }

    async fn clear_in(&self, ns: &Namespace) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        if let Some(partition) = partitions.get_mut(&ns.id) {
            partition.rows.clear();
            partition.ids.clear();
        }
        info!(namespace = %ns.id, "memory namespace cleared");
        Ok(())
    }

    async fn search_in(&self, ns: &Namespace, query: &[f32], k: usize) -> Result<Vec<Retrieved>> {
        check_query(ns, query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let partitions = self.partitions.read().await;
        let partition = partitions
            .get(&ns.id)
            .ok_or_else(|| Error::NotFound(format!("namespace {}", ns.id)))?;
        let mut scored: Vec<(usize, f32)> =
            partition.rows.iter().enumerate().map(|(i, (_, v))| (i, cosine_similarity(query, v))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(i, score)| Retrieved { chunk: partition.rows[i].0.clone(), score })
            .collect())
    }

    async fn delete_document_in(&self, ns: &Namespace, doc_id: &str) -> Result<usize> {
        let mut partitions = self.partitions.write().await;
        let Some(partition) = partitions.get_mut(&ns.id) else { return Ok(0) };
        let before = partition.rows.len();
        partition.rows.retain(|(c, _)| c.doc_id != doc_id);
        partition.ids = partition.rows.iter().map(|(c, _)| c.id.clone()).collect();
        Ok(before - partition.rows.len())
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let active = self.active_id();
        let partitions = self.partitions.read().await;
        let mut out: Vec<NamespaceInfo> = partitions
            .values()
            .map(|p| NamespaceInfo {
                id: p.namespace.id.clone(),
                model_name: p.namespace.model_name.clone(),
                dimension: Some(p.namespace.dimension),
                count: p.rows.len(),
                active: p.namespace.id == active,
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn switch_active(&self, model_name: &str, dimension: usize) -> Result<Namespace> {
        let target = self.manager.resolve(model_name, dimension)?;
        let _switching = self.switch_lock.lock().await;
        let namespace = {
            let mut partitions = self.partitions.write().await;
            partitions
                .entry(target.id.clone())
                .or_insert_with(|| Partition::new(target))
                .namespace
                .clone()
        };
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(namespace.clone());
        info!(namespace = %namespace.id, model = %namespace.model_name, dim = namespace.dimension, "active namespace switched");
        Ok(namespace)
    }
}
