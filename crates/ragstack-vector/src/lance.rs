//! LanceDB-backed store. Each namespace is one table named by its id; a
//! `{base}_meta` table records the exact model name and creation time of
//! every namespace this store has opened, plus the id of the active one.

use std::sync::{Arc, PoisonError, RwLock};

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ragstack_core::traits::VectorStore;
use ragstack_core::types::{Chunk, Meta, Namespace, NamespaceInfo, Retrieved};
use ragstack_core::{Error, Result};

use crate::namespace::NamespaceManager;
use crate::schema::{build_chunk_schema, vector_dimension};
use crate::table::{ensure_table, get_meta, list_meta, open_db, set_meta, string_column, table_names};
use crate::{check_batch, check_query};

#[derive(Debug, Serialize, Deserialize)]
struct NamespaceRecord {
    model_name: String,
    dimension: usize,
    created_at: DateTime<Utc>,
}

pub struct LanceStore {
    conn: Connection,
    manager: NamespaceManager,
    meta_table: String,
    active: RwLock<Arc<Namespace>>,
    switch_lock: Mutex<()>,
    // Held from the duplicate-id check until the commit lands.
    write_lock: Mutex<()>,
}

const ACTIVE_KEY: &str = "active";

fn dimension_i32(dimension: usize) -> Result<i32> {
    i32::try_from(dimension).map_err(|_| Error::validation(format!("dimension {dimension} is too large")))
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl LanceStore {
    /// Connect to `uri`. The namespace recorded by the last `switch_active`
    /// becomes active again; without one, (model, dimension) is used.
    pub async fn open(uri: &str, manager: NamespaceManager, model_name: &str, dimension: usize) -> Result<Self> {
        let conn = open_db(uri).await?;
        let meta_table = format!("{}_meta", manager.base());
        let namespace = match restore_active(&conn, &manager, &meta_table).await? {
            Some(restored) => {
                info!(uri, namespace = %restored.id, "restored active namespace");
                restored
            }
            None => prepare_namespace(&conn, &manager, &meta_table, model_name, dimension).await?,
        };
        info!(uri, namespace = %namespace.id, "lancedb store opened");
        Ok(Self {
            conn,
            manager,
            meta_table,
            active: RwLock::new(Arc::new(namespace)),
            switch_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
        })
    }

    async fn open_table(&self, ns: &Namespace) -> Result<Table> {
        self.conn
            .open_table(&ns.id)
            .execute()
            .await
            .map_err(|e| Error::storage(format!("opening namespace {}", ns.id), e))
    }

    async fn count_matching(table: &Table, filter: Option<String>) -> Result<usize> {
        table.count_rows(filter).await.map_err(|e| Error::storage("counting rows", e))
    }
}

/// Resolve the namespace, creating its table and meta record when missing.
/// An existing table must declare the same vector width.
async fn prepare_namespace(
    conn: &Connection,
    manager: &NamespaceManager,
    meta_table: &str,
    model_name: &str,
    dimension: usize,
) -> Result<Namespace> {
    let mut namespace = manager.resolve(model_name, dimension)?;
    let created = ensure_table(conn, &namespace.id, build_chunk_schema(dimension_i32(dimension)?)).await?;
    if !created {
        let table = conn
            .open_table(&namespace.id)
            .execute()
            .await
            .map_err(|e| Error::storage(format!("opening namespace {}", namespace.id), e))?;
        let schema = table.schema().await.map_err(|e| Error::storage("reading schema", e))?;
        if vector_dimension(&schema) != Some(dimension) {
            return Err(Error::validation(format!(
                "table {} does not hold {dimension}-dimensional vectors",
                namespace.id
            )));
        }
    }
    match get_meta(conn, meta_table, &namespace.id).await? {
        Some(raw) => match serde_json::from_str::<NamespaceRecord>(&raw) {
            Ok(record) => namespace.created_at = record.created_at,
            Err(e) => warn!(namespace = %namespace.id, error = %e, "unreadable namespace record"),
        },
        None => {
            let record = NamespaceRecord {
                model_name: namespace.model_name.clone(),
                dimension,
                created_at: namespace.created_at,
            };
            let raw = serde_json::to_string(&record).map_err(|e| Error::storage("encoding namespace record", e))?;
            set_meta(conn, meta_table, &namespace.id, &raw).await?;
            info!(namespace = %namespace.id, model = model_name, dim = dimension, "namespace created");
        }
    }
    Ok(namespace)
}

/// The namespace stored under the active key, provided its record is readable
/// and the id still derives from it.
async fn restore_active(conn: &Connection, manager: &NamespaceManager, meta_table: &str) -> Result<Option<Namespace>> {
    let Some(id) = get_meta(conn, meta_table, ACTIVE_KEY).await? else {
        return Ok(None);
    };
    let record = match get_meta(conn, meta_table, &id).await? {
        Some(raw) => serde_json::from_str::<NamespaceRecord>(&raw).ok(),
        None => None,
    };
    let Some(record) = record else {
        warn!(namespace = %id, "active namespace has no record, using configured model");
        return Ok(None);
    };
    if manager.resolve(&record.model_name, record.dimension)?.id != id {
        warn!(namespace = %id, "active namespace belongs to another collection, using configured model");
        return Ok(None);
    }
    prepare_namespace(conn, manager, meta_table, &record.model_name, record.dimension)
        .await
        .map(Some)
}

fn chunks_to_batch(ns: &Namespace, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
    let dim = dimension_i32(ns.dimension)?;
    let mut ordinals = Vec::with_capacity(chunks.len());
    let mut metadata = Vec::with_capacity(chunks.len());
    for c in chunks {
        ordinals.push(i32::try_from(c.ordinal).map_err(|_| Error::validation(format!("ordinal of {} too large", c.id)))?);
        metadata.push(serde_json::to_string(&c.metadata).map_err(|e| Error::storage("encoding metadata", e))?);
    }
    let vectors = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
    RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.doc_id.as_str()))),
            Arc::new(Int32Array::from(ordinals)),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
            Arc::new(StringArray::from(metadata)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
        ],
    )
    .map_err(|e| Error::storage("building record batch", e))
}

fn batch_to_retrieved(batch: &RecordBatch) -> Result<Vec<Retrieved>> {
    let ids = string_column(batch, "id")?;
    let doc_ids = string_column(batch, "doc_id")?;
    let texts = string_column(batch, "text")?;
    let metadata = string_column(batch, "metadata")?;
    let ordinals = batch
        .column_by_name("ordinal")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| Error::storage("decoding results", "ordinal column missing"))?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let meta: Meta = serde_json::from_str(metadata.value(i)).map_err(|e| Error::storage("decoding metadata", e))?;
        let score = match distances {
            Some(d) if !d.is_null(i) => 1.0 - d.value(i),
            _ => 0.0,
        };
        out.push(Retrieved {
            chunk: Chunk {
                id: ids.value(i).to_string(),
                doc_id: doc_ids.value(i).to_string(),
                ordinal: usize::try_from(ordinals.value(i)).unwrap_or_default(),
                text: texts.value(i).to_string(),
                metadata: meta,
            },
            score,
        });
    }
    Ok(out)
}

#[async_trait]
impl VectorStore for LanceStore {
    fn active(&self) -> Namespace {
        self.active.read().unwrap_or_else(PoisonError::into_inner).as_ref().clone()
    }

    async fn add_in(&self, ns: &Namespace, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        check_batch(ns, chunks, vectors)?;
        if chunks.is_empty() {
            return Ok(0);
        }
        let _writing = self.write_lock.lock().await;
        let table = self.open_table(ns).await?;
        let ids: Vec<String> = chunks.iter().map(|c| quote(&c.id)).collect();
        let existing = Self::count_matching(&table, Some(format!("id IN ({})", ids.join(", ")))).await?;
        if existing > 0 {
            return Err(Error::validation(format!("{existing} chunk id(s) already stored in {}", ns.id)));
        }
        let batch = chunks_to_batch(ns, chunks, vectors)?;
        let schema = batch.schema();
        // One batch is one commit, so a failed add leaves nothing behind.
        table
            .add(Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema)))
            .execute()
            .await
            .map_err(|e| Error::storage(format!("adding to {}", ns.id), e))?;
        debug!(namespace = %ns.id, added = chunks.len(), "lancedb add");
        Ok(chunks.len())
    }

    async fn count_in(&self, ns: &Namespace) -> Result<usize> {
        let table = self.open_table(ns).await?;
        Self::count_matching(&table, None).await
    }

    async fn clear_in(&self, ns: &Namespace) -> Result<()> {
        let schema = build_chunk_schema(dimension_i32(ns.dimension)?);
        if ensure_table(&self.conn, &ns.id, schema).await? {
            return Ok(());
        }
        let table = self.open_table(ns).await?;
        table
            .delete("id IS NOT NULL")
            .await
            .map_err(|e| Error::storage(format!("clearing {}", ns.id), e))?;
        info!(namespace = %ns.id, "lancedb namespace cleared");
        Ok(())
    }

    async fn search_in(&self, ns: &Namespace, query: &[f32], k: usize) -> Result<Vec<Retrieved>> {
        check_query(ns, query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let table = self.open_table(ns).await?;
        let mut stream = table
            .vector_search(query.to_vec())
            .map_err(|e| Error::storage("building vector query", e))?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| Error::storage("running vector query", e))?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| Error::storage("reading vector results", e))? {
            hits.extend(batch_to_retrieved(&batch)?);
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete_document_in(&self, ns: &Namespace, doc_id: &str) -> Result<usize> {
        let table = self.open_table(ns).await?;
        let filter = format!("doc_id = {}", quote(doc_id));
        let matching = Self::count_matching(&table, Some(filter.clone())).await?;
        if matching > 0 {
            table
                .delete(&filter)
                .await
                .map_err(|e| Error::storage(format!("deleting {doc_id} from {}", ns.id), e))?;
        }
        Ok(matching)
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let active = self.active().id;
        let records = list_meta(&self.conn, &self.meta_table).await?;
        let mut out = Vec::new();
        for name in table_names(&self.conn).await? {
            if name == self.meta_table {
                continue;
            }
            let recorded = records.get(&name).and_then(|raw| serde_json::from_str::<NamespaceRecord>(raw).ok());
            let (model_name, dimension) = match (recorded, self.manager.parse(&name)) {
                (Some(r), _) => (r.model_name, Some(r.dimension)),
                (None, Some(parsed)) => (parsed.model_name, Some(parsed.dimension)),
                (None, None) => continue,
            };
            let table = self.conn.open_table(&name).execute().await.map_err(|e| Error::storage(format!("opening {name}"), e))?;
            let count = Self::count_matching(&table, None).await?;
            out.push(NamespaceInfo { active: name == active, id: name, model_name, dimension, count });
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn switch_active(&self, model_name: &str, dimension: usize) -> Result<Namespace> {
        let _switching = self.switch_lock.lock().await;
        let namespace = prepare_namespace(&self.conn, &self.manager, &self.meta_table, model_name, dimension).await?;
        set_meta(&self.conn, &self.meta_table, ACTIVE_KEY, &namespace.id).await?;
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(namespace.clone());
        info!(namespace = %namespace.id, model = model_name, dim = dimension, "active namespace switched");
        Ok(namespace)
    }
}
