//! LanceDB connection and housekeeping helpers.
//!
//! Provides database open functions, an ensure helper for tables, and a simple
//! key/value metadata table used to record which namespaces exist.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};

use ragstack_core::{Error, Result};

use crate::schema::build_meta_schema;

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri)
        .execute()
        .await
        .map_err(|e| Error::Unavailable(format!("cannot open lancedb at {uri}: {e}")))
}

pub async fn table_names(conn: &Connection) -> Result<Vec<String>> {
    conn.table_names().execute().await.map_err(|e| Error::storage("listing tables", e))
}

/// Create an empty table with `schema` unless one named `name` exists.
/// Returns whether the table was created.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<bool> {
    if table_names(conn).await?.iter().any(|n| n == name) {
        return Ok(false);
    }
    conn.create_empty_table(name, schema)
        .execute()
        .await
        .map_err(|e| Error::storage(format!("creating table {name}"), e))?;
    Ok(true)
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    ensure_table(conn, table, build_meta_schema()).await?;
    let t = conn
        .open_table(table)
        .execute()
        .await
        .map_err(|e| Error::storage(format!("opening {table}"), e))?;
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )
    .map_err(|e| Error::storage("building meta row", e))?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
    // Upsert: key is unique
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await.map_err(|e| Error::storage(format!("writing meta key {key}"), e))?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    Ok(read_meta(conn, table, Some(key)).await?.remove(key))
}

pub async fn list_meta(conn: &Connection, table: &str) -> Result<HashMap<String, String>> {
    read_meta(conn, table, None).await
}

async fn read_meta(conn: &Connection, table: &str, key: Option<&str>) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    if !table_names(conn).await?.iter().any(|n| n == table) {
        return Ok(out);
    }
    let t = conn
        .open_table(table)
        .execute()
        .await
        .map_err(|e| Error::storage(format!("opening {table}"), e))?;
    let mut query = t.query();
    if let Some(key) = key {
        query = query.only_if(format!("key = '{}'", key.replace('\'', "''")));
    }
    let mut stream = query.execute().await.map_err(|e| Error::storage("querying meta", e))?;
    while let Some(batch) = stream.try_next().await.map_err(|e| Error::storage("reading meta", e))? {
        let keys = string_column(&batch, "key")?;
        let values = string_column(&batch, "value")?;
        for i in 0..batch.num_rows() {
            out.insert(keys.value(i).to_string(), values.value(i).to_string());
        }
    }
    Ok(out)
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::storage("decoding results", format!("column {name} missing or not utf8")))
}
