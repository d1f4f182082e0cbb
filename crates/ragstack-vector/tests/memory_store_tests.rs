use std::sync::Arc;

use serde_json::json;

use ragstack_core::traits::VectorStore;
use ragstack_core::types::{Chunk, Meta};
use ragstack_vector::{MemoryStore, NamespaceManager};

fn chunk(doc: &str, ordinal: usize) -> Chunk {
    let mut metadata = Meta::new();
    metadata.insert("strategy".into(), json!("sentence"));
    Chunk { id: format!("{doc}:{ordinal}"), doc_id: doc.to_string(), ordinal, text: format!("text {doc} {ordinal}"), metadata }
}

fn unit(dim: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot % dim] = 1.0;
    v
}

fn store() -> MemoryStore {
    MemoryStore::new(NamespaceManager::default(), "model-a", 4).unwrap()
}

#[tokio::test]
async fn namespaces_round_trip_and_stay_isolated() -> ragstack_core::Result<()> {
    let store = store();
    store.add(&[chunk("a", 0), chunk("a", 1), chunk("a", 2)], &[unit(4, 0), unit(4, 1), unit(4, 2)]).await?;

    store.switch_active("model-b", 8).await?;
    assert_eq!(store.count().await?, 0, "namespace B starts empty");
    store.add(&[chunk("b", 0)], &[unit(8, 0)]).await?;

    let a = store.switch_active("model-a", 4).await?;
    assert_eq!(store.count().await?, 3);
    store.switch_active("model-b", 8).await?;
    assert_eq!(store.count().await?, 1);
    assert_eq!(store.count_in(&a).await?, 3);
    Ok(())
}

#[tokio::test]
async fn wrong_dimension_is_rejected_without_mutation() -> ragstack_core::Result<()> {
    let store = store();
    store.add(&[chunk("a", 0)], &[unit(4, 0)]).await?;

    let err = store.add(&[chunk("a", 1)], &[vec![0.5; 3]]).await.unwrap_err();
    assert!(err.is_validation());
    let err = store.add(&[chunk("a", 1), chunk("a", 2)], &[unit(4, 1)]).await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_ids_are_rejected() -> ragstack_core::Result<()> {
    let store = store();
    store.add(&[chunk("a", 0)], &[unit(4, 0)]).await?;
    assert!(store.add(&[chunk("a", 0)], &[unit(4, 0)]).await.unwrap_err().is_validation());
    assert!(store.add(&[chunk("b", 0), chunk("b", 0)], &[unit(4, 0), unit(4, 1)]).await.unwrap_err().is_validation());
    assert_eq!(store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn clear_is_idempotent_and_scoped() -> ragstack_core::Result<()> {
    let store = store();
    store.add(&[chunk("a", 0)], &[unit(4, 0)]).await?;
    let a = store.active();
    store.switch_active("model-b", 8).await?;
    store.add(&[chunk("b", 0)], &[unit(8, 0)]).await?;

    store.clear().await?;
    assert_eq!(store.count().await?, 0);
    store.clear().await?;
    assert_eq!(store.count().await?, 0);
    assert_eq!(store.count_in(&a).await?, 1, "other namespace untouched");
    Ok(())
}

#[tokio::test]
async fn concurrent_adds_sum_up() -> ragstack_core::Result<()> {
    let store = Arc::new(store());
    let mut tasks = Vec::new();
    for t in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let doc = format!("doc{t}");
            let chunks: Vec<Chunk> = (0..5).map(|i| chunk(&doc, i)).collect();
            let vectors: Vec<Vec<f32>> = (0..5).map(|i| unit(4, i)).collect();
            store.add(&chunks, &vectors).await
        }));
    }
    for task in tasks {
        task.await.expect("join")?;
    }
    assert_eq!(store.count().await?, 40);
    Ok(())
}

#[tokio::test]
async fn search_ranks_by_cosine() -> ragstack_core::Result<()> {
    let store = store();
    store
        .add(
            &[chunk("a", 0), chunk("a", 1), chunk("a", 2)],
            &[vec![1.0, 0.0, 0.0, 0.0], vec![0.7, 0.7, 0.0, 0.0], vec![0.0, 0.0, 1.0, 0.0]],
        )
        .await?;
    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 2).await?;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.id, "a:0");
    assert_eq!(hits[1].chunk.id, "a:1");
    assert!(hits[0].score >= hits[1].score);

    assert!(store.search(&[1.0, 0.0], 2).await.unwrap_err().is_validation());
    Ok(())
}

#[tokio::test]
async fn delete_document_removes_only_its_chunks() -> ragstack_core::Result<()> {
    let store = store();
    store.add(&[chunk("a", 0), chunk("a", 1), chunk("b", 0)], &[unit(4, 0), unit(4, 1), unit(4, 2)]).await?;
    assert_eq!(store.delete_document("a").await?, 2);
    assert_eq!(store.count().await?, 1);
    store.add(&[chunk("a", 0)], &[unit(4, 0)]).await?;
    assert_eq!(store.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn failed_switch_keeps_active_namespace() -> ragstack_core::Result<()> {
    let store = store();
    let before = store.active();
    assert!(store.switch_active("", 8).await.unwrap_err().is_validation());
    assert!(store.switch_active("model-b", 0).await.unwrap_err().is_validation());
    assert_eq!(store.active(), before);
    Ok(())
}

#[tokio::test]
async fn list_marks_the_active_namespace() -> ragstack_core::Result<()> {
    let store = store();
    store.add(&[chunk("a", 0)], &[unit(4, 0)]).await?;
    let b = store.switch_active("model-b", 8).await?;

    let list = store.list_namespaces().await?;
    assert_eq!(list.len(), 2);
    let active: Vec<&str> = list.iter().filter(|n| n.active).map(|n| n.id.as_str()).collect();
    assert_eq!(active, vec![b.id.as_str()]);
    let a = list.iter().find(|n| n.model_name == "model-a").expect("model-a listed");
    assert_eq!(a.count, 1);
    assert_eq!(a.dimension, Some(4));

    let stats = store.stats().await?;
    assert_eq!(stats.id, b.id);
    assert_eq!(stats.count, 0);
    Ok(())
}
