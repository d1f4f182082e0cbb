use std::collections::HashSet;

use ragstack_vector::namespace::{sanitize_model, MAX_MODEL_CHARS};
use ragstack_vector::NamespaceManager;

#[test]
fn derivation_is_stable() {
    let m = NamespaceManager::default();
    let first = m.derive_id("BAAI/bge-m3", 1024).unwrap();
    for _ in 0..10 {
        assert_eq!(m.derive_id("BAAI/bge-m3", 1024).unwrap(), first);
    }
    // A fresh manager, as after a restart, agrees.
    assert_eq!(NamespaceManager::new("rag_documents").unwrap().derive_id("BAAI/bge-m3", 1024).unwrap(), first);
}

#[test]
fn distinct_pairs_get_distinct_ids() {
    let m = NamespaceManager::default();
    let models = [
        "BAAI/bge-m3",
        "baai-bge-m3",
        "baai_bge_m3",
        "BAAI_bge_m3",
        "nomic-embed-text",
        "text-embedding-3-small",
        "text-embedding-3-large",
        "sentence-transformers/all-MiniLM-L6-v2",
        "sentence-transformers/all-MiniLM-L12-v2",
        "intfloat/multilingual-e5-large",
    ];
    let dims = [256, 384, 768, 1024, 1536, 3072];
    let mut seen = HashSet::new();
    for model in models {
        for dim in dims {
            assert!(seen.insert(m.derive_id(model, dim).unwrap()), "collision for {model}/{dim}");
        }
    }
    assert_eq!(seen.len(), models.len() * dims.len());
}

#[test]
fn ids_follow_layout() {
    let m = NamespaceManager::default();
    let id = m.derive_id("sentence-transformers/all-MiniLM-L6-v2", 384).unwrap();
    assert!(id.starts_with("rag_documents_sentence_transformers_all_mi"));
    let parsed = m.parse(&id).unwrap();
    assert_eq!(parsed.sanitized.chars().count(), MAX_MODEL_CHARS);
    assert_eq!(parsed.dimension, 384);
    assert_eq!(parsed.model_name, parsed.sanitized, "truncated names cannot be recovered");
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
}

#[test]
fn sanitizing_is_lossy_but_hash_separates() {
    assert_eq!(sanitize_model("a-b"), sanitize_model("a/b"));
    let m = NamespaceManager::default();
    assert_ne!(m.derive_id("a-b", 8).unwrap(), m.derive_id("a/b", 8).unwrap());
    assert_eq!(m.parse(&m.derive_id("a/b", 8).unwrap()).unwrap().model_name, "a/b");
}

#[test]
fn invalid_inputs_are_rejected() {
    let m = NamespaceManager::default();
    assert!(m.derive_id("", 384).unwrap_err().is_validation());
    assert!(m.derive_id("model", 0).unwrap_err().is_validation());
    assert!(NamespaceManager::new("bad base!").is_err());
}
