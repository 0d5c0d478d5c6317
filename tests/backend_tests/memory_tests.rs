//! Tests for MemoryBackend
//!
//! These tests verify:
//! - Batches apply all-or-nothing
//! - Injected failures apply nothing and are consumed once
//! - The change feed delivers per-table changes in commit order
//! - Scans return items in key order

use std::time::Duration;

use dualstore::backend::{BackendError, BatchOp, KeyValueBackend};
use dualstore::{MemoryBackend, PrimaryKey};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn key(id: &str) -> PrimaryKey {
    PrimaryKey {
        pk: format!("T#root#project#{}", id),
        sk: id.to_string(),
    }
}

fn put(table: &str, id: &str, title: &str) -> BatchOp {
    BatchOp::Put {
        table: table.to_string(),
        key: key(id),
        item: json!({ "id": id, "title": title }),
    }
}

fn delete(table: &str, id: &str) -> BatchOp {
    BatchOp::Delete {
        table: table.to_string(),
        key: key(id),
    }
}

// =============================================================================
// Batch Tests
// =============================================================================

#[tokio::test]
async fn test_batch_spans_tables() {
    let backend = MemoryBackend::new();
    backend
        .batch_write(vec![put("projects", "a", "A"), put("projects-search", "a", "A")])
        .await
        .unwrap();

    assert_eq!(backend.item_count("projects"), 1);
    assert_eq!(backend.item_count("projects-search"), 1);
    assert_eq!(
        backend.get("projects", &key("a")).await.unwrap(),
        Some(json!({ "id": "a", "title": "A" }))
    );
    assert_eq!(backend.get("projects", &key("b")).await.unwrap(), None);
}

#[tokio::test]
async fn test_invalid_batch_applies_nothing() {
    let backend = MemoryBackend::new();

    let bad_item = BatchOp::Put {
        table: "projects-search".to_string(),
        key: key("a"),
        item: json!("not an object"),
    };
    let err = backend
        .batch_write(vec![put("projects", "a", "A"), bad_item])
        .await
        .unwrap_err();
    assert_eq!(err.code, "VALIDATION");

    let err = backend
        .batch_write(vec![put("projects", "a", "A"), delete("projects", "a")])
        .await
        .unwrap_err();
    assert_eq!(err.code, "VALIDATION");

    assert_eq!(backend.item_count("projects"), 0);
    assert_eq!(backend.item_count("projects-search"), 0);
}

#[tokio::test]
async fn test_injected_failure_is_consumed_once() {
    let backend = MemoryBackend::new();
    backend.fail_next_batch(BackendError::new("ThrottlingException", "slow down"));

    let err = backend
        .batch_write(vec![put("projects", "a", "A")])
        .await
        .unwrap_err();
    assert_eq!(err.code, "ThrottlingException");
    assert_eq!(backend.item_count("projects"), 0);

    backend.batch_write(vec![put("projects", "a", "A")]).await.unwrap();
    assert_eq!(backend.item_count("projects"), 1);
}

#[tokio::test]
async fn test_delete_of_absent_key_is_noop() {
    let backend = MemoryBackend::new();
    backend.batch_write(vec![delete("projects", "a")]).await.unwrap();
    assert_eq!(backend.item_count("projects"), 0);
}

#[tokio::test]
async fn test_scan_is_key_ordered() {
    let backend = MemoryBackend::new();
    backend
        .batch_write(vec![
            put("projects", "c", "C"),
            put("projects", "a", "A"),
            put("projects", "b", "B"),
        ])
        .await
        .unwrap();

    let keys: Vec<String> = backend
        .scan("projects")
        .await
        .unwrap()
        .into_iter()
        .map(|(k, _)| k.sk)
        .collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert!(backend.scan("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_latency_delays_calls() {
    let backend = MemoryBackend::new();
    backend.set_latency(Some(Duration::from_millis(200)));

    let slow =
        tokio::time::timeout(Duration::from_millis(20), backend.get("projects", &key("a"))).await;
    assert!(slow.is_err());

    backend.set_latency(None);
    let fast =
        tokio::time::timeout(Duration::from_millis(200), backend.get("projects", &key("a"))).await;
    assert!(fast.is_ok());
}

// =============================================================================
// Change Feed Tests
// =============================================================================

#[tokio::test]
async fn test_change_feed_follows_commit_order() {
    let backend = MemoryBackend::new();
    let mut shadow = backend.subscribe("projects-search");

    backend
        .batch_write(vec![put("projects", "a", "A"), put("projects-search", "a", "A")])
        .await
        .unwrap();
    backend
        .batch_write(vec![put("projects", "a", "A2"), put("projects-search", "a", "A2")])
        .await
        .unwrap();
    backend
        .batch_write(vec![delete("projects", "a"), delete("projects-search", "a")])
        .await
        .unwrap();

    let created = shadow.recv().await.unwrap();
    assert_eq!(created.table, "projects-search");
    assert_eq!(created.old_image, None);
    assert_eq!(created.new_image, Some(json!({ "id": "a", "title": "A" })));

    let updated = shadow.recv().await.unwrap();
    assert!(updated.sequence > created.sequence);
    assert_eq!(updated.old_image, Some(json!({ "id": "a", "title": "A" })));
    assert_eq!(updated.new_image, Some(json!({ "id": "a", "title": "A2" })));

    let removed = shadow.recv().await.unwrap();
    assert_eq!(removed.old_image, Some(json!({ "id": "a", "title": "A2" })));
    assert_eq!(removed.new_image, None);

    // Primary table changes never reach a shadow subscriber
    assert!(shadow.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_batch_publishes_nothing() {
    let backend = MemoryBackend::new();
    let mut shadow = backend.subscribe("projects-search");
    backend.fail_next_batch(BackendError::new("X", "x"));

    let _ = backend.batch_write(vec![put("projects-search", "a", "A")]).await;
    assert!(shadow.try_recv().is_err());
}
