use std::sync::Arc;
use std::time::Duration;

use super::memory::MemoryStore;
use super::{bounded, KvStore};
use crate::error::StoreError;

#[tokio::test]
async fn set_if_absent_writes_once() {
    let store = MemoryStore::new();
    assert!(store.set_if_absent("alice", "hash-1").await.unwrap());
    assert!(!store.set_if_absent("alice", "hash-2").await.unwrap());
    // The first write must survive the second attempt.
    assert_eq!(store.get("alice").await.unwrap().as_deref(), Some("hash-1"));
}

#[tokio::test]
async fn set_if_absent_under_contention_admits_exactly_one_writer() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.set_if_absent("bob", &format!("hash-{}", i)).await.unwrap()
        }));
    }
    let mut winners = 0;
    for h in handles {
        if h.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert!(store.get("bob").await.unwrap().is_some());
}

#[tokio::test]
async fn list_push_front_keeps_newest_at_head() {
    let store = MemoryStore::new();
    store.list_push_front("alice:data", "payload1").await.unwrap();
    store.list_push_front("alice:data", "payload2").await.unwrap();
    let items = store.list_range("alice:data").await.unwrap();
    assert_eq!(items, vec!["payload2".to_string(), "payload1".to_string()]);
}

#[tokio::test]
async fn list_range_of_missing_key_is_empty() {
    let store = MemoryStore::new();
    assert!(store.list_range("nobody:results").await.unwrap().is_empty());
}

#[tokio::test]
async fn kind_mismatch_is_reported() {
    let store = MemoryStore::new();
    store.set_if_absent("alice", "hash").await.unwrap();
    let err = store.list_push_front("alice", "x").await.unwrap_err();
    assert_eq!(err, StoreError::WrongKind("alice".into()));

    store.list_push_front("alice:data", "x").await.unwrap();
    let err = store.get("alice:data").await.unwrap_err();
    assert_eq!(err, StoreError::WrongKind("alice:data".into()));
}

#[tokio::test]
async fn bounded_maps_timeout_to_unavailable() {
    let res: Result<(), StoreError> =
        bounded(Duration::from_millis(10), std::future::pending()).await;
    match res {
        Err(StoreError::Unavailable(msg)) => assert!(msg.contains("10ms")),
        other => panic!("expected Unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn bounded_passes_through_fast_calls() {
    let store = MemoryStore::new();
    let ok = bounded(Duration::from_millis(500), store.exists("alice")).await.unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn snapshot_roundtrip_preserves_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("snapshot.json");

    let store = MemoryStore::with_snapshot(&path);
    store.set_if_absent("alice", "hash").await.unwrap();
    store.list_push_front("alice:data", "payload1").await.unwrap();
    store.list_push_front("alice:data", "payload2").await.unwrap();
    store.save_snapshot().unwrap();

    let reloaded = MemoryStore::with_snapshot(&path);
    assert_eq!(reloaded.get("alice").await.unwrap().as_deref(), Some("hash"));
    assert_eq!(
        reloaded.list_range("alice:data").await.unwrap(),
        vec!["payload2".to_string(), "payload1".to_string()]
    );
}

#[tokio::test]
async fn snapshot_is_noop_without_path() {
    let store = MemoryStore::new();
    store.set_if_absent("alice", "hash").await.unwrap();
    store.save_snapshot().unwrap();
    assert_eq!(store.len(), 1);
}
