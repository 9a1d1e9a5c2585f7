//! Basic cache operation tests

use super::{cache_at, quiet_options};
use crate::config::CacheOptions;
use crate::events::{CacheEvent, CacheOperation, EventKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tiercache_core::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}

#[tokio::test]
async fn test_basic_operations() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    let user = User {
        name: "A".to_string(),
        age: 30,
    };
    cache.set("user:1", &user, None).await.unwrap();

    assert_eq!(cache.get::<User>("user:1", None).await, Some(user));
    assert!(cache.has("user:1").await);
    assert!(!cache.has("user:2").await);
    assert_eq!(cache.get::<User>("user:2", None).await, None);

    assert!(cache.delete("user:1").await);
    assert!(!cache.delete("user:1").await);
    assert_eq!(cache.get::<User>("user:1", None).await, None);

    let stats = cache.stats().await;
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.deletes, 2);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_values_survive_a_new_instance() {
    let temp_dir = TempDir::new().unwrap();
    {
        let cache = cache_at(temp_dir.path(), quiet_options()).await;
        cache.set("config", &json!({"retries": 3}), None).await.unwrap();
    }

    let cache = cache_at(temp_dir.path(), quiet_options()).await;
    assert!(!cache.in_memory("config"));
    assert_eq!(
        cache.get::<serde_json::Value>("config", None).await,
        Some(json!({"retries": 3}))
    );
    assert!(cache.in_memory("config"));

    let stats = cache.stats().await;
    assert_eq!(stats.disk_hits, 1);
    assert_eq!(stats.entry_count(), 1);
}

#[tokio::test]
async fn test_entries_expire() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    cache
        .set("short", &"lived", Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(cache.get::<String>("short", None).await.as_deref(), Some("lived"));

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(cache.get::<String>("short", None).await, None);
    assert!(!cache.in_memory("short"));

    let paths = cache.inner.entry_paths("short");
    assert!(!paths.json.exists());
    assert!(!paths.gz.exists());
    assert_eq!(cache.stats().await.expired_removals, 1);
}

#[tokio::test]
async fn test_lru_evicts_least_recently_touched() {
    let temp_dir = TempDir::new().unwrap();
    let options = CacheOptions {
        max_memory_entries: 3,
        ..quiet_options()
    };
    let cache = cache_at(temp_dir.path(), options).await;

    for key in ["a", "b", "c"] {
        cache.set(key, &key, None).await.unwrap();
    }
    // Reading "a" makes "b" the oldest
    assert!(cache.get::<String>("a", None).await.is_some());
    cache.set("d", &"d", None).await.unwrap();

    assert!(cache.in_memory("a"));
    assert!(!cache.in_memory("b"));
    assert!(cache.in_memory("c"));
    assert!(cache.in_memory("d"));
    assert_eq!(cache.memory_len(), 3);

    // Still on disk
    assert_eq!(cache.get::<String>("b", None).await.as_deref(), Some("b"));
    assert_eq!(cache.stats().await.evictions, 2);
}

#[tokio::test]
async fn test_compressed_round_trip_and_stale_sibling() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;
    let paths = cache.inner.entry_paths("doc");

    let large = "lorem ipsum ".repeat(500);
    cache.set("doc", &large, None).await.unwrap();
    assert!(paths.gz.exists());
    assert!(!paths.json.exists());

    let reopened = cache_at(temp_dir.path(), quiet_options()).await;
    assert_eq!(reopened.get::<String>("doc", None).await, Some(large));

    cache.set("doc", &"small", None).await.unwrap();
    assert!(paths.json.exists());
    assert!(!paths.gz.exists());

    let stats = cache.stats().await;
    assert_eq!(stats.compression.compressions, 1);
    assert!(stats.compression.average_ratio < 1.0);
}

#[tokio::test]
async fn test_uncompressed_when_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let options = CacheOptions {
        compression: false,
        ..quiet_options()
    };
    let cache = cache_at(temp_dir.path(), options).await;

    cache.set("doc", &"x".repeat(4096), None).await.unwrap();
    let paths = cache.inner.entry_paths("doc");
    assert!(paths.json.exists());
    assert!(!paths.gz.exists());
}

#[tokio::test]
async fn test_oversized_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let options = CacheOptions {
        max_size: 16,
        ..quiet_options()
    };
    let cache = cache_at(temp_dir.path(), options).await;

    let err = cache
        .set("big", &"far more than sixteen bytes", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(!cache.in_memory("big"));
    assert!(!cache.has("big").await);
    assert_eq!(cache.stats().await.errors, 1);
}

#[tokio::test]
async fn test_empty_key_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    assert!(cache.set("", &1, None).await.is_err());
}

#[tokio::test]
async fn test_input_hash_mismatch_invalidates() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    cache
        .set_with_hash("build", &"output", None, Some("inputs-v1"))
        .await
        .unwrap();

    assert_eq!(
        cache.get::<String>("build", Some("inputs-v1")).await.as_deref(),
        Some("output")
    );
    assert_eq!(cache.get::<String>("build", None).await.as_deref(), Some("output"));
    assert_eq!(cache.get::<String>("build", Some("inputs-v2")).await, None);

    // The mismatch removed the entry for good
    assert_eq!(cache.get::<String>("build", Some("inputs-v1")).await, None);
    assert!(!cache.has("build").await);
}

#[tokio::test]
async fn test_has_does_not_check_ttl_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    cache
        .set("k", &1, Some(Duration::from_millis(30)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(cache.has("k").await);
    assert!(!cache.in_memory("k"));

    assert_eq!(cache.get::<i32>("k", None).await, None);
    assert!(!cache.has("k").await);
}

#[tokio::test]
async fn test_wrong_type_is_a_miss() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    cache.set("n", &"not a number", None).await.unwrap();
    assert_eq!(cache.get::<u64>("n", None).await, None);
    assert_eq!(cache.stats().await.errors, 1);
}

#[tokio::test]
async fn test_clear() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    for i in 0..10 {
        cache.set(&format!("key{i}"), &i, None).await.unwrap();
    }
    cache.clear().await.unwrap();

    assert_eq!(cache.memory_len(), 0);
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    assert_eq!(cache.get::<i32>("key3", None).await, None);

    // Partition directories come back on the next write
    cache.set("key3", &3, None).await.unwrap();
    let reopened = cache_at(temp_dir.path(), quiet_options()).await;
    assert_eq!(reopened.get::<i32>("key3", None).await, Some(3));
}

#[tokio::test]
async fn test_flat_layout_without_partitioning() {
    let temp_dir = TempDir::new().unwrap();
    let options = CacheOptions {
        enable_partitioning: false,
        ..quiet_options()
    };
    let cache = cache_at(temp_dir.path(), options).await;
    assert!(!cache.is_partitioned());

    cache.set("flat", &true, None).await.unwrap();
    let paths = cache.inner.entry_paths("flat");
    assert_eq!(paths.json.parent(), Some(temp_dir.path()));
    assert!(paths.json.exists());

    let stats = cache.stats().await;
    assert!(!stats.storage.partitioned);
    assert_eq!(stats.storage.file_count, 1);
}

#[tokio::test]
async fn test_partitioned_layout() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;
    assert!(cache.is_partitioned());

    cache.set("sharded", &true, None).await.unwrap();
    let paths = cache.inner.entry_paths("sharded");
    let partition = paths.json.parent().unwrap();
    assert_eq!(partition.parent(), Some(temp_dir.path()));
    assert!(partition
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('p')));

    let stats = cache.stats().await;
    assert!(stats.storage.partitioned);
    assert_eq!(stats.storage.partition_count, 1);
    assert_eq!(stats.storage.file_count, 1);
}

#[tokio::test]
async fn test_batch_operations_keep_input_order() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    let results = cache
        .batch_set(&[("a", 1), ("b", 2), ("c", 3)], None)
        .await;
    assert!(results.iter().all(|r| r.is_ok()));

    assert_eq!(
        cache.batch_get::<i32>(&["c", "missing", "a"]).await,
        vec![Some(3), None, Some(1)]
    );
    assert_eq!(
        cache.batch_has(&["a", "missing", "b"]).await,
        vec![true, false, true]
    );
    assert_eq!(
        cache.batch_delete(&["b", "missing"]).await,
        vec![true, false]
    );
    assert!(!cache.has("b").await);
}

#[tokio::test]
async fn test_operation_events() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path(), quiet_options()).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = cache.events().subscribe(EventKind::Operation, move |event| {
        if let CacheEvent::Operation(op) = event {
            sink.lock().push((op.operation, op.key.clone(), op.success));
        }
    });

    cache.set("k", &1, None).await.unwrap();
    cache.get::<i32>("k", None).await;
    cache.has("k").await;
    cache.delete("k").await;
    cache.clear().await.unwrap();
    cache.set("", &1, None).await.unwrap_err();

    assert!(cache.events().unsubscribe(id));
    cache.get::<i32>("k", None).await;

    let key = || Some("k".to_string());
    assert_eq!(
        *seen.lock(),
        vec![
            (CacheOperation::Set, key(), true),
            (CacheOperation::Get, key(), true),
            (CacheOperation::Has, key(), true),
            (CacheOperation::Delete, key(), true),
            (CacheOperation::Clear, None, true),
            (CacheOperation::Set, Some(String::new()), false),
        ]
    );
}

#[tokio::test]
async fn test_tiny_floats_read_back_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let value = 1.0715660391465826e-75_f64;
    {
        let cache = cache_at(temp_dir.path(), quiet_options()).await;
        cache.set("ratio", &value, None).await.unwrap();
    }

    let cache = cache_at(temp_dir.path(), quiet_options()).await;
    assert_eq!(cache.get::<f64>("ratio", None).await, Some(value));

    let stats = cache.stats().await;
    assert_eq!(stats.disk_hits, 1);
    assert_eq!(stats.checksum_failures, 0);
    assert_eq!(stats.corrupted_entries, 0);
}

#[tokio::test]
async fn test_get_event_carries_checksum_error() {
    let temp_dir = TempDir::new().unwrap();
    let writer = cache_at(temp_dir.path(), quiet_options()).await;
    writer.set("k", &json!({"n": 1}), None).await.unwrap();

    let path = writer.inner.entry_paths("k").json;
    let mut stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    stored["data"]["n"] = json!(2);
    std::fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

    let reader = cache_at(temp_dir.path(), quiet_options()).await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    reader.events().subscribe(EventKind::Operation, move |event| {
        if let CacheEvent::Operation(op) = event {
            sink.lock().push((op.success, op.error.clone()));
        }
    });

    assert_eq!(reader.get::<serde_json::Value>("k", None).await, None);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let (success, error) = &seen[0];
    assert!(!success);
    assert!(error.as_deref().unwrap().contains("checksum mismatch for key 'k'"));
}
