//! End-to-end scenarios against the public cache API

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tiercache::{
    Cache, CacheEvent, CacheManager, CacheOptions, EventKind, MemoryPressureLevel,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
}

fn options() -> CacheOptions {
    CacheOptions::builder()
        .with_auto_cleanup(false, Duration::ZERO)
        .with_memory_pressure(false, 0.75, 0.90)
        .build()
        .unwrap()
}

#[tokio::test]
async fn scenario_entry_expires_after_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Cache::new(temp_dir.path(), options()).await.unwrap();

    let profile = Profile {
        name: "A".to_string(),
    };
    cache
        .set("user:1", &profile, Some(Duration::from_millis(1000)))
        .await
        .unwrap();
    assert_eq!(cache.get::<Profile>("user:1", None).await, Some(profile));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(cache.get::<Profile>("user:1", None).await, None);
    assert!(!cache.in_memory("user:1"));
    assert!(!cache.has("user:1").await);
}

#[tokio::test]
async fn scenario_evicted_entry_served_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Cache::new(temp_dir.path(), options()).await.unwrap();
    assert_eq!(cache.options().max_memory_entries, 100);

    for i in 0..=100 {
        cache.set(&format!("k{i}"), &i, None).await.unwrap();
    }

    assert_eq!(cache.memory_len(), 100);
    assert!(!cache.in_memory("k0"));
    assert_eq!(cache.get::<i32>("k0", None).await, Some(0));

    let stats = cache.stats().await;
    assert_eq!(stats.disk_hits, 1);
    assert_eq!(stats.entry_count(), 101);
}

#[tokio::test]
async fn scenario_critical_pressure_shrinks_memory_tier() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Cache::new(temp_dir.path(), options()).await.unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    cache
        .events()
        .subscribe(EventKind::EvictionCompleted, move |event| {
            sink.lock().push(event.clone());
        });

    for i in 0..100 {
        cache.set(&format!("k{i}"), &i, None).await.unwrap();
    }

    cache
        .respond_to_memory_pressure(MemoryPressureLevel::Critical)
        .await;

    let stats = cache.stats().await;
    assert!(stats.memory_entries <= 50);
    assert!(stats.cleanup_runs >= 1);
    assert_eq!(stats.effective_capacity, 50);
    assert_eq!(events.lock().len(), 1);
    assert!(matches!(
        events.lock()[0],
        CacheEvent::EvictionCompleted { remaining, .. } if remaining <= 50
    ));
}

#[tokio::test]
async fn scenario_checksum_failure_counted_once() {
    let temp_dir = TempDir::new().unwrap();
    let mut options = options();
    options.enable_partitioning = false;
    options.compression = false;

    let writer = Cache::new(temp_dir.path(), options.clone()).await.unwrap();
    writer
        .set("doc", &Profile { name: "original".to_string() }, None)
        .await
        .unwrap();

    let file = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().is_some_and(|ext| ext == "json"))
        .unwrap();
    let text = std::fs::read_to_string(&file).unwrap();
    std::fs::write(&file, text.replace("original", "tampered")).unwrap();

    let reader = Cache::new(temp_dir.path(), options).await.unwrap();
    assert_eq!(reader.get::<Profile>("doc", None).await, None);
    assert_eq!(reader.get::<Profile>("doc", None).await, None);
    assert_eq!(reader.stats().await.checksum_failures, 1);
}

#[tokio::test]
async fn scenario_manager_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let manager = CacheManager::new(temp_dir.path(), options()).await.unwrap();

    let tasks = manager.get_cache("tasks").await.unwrap();
    tasks.set("build", &"ok", None).await.unwrap();
    manager
        .config_cache()
        .set("settings", &serde_json::json!({"verbose": true}), None)
        .await
        .unwrap();

    assert_eq!(tasks.get::<String>("build", None).await.as_deref(), Some("ok"));

    let stats = manager.get_global_stats().await;
    assert_eq!(stats.cache_count, 2);
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.total_hits, 1);

    manager.clear_all().await.unwrap();
    assert_eq!(manager.get_global_stats().await.total_entries, 0);
    manager.destroy().await;
}
