//! Property-based tests for cache invariants

use proptest::prelude::*;
use std::time::Duration;
use tempfile::TempDir;
use tiercache::{Cache, CacheOptions, PartitionedStorage};
use tokio::runtime::Runtime;

fn options(max_memory_entries: usize) -> CacheOptions {
    CacheOptions {
        max_memory_entries,
        auto_cleanup: false,
        enable_memory_pressure_detection: false,
        ..CacheOptions::default()
    }
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_-]{1,64}",
        "[a-z]{1,10}(:[a-z0-9]{1,10}){1,3}",
        "[a-f0-9]{64}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Values read back equal what was written, on either side of the
    /// compression threshold and after a restart
    #[test]
    fn prop_round_trip(key in arb_key(), value in ".{0,3000}") {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let temp_dir = TempDir::new().unwrap();
            let cache = Cache::new(temp_dir.path(), options(100)).await.unwrap();
            cache.set(&key, &value, None).await.unwrap();
            assert_eq!(cache.get::<String>(&key, None).await.as_ref(), Some(&value));

            let reopened = Cache::new(temp_dir.path(), options(100)).await.unwrap();
            assert_eq!(reopened.get::<String>(&key, None).await, Some(value));
        });
    }

    /// Inserting capacity + 1 keys evicts the first from memory only
    #[test]
    fn prop_lru_evicts_oldest(capacity in 1usize..16) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let temp_dir = TempDir::new().unwrap();
            let cache = Cache::new(temp_dir.path(), options(capacity)).await.unwrap();

            for i in 0..=capacity {
                cache.set(&format!("key{i}"), &i, Some(Duration::from_secs(60))).await.unwrap();
            }

            assert_eq!(cache.memory_len(), capacity);
            assert!(!cache.in_memory("key0"));
            assert!(cache.in_memory(&format!("key{capacity}")));
            assert_eq!(cache.get::<usize>("key0", None).await, Some(0));
        });
    }

    /// Partition paths depend only on the key, the filename and the count
    #[test]
    fn prop_partition_paths_survive_restart(key in arb_key(), count in 1u32..512) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let temp_dir = TempDir::new().unwrap();
            let first = PartitionedStorage::new(temp_dir.path().to_path_buf(), count)
                .await
                .unwrap();
            let path = first.get_partitioned_path(&key, "entry.json").await.unwrap();
            assert_eq!(first.get_partitioned_path(&key, "entry.json").await.unwrap(), path.clone());

            let second = PartitionedStorage::new(temp_dir.path().to_path_buf(), count)
                .await
                .unwrap();
            assert_eq!(second.get_partitioned_path(&key, "entry.json").await.unwrap(), path);
        });
    }
}
