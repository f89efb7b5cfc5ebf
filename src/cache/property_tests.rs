//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's ordering, capacity and accounting
//! guarantees over random operation sequences.

use proptest::prelude::*;

use crate::cache::{LruEngine, MemCache, MemoryStore};

// == Test Configuration ==
const TEST_MAX_SIZE: u64 = 200;

// == Strategies ==
/// Small key space so sequences revisit keys
fn key_strategy() -> impl Strategy<Value = String> {
    "k[0-9]{1,2}".prop_map(|s| s)
}

/// Values never larger than the test capacity
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..40)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Clear { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Clear { key }),
    ]
}

fn new_engine() -> LruEngine<MemoryStore> {
    LruEngine::new(MemoryStore::new(), TEST_MAX_SIZE, 0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every lookup counts towards the total exactly once; only live entries count as hits.
    #[test]
    fn prop_hit_accounting(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut engine = new_engine();
        let mut expected_hits: u64 = 0;
        let mut expected_total: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => engine.set(&key, value, None).unwrap(),
                CacheOp::Get { key } => {
                    expected_total += 1;
                    let was_live = engine.contains(&key);
                    let hit = engine.get(&key).unwrap();
                    prop_assert_eq!(hit.is_some(), was_live);
                    if hit.is_some() {
                        expected_hits += 1;
                    }
                }
                CacheOp::Clear { key } => engine.clear(&key).unwrap(),
            }
        }

        prop_assert_eq!(engine.hit_info(), (expected_hits, expected_total));
    }

    // List, index and byte count agree, and capacity holds, after every operation.
    #[test]
    fn prop_structure_and_capacity(ops in prop::collection::vec(cache_op_strategy(), 1..120)) {
        let mut engine = new_engine();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => engine.set(&key, value, None).unwrap(),
                CacheOp::Get { key } => { engine.get(&key).unwrap(); }
                CacheOp::Clear { key } => engine.clear(&key).unwrap(),
            }
            prop_assert!(engine.check_invariants().is_ok(), "{:?}", engine.check_invariants());
            prop_assert!(
                engine.cur_size() <= engine.max_size(),
                "cur_size {} exceeds max {}",
                engine.cur_size(),
                engine.max_size()
            );
        }
    }

    // The most recently touched live key is always at the head.
    #[test]
    fn prop_recency_head(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut engine = new_engine();

        for op in ops {
            let touched = match op {
                CacheOp::Set { key, value } => {
                    engine.set(&key, value, None).unwrap();
                    Some(key)
                }
                CacheOp::Get { key } => engine.get(&key).unwrap().map(|_| key),
                CacheOp::Clear { key } => {
                    engine.clear(&key).unwrap();
                    None
                }
            };

            if let Some(key) = touched {
                if engine.contains(&key) {
                    let nodes = engine.traversal();
                    prop_assert_eq!(&nodes[0].key, &key);
                }
            }
        }
    }

    // An eviction frees at least a tenth of the capacity, or everything that was held.
    #[test]
    fn prop_eviction_batch_size(
        sizes in prop::collection::vec(1usize..40, 1..60),
    ) {
        let mut engine = new_engine();
        let batch = TEST_MAX_SIZE.div_ceil(10);

        for (i, size) in sizes.into_iter().enumerate() {
            let held_before = engine.cur_size();
            let evictions_before = engine.stats().evictions;

            engine.set(&format!("key{}", i), vec![0; size], None).unwrap();

            if engine.stats().evictions > evictions_before {
                let freed = held_before + size as u64 - engine.cur_size();
                prop_assert!(
                    freed >= batch.min(held_before + size as u64),
                    "freed {} bytes, batch is {}",
                    freed,
                    batch
                );
            }
        }
    }

    // Evicted keys are always the least recently used ones.
    #[test]
    fn prop_evicts_from_tail(sizes in prop::collection::vec(1usize..40, 2..60)) {
        let mut engine = new_engine();

        for (i, size) in sizes.into_iter().enumerate() {
            let before: Vec<String> = engine.traversal().into_iter().map(|n| n.key).collect();
            engine.set(&format!("key{}", i), vec![0; size], None).unwrap();
            let after: Vec<String> = engine.traversal().into_iter().map(|n| n.key).collect();

            // Survivors are a prefix of the previous MRU-first order
            let survivors = &after[1..];
            prop_assert_eq!(survivors, &before[..survivors.len()]);
        }
    }

    // Storing then retrieving returns the stored bytes and metadata.
    #[test]
    fn prop_roundtrip_storage(
        key in key_strategy(),
        value in value_strategy(),
        tag in any::<u32>(),
    ) {
        let cache = MemCache::with_capacity(TEST_MAX_SIZE as i64);

        cache.set(&key, value.clone(), Some(serde_json::json!(tag))).unwrap();

        let hit = cache.get(&key).unwrap().unwrap();
        prop_assert_eq!(hit.value, value);
        prop_assert_eq!(hit.extra, Some(serde_json::json!(tag)));
    }

    // Overwriting keeps a single node and the newest value.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let cache = MemCache::with_capacity(TEST_MAX_SIZE as i64);

        cache.set(&key, value1, None).unwrap();
        cache.set(&key, value2.clone(), None).unwrap();

        prop_assert_eq!(cache.len(), 1);
        prop_assert_eq!(cache.cur_size(), value2.len() as u64);
        prop_assert_eq!(cache.get(&key).unwrap().unwrap().value, value2);
    }

    // Clearing twice is as good as clearing once.
    #[test]
    fn prop_clear_is_idempotent(key in key_strategy(), value in value_strategy()) {
        let cache = MemCache::with_capacity(TEST_MAX_SIZE as i64);

        cache.set(&key, value, None).unwrap();
        prop_assert!(cache.clear(&key).is_ok());
        prop_assert!(cache.clear(&key).is_ok());
        prop_assert!(cache.get(&key).unwrap().is_none());
        prop_assert_eq!(cache.cur_size(), 0);
    }
}
