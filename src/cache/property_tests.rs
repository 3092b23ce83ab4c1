//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's read, delete and sweep guarantees over
//! generated keys, values and operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::cache::Cache;

// == Test Configuration ==
/// Long enough that the reaper never fires during a test case.
const TEST_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

// == Helpers ==
/// The cache needs a runtime to spawn its reaper; the runtime is never driven,
/// so sweeps only happen through explicit `delete_expired` calls.
fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn new_cache(runtime: &Runtime) -> Cache<String> {
    let _guard = runtime.enter();
    Cache::new(TEST_CLEANUP_INTERVAL)
}

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}".prop_map(|s| s)
}

/// Generates cache values
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Round-trip: a set followed by a get returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let runtime = test_runtime();
        let cache = new_cache(&runtime);

        cache.set(key.clone(), value.clone());

        prop_assert_eq!(cache.get(&key), Some(value));
    }

    // Last write wins, and overwriting never reaches the eviction callback.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let runtime = test_runtime();
        let cache = new_cache(&runtime);
        let notified = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&notified);
        cache.set_on_evicted(move |_, _| *sink.lock().unwrap() += 1);

        cache.set(key.clone(), value1);
        cache.set(key.clone(), value2.clone());

        prop_assert_eq!(cache.get(&key), Some(value2));
        prop_assert_eq!(cache.len(), 1);
        prop_assert_eq!(*notified.lock().unwrap(), 0);
    }

    // The cache behaves like a map under any mix of sets, gets and deletes,
    // and every successful delete notifies exactly once with the removed value.
    #[test]
    fn prop_matches_model_map(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let runtime = test_runtime();
        let cache = new_cache(&runtime);
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        cache.set_on_evicted(move |key, value| {
            sink.lock().unwrap().push((key.to_string(), value));
        });

        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_evicted = Vec::new();
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value.clone());
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let expected = model.get(&key).cloned();
                    if expected.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                    prop_assert_eq!(cache.get(&key), expected);
                }
                CacheOp::Delete { key } => {
                    let expected = model.remove(&key);
                    prop_assert_eq!(cache.delete(&key), expected.is_some());
                    if let Some(value) = expected {
                        expected_evicted.push((key, value));
                    }
                }
            }
        }

        prop_assert_eq!(cache.len(), model.len());
        prop_assert_eq!(&*evicted.lock().unwrap(), &expected_evicted);

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.deletions, expected_evicted.len() as u64);
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // A sweep over N expired and M live entries removes exactly the N, reports
    // N, notifies once per expired key, and leaves the M readable.
    #[test]
    fn prop_sweep_removes_exactly_expired(
        keys in prop::collection::hash_set(key_strategy(), 2..20),
        split in 0usize..20
    ) {
        let runtime = test_runtime();
        let cache = new_cache(&runtime);
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        cache.set_on_evicted(move |key, _| sink.lock().unwrap().push(key.to_string()));

        let keys: Vec<String> = keys.into_iter().collect();
        let split = split.min(keys.len());
        let (expiring, live) = keys.split_at(split);

        for key in expiring {
            cache.set_with_expiration(key.clone(), format!("v_{}", key), Duration::from_millis(5));
        }
        for (i, key) in live.iter().enumerate() {
            if i % 2 == 0 {
                cache.set(key.clone(), format!("v_{}", key));
            } else {
                cache.set_with_expiration(key.clone(), format!("v_{}", key), Duration::from_secs(3600));
            }
        }

        sleep(Duration::from_millis(20));

        // Lazy expiry hides the expired entries before any sweep
        for key in expiring {
            prop_assert_eq!(cache.get(key), None);
        }
        prop_assert_eq!(cache.len(), keys.len());

        prop_assert_eq!(cache.delete_expired(), expiring.len());

        let notified: HashSet<String> = evicted.lock().unwrap().iter().cloned().collect();
        let expected: HashSet<String> = expiring.iter().cloned().collect();
        prop_assert_eq!(evicted.lock().unwrap().len(), expiring.len());
        prop_assert_eq!(notified, expected);

        prop_assert_eq!(cache.len(), live.len());
        for key in live {
            prop_assert_eq!(cache.get(key), Some(format!("v_{}", key)));
        }
    }

    // Entries read back before their TTL and miss after it.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let runtime = test_runtime();
        let cache = new_cache(&runtime);

        cache.set_with_expiration(key.clone(), value.clone(), Duration::from_millis(50));
        prop_assert_eq!(cache.get(&key), Some(value));

        sleep(Duration::from_millis(80));

        prop_assert_eq!(cache.get(&key), None);
    }
}
