//! Integration Tests for the Cache Manager façade
//!
//! Exercises the public API the way application code uses it, with simulated time
//! wherever expiry matters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cache_manager::cache::{CacheBackend, CacheStats, KeyPattern, PatternDeletion};
use cache_manager::error::Result;
use cache_manager::{
    CacheConfig, CacheError, CacheManager, CacheOptions, EvictionStrategy, ManualClock, WarmItem,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

// == Helper Functions ==

fn manual_manager(config: CacheConfig) -> (CacheManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    (CacheManager::with_clock(config, clock.clone()), clock)
}

fn sized(max_size: usize, strategy: EvictionStrategy) -> CacheConfig {
    CacheConfig {
        max_size,
        strategy,
        ..CacheConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

/// Backend whose every operation fails.
struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl_secs: u64) -> Result<()> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn reject(&self, _key: &str, _payload: &[u8]) -> Result<bool> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn delete_by_pattern(&self, _pattern: &KeyPattern) -> Result<PatternDeletion> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn ttl_remaining(&self, _key: &str) -> Result<Option<Duration>> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn clear(&self) -> Result<()> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn purge_expired(&self) -> Result<usize> {
        Err(CacheError::Internal("backend down".into()))
    }

    async fn stats(&self) -> Result<CacheStats> {
        Err(CacheError::Internal("backend down".into()))
    }
}

// == Basic Operations ==

#[tokio::test]
async fn test_typed_round_trip() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let user = User {
        id: 7,
        name: "Grace".to_string(),
    };

    assert!(cache.set("user:7", &user, &CacheOptions::default()).await);
    let loaded: Option<User> = cache.get("user:7", &CacheOptions::default()).await;

    assert_eq!(loaded, Some(user));
    assert_eq!(cache.keys().await, vec!["cache:user:7"]);
}

#[tokio::test]
async fn test_decode_mismatch_is_a_miss() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    cache.set("k", "text", &opts).await;

    let wrong: Option<u32> = cache.get("k", &opts).await;

    assert_eq!(wrong, None);
    let stats = cache.stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 1));
    assert!(!cache.exists("k", &opts).await);
}

#[tokio::test]
async fn test_get_or_set_replaces_undecodable_entry() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    cache.set("k", "text", &opts).await;

    let counter = AtomicUsize::new(0);
    let calls = &counter;
    for _ in 0..3 {
        let value: std::result::Result<u32, ()> = cache
            .get_or_set(
                "k",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                },
                &opts,
            )
            .await;
        assert_eq!(value, Ok(7));
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    let stats = cache.stats().await;
    assert_eq!((stats.hits, stats.misses), (2, 1));
    let repaired: Option<u32> = cache.get("k", &opts).await;
    assert_eq!(repaired, Some(7));
}

#[tokio::test]
async fn test_delete_reports_presence() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    cache.set("k", &1, &opts).await;

    assert!(cache.delete("k", &opts).await);
    assert!(!cache.delete("k", &opts).await);
    assert!(!cache.exists("k", &opts).await);
}

// == TTL ==

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let (cache, clock) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::with_ttl(1);

    cache.set("a", &json!({"x": 1}), &opts).await;
    assert_eq!(cache.get_json("a", &opts).await, Some(json!({"x": 1})));

    let misses_before = cache.stats().await.misses;
    clock.advance(Duration::from_secs(2));

    assert_eq!(cache.get_json("a", &opts).await, None);
    let stats = cache.stats().await;
    assert_eq!(stats.misses, misses_before + 1);
    assert_eq!(stats.expirations, 1);
    assert!(cache.keys().await.is_empty());
}

#[tokio::test]
async fn test_entry_alive_until_exact_deadline() {
    let (cache, clock) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::with_ttl(5);
    cache.set("k", &1, &opts).await;

    clock.advance(Duration::from_millis(4_999));
    assert!(cache.exists("k", &opts).await);
    assert_eq!(
        cache.ttl_remaining("k", &opts).await,
        Some(Duration::from_millis(1))
    );

    clock.advance(Duration::from_millis(1));
    assert!(!cache.exists("k", &opts).await);
    assert_eq!(cache.ttl_remaining("k", &opts).await, None);
}

#[tokio::test]
async fn test_zero_ttl_uses_default() {
    let (cache, _) = manual_manager(CacheConfig::default());
    cache.set("k", &1, &CacheOptions::with_ttl(0)).await;

    let remaining = cache.ttl_remaining("k", &CacheOptions::default()).await;
    assert_eq!(remaining, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn test_overwrite_refreshes_ttl() {
    let (cache, clock) = manual_manager(CacheConfig::default());
    cache.set("k", &1, &CacheOptions::with_ttl(2)).await;
    clock.advance(Duration::from_millis(1_500));
    cache.set("k", &2, &CacheOptions::with_ttl(2)).await;
    clock.advance(Duration::from_millis(1_500));

    let value: Option<i32> = cache.get("k", &CacheOptions::default()).await;
    assert_eq!(value, Some(2));
}

#[tokio::test]
async fn test_sweeper_purges_expired_entries() {
    let config = CacheConfig {
        check_interval: Duration::from_millis(20),
        ..CacheConfig::default()
    };
    let (cache, clock) = manual_manager(config);
    cache.set("short", &1, &CacheOptions::with_ttl(1)).await;
    cache.set("long", &1, &CacheOptions::with_ttl(60)).await;
    assert!(cache.spawn_sweeper());

    clock.advance(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(cache.keys().await, vec!["cache:long"]);
    assert_eq!(cache.stats().await.expirations, 1);
    cache.destroy().await;
}

// == Eviction ==

#[tokio::test]
async fn test_lru_evicts_least_recently_used() {
    let (cache, clock) = manual_manager(sized(3, EvictionStrategy::Lru));
    let opts = CacheOptions::default();

    for key in ["A", "B", "C"] {
        cache.set(key, &key, &opts).await;
        clock.advance(Duration::from_millis(10));
    }
    let _: Option<String> = cache.get("A", &opts).await;
    cache.set("D", &"D", &opts).await;

    assert!(cache.exists("A", &opts).await);
    assert!(!cache.exists("B", &opts).await);
    assert!(cache.exists("C", &opts).await);
    assert!(cache.exists("D", &opts).await);
    assert_eq!(cache.stats().await.evictions, 1);
}

#[tokio::test]
async fn test_lfu_evicts_least_frequently_used() {
    let (cache, _) = manual_manager(sized(3, EvictionStrategy::Lfu));
    let opts = CacheOptions::default();

    for key in ["A", "B", "C"] {
        cache.set(key, &key, &opts).await;
    }
    for key in ["A", "A", "C"] {
        let _: Option<String> = cache.get(key, &opts).await;
    }
    cache.set("D", &"D", &opts).await;

    assert!(!cache.exists("B", &opts).await);
    assert_eq!(cache.stats().await.entries, 3);
}

#[tokio::test]
async fn test_fifo_ignores_access_pattern() {
    let (cache, clock) = manual_manager(sized(3, EvictionStrategy::Fifo));
    let opts = CacheOptions::default();

    for key in ["A", "B", "C"] {
        cache.set(key, &key, &opts).await;
        clock.advance(Duration::from_millis(10));
    }
    for _ in 0..5 {
        let _: Option<String> = cache.get("A", &opts).await;
    }
    cache.set("D", &"D", &opts).await;

    assert!(!cache.exists("A", &opts).await);
    assert!(cache.exists("B", &opts).await);
}

#[tokio::test]
async fn test_capacity_never_exceeded() {
    let (cache, _) = manual_manager(sized(50, EvictionStrategy::Lru));
    let opts = CacheOptions::default();

    for i in 0..500 {
        cache.set(&format!("k{}", i), &i, &opts).await;
        assert!(cache.stats().await.entries <= 50);
    }

    let stats = cache.stats().await;
    assert!(stats.evictions >= 450);
    assert!(cache.exists("k499", &opts).await);
}

#[tokio::test]
async fn test_memory_budget_triggers_eviction() {
    let config = CacheConfig {
        max_memory: 100,
        ..CacheConfig::default()
    };
    let (cache, _) = manual_manager(config);
    let value = "x".repeat(38);

    for key in ["a", "b", "c", "d"] {
        cache.set(key, &value, &CacheOptions::default()).await;
        assert!(cache.stats().await.current_size <= 100);
    }
    assert!(cache.stats().await.evictions >= 2);
}

// == Pattern Deletion ==

#[tokio::test]
async fn test_delete_by_pattern_removes_only_matches() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    for key in ["user:1", "user:2", "order:1"] {
        cache.set(key, &1, &opts).await;
    }

    let deletion = cache.delete_by_pattern("user:*", &opts).await;

    assert_eq!(deletion.deleted_count, 2);
    let mut deleted = deletion.keys_deleted;
    deleted.sort();
    assert_eq!(deleted, vec!["cache:user:1", "cache:user:2"]);
    assert_eq!(cache.keys().await, vec!["cache:order:1"]);
}

#[tokio::test]
async fn test_delete_by_pattern_single_char_wildcard() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    for key in ["v1", "v2", "v10"] {
        cache.set(key, &1, &opts).await;
    }

    let deletion = cache.delete_by_pattern("v?", &opts).await;

    assert_eq!(deletion.deleted_count, 2);
    assert!(cache.exists("v10", &opts).await);
}

#[tokio::test]
async fn test_delete_by_pattern_literal_metacharacters() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    cache.set("price.(usd)", &1, &opts).await;
    cache.set("priceX(usd)", &1, &opts).await;

    let deletion = cache.delete_by_pattern("price.(usd)", &opts).await;

    assert_eq!(deletion.keys_deleted, vec!["cache:price.(usd)"]);
    assert!(cache.exists("priceX(usd)", &opts).await);
}

#[tokio::test]
async fn test_delete_by_pattern_respects_namespace() {
    let (cache, _) = manual_manager(CacheConfig::default());
    cache.set("user:1", &1, &CacheOptions::default()).await;
    cache
        .set("user:1", &1, &CacheOptions::in_namespace("tenant"))
        .await;

    let deletion = cache
        .delete_by_pattern("user:*", &CacheOptions::in_namespace("tenant"))
        .await;

    assert_eq!(deletion.keys_deleted, vec!["tenant:user:1"]);
    assert!(cache.exists("user:1", &CacheOptions::default()).await);
}

#[tokio::test]
async fn test_delete_by_pattern_rejects_empty_pattern() {
    let (cache, _) = manual_manager(CacheConfig::default());
    cache.set("k", &1, &CacheOptions::default()).await;

    let deletion = cache.delete_by_pattern("", &CacheOptions::default()).await;

    assert_eq!(deletion, PatternDeletion::default());
    assert_eq!(cache.keys().await.len(), 1);
}

// == Get Or Set ==

#[tokio::test]
async fn test_get_or_set_fetches_on_miss_only() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    for _ in 0..3 {
        let value: std::result::Result<User, String> = cache
            .get_or_set(
                "user:1",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(User {
                        id: 1,
                        name: "Ada".to_string(),
                    })
                },
                &CacheOptions::with_ttl(60),
            )
            .await;
        assert_eq!(value.unwrap().name, "Ada");
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    let stats = cache.stats().await;
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_get_or_set_propagates_fetcher_error() {
    let (cache, _) = manual_manager(CacheConfig::default());

    let result: std::result::Result<u32, String> = cache
        .get_or_set(
            "k",
            || async { Err("upstream failed".to_string()) },
            &CacheOptions::default(),
        )
        .await;

    assert_eq!(result, Err("upstream failed".to_string()));
    assert!(!cache.exists("k", &CacheOptions::default()).await);
}

#[tokio::test]
async fn test_get_or_set_refetches_after_expiry() {
    let (cache, clock) = manual_manager(CacheConfig::default());
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let fetch = move || async move { Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst)) };

    let first = cache.get_or_set("n", fetch, &CacheOptions::with_ttl(1)).await;
    clock.advance(Duration::from_secs(2));
    let second = cache.get_or_set("n", fetch, &CacheOptions::with_ttl(1)).await;

    assert_eq!(first, Ok(0));
    assert_eq!(second, Ok(1));
}

#[tokio::test]
async fn test_get_or_set_fetcher_may_use_the_cache() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let cache_ref = &cache;

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        cache.get_or_set(
            "outer",
            move || async move {
                let opts = CacheOptions::default();
                cache_ref.set("inner", &41, &opts).await;
                let inner: Option<i32> = cache_ref.get("inner", &opts).await;
                Ok::<_, ()>(inner.unwrap_or(0) + 1)
            },
            &CacheOptions::default(),
        ),
    )
    .await
    .expect("fetcher re-entering the cache must not block");

    assert_eq!(result, Ok(42));
    let outer: Option<i32> = cache.get("outer", &CacheOptions::default()).await;
    assert_eq!(outer, Some(42));
}

#[tokio::test]
async fn test_concurrent_get_or_set_each_fetch() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let counter = AtomicUsize::new(0);
    let barrier = tokio::sync::Barrier::new(2);
    let (calls, gate) = (&counter, &barrier);

    // Both fetchers must be in flight at once for the barrier to open.
    let fetch = move || async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        gate.wait().await;
        Ok::<_, ()>(n)
    };
    let opts = CacheOptions::default();

    let both = async {
        tokio::join!(
            cache.get_or_set("same", fetch, &opts),
            cache.get_or_set("same", fetch, &opts)
        )
    };
    let (a, b) = tokio::time::timeout(Duration::from_secs(5), both)
        .await
        .expect("both callers should fetch independently");

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    let mut results = vec![a.unwrap(), b.unwrap()];
    results.sort();
    assert_eq!(results, vec![0, 1]);
    assert_eq!(cache.stats().await.misses, 2);
}

// == Fail-Open ==

#[tokio::test]
async fn test_invalid_key_fails_open() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let long_key = "k".repeat(600);
    let opts = CacheOptions::default();

    assert!(!cache.set(&long_key, &1, &opts).await);
    let value: Option<i32> = cache.get(&long_key, &opts).await;
    assert_eq!(value, None);
    assert!(!cache.delete("", &opts).await);
    assert!(cache.keys().await.is_empty());
}

#[tokio::test]
async fn test_backend_failure_fails_open() {
    let cache = CacheManager::with_backend(CacheConfig::default(), Arc::new(FailingBackend));
    let opts = CacheOptions::default();

    assert!(!cache.set("k", &1, &opts).await);
    let value: Option<i32> = cache.get("k", &opts).await;
    assert_eq!(value, None);
    assert!(!cache.delete("k", &opts).await);
    assert!(!cache.exists("k", &opts).await);
    assert_eq!(cache.ttl_remaining("k", &opts).await, None);
    assert_eq!(
        cache.delete_by_pattern("*", &opts).await,
        PatternDeletion::default()
    );
    assert!(cache.keys().await.is_empty());
    assert_eq!(cache.stats().await, CacheStats::default());
    cache.clear().await;
}

#[tokio::test]
async fn test_get_or_set_falls_back_to_uncached_fetch() {
    let cache = CacheManager::with_backend(CacheConfig::default(), Arc::new(FailingBackend));
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    for _ in 0..2 {
        let value: std::result::Result<String, ()> = cache
            .get_or_set(
                "k",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("fresh".to_string())
                },
                &CacheOptions::default(),
            )
            .await;
        assert_eq!(value.as_deref(), Ok("fresh"));
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// == Stats ==

#[tokio::test]
async fn test_hit_rate_percentage() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    cache.set("k", &1, &opts).await;

    for _ in 0..3 {
        let _: Option<i32> = cache.get("k", &opts).await;
    }
    let _: Option<i32> = cache.get("missing", &opts).await;

    let stats = cache.stats().await;
    assert_eq!((stats.hits, stats.misses), (3, 1));
    assert_eq!(stats.hit_rate(), 75.0);
}

#[tokio::test]
async fn test_hit_rate_zero_without_reads() {
    let (cache, _) = manual_manager(CacheConfig::default());
    assert_eq!(cache.stats().await.hit_rate(), 0.0);
}

#[tokio::test]
async fn test_clear_wipes_keys_and_keeps_counters() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let opts = CacheOptions::default();
    cache.set("a", &1, &opts).await;
    cache.set("b", &1, &CacheOptions::in_namespace("other")).await;
    let _: Option<i32> = cache.get("a", &opts).await;

    cache.clear().await;

    let stats = cache.stats().await;
    assert!(cache.keys().await.is_empty());
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.current_size, 0);
    assert_eq!(stats.hits, 1);
}

// == Warming ==

#[tokio::test]
async fn test_warm_counts_successes() {
    let (cache, _) = manual_manager(CacheConfig::default());
    let mut scoped = WarmItem::new("cfg", 3, None);
    scoped.namespace = Some("settings".to_string());

    let warmed = cache
        .warm(vec![
            WarmItem::new("one", 1, Some(60)),
            WarmItem::new("", 2, None),
            scoped,
        ])
        .await;

    assert_eq!(warmed, 2);
    let mut keys = cache.keys().await;
    keys.sort();
    assert_eq!(keys, vec!["cache:one", "settings:cfg"]);
}

// == Namespaces ==

#[tokio::test]
async fn test_namespaces_isolate_keys() {
    let (cache, _) = manual_manager(CacheConfig::default());
    cache.set("k", &"default", &CacheOptions::default()).await;
    cache.set("k", &"tenant", &CacheOptions::in_namespace("t1")).await;

    let a: Option<String> = cache.get("k", &CacheOptions::default()).await;
    let b: Option<String> = cache.get("k", &CacheOptions::in_namespace("t1")).await;
    assert_eq!(a.as_deref(), Some("default"));
    assert_eq!(b.as_deref(), Some("tenant"));

    cache.set_namespace("t1");
    let c: Option<String> = cache.get("k", &CacheOptions::default()).await;
    assert_eq!(c.as_deref(), Some("tenant"));
}

// == Lifecycle ==

#[tokio::test]
async fn test_destroy_stops_sweeper_and_clears() {
    let (cache, _) = manual_manager(CacheConfig::default());
    cache.set("k", &1, &CacheOptions::default()).await;
    assert!(cache.spawn_sweeper());

    cache.destroy().await;
    tokio::task::yield_now().await;

    assert!(!cache.is_sweeper_running());
    assert!(cache.keys().await.is_empty());

    cache.destroy().await;
}

#[tokio::test]
async fn test_concurrent_access() {
    let cache = Arc::new(CacheManager::new(CacheConfig::default()));
    let mut handles = Vec::new();

    for task in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let key = format!("t{}:{}", task, i);
                cache.set(&key, &i, &CacheOptions::default()).await;
                let value: Option<i32> = cache.get(&key, &CacheOptions::default()).await;
                assert_eq!(value, Some(i));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = cache.stats().await;
    assert_eq!(stats.entries, 400);
    assert_eq!(stats.hits, 400);
}

#[test]
fn test_global_returns_shared_instance() {
    let first = CacheManager::global();
    let second = CacheManager::global();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.namespace(), "cache");
}
