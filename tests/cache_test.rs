use std::{sync::Arc, time::Duration};

use tokio::time::{advance, sleep};
use utafm::{
    lastfm::params,
    management::{MemoryCache, cache_key},
};

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let cache = MemoryCache::new(Some(Duration::from_secs(300)), 10);
    cache.set("recent", 1, Some(Duration::from_secs(60)));

    advance(Duration::from_secs(59)).await;
    assert_eq!(cache.get("recent"), Some(1));

    advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get("recent"), None);

    // expired entries are removed on read
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_default_ttl_applies_without_explicit_ttl() {
    let cache = MemoryCache::new(Some(Duration::from_secs(300)), 10);
    cache.set("info", "value".to_string(), None);

    advance(Duration::from_secs(299)).await;
    assert!(cache.contains("info"));

    advance(Duration::from_secs(2)).await;
    assert!(!cache.contains("info"));
}

#[tokio::test(start_paused = true)]
async fn test_no_default_ttl_keeps_entries() {
    let cache = MemoryCache::new(None, 10);
    cache.set("forever", 7, None);

    advance(Duration::from_secs(365 * 24 * 3600)).await;
    assert_eq!(cache.get("forever"), Some(7));
}

#[tokio::test(start_paused = true)]
async fn test_full_cache_evicts_least_recently_accessed() {
    let cache = MemoryCache::new(None, 3);

    cache.set("a", 1, None);
    advance(Duration::from_millis(10)).await;
    cache.set("b", 2, None);
    advance(Duration::from_millis(10)).await;
    cache.set("c", 3, None);
    advance(Duration::from_millis(10)).await;

    // touching "a" makes "b" the oldest
    assert_eq!(cache.get("a"), Some(1));
    advance(Duration::from_millis(10)).await;

    cache.set("d", 4, None);

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("a"), Some(1));
    assert_eq!(cache.get("c"), Some(3));
    assert_eq!(cache.get("d"), Some(4));
}

#[tokio::test(start_paused = true)]
async fn test_overwriting_existing_key_does_not_evict() {
    let cache = MemoryCache::new(None, 2);

    cache.set("a", 1, None);
    advance(Duration::from_millis(10)).await;
    cache.set("b", 2, None);
    advance(Duration::from_millis(10)).await;
    cache.set("a", 10, None);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), Some(10));
    assert_eq!(cache.get("b"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_counts_removed_entries() {
    let cache = MemoryCache::new(None, 10);
    cache.set("short", 1, Some(Duration::from_secs(10)));
    cache.set("short2", 2, Some(Duration::from_secs(10)));
    cache.set("long", 3, Some(Duration::from_secs(1000)));

    advance(Duration::from_secs(11)).await;

    assert_eq!(cache.purge_expired(), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_removes_expired_entries() {
    let cache = Arc::new(MemoryCache::new(None, 10));
    cache.set("short", 1, Some(Duration::from_secs(10)));
    cache.set("long", 2, Some(Duration::from_secs(3600)));

    let sweeper = cache.spawn_sweeper(Duration::from_secs(60));

    sleep(Duration::from_secs(61)).await;

    // len() does not purge, so only the sweeper could have removed it
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("long"), Some(2));

    sweeper.abort();
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_stops_when_cache_is_dropped() {
    let cache = Arc::new(MemoryCache::<u32>::new(None, 10));
    let sweeper = cache.spawn_sweeper(Duration::from_secs(60));

    drop(cache);

    let finished = tokio::time::timeout(Duration::from_secs(180), sweeper).await;
    assert!(finished.is_ok());
}

#[test]
fn test_remove_and_clear() {
    let cache = MemoryCache::new(None, 10);
    cache.set("a", 1, None);
    cache.set("b", 2, None);

    assert!(cache.remove("a"));
    assert!(!cache.remove("a"));

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_cache_key_ignores_order_and_empty_values() {
    let first = params([("method", "user.getinfo"), ("user", "alice"), ("username", "")]);
    let second = params([("user", "alice"), ("method", "user.getinfo")]);

    assert_eq!(cache_key(&first), cache_key(&second));
}

#[test]
fn test_cache_key_differs_by_value() {
    let alice = params([("method", "user.getinfo"), ("user", "alice")]);
    let bob = params([("method", "user.getinfo"), ("user", "bob")]);

    assert_ne!(cache_key(&alice), cache_key(&bob));
}
