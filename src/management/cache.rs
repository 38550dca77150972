use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};

use crate::lastfm::Params;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Time-expiring key/value cache with least-recently-accessed eviction.
///
/// Expired entries are dropped lazily on read and by a periodic sweep
/// ([`MemoryCache::spawn_sweeper`]) so keys that are never read again do not
/// pile up.
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Option<Duration>,
    max_size: usize,
}

impl<V: Clone> MemoryCache<V> {
    /// `default_ttl` of `None` keeps entries without an explicit TTL forever.
    pub fn new(default_ttl: Option<Duration>, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            max_size: max_size.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired = entries.get(key)?.is_expired(now);
        if expired {
            entries.remove(key);
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.last_accessed = now;
        Some(entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entries = self.lock();

        if entries.len() >= self.max_size && !entries.contains_key(key) {
            Self::evict_lru(&mut entries);
        }

        let expires_at = ttl.or(self.default_ttl).map(|ttl| now + ttl);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at,
                last_accessed: now,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry whose TTL has elapsed and returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn evict_lru(entries: &mut HashMap<String, CacheEntry<V>>) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            tracing::trace!(target: "cache", key = %key, "evicting least recently used entry");
            entries.remove(&key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V: Clone + Send + 'static> MemoryCache<V> {
    /// Sweeps expired entries every `interval` for as long as the cache is
    /// alive. The task ends once the last `Arc` to the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(target: "cache", removed, "swept expired cache entries");
                }
            }
        })
    }
}

/// Canonical cache key: sorted parameters with empty values dropped.
pub fn cache_key(params: &Params) -> String {
    let canonical: Params = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::to_string(&canonical).unwrap_or_default()
}
