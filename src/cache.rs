//! TTL-bounded, capacity-bounded local result cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::CacheConfig;

/// One cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value.
    pub value: Value,
    /// When the entry was written.
    pub created_at: Instant,
    /// Time-to-live; the entry is expired once this has elapsed.
    pub ttl: Duration,
    /// Number of hits this entry has served.
    pub access_count: u64,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            access_count: 0,
        }
    }

    /// Returns true once the entry's TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Accesses served from a fresh entry.
    pub hits: u64,
    /// Accesses that found nothing usable.
    pub misses: u64,
    /// Entries currently held.
    pub size: usize,
    /// Maximum entries held at once.
    pub capacity: usize,
    /// `hits / (hits + misses) * 100`; 0.0 when no accesses have occurred.
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl CacheInner {
    /// Make room for one new entry: delete any expired entry if one exists,
    /// otherwise the entry with the globally lowest access count
    /// (ties broken by smallest key).
    fn evict_one(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .find(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
        {
            debug!(key = %key, "evicting expired entry");
            self.entries.remove(&key);
            return;
        }

        let victim = self
            .entries
            .iter()
            .min_by(|(ka, ea), (kb, eb)| {
                ea.access_count
                    .cmp(&eb.access_count)
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(k, _)| k.clone());

        if let Some(key) = victim {
            debug!(key = %key, "evicting least-accessed entry");
            self.entries.remove(&key);
        }
    }
}

/// TTL + capacity bounded cache with hit/miss accounting.
///
/// A single mutex guards the entries and the counters, so every public
/// method is atomic end-to-end; two sequential calls are not jointly atomic.
#[derive(Debug)]
pub struct EdgeCache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl EdgeCache {
    /// Create a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Look up a key.
    ///
    /// An absent key is a miss. A present-but-expired entry is deleted and
    /// counted as a miss, never a hit. A fresh entry counts as a hit and has
    /// its access count incremented.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.access_count += 1;
                inner.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite a value.
    ///
    /// When the cache is at capacity and the key is new, one entry is
    /// evicted first; the size never exceeds the configured capacity.
    pub async fn put(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let mut inner = self.inner.lock().await;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.capacity {
            inner.evict_one();
        }
        inner.entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Remove a key. Returns false when absent.
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.lock().await.entries.remove(key).is_some()
    }

    /// Remove everything. Returns the number of entries removed.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let count = inner.entries.len();
        inner.entries.clear();
        count
    }

    /// Remove every expired entry. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.is_expired());
        before - inner.entries.len()
    }

    /// Current statistics.
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let accesses = inner.hits + inner.misses;
        let hit_rate = if accesses == 0 {
            0.0
        } else {
            inner.hits as f64 / accesses as f64 * 100.0
        };

        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
            capacity: self.config.capacity,
            hit_rate,
        }
    }
}

impl Default for EdgeCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
