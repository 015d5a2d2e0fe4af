// =====================================================================================
// TTL RESPONSE CACHE
// =====================================================================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cache_name: String,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

/// Keyed in-memory cache shared by concurrent workers. Population is
/// put-if-absent under the write lock, so racing writers converge on one value.
#[derive(Debug)]
pub struct TtlCache<T> {
    name: String,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    max_entries: usize,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(name: &str, ttl: Duration) -> Self {
        Self::with_capacity(name, ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(name: &str, ttl: Duration, max_entries: usize) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                debug!(cache = %self.name, key, "cache hit");
                Some(entry.data.clone())
            }
            _ => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                debug!(cache = %self.name, key, "cache miss");
                None
            }
        }
    }

    /// Stores `value` unless a live entry already exists; returns the value
    /// that ends up cached.
    pub async fn put_if_absent(&self, key: &str, value: T) -> T {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(key) {
            if !existing.is_expired() {
                return existing.data.clone();
            }
        }

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            self.evict(&mut entries);
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                data: value.clone(),
                created_at: Instant::now(),
                ttl: self.ttl,
            },
        );

        value
    }

    /// Returns the cached value or runs `fetch` and caches its success.
    /// Errors are never cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        let fetched = fetch().await?;
        Ok(self.put_if_absent(key, fetched).await)
    }

    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await.len();
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            cache_name: self.name.clone(),
            entries,
            hits,
            misses,
            evictions: self.eviction_count.load(Ordering::Relaxed),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }

    // Expired entries go first, then the oldest 10%.
    fn evict(&self, entries: &mut HashMap<String, CacheEntry<T>>) {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());

        if entries.len() >= self.max_entries {
            let mut by_age: Vec<(String, Instant)> = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.created_at))
                .collect();
            by_age.sort_by_key(|(_, created_at)| *created_at);

            let to_remove = (entries.len() / 10).max(1);
            for (key, _) in by_age.into_iter().take(to_remove) {
                entries.remove(&key);
            }
        }

        let removed = before - entries.len();
        self.eviction_count.fetch_add(removed as u64, Ordering::Relaxed);
        debug!(cache = %self.name, removed, "cache evicted entries");
    }
}
