// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Exact-match (L1) calculation cache.

TTL + LRU cache over an `AHashMap` behind a `parking_lot::RwLock`.

- Lookups take the read lock; access statistics are atomics inside each
  entry, so concurrent hits never serialize on a write lock.
- Recency is a logical tick rather than wall time, which keeps LRU order
  exact even when many accesses land in the same clock instant.
- Values are stored as `Arc<V>` snapshots and never mutated in place.
*/

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::CacheConfig;

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
    access_count: AtomicU64,
    last_access_tick: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheMetrics {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub max_size: usize,
    pub evictions: u64,
    pub expirations: u64,
    pub approximate_memory_bytes: usize,
    pub last_cleared: Option<DateTime<Utc>>,
}

struct Inner<K, V> {
    config: CacheConfig,
    entries: RwLock<AHashMap<K, CacheEntry<V>>>,
    clock: AtomicU64,
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    eviction_in_progress: AtomicBool,
    sweep_lock: Mutex<()>,
    last_cleared: Mutex<Option<DateTime<Utc>>>,
}

/// Thread-safe exact-match cache. Cloning shares the same storage.
pub struct ExactCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for ExactCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> ExactCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: RwLock::new(AHashMap::new()),
                clock: AtomicU64::new(0),
                requests: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
                expirations: AtomicU64::new(0),
                eviction_in_progress: AtomicBool::new(false),
                sweep_lock: Mutex::new(()),
                last_cleared: Mutex::new(None),
            }),
        }
    }

    /// Live value for `key`. An expired entry is removed and reported as a miss.
    pub fn try_get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.try_get(key)
    }

    /// Insert or overwrite `key` with the configured TTL
    pub fn set(&self, key: K, value: impl Into<Arc<V>>) {
        let ttl = self.inner.config.ttl;
        self.set_with_ttl(key, value, ttl);
    }

    pub fn set_with_ttl(&self, key: K, value: impl Into<Arc<V>>, ttl: Duration) {
        let len = self.inner.insert(key, value.into(), ttl);
        if len > self.inner.config.max_cache_size {
            self.schedule_eviction();
        }
    }

    /// Remove every entry and record the clear time
    pub fn clear(&self) {
        self.inner.entries.write().clear();
        *self.inner.last_cleared.lock() = Some(Utc::now());
        debug!(target: "chimera-expression", "[L1] Cache cleared");
    }

    /// Remove all expired entries. Returns 0 without work if a sweep is
    /// already running on another thread.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// Remove the least-recently-used share of entries (expired ones first).
    ///
    /// Removes `max(len - max_cache_size, ceil(len * eviction_fraction))`.
    pub fn evict_lru(&self) -> usize {
        self.inner.evict_lru()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// True while a background eviction pass is queued or running
    pub fn is_evicting(&self) -> bool {
        self.inner.eviction_in_progress.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> CacheMetrics {
        let size = self.len();
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let per_entry = std::mem::size_of::<K>()
            + std::mem::size_of::<CacheEntry<V>>()
            + std::mem::size_of::<V>();
        CacheMetrics {
            total_requests: self.inner.requests.load(Ordering::Relaxed),
            hits,
            misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            size,
            max_size: self.inner.config.max_cache_size,
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            expirations: self.inner.expirations.load(Ordering::Relaxed),
            approximate_memory_bytes: size * per_entry,
            last_cleared: *self.inner.last_cleared.lock(),
        }
    }

    fn schedule_eviction(&self) {
        if !self.inner.config.async_eviction {
            self.inner.evict_lru();
            return;
        }
        // One background pass at a time; later overflows are covered by it
        if self
            .inner
            .eviction_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let inner = Arc::clone(&self.inner);
        rayon::spawn(move || {
            inner.evict_lru();
            inner.eviction_in_progress.store(false, Ordering::Release);
        });
    }
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn try_get(&self, key: &K) -> Option<Arc<V>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();

        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    entry.access_count.fetch_add(1, Ordering::Relaxed);
                    entry.last_access_tick.store(self.tick(), Ordering::Relaxed);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&entry.value));
                }
                Some(_) => {}
            }
        }

        // Expired: upgrade and re-check, a concurrent set may have replaced it
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            trace!(target: "chimera-expression", "[L1] Expired entry removed on lookup");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn insert(&self, key: K, value: Arc<V>, ttl: Duration) -> usize {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
            access_count: AtomicU64::new(0),
            last_access_tick: AtomicU64::new(self.tick()),
        };
        let mut entries = self.entries.write();
        entries.insert(key, entry);
        entries.len()
    }

    fn sweep_expired(&self) -> usize {
        let Some(_guard) = self.sweep_lock.try_lock() else {
            trace!(target: "chimera-expression", "[L1] Sweep already running, skipped");
            return 0;
        };

        let now = Instant::now();
        let expired: Vec<K> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect()
        };
        if expired.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut entries = self.entries.write();
        for key in &expired {
            if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
                entries.remove(key);
                removed += 1;
            }
        }
        drop(entries);

        self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        debug!(target: "chimera-expression", "[L1] Sweep removed {} expired entries", removed);
        removed
    }

    fn evict_lru(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let len = entries.len();
        if len == 0 {
            return 0;
        }

        let overflow = len.saturating_sub(self.config.max_cache_size);
        let share = (len as f64 * self.config.eviction_fraction as f64).ceil() as usize;
        let target = overflow.max(share).min(len);
        if target == 0 {
            return 0;
        }

        // Expired first, then oldest access
        let mut order: Vec<(bool, u64, K)> = entries
            .iter()
            .map(|(key, entry)| {
                (
                    !entry.is_expired(now),
                    entry.last_access_tick.load(Ordering::Relaxed),
                    key.clone(),
                )
            })
            .collect();
        order.sort_unstable_by_key(|(live, tick, _)| (*live, *tick));

        for (_, _, key) in order.into_iter().take(target) {
            entries.remove(&key);
        }
        drop(entries);

        self.evictions.fetch_add(target as u64, Ordering::Relaxed);
        debug!(target: "chimera-expression", "[L1] Evicted {} of {} entries", target, len);
        target
    }
}
