//! Listing page cache
//!
//! Process-local memoization of rendered listing responses (index, group and
//! profile pages) with a short TTL. Writes do not have to invalidate entries:
//! readers may see a listing up to one TTL old. Callers that need strict
//! recency use [`ListingCache::invalidate`] / [`ListingCache::invalidate_prefix`],
//! and tests run with [`ListingCache::disabled`].

mod keys;

pub use keys::{ListingKey, LISTING_CACHE_VERSION};

use crate::config::CacheConfig;
use crate::metrics::{LISTING_CACHE_INVALIDATIONS, LISTING_CACHE_LOOKUPS};
use bytes::Bytes;
use dashmap::DashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default listing TTL
pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(20);

/// Default bound on stored entries
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Cached entry with TTL metadata
#[derive(Debug, Clone)]
struct CachedEntry {
    data: Bytes,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(data: Bytes, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub struct ListingCache {
    store: DashMap<String, CachedEntry>,
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
    invalidate_on_write: bool,
}

impl ListingCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        debug!(
            ttl_secs = ttl.as_secs_f64(),
            max_entries, "Initializing listing cache"
        );

        Self {
            store: DashMap::new(),
            ttl,
            max_entries,
            enabled: true,
            invalidate_on_write: false,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(
            Duration::from_secs(config.listing_ttl_secs),
            config.max_entries,
        );
        cache.enabled = config.enabled;
        cache.invalidate_on_write = config.invalidate_on_write;
        cache
    }

    /// A cache that never stores anything; every lookup goes to the loader
    pub fn disabled() -> Self {
        Self {
            store: DashMap::new(),
            ttl: Duration::ZERO,
            max_entries: 0,
            enabled: false,
            invalidate_on_write: false,
        }
    }

    pub fn with_invalidate_on_write(mut self, invalidate_on_write: bool) -> Self {
        self.invalidate_on_write = invalidate_on_write;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.ttl.is_zero() && self.max_entries > 0
    }

    /// Whether authoring operations should drop affected listings eagerly
    pub fn invalidates_on_write(&self) -> bool {
        self.is_enabled() && self.invalidate_on_write
    }

    /// Fresh cached value, if any. Expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                return Some(entry.data.clone());
            }
        }

        self.store.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    pub fn insert(&self, key: String, data: Bytes) {
        if !self.is_enabled() {
            return;
        }

        if self.store.len() >= self.max_entries && !self.store.contains_key(&key) {
            self.store.retain(|_, entry| !entry.is_expired());
            if self.store.len() >= self.max_entries {
                debug!(%key, "Listing cache full, not storing");
                return;
            }
        }

        self.store.insert(key, CachedEntry::new(data, self.ttl));
    }

    /// Return the cached body for `key` or run `loader` and cache its output
    pub async fn get_or_load<F, Fut, E>(&self, key: String, loader: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if !self.is_enabled() {
            LISTING_CACHE_LOOKUPS.with_label_values(&["bypass"]).inc();
            return loader().await;
        }

        if let Some(data) = self.get(&key) {
            LISTING_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
            debug!(%key, "Listing cache HIT");
            return Ok(data);
        }

        LISTING_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
        debug!(%key, "Listing cache MISS");

        let data = loader().await?;
        self.insert(key, data.clone());
        Ok(data)
    }

    /// Drop specific keys; returns how many were present
    pub fn invalidate(&self, keys: &[String]) -> usize {
        let removed = keys
            .iter()
            .filter(|key| self.store.remove(key.as_str()).is_some())
            .count();
        LISTING_CACHE_INVALIDATIONS.inc_by(removed as u64);
        removed
    }

    /// Drop every key starting with `prefix`; returns how many were removed
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = self.invalidate(&keys);
        debug!(%prefix, removed, "Listing cache prefix invalidation");
        removed
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(DEFAULT_LISTING_TTL, DEFAULT_MAX_ENTRIES)
    }
}
