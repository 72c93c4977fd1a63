//! LRU cache of parsed tables of contents, keyed by (manual, version).

use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Toc;
use crate::config::CacheConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TocCacheKey {
    manual: String,
    version: String,
}

impl TocCacheKey {
    fn new(manual: &str, version: &str) -> Self {
        Self {
            manual: manual.to_lowercase(),
            version: version.to_string(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
}

/// Parsed TOC cache.
///
/// A disabled cache stores nothing and every lookup misses.
#[derive(Debug)]
pub struct TocCache {
    cache: Option<RwLock<LruCache<TocCacheKey, Arc<Toc>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TocCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl TocCache {
    /// Create a cache with the given bounds.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            RwLock::new(LruCache::new(size))
        });
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(&CacheConfig {
            max_entries: 0,
            enabled: false,
        })
    }

    /// Cached TOC for (manual, version).
    pub fn get(&self, manual: &str, version: &str) -> Option<Arc<Toc>> {
        let found = self
            .cache
            .as_ref()
            .and_then(|c| c.read().peek(&TocCacheKey::new(manual, version)).cloned());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a TOC under its own (manual, version).
    pub fn insert(&self, toc: Arc<Toc>) {
        if let Some(cache) = &self.cache {
            let key = TocCacheKey::new(&toc.manual, &toc.version);
            cache.write().put(key, toc);
        }
    }

    /// Drop the entry for (manual, version). Returns whether one was present.
    pub fn invalidate(&self, manual: &str, version: &str) -> bool {
        let removed = self
            .cache
            .as_ref()
            .and_then(|c| c.write().pop(&TocCacheKey::new(manual, version)))
            .is_some();
        if removed {
            tracing::debug!(manual, version, "Invalidated cached TOC");
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
    }

    /// Get cache statistics. `None` when disabled.
    pub fn stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
                hits: self.hits.load(Ordering::Relaxed),
                misses: self.misses.load(Ordering::Relaxed),
            }
        })
    }
}
