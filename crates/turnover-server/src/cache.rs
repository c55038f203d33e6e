//! Feed cache with expiry support.
//!
//! This module provides a cache for raw feed bytes, keyed by unit. Entries
//! expire at an absolute instant read from an injected [`Clock`], so tests
//! can move time without sleeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use turnover_core::Clock;

/// Storage for fetched feeds.
pub trait FeedCache: Send + Sync {
    /// Returns the cached feed for `unit_id`, unless it has expired.
    fn get(&self, unit_id: &str) -> Option<Vec<u8>>;

    /// Stores a feed until `expiry`.
    fn put(&self, unit_id: &str, bytes: Vec<u8>, expiry: DateTime<Utc>);

    /// Drops every expired entry, returning how many were removed.
    fn evict_expired(&self) -> usize;
}

/// Cache entry containing feed bytes and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Raw feed bytes.
    pub bytes: Vec<u8>,
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
    /// When the entry expires.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns true if the entry has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory feed cache.
pub struct MemoryFeedCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for MemoryFeedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFeedCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl MemoryFeedCache {
    /// Creates an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a copy of the entry for `unit_id`, expired or not.
    pub fn entry(&self, unit_id: &str) -> Option<CacheEntry> {
        self.entries().get(unit_id).cloned()
    }

    /// Removes a cache entry.
    pub fn remove(&self, unit_id: &str) -> Option<CacheEntry> {
        let entry = self.entries().remove(unit_id);
        if entry.is_some() {
            debug!(unit = %unit_id, "Removed cache entry");
        }
        entry
    }

    /// Clears all cache entries.
    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        debug!(count = count, "Cleared all cache entries");
    }

    /// Returns the number of cache entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl FeedCache for MemoryFeedCache {
    fn get(&self, unit_id: &str) -> Option<Vec<u8>> {
        let now = self.clock.now();
        let entries = self.entries();
        let entry = entries.get(unit_id)?;
        if entry.is_expired(now) {
            trace!(unit = %unit_id, "Cache entry expired");
            return None;
        }
        trace!(unit = %unit_id, "Cache hit");
        Some(entry.bytes.clone())
    }

    fn put(&self, unit_id: &str, bytes: Vec<u8>, expiry: DateTime<Utc>) {
        let entry = CacheEntry {
            bytes,
            stored_at: self.clock.now(),
            expires_at: expiry,
        };
        self.entries().insert(unit_id.to_string(), entry);
        debug!(unit = %unit_id, expires_at = %expiry, "Stored cache entry");
    }

    fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|unit, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                trace!(unit = %unit, "Evicting expired cache entry");
            }
            keep
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted = evicted, "Evicted expired cache entries");
        }
        evicted
    }
}
