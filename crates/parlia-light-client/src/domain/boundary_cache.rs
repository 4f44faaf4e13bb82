//! # Boundary Height Cache
//!
//! Memoizes the first block height of timestamp-activated forks.
//!
//! Owned by the caller and injected where needed. Disabling or clearing it
//! never changes results, only the number of header fetches.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use super::invariants::DEFAULT_BOUNDARY_CACHE_SIZE;

/// LRU cache from fork activation timestamp (ms) to boundary height.
#[derive(Debug)]
pub struct BoundaryHeightCache {
    entries: Option<Mutex<LruCache<u64, u64>>>,
}

impl Default for BoundaryHeightCache {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNDARY_CACHE_SIZE)
    }
}

impl BoundaryHeightCache {
    /// Create a cache holding up to `capacity` entries; 0 disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    /// Whether lookups can hit.
    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Cached boundary height for a fork timestamp.
    pub fn get(&self, timestamp: u64) -> Option<u64> {
        self.entries.as_ref()?.lock().get(&timestamp).copied()
    }

    /// Store a resolved boundary. Height 0 means "not forked yet" and is skipped.
    pub fn insert(&self, timestamp: u64, height: u64) {
        if height == 0 {
            return;
        }
        if let Some(entries) = &self.entries {
            entries.lock().put(timestamp, height);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.lock().len())
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
