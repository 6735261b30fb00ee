//! Pattern cache
//!
//! Maps `(pattern text, flags)` to the live [`RegexHandle`] built for it.
//! Entries are weak: the table never keeps a handle alive, and a handle
//! removes its own entry when it is dropped. With [`CachePolicy::Lru`] the
//! most recently used handles are additionally held by strong references.
//!
//! The table is always accessed under the engine's mutex. Methods that may
//! release handles return them instead of dropping them, so callers can drop
//! them after unlocking (a handle's `Drop` locks the table itself).

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::handle::RegexHandle;
use crate::flags::FlagSet;

/// Cache lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub pattern: Box<str>,
    pub flags: FlagSet,
}

impl PatternKey {
    pub fn new(pattern: &str, flags: FlagSet) -> Self {
        Self {
            pattern: pattern.into(),
            flags,
        }
    }
}

/// Retention policy of the pattern cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CachePolicy {
    /// Entries live exactly as long as their handles
    #[default]
    Weak,
    /// Also keep the `capacity` most recently used handles alive
    Lru { capacity: usize },
}

/// Counters for cache monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by a live entry
    pub hits: u64,
    /// Lookups that built a new handle
    pub misses: u64,
    /// Entries inserted
    pub insertions: u64,
    /// Entries removed because their handle was dropped
    pub removals: u64,
    /// Handles released by the LRU retention layer
    pub evictions: u64,
}

/// Weak table plus optional LRU retention
#[derive(Debug)]
pub struct PatternCache {
    entries: HashMap<PatternKey, Weak<RegexHandle>>,
    retained: Option<LruCache<PatternKey, Arc<RegexHandle>>>,
    stats: CacheStats,
}

impl PatternCache {
    pub fn new(policy: CachePolicy) -> Self {
        let retained = match policy {
            CachePolicy::Weak => None,
            CachePolicy::Lru { capacity } => NonZeroUsize::new(capacity).map(LruCache::new),
        };
        Self {
            entries: HashMap::new(),
            retained,
            stats: CacheStats::default(),
        }
    }

    /// Live handle for `key`, counting a hit or a miss
    ///
    /// On a hit the second value is a handle released by the retention
    /// layer, to be dropped after unlocking.
    pub fn lookup(&mut self, key: &PatternKey) -> (Option<Arc<RegexHandle>>, Option<Arc<RegexHandle>>) {
        match self.entries.get(key).and_then(Weak::upgrade) {
            Some(handle) => {
                self.stats.hits += 1;
                trace!(target: "rexvm::cache", pattern = %key.pattern, flags = %key.flags, "Cache hit");
                let released = self.retain(key, &handle);
                (Some(handle), released)
            }
            None => {
                self.stats.misses += 1;
                trace!(target: "rexvm::cache", pattern = %key.pattern, flags = %key.flags, "Cache miss");
                (None, None)
            }
        }
    }

    /// Record a freshly built handle
    ///
    /// Returns a handle released by the retention layer, if any.
    pub fn insert(&mut self, key: PatternKey, handle: &Arc<RegexHandle>) -> Option<Arc<RegexHandle>> {
        self.stats.insertions += 1;
        trace!(target: "rexvm::cache", pattern = %key.pattern, flags = %key.flags, "Cache insert");
        let released = self.retain(&key, handle);
        self.entries.insert(key, Arc::downgrade(handle));
        released
    }

    fn retain(&mut self, key: &PatternKey, handle: &Arc<RegexHandle>) -> Option<Arc<RegexHandle>> {
        let retained = self.retained.as_mut()?;
        if retained.get(key).is_some() {
            return None;
        }
        match retained.push(key.clone(), Arc::clone(handle)) {
            Some((evicted_key, evicted)) if evicted_key != *key => {
                self.stats.evictions += 1;
                trace!(
                    target: "rexvm::cache",
                    pattern = %evicted_key.pattern,
                    flags = %evicted_key.flags,
                    "Cache evict"
                );
                Some(evicted)
            }
            Some((_, replaced)) => Some(replaced),
            None => None,
        }
    }

    /// Remove the entry for `key` if it still refers to `handle`
    ///
    /// Called from the handle's destructor; an entry that already points at a
    /// newer handle for the same key is left alone.
    pub fn remove_if_same(&mut self, key: &PatternKey, handle: *const RegexHandle) {
        let same = self
            .entries
            .get(key)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), handle));
        if same {
            self.entries.remove(key);
            self.stats.removals += 1;
            trace!(target: "rexvm::cache", pattern = %key.pattern, flags = %key.flags, "Cache remove");
        }
    }

    /// Number of entries whose handle is alive
    pub fn live_len(&self) -> usize {
        self.entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Number of handles held by the retention layer
    pub fn retained_len(&self) -> usize {
        self.retained.as_ref().map_or(0, LruCache::len)
    }

    /// Drop every entry; returns the retained handles for release
    pub fn clear(&mut self) -> Vec<Arc<RegexHandle>> {
        self.entries.clear();
        match self.retained.as_mut() {
            Some(retained) => {
                let mut released = Vec::with_capacity(retained.len());
                while let Some((_, handle)) = retained.pop_lru() {
                    released.push(handle);
                }
                released
            }
            None => Vec::new(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}
