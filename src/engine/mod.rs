//! Regex engine: pattern cache and handles
//!
//! An [`Engine`] owns one pattern cache. Asking it twice for the same
//! `(pattern, flags)` while the first handle is still alive returns the same
//! `Arc`; once every handle is gone the entry disappears with it.
//!
//! ```
//! use std::sync::Arc;
//! use rexvm::{Engine, FlagSet};
//!
//! let engine = Engine::new();
//! let a = engine.get_or_create("(\\w+)@(\\w+)", FlagSet::empty());
//! let b = engine.get_or_create("(\\w+)@(\\w+)", FlagSet::empty());
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! let m = a.find("mail bob@host").unwrap();
//! assert_eq!(m.group(2), Some("host"));
//! ```

mod cache;
mod config;
mod handle;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

pub use cache::{CachePolicy, CacheStats, PatternCache, PatternKey};
pub use config::{
    ConfigError, EngineConfig, ENV_CACHE_CAPACITY, ENV_JIT, ENV_NATIVE_BACKTRACK_CAPACITY,
    ENV_TRACE,
};
pub use handle::{CaptureBuffer, FindIter, Match, RegexHandle};

use crate::flags::FlagSet;
use crate::syntax::ParseError;

/// Owner of a pattern cache
///
/// Handles are built under the cache lock, so each distinct key is parsed
/// and compiled at most once while a handle for it is alive.
pub struct Engine {
    cache: Arc<Mutex<PatternCache>>,
    config: EngineConfig,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        debug!(target: "rexvm::engine", ?config, "Creating engine");
        Self {
            cache: Arc::new(Mutex::new(PatternCache::new(config.cache_policy))),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cached handle for `(pattern, flags)`, built on a miss
    ///
    /// A pattern that fails to parse still yields a (cached) handle that
    /// never matches; see [`Engine::try_get_or_create`] for the error.
    pub fn get_or_create(&self, pattern: &str, flags: FlagSet) -> Arc<RegexHandle> {
        let key = PatternKey::new(pattern, flags);
        let mut cache = self.cache.lock();

        let (existing, released) = cache.lookup(&key);
        if let Some(handle) = existing {
            drop(cache);
            drop(released);
            return handle;
        }

        let handle = Arc::new(RegexHandle::build(
            key.clone(),
            self.config.hybrid_config(),
            Arc::downgrade(&self.cache),
        ));
        let released = cache.insert(key, &handle);
        drop(cache);
        drop(released);
        handle
    }

    /// Like [`Engine::get_or_create`], but reports a parse failure
    pub fn try_get_or_create(
        &self,
        pattern: &str,
        flags: FlagSet,
    ) -> Result<Arc<RegexHandle>, ParseError> {
        let handle = self.get_or_create(pattern, flags);
        match handle.parse_error() {
            Some(err) => Err(err.clone()),
            None => Ok(handle),
        }
    }

    /// Number of cached entries whose handle is alive
    pub fn cache_len(&self) -> usize {
        self.cache.lock().live_len()
    }

    /// Forget every entry and release retained handles
    ///
    /// Handles held elsewhere stay valid; the next lookup builds a new one.
    pub fn clear_cache(&self) {
        let released = self.cache.lock().clear();
        debug!(target: "rexvm::engine", released = released.len(), "Cleared pattern cache");
        drop(released);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let released = self.cache.lock().clear();
        drop(released);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("cache_len", &self.cache_len())
            .finish()
    }
}
