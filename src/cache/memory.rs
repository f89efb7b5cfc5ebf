//! Memory Cache Module
//!
//! LRU cache whose values live inside the engine nodes.

use crate::cache::facade::LruCache;
use crate::cache::lru::LruEngine;
use crate::cache::store::MemoryStore;
use crate::config::CacheConfig;

/// In-process byte cache, 64 MiB by default.
pub type MemCache = LruCache<MemoryStore>;

impl LruCache<MemoryStore> {
    /// Creates an empty memory cache from `config`.
    ///
    /// `cache_dir` is ignored.
    pub fn new(config: &CacheConfig) -> Self {
        let engine = LruEngine::new(MemoryStore::new(), config.memory_capacity(), config.ttl)
            .with_eviction_errors(config.eviction_errors);
        Self::from_engine(engine, config.need_crypt_key)
    }

    /// Memory cache of `max_size` bytes without key hashing or TTL.
    pub fn with_capacity(max_size: i64) -> Self {
        Self::new(&CacheConfig::default().with_max_size(max_size))
    }
}
