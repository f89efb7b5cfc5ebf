//! Cache Facade Module
//!
//! Thread-safe front end over an [`LruEngine`]: optional key hashing plus the
//! public set/get/clear API shared by the memory and disk backends.

use parking_lot::RwLock;
use serde_json::Value;

use crate::cache::entry::{CacheHit, NodeInfo};
use crate::cache::hasher::hash_key;
use crate::cache::lru::LruEngine;
use crate::cache::stats::CacheStats;
use crate::cache::store::ValueStore;
use crate::error::Result;

// == Byte Cache ==
/// Operations common to every cache backend.
pub trait ByteCache: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>, extra: Option<Value>) -> Result<()>;

    /// Returns the value under `key`, `Ok(None)` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<CacheHit>>;

    /// Removes `key`. Removing an absent key succeeds.
    fn clear(&self, key: &str) -> Result<()>;

    /// Removes every entry, stopping at the first failure.
    fn clear_all(&self) -> Result<()>;

    /// Hit and total lookup counts.
    fn get_hit_info(&self) -> (u64, u64);

    /// Removes entries whose TTL has elapsed, returning how many.
    fn purge_expired(&self) -> Result<usize>;

    fn stats(&self) -> CacheStats;
}

// == LRU Cache ==
/// An [`LruEngine`] behind a read/write lock.
///
/// Every operation that can change recency holds the write lock for its
/// whole duration, store I/O included.
pub struct LruCache<S: ValueStore> {
    engine: RwLock<LruEngine<S>>,
    need_crypt_key: bool,
}

impl<S: ValueStore> LruCache<S> {
    pub fn from_engine(engine: LruEngine<S>, need_crypt_key: bool) -> Self {
        Self {
            engine: RwLock::new(engine),
            need_crypt_key,
        }
    }

    /// Key as seen by the engine and the store.
    pub fn internal_key(&self, key: &str) -> String {
        if self.need_crypt_key {
            hash_key(key)
        } else {
            key.to_string()
        }
    }

    pub fn set(&self, key: &str, value: Vec<u8>, extra: Option<Value>) -> Result<()> {
        let key = self.internal_key(key);
        self.engine.write().set(&key, value, extra)
    }

    pub fn get(&self, key: &str) -> Result<Option<CacheHit>> {
        let key = self.internal_key(key);
        self.engine.write().get(&key)
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        let key = self.internal_key(key);
        self.engine.write().clear(&key)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.engine.write().clear_all()
    }

    pub fn get_hit_info(&self) -> (u64, u64) {
        self.engine.read().hit_info()
    }

    pub fn purge_expired(&self) -> Result<usize> {
        self.engine.write().purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.engine.read().stats()
    }

    /// Entries from most to least recently used.
    pub fn traversal(&self) -> Vec<NodeInfo> {
        self.engine.read().traversal()
    }

    pub fn len(&self) -> usize {
        self.engine.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.read().is_empty()
    }

    /// Bytes currently held.
    pub fn cur_size(&self) -> u64 {
        self.engine.read().cur_size()
    }

    pub fn max_size(&self) -> u64 {
        self.engine.read().max_size()
    }
}

impl<S: ValueStore> ByteCache for LruCache<S> {
    fn set(&self, key: &str, value: Vec<u8>, extra: Option<Value>) -> Result<()> {
        LruCache::set(self, key, value, extra)
    }

    fn get(&self, key: &str) -> Result<Option<CacheHit>> {
        LruCache::get(self, key)
    }

    fn clear(&self, key: &str) -> Result<()> {
        LruCache::clear(self, key)
    }

    fn clear_all(&self) -> Result<()> {
        LruCache::clear_all(self)
    }

    fn get_hit_info(&self) -> (u64, u64) {
        LruCache::get_hit_info(self)
    }

    fn purge_expired(&self) -> Result<usize> {
        LruCache::purge_expired(self)
    }

    fn stats(&self) -> CacheStats {
        LruCache::stats(self)
    }
}
