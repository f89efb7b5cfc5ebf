//! Cache Module
//!
//! Size-bounded LRU engine with TTL expiry, and the memory and disk
//! backends built on it.

mod disk;
mod entry;
mod facade;
mod file_time;
mod hasher;
mod lru;
mod memory;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use disk::{DiskCache, DiskStore};
pub use entry::{current_timestamp_ms, CacheEntry, CacheHit, NodeInfo};
pub use facade::{ByteCache, LruCache};
pub use file_time::FileTimes;
pub use hasher::{hash_key, HASHED_KEY_LEN};
pub use lru::{LruEngine, NodeId, RestoredEntry, WarmStartReport, EVICTION_BATCH_DIVISOR};
pub use memory::MemCache;
pub use stats::CacheStats;
pub use store::{MemoryStore, ValueStore};
