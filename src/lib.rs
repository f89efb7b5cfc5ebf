//! byte_lru - A size-bounded LRU byte cache
//!
//! One recency engine with TTL expiry and batch eviction, driving either
//! in-memory values or one file per entry on disk.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{ByteCache, CacheHit, DiskCache, MemCache};
pub use config::{CacheConfig, EvictionErrorPolicy};
pub use error::{CacheError, Result};
pub use tasks::spawn_expiry_sweeper;
