//! Cache Statistics Module
//!
//! Tracks hit/total lookup counts plus eviction and expiry activity.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
///
/// Counters only ever grow over the lifetime of an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a live, unexpired entry
    pub hits: u64,
    /// All lookups, hits and misses alike
    pub total: u64,
    /// Entries removed by capacity eviction
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Bytes currently held
    pub cur_size: u64,
    /// Capacity in bytes
    pub max_size: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / total, or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    pub fn misses(&self) -> u64 {
        self.total - self.hits
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.total += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.total += 1;
    }

    // == Record Eviction ==
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Expiration ==
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// Hit and total counts, in that order.
    pub fn hit_info(&self) -> (u64, u64) {
        (self.hits, self.total)
    }
}
