//! Cache Entry Module
//!
//! Defines the node stored for every live key, with its recency links and
//! TTL metadata.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

// == Cache Entry ==
/// One live key in the engine arena.
///
/// `prev` and `next` are arena slot indices; `prev` points towards the most
/// recently used end of the list.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key after optional hashing
    pub key: String,
    /// Resident payload, None when the store keeps it elsewhere
    pub value: Option<Vec<u8>>,
    /// Byte length of the payload, counted against capacity
    pub size: u64,
    /// Caller metadata, returned untouched on access
    pub extra: Option<Value>,
    /// Last touch (Unix milliseconds)
    pub access_time: u64,
    /// Number of touches, creation included
    pub access_count: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expire_time: Option<u64>,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a detached entry touched now, expiring after `ttl_seconds` if non-zero.
    pub fn new(
        key: String,
        value: Option<Vec<u8>>,
        size: u64,
        extra: Option<Value>,
        ttl_seconds: u64,
    ) -> Self {
        let now = current_timestamp_ms();
        Self {
            key,
            value,
            size,
            extra,
            access_time: now,
            access_count: 1,
            expire_time: expiry_from(now, ttl_seconds),
            prev: None,
            next: None,
        }
    }

    /// Rebuilds a node for a payload found in the store at startup.
    ///
    /// Nothing is known about past touches, so `access_count` starts at 0.
    pub fn restored(key: String, size: u64, access_time: u64, expire_time: Option<u64>) -> Self {
        Self {
            key,
            value: None,
            size,
            extra: None,
            access_time,
            access_count: 0,
            expire_time,
            prev: None,
            next: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expire_time`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expire_time {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records an access at `now`. Access time never moves backwards.
    pub fn touch(&mut self, now: u64) {
        self.access_time = self.access_time.max(now);
        self.access_count += 1;
    }

    /// Metadata snapshot without the payload.
    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            key: self.key.clone(),
            size: self.size,
            extra: self.extra.clone(),
            access_time: self.access_time,
            access_count: self.access_count,
            expire_time: self.expire_time,
        }
    }
}

// == Node Info ==
/// Read-only view of a node, as produced by a traversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub key: String,
    pub size: u64,
    pub extra: Option<Value>,
    pub access_time: u64,
    pub access_count: u64,
    pub expire_time: Option<u64>,
}

impl NodeInfo {
    /// Milliseconds left before expiry at `now`, None if the node never expires.
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.expire_time.map(|expires| expires.saturating_sub(now))
    }
}

// == Cache Hit ==
/// Value and metadata returned by a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub value: Vec<u8>,
    pub extra: Option<Value>,
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Absolute expiry for an entry touched at `from`, None when `ttl_seconds` is 0.
pub fn expiry_from(from: u64, ttl_seconds: u64) -> Option<u64> {
    if ttl_seconds > 0 {
        Some(from.saturating_add(ttl_seconds.saturating_mul(1000)))
    } else {
        None
    }
}
