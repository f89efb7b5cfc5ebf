//! Configuration Module
//!
//! Construction parameters for memory and disk caches, loadable from
//! environment variables.

use std::env;
use std::str::FromStr;

// == Defaults ==
/// Capacity used by memory caches when `max_size <= 0` (64 MiB).
pub const DEFAULT_MAX_MEM_CACHE_SIZE: u64 = 64 << 20;

/// Capacity used by disk caches when `max_size <= 0` (4 GiB).
pub const DEFAULT_MAX_DISK_CACHE_SIZE: u64 = 4 << 30;

/// Directory used by disk caches when none is configured.
pub const DEFAULT_DISK_CACHE_DIR: &str = "./cache/";

// == Eviction Error Policy ==
/// What eviction does when the value store fails to delete an evicted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionErrorPolicy {
    /// Log the failure and keep evicting.
    #[default]
    BestEffort,
    /// Stop the batch at the first failure and report it.
    FailFast,
}

impl FromStr for EvictionErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" => Ok(Self::BestEffort),
            "fail-fast" | "fail_fast" | "failfast" => Ok(Self::FailFast),
            other => Err(format!("unknown eviction error policy: {}", other)),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Capacity in bytes; `<= 0` selects the backend default
    pub max_size: i64,
    /// Replace every key with its digest before it reaches the engine
    pub need_crypt_key: bool,
    /// Directory holding one file per entry (disk caches only)
    pub cache_dir: String,
    /// Default time-to-live in seconds for new entries, 0 = never expire
    pub ttl: u64,
    /// Handling of store failures while evicting
    pub eviction_errors: EvictionErrorPolicy,
    /// Interval in seconds for the background expiry sweeper, 0 = disabled
    pub sweep_interval: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Capacity in bytes (default: 0, backend default)
    /// - `CACHE_NEED_CRYPT_KEY` - Hash keys, `true`/`1` to enable (default: false)
    /// - `CACHE_DIR` - Disk cache directory (default: `./cache/`)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 0)
    /// - `CACHE_EVICTION_ERRORS` - `best-effort` or `fail-fast` (default: best-effort)
    /// - `CACHE_SWEEP_INTERVAL` - Expiry sweep interval in seconds (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env::var("CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_size),
            need_crypt_key: env::var("CACHE_NEED_CRYPT_KEY")
                .ok()
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(defaults.need_crypt_key),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.cache_dir),
            ttl: env::var("CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl),
            eviction_errors: env::var("CACHE_EVICTION_ERRORS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.eviction_errors),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
        }
    }

    // == Builders ==
    pub fn with_max_size(mut self, max_size: i64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_crypt_key(mut self, need_crypt_key: bool) -> Self {
        self.need_crypt_key = need_crypt_key;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<String>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_eviction_errors(mut self, policy: EvictionErrorPolicy) -> Self {
        self.eviction_errors = policy;
        self
    }

    // == Resolved Values ==
    /// Capacity for a memory cache, applying the 64 MiB default.
    pub fn memory_capacity(&self) -> u64 {
        resolve_capacity(self.max_size, DEFAULT_MAX_MEM_CACHE_SIZE)
    }

    /// Capacity for a disk cache, applying the 4 GiB default.
    pub fn disk_capacity(&self) -> u64 {
        resolve_capacity(self.max_size, DEFAULT_MAX_DISK_CACHE_SIZE)
    }

    /// Cache directory with the default applied and a trailing `/` enforced.
    pub fn normalized_cache_dir(&self) -> String {
        let mut dir = if self.cache_dir.is_empty() {
            DEFAULT_DISK_CACHE_DIR.to_string()
        } else {
            self.cache_dir.clone()
        };
        if !dir.ends_with('/') {
            dir.push('/');
        }
        dir
    }
}

fn resolve_capacity(max_size: i64, default: u64) -> u64 {
    if max_size <= 0 {
        default
    } else {
        max_size as u64
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 0,
            need_crypt_key: false,
            cache_dir: DEFAULT_DISK_CACHE_DIR.to_string(),
            ttl: 0,
            eviction_errors: EvictionErrorPolicy::BestEffort,
            sweep_interval: 0,
        }
    }
}
