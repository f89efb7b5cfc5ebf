//! byte_lru inspector
//!
//! Opens the disk cache described by the `CACHE_*` environment variables,
//! rebuilds its recency order from the directory and reports on it.
//!
//! # Commands
//! - `list` (default) - Print entries, most recently used first, as JSON
//! - `stats` - Print cache statistics as JSON
//! - `purge` - Remove expired entries
//! - `clear` - Remove every entry

use std::env;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use byte_lru::cache::{current_timestamp_ms, DiskCache, NodeInfo};
use byte_lru::CacheConfig;

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "byte_lru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = env::args().nth(1).unwrap_or_else(|| "list".to_string());

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: max_size={}, dir={}, ttl={}s, hashed_keys={}",
        config.disk_capacity(),
        config.normalized_cache_dir(),
        config.ttl,
        config.need_crypt_key
    );

    let cache = DiskCache::open(&config)
        .with_context(|| format!("opening disk cache in {}", config.normalized_cache_dir()))?;

    match command.as_str() {
        "list" => {
            let now = current_timestamp_ms();
            let entries: Vec<_> = cache
                .traversal()
                .iter()
                .map(|node| describe(node, now))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        "stats" => {
            let stats = cache.stats();
            let report = json!({
                "stats": stats,
                "misses": stats.misses(),
                "hit_rate": stats.hit_rate(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "purge" => {
            let removed = cache.purge_expired().context("purging expired entries")?;
            info!("Removed {} expired entries", removed);
        }
        "clear" => {
            let count = cache.len();
            cache.clear_all().context("clearing cache")?;
            info!("Removed {} entries", count);
        }
        other => bail!("unknown command '{}', expected list, stats, purge or clear", other),
    }

    Ok(())
}

fn describe(node: &NodeInfo, now: u64) -> serde_json::Value {
    json!({
        "key": node.key,
        "size": node.size,
        "last_access": format_ms(node.access_time),
        "expires": node.expire_time.map(format_ms),
        "ttl_remaining_ms": node.ttl_remaining_ms(now),
    })
}

fn format_ms(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
