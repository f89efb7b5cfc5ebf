//! Disk Cache Module
//!
//! LRU cache that keeps one file per entry in a directory and only metadata
//! in memory. On startup the directory is scanned and recency order is
//! rebuilt from file timestamps.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cache::facade::LruCache;
use crate::cache::file_time::FileTimes;
use crate::cache::lru::{LruEngine, RestoredEntry};
use crate::cache::store::ValueStore;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Suffix of the file a payload is written to before it is renamed into place.
const STAGING_SUFFIX: &str = ".tmp";

// == Disk Store ==
/// Value store writing each payload to `dir + key`.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory path ending in `/`
    dir: String,
}

impl DiskStore {
    /// Creates a store rooted at `dir`. A trailing `/` is added if missing.
    pub fn new(dir: impl Into<String>) -> Self {
        let mut dir = dir.into();
        if !dir.ends_with('/') {
            dir.push('/');
        }
        Self { dir }
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn file_name(&self, key: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.dir, key))
    }

    /// Path a payload for `key` is staged at: `dir + "." + key + ".tmp"`.
    fn staging_name(&self, key: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}{}", self.dir, key, STAGING_SUFFIX))
    }

    /// Creates the cache directory if it does not exist.
    pub fn init_dir(&self) -> Result<()> {
        let path = Path::new(&self.dir);
        if path.exists() && !path.is_dir() {
            return Err(CacheError::InvalidConfig(format!(
                "cache dir {} is not a directory",
                self.dir
            )));
        }
        fs::create_dir_all(path).map_err(|e| CacheError::io("create dir", path, e))
    }

    /// Lists the regular files in the cache directory as restorable entries.
    pub fn scan(&self) -> Result<Vec<RestoredEntry>> {
        let dir = Path::new(&self.dir);
        let entries = fs::read_dir(dir).map_err(|e| CacheError::io("read dir", dir, e))?;

        let mut restored = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io("read dir", dir, e))?;
            let path = entry.path();

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !file_type.is_file() {
                continue;
            }
            let Ok(key) = entry.file_name().into_string() else {
                warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            if is_staging_name(&key) {
                // Left behind by a write that never reached its rename
                discard(&path);
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                // Removed between listing and stat
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::io("stat", path, e)),
            };
            // Files without any timestamp sort as the oldest
            let access_time = FileTimes::from_metadata(&metadata).last_use().unwrap_or(0);

            restored.push(RestoredEntry {
                key,
                size: metadata.len(),
                access_time,
            });
        }
        Ok(restored)
    }
}

impl ValueStore for DiskStore {
    fn persist(&mut self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        self.init_dir()?;
        let path = self.file_name(key);
        let staging = self.staging_name(key);

        // The previous payload is untouched until the rename succeeds
        if let Err(err) = write_synced(&staging, &value) {
            discard(&staging);
            return Err(err);
        }
        if let Err(e) = fs::rename(&staging, &path) {
            discard(&staging);
            return Err(CacheError::io("rename", path, e));
        }
        Ok(None)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.file_name(key);
        match fs::read(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io("read", path, e)),
        }
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let path = self.file_name(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io("remove", path, e)),
        }
    }
}

fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

fn write_synced(path: &Path, value: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| CacheError::io("write", path, e))?;
    file.write_all(value).map_err(|e| CacheError::io("write", path, e))?;
    file.sync_all().map_err(|e| CacheError::io("sync", path, e))
}

/// Best-effort removal of a staging file.
fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove staging file");
        }
    }
}

// == Disk Cache ==
/// File-backed byte cache, 4 GiB by default.
pub type DiskCache = LruCache<DiskStore>;

impl LruCache<DiskStore> {
    /// Opens the disk cache described by `config`.
    ///
    /// Creates the directory if needed, then admits the files already in
    /// it, most recently used first. Files that are expired or do not fit
    /// in the capacity are deleted.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        let store = DiskStore::new(config.normalized_cache_dir());
        store.init_dir()?;
        let restored = store.scan()?;
        let found = restored.len();

        let mut engine = LruEngine::new(store, config.disk_capacity(), config.ttl)
            .with_eviction_errors(config.eviction_errors);
        let report = engine.warm_start(restored);

        info!(
            dir = %engine.store().dir(),
            found,
            admitted = report.admitted,
            expired = report.expired,
            rejected = report.rejected,
            bytes = engine.cur_size(),
            "Disk cache opened"
        );

        Ok(Self::from_engine(engine, config.need_crypt_key))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_string(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    fn disk_config(dir: &TempDir, max_size: i64) -> CacheConfig {
        CacheConfig::default()
            .with_max_size(max_size)
            .with_cache_dir(dir_string(dir))
    }

    #[test]
    fn test_file_name_enforces_trailing_slash() {
        let store = DiskStore::new("/var/cache/app");
        assert_eq!(store.dir(), "/var/cache/app/");
        assert_eq!(store.file_name("test"), PathBuf::from("/var/cache/app/test"));
    }

    #[test]
    fn test_persist_writes_raw_bytes() {
        let dir = TempDir::new().unwrap();
        let mut store = DiskStore::new(dir_string(&dir));

        let resident = store.persist("key1", b"1234567890".to_vec()).unwrap();

        assert_eq!(resident, None);
        assert_eq!(fs::read(dir.path().join("key1")).unwrap(), b"1234567890");
    }

    #[test]
    fn test_persist_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        let mut store = DiskStore::new(nested.to_string_lossy().into_owned());

        store.persist("k", b"v".to_vec()).unwrap();

        assert!(nested.join("k").is_file());
    }

    #[test]
    fn test_load_missing_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir_string(&dir));
        assert_eq!(store.load("absent").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_file_succeeds() {
        let dir = TempDir::new().unwrap();
        let mut store = DiskStore::new(dir_string(&dir));

        store.persist("k", b"v".to_vec()).unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();

        assert!(!dir.path().join("k").exists());
    }

    #[test]
    fn test_delete_surfaces_other_errors() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner"), b"x").unwrap();
        let mut store = DiskStore::new(dir_string(&dir));

        // remove_file on a non-empty directory is not a NotFound error
        let result = store.delete("sub");
        assert!(matches!(result, Err(CacheError::Io { op: "remove", .. })));
    }

    #[test]
    fn test_init_dir_rejects_regular_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();
        let store = DiskStore::new(file.to_string_lossy().into_owned());

        assert!(matches!(store.init_dir(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_scan_lists_regular_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"12345").unwrap();
        fs::write(dir.path().join("b"), b"1").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let store = DiskStore::new(dir_string(&dir));

        let mut restored = store.scan().unwrap();
        restored.sort_by(|x, y| x.key.cmp(&y.key));

        assert_eq!(restored.len(), 2);
        assert_eq!((restored[0].key.as_str(), restored[0].size), ("a", 5));
        assert_eq!((restored[1].key.as_str(), restored[1].size), ("b", 1));
    }

    #[test]
    fn test_disk_cache_set_get_clear() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(&disk_config(&dir, 100)).unwrap();

        cache.set("k", b"payload".to_vec(), None).unwrap();
        assert_eq!(fs::read(dir.path().join("k")).unwrap(), b"payload");
        assert_eq!(cache.get("k").unwrap().unwrap().value, b"payload".to_vec());

        cache.clear("k").unwrap();
        assert!(!dir.path().join("k").exists());
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_disk_cache_eviction_removes_files() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(&disk_config(&dir, 100)).unwrap();

        for i in 0..10 {
            cache
                .set(&format!("key{}", i), b"1234567890".to_vec(), None)
                .unwrap();
        }
        cache.get("key0").unwrap();
        cache.set("key10", b"hello".to_vec(), None).unwrap();

        // key0 was promoted, so key1 is the eviction victim
        assert!(dir.path().join("key0").exists());
        assert!(!dir.path().join("key1").exists());
        assert!(dir.path().join("key10").exists());
        assert_eq!(cache.cur_size(), 95);
    }

    #[test]
    fn test_disk_cache_file_removed_out_of_band() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(&disk_config(&dir, 100)).unwrap();

        cache.set("k", b"v".to_vec(), None).unwrap();
        fs::remove_file(dir.path().join("k")).unwrap();

        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.is_empty());
        cache.clear("k").unwrap();
    }

    #[test]
    fn test_persist_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let mut store = DiskStore::new(dir_string(&dir));

        store.persist("k", b"first".to_vec()).unwrap();
        store.persist("k", b"second".to_vec()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k".to_string()]);
        assert_eq!(fs::read(dir.path().join("k")).unwrap(), b"second");
    }

    #[test]
    fn test_failed_overwrite_keeps_previous_payload() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(&disk_config(&dir, 1000)).unwrap();
        cache.set("k", b"original bytes".to_vec(), None).unwrap();

        // A directory at the staging path makes the write fail
        fs::create_dir(dir.path().join(".k.tmp")).unwrap();
        let result = cache.set("k", vec![7; 200], None);

        assert!(matches!(result, Err(CacheError::Io { op: "write", .. })));
        assert_eq!(fs::read(dir.path().join("k")).unwrap(), b"original bytes");
        assert_eq!(cache.cur_size(), 14);
        assert_eq!(
            cache.get("k").unwrap().unwrap().value,
            b"original bytes".to_vec()
        );
    }

    #[test]
    fn test_failed_first_write_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(&disk_config(&dir, 1000)).unwrap();
        fs::create_dir(dir.path().join(".k.tmp")).unwrap();

        assert!(cache.set("k", b"payload".to_vec(), None).is_err());

        assert!(!dir.path().join("k").exists());
        assert!(cache.is_empty());
        assert_eq!(cache.cur_size(), 0);
    }

    #[test]
    fn test_scan_discards_interrupted_writes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"12345").unwrap();
        fs::write(dir.path().join(".a.tmp"), b"123").unwrap();
        let store = DiskStore::new(dir_string(&dir));

        let restored = store.scan().unwrap();

        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].key, "a");
        assert!(!dir.path().join(".a.tmp").exists());
    }
}
