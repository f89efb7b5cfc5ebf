//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its value stores.
///
/// A missing key is never an error: lookups report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Insertion of a key that already has a node
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// A node handle whose node has been removed
    #[error("Stale node handle")]
    StaleNode,

    /// File create/write/read/remove failure in the disk store
    #[error("I/O failure while trying to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration that cannot be used to build a cache
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps an I/O error with the operation and path that produced it.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
