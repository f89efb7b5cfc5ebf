//! Value Store Module
//!
//! The persistence capability the LRU engine drives: where a node's bytes
//! actually live.

use crate::error::Result;

// == Value Store ==
/// Store/load/delete hooks for the payload behind a cache key.
///
/// The engine calls `persist` before a node is linked or replaced and
/// `delete` exactly when a node is removed.
pub trait ValueStore: Send + Sync {
    /// Persists `value` under `key`.
    ///
    /// Returns the bytes the engine should keep resident in the node, or
    /// None if the store holds the payload itself.
    fn persist(&mut self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>>;

    /// Loads the payload for a node that has no resident value.
    ///
    /// `Ok(None)` means the payload is gone and the lookup is a miss.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Deletes the payload for `key`. Deleting an absent payload succeeds.
    fn delete(&mut self, key: &str) -> Result<()>;
}

// == Memory Store ==
/// Keeps every value inside its node. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryStore;

impl MemoryStore {
    pub fn new() -> Self {
        Self
    }
}

impl ValueStore for MemoryStore {
    fn persist(&mut self, _key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        Ok(Some(value))
    }

    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn delete(&mut self, _key: &str) -> Result<()> {
        Ok(())
    }
}
