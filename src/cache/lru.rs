//! LRU Engine Module
//!
//! Size-bounded recency list over an arena of nodes.
//!
//! Nodes live in slots addressed by index; `prev`/`next` links are slot
//! indices, so promotion and eviction are constant-time relinks. Freed slots
//! are recycled through a free list and carry a generation counter, so a
//! [`NodeId`] held across a removal never resolves to a different key.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::entry::{current_timestamp_ms, expiry_from, CacheEntry, CacheHit, NodeInfo};
use crate::cache::stats::CacheStats;
use crate::cache::store::ValueStore;
use crate::config::EvictionErrorPolicy;
use crate::error::{CacheError, Result};

/// A triggered eviction frees at least `max_size / EVICTION_BATCH_DIVISOR`
/// bytes (rounded up).
pub const EVICTION_BATCH_DIVISOR: u64 = 10;

// == Node Id ==
/// Handle to a node in the engine arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<CacheEntry>,
}

// == Warm Start ==
/// A payload found in the store before the engine existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredEntry {
    pub key: String,
    pub size: u64,
    /// Last access (Unix milliseconds)
    pub access_time: u64,
}

/// Outcome of [`LruEngine::warm_start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmStartReport {
    /// Entries linked into the recency list
    pub admitted: usize,
    /// Entries whose TTL had already elapsed, payload deleted
    pub expired: usize,
    /// Entries that did not fit in the capacity, payload deleted
    pub rejected: usize,
}

// == LRU Engine ==
/// Recency-ordered, byte-bounded index of cache nodes backed by a [`ValueStore`].
///
/// Head of the list is the most recently used node, tail the least.
pub struct LruEngine<S: ValueStore> {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<String, NodeId>,
    head: Option<u32>,
    tail: Option<u32>,
    max_size: u64,
    cur_size: u64,
    /// Default TTL in seconds for new nodes, 0 = never expire
    ttl: u64,
    eviction_errors: EvictionErrorPolicy,
    stats: CacheStats,
    store: S,
}

impl<S: ValueStore> LruEngine<S> {
    // == Constructor ==
    /// Creates an empty engine holding at most `max_size` bytes.
    ///
    /// A `max_size` of 0 is raised to 1 so that eviction batches always make progress.
    pub fn new(store: S, max_size: u64, ttl: u64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            max_size: max_size.max(1),
            cur_size: 0,
            ttl,
            eviction_errors: EvictionErrorPolicy::default(),
            stats: CacheStats::new(),
            store,
        }
    }

    pub fn with_eviction_errors(mut self, policy: EvictionErrorPolicy) -> Self {
        self.eviction_errors = policy;
        self
    }

    // == Lookup ==
    /// Returns the handle of the node stored under `key`.
    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Add New Node ==
    /// Inserts a new node at the head of the list.
    ///
    /// The value is persisted before anything is linked; a store failure
    /// leaves the engine untouched. If the insertion pushes the engine over
    /// capacity an eviction batch runs afterwards, which may evict the new
    /// node itself when it alone exceeds the capacity.
    pub fn add_new_node(
        &mut self,
        key: String,
        value: Vec<u8>,
        extra: Option<Value>,
    ) -> Result<NodeId> {
        if self.index.contains_key(&key) {
            return Err(CacheError::AlreadyExists(key));
        }

        let size = value.len() as u64;
        let resident = self.store.persist(&key, value)?;

        let entry = CacheEntry::new(key.clone(), resident, size, extra, self.ttl);
        let id = self.alloc(entry);
        self.index.insert(key, id);
        self.push_front(id.index);
        self.cur_size += size;

        self.evict_if_needed()?;
        Ok(id)
    }

    // == Replace ==
    /// Overwrites the value of an existing node and promotes it.
    ///
    /// The new value is persisted first; on failure the node keeps its old
    /// value, size and position.
    pub fn replace(&mut self, id: NodeId, value: Vec<u8>, extra: Option<Value>) -> Result<()> {
        let idx = self.resolve(id).ok_or(CacheError::StaleNode)?;
        let key = self
            .node(idx)
            .map(|node| node.key.clone())
            .ok_or(CacheError::StaleNode)?;

        let new_size = value.len() as u64;
        let resident = self.store.persist(&key, value)?;

        let now = current_timestamp_ms();
        let ttl = self.ttl;
        let node = self.node_mut(idx).ok_or(CacheError::StaleNode)?;
        let old_size = node.size;
        node.value = resident;
        node.size = new_size;
        node.extra = extra;
        node.touch(now);
        node.expire_time = expiry_from(node.access_time, ttl);

        self.cur_size = self.cur_size - old_size + new_size;
        self.move_to_front(idx);
        self.evict_if_needed()
    }

    // == Access ==
    /// Read path: returns the node's value and promotes it to the head.
    ///
    /// An expired node is deleted and reported as absent, as is a node
    /// whose payload has disappeared from the store.
    pub fn access(&mut self, id: NodeId) -> Result<Option<CacheHit>> {
        let Some(idx) = self.resolve(id) else {
            return Ok(None);
        };

        let now = current_timestamp_ms();
        let (expired, key, resident) = match self.node(idx) {
            Some(node) => (node.is_expired_at(now), node.key.clone(), node.value.clone()),
            None => return Ok(None),
        };

        if expired {
            self.delete_at(idx)?;
            self.stats.record_expiration();
            debug!(key = %key, "Entry expired on access");
            return Ok(None);
        }

        let value = match resident {
            Some(value) => value,
            None => match self.store.load(&key)? {
                Some(value) => value,
                None => {
                    debug!(key = %key, "Payload missing from store, dropping node");
                    self.delete_at(idx)?;
                    return Ok(None);
                }
            },
        };

        let extra = match self.node_mut(idx) {
            Some(node) => {
                node.touch(now);
                node.extra.clone()
            }
            None => None,
        };
        self.move_to_front(idx);

        Ok(Some(CacheHit { value, extra }))
    }

    // == Delete ==
    /// Removes a node and its payload. Deleting a removed node succeeds.
    ///
    /// The store is asked first; if it fails the node stays in place.
    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        match self.resolve(id) {
            Some(idx) => self.delete_at(idx),
            None => Ok(()),
        }
    }

    // == Traversal ==
    /// Snapshot of all live nodes from most to least recently used.
    pub fn traversal(&self) -> Vec<NodeInfo> {
        let mut nodes = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(node) = self.node(idx) else { break };
            nodes.push(node.info());
            cursor = node.next;
        }
        nodes
    }

    // == Key Operations ==
    /// Looks `key` up, counting the lookup in the hit statistics.
    pub fn get(&mut self, key: &str) -> Result<Option<CacheHit>> {
        let result = match self.lookup(key) {
            Some(id) => self.access(id),
            None => Ok(None),
        };

        match &result {
            Ok(Some(_)) => self.stats.record_hit(),
            _ => self.stats.record_miss(),
        }
        result
    }

    /// Inserts `key`, or overwrites it in place if it already has a node.
    pub fn set(&mut self, key: &str, value: Vec<u8>, extra: Option<Value>) -> Result<()> {
        match self.lookup(key) {
            Some(id) => self.replace(id, value, extra),
            None => self.add_new_node(key.to_string(), value, extra).map(|_| ()),
        }
    }

    /// Removes `key` if present.
    pub fn clear(&mut self, key: &str) -> Result<()> {
        match self.lookup(key) {
            Some(id) => self.delete(id),
            None => Ok(()),
        }
    }

    /// Removes every node, least recently used first.
    ///
    /// Stops at the first store failure; nodes not yet reached stay intact.
    pub fn clear_all(&mut self) -> Result<()> {
        while let Some(idx) = self.tail {
            self.delete_at(idx)?;
        }
        Ok(())
    }

    // == Purge Expired ==
    /// Removes every node whose TTL has elapsed.
    ///
    /// Returns the number of nodes removed.
    pub fn purge_expired(&mut self) -> Result<usize> {
        let now = current_timestamp_ms();
        let mut expired = Vec::new();
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(node) = self.node(idx) else { break };
            if node.is_expired_at(now) {
                expired.push(idx);
            }
            cursor = node.next;
        }

        for &idx in &expired {
            self.delete_at(idx)?;
            self.stats.record_expiration();
        }
        Ok(expired.len())
    }

    // == Warm Start ==
    /// Admits payloads that already exist in the store.
    ///
    /// Entries are ordered by access time, newest first, and linked in that
    /// order. An entry whose TTL has already elapsed, or that would push the
    /// engine over capacity, has its payload deleted instead. Store failures
    /// here are logged and skipped.
    pub fn warm_start(&mut self, mut entries: Vec<RestoredEntry>) -> WarmStartReport {
        let now = current_timestamp_ms();
        let mut report = WarmStartReport::default();

        entries.sort_by(|a, b| b.access_time.cmp(&a.access_time));

        for restored in entries {
            if self.index.contains_key(&restored.key) {
                continue;
            }

            let expire_time = expiry_from(restored.access_time, self.ttl);
            let expired = expire_time.is_some_and(|expires| now >= expires);
            let over_capacity = self.cur_size + restored.size > self.max_size;

            if expired || over_capacity {
                if let Err(err) = self.store.delete(&restored.key) {
                    warn!(key = %restored.key, error = %err, "Failed to drop restored payload");
                }
                if expired {
                    report.expired += 1;
                } else {
                    report.rejected += 1;
                }
                continue;
            }

            let size = restored.size;
            let entry =
                CacheEntry::restored(restored.key.clone(), size, restored.access_time, expire_time);
            let id = self.alloc(entry);
            self.index.insert(restored.key, id);
            self.push_back(id.index);
            self.cur_size += size;
            report.admitted += 1;
        }

        report
    }

    // == Accessors ==
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently held.
    pub fn cur_size(&self) -> u64 {
        self.cur_size
    }

    /// Capacity in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Default TTL in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Hit and total lookup counts.
    pub fn hit_info(&self) -> (u64, u64) {
        self.stats.hit_info()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.index.len();
        stats.cur_size = self.cur_size;
        stats.max_size = self.max_size;
        stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // == Eviction ==
    /// Evicts from the tail once the engine is over capacity.
    ///
    /// A batch stops when it has freed at least a tenth of the capacity and
    /// the engine is back within capacity, or when the list is empty.
    fn evict_if_needed(&mut self) -> Result<()> {
        if self.cur_size <= self.max_size {
            return Ok(());
        }

        let batch = self.max_size.div_ceil(EVICTION_BATCH_DIVISOR);
        let mut freed = 0u64;
        let mut evicted = 0usize;

        while let Some(idx) = self.tail {
            if freed >= batch && self.cur_size <= self.max_size {
                break;
            }
            let Some((key, size)) = self.node(idx).map(|node| (node.key.clone(), node.size)) else {
                break;
            };

            if let Err(err) = self.store.delete(&key) {
                match self.eviction_errors {
                    EvictionErrorPolicy::FailFast => {
                        warn!(key = %key, error = %err, evicted, freed, "Eviction aborted");
                        return Err(err);
                    }
                    EvictionErrorPolicy::BestEffort => {
                        warn!(key = %key, error = %err, "Failed to delete evicted payload");
                    }
                }
            }

            self.remove_node(idx);
            self.stats.record_eviction();
            freed += size;
            evicted += 1;
        }

        debug!(
            evicted,
            freed,
            cur_size = self.cur_size,
            max_size = self.max_size,
            "Eviction batch complete"
        );
        Ok(())
    }

    // == Arena ==
    fn resolve(&self, id: NodeId) -> Option<u32> {
        let slot = self.slots.get(id.index as usize)?;
        (slot.generation == id.generation && slot.entry.is_some()).then_some(id.index)
    }

    fn node(&self, idx: u32) -> Option<&CacheEntry> {
        self.slots.get(idx as usize)?.entry.as_ref()
    }

    fn node_mut(&mut self, idx: u32) -> Option<&mut CacheEntry> {
        self.slots.get_mut(idx as usize)?.entry.as_mut()
    }

    fn alloc(&mut self, entry: CacheEntry) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Unlinks and frees a node without touching the store.
    fn remove_node(&mut self, idx: u32) -> Option<CacheEntry> {
        self.unlink(idx);
        let slot = self.slots.get_mut(idx as usize)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(idx);
        self.index.remove(&entry.key);
        self.cur_size -= entry.size;
        Some(entry)
    }

    fn delete_at(&mut self, idx: u32) -> Result<()> {
        let Some(key) = self.node(idx).map(|node| node.key.clone()) else {
            return Ok(());
        };
        self.store.delete(&key)?;
        self.remove_node(idx);
        Ok(())
    }

    // == Links ==
    fn unlink(&mut self, idx: u32) {
        let Some((prev, next)) = self.node(idx).map(|node| (node.prev, node.next)) else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_front(&mut self, idx: u32) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.node_mut(h) {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn push_back(&mut self, idx: u32) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn move_to_front(&mut self, idx: u32) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    /// Verifies list/index agreement and size accounting.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut seen = 0usize;
        let mut total = 0u64;
        let mut prev: Option<u32> = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx).ok_or(format!("dangling link to slot {}", idx))?;
            if node.prev != prev {
                return Err(format!("bad prev link on {}", node.key));
            }
            match self.index.get(&node.key) {
                Some(id) if id.index == idx => {}
                _ => return Err(format!("{} linked but not indexed", node.key)),
            }
            seen += 1;
            total += node.size;
            if seen > self.index.len() {
                return Err("list longer than index".to_string());
            }
            prev = Some(idx);
            cursor = node.next;
        }
        if self.tail != prev {
            return Err("tail does not end the list".to_string());
        }
        if seen != self.index.len() {
            return Err(format!("list has {} nodes, index {}", seen, self.index.len()));
        }
        if total != self.cur_size {
            return Err(format!("cur_size {} but nodes sum to {}", self.cur_size, total));
        }
        if self.head.is_none() != self.index.is_empty() {
            return Err("head/emptiness mismatch".to_string());
        }
        Ok(())
    }
}
