//! The per-partition working set: local pool, frontier, and reference-counted lifecycle.

use crate::{
    block::{Block, FeedData, ReqId},
    identifier::{BlockKey, PartitionId},
    pool::{Checkout, SharedPool},
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use tracing::trace;

/// A partition's cached working set of blocks.
///
/// Cheap to clone: every clone shares the same underlying state, the way overlapping
/// subscribers on one partition share one local pool. All public operations are serialized
/// under a single mutex covering the whole method body; see the crate-level concurrency notes.
#[derive(Clone)]
pub struct PartitionCache {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    partition_id: PartitionId,
    shared: Arc<SharedPool>,
    local_pool: IndexMap<BlockKey, Block>,
    frontier: Option<BlockKey>,
    max_blocks: usize,
    ref_count: i32,
}

impl PartitionCache {
    pub(crate) fn new(partition_id: PartitionId, shared: Arc<SharedPool>, max_blocks: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                partition_id,
                shared,
                local_pool: IndexMap::new(),
                frontier: None,
                max_blocks,
                ref_count: 0,
            })),
        }
    }

    /// Registers a subscriber. Increments the reference count; has no other effect.
    pub fn open(&self) {
        let mut inner = self.inner.lock();
        inner.ref_count += 1;
    }

    /// Unregisters a subscriber. If this drives the reference count to zero (or below, which is
    /// tolerated rather than treated as caller error), the partition is cleared and deregistered
    /// from the shared pool. The instance must not be reused after that point.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.ref_count -= 1;
        if inner.ref_count <= 0 {
            inner.clear_locked();
            let partition_id = inner.partition_id;
            let shared = Arc::clone(&inner.shared);
            drop(inner);
            shared.remove_partition(partition_id);
        }
    }

    /// Checks every held block back in to the shared pool and drops the frontier.
    pub fn clear(&self) {
        self.inner.lock().clear_locked();
    }

    /// Sets the per-partition block budget and immediately evicts down to it.
    pub fn set_max_blocks(&self, max_blocks: usize) {
        let mut inner = self.inner.lock();
        inner.max_blocks = max_blocks;
        inner.evict_to(max_blocks);
    }

    /// The current per-partition block budget.
    pub fn max_blocks(&self) -> usize {
        self.inner.lock().max_blocks
    }

    /// Number of blocks currently resident in the local pool.
    pub fn num_blocks(&self) -> usize {
        self.inner.lock().local_pool.len()
    }

    /// The current reference count.
    pub fn ref_count(&self) -> i32 {
        self.inner.lock().ref_count
    }

    /// Appends one record. A no-op (returns `false`) while the partition has no active
    /// subscribers. Returns whether the record was accepted -- callers on the ingest path may
    /// ignore this; it exists so the round-trip property (`add` then `get`) is directly testable.
    pub fn add(&self, transaction_id: u64, req_id: ReqId, header: i32) -> bool {
        self.inner.lock().add_locked(transaction_id, req_id, header)
    }

    /// Appends a batch of records, assumed to already be in ascending transaction-id order.
    /// Equivalent to calling [`Self::add`] once per record, but under a single lock acquisition.
    pub fn add_all(&self, records: impl IntoIterator<Item = FeedData>) {
        let mut inner = self.inner.lock();
        for record in records {
            inner.add_locked(record.transaction_id, record.req_id, record.header);
        }
    }

    /// Returns the feed data for `transaction_id`, or `None` on a cache miss or an inactive
    /// partition. A miss never checks a block out of the shared pool -- it is a pure local-pool
    /// lookup. Never updates the frontier.
    pub fn get(&self, transaction_id: u64) -> Option<FeedData> {
        self.inner.lock().get_locked(transaction_id)
    }
}

impl Inner {
    fn key_for(&self, transaction_id: u64) -> BlockKey {
        BlockKey::for_transaction(self.partition_id, transaction_id, self.shared.block_size())
    }

    fn add_locked(&mut self, transaction_id: u64, req_id: ReqId, header: i32) -> bool {
        if self.ref_count == 0 {
            return false;
        }

        if let Some(key) = self.frontier {
            let block = self.local_pool.get_mut(&key).expect("frontier is always resident");
            if block.add(transaction_id, req_id, header) {
                return true;
            }
        }

        let key = self.key_for(transaction_id);
        if self.local_pool.contains_key(&key) {
            self.frontier = Some(key);
        } else {
            self.evict_to(self.max_blocks.saturating_sub(1));
            match self.shared.check_out(key) {
                Checkout::Block(block) => {
                    self.local_pool.insert(key, block);
                    self.frontier = Some(key);
                }
                Checkout::Exhausted | Checkout::Closed => return false,
            }
        }

        let block = self.local_pool.get_mut(&key).expect("just installed or already resident");
        block.add(transaction_id, req_id, header)
    }

    fn get_locked(&mut self, transaction_id: u64) -> Option<FeedData> {
        if self.ref_count == 0 {
            return None;
        }

        if let Some(key) = self.frontier {
            if let Some(hit) = self.local_pool.get(&key).and_then(|b| b.get(transaction_id)) {
                return Some(hit);
            }
        }

        let key = self.key_for(transaction_id);
        let hit = self.local_pool.get(&key).and_then(|block| block.get(transaction_id));
        if hit.is_none() {
            // A block that isn't already resident is never checked out just to answer a read:
            // doing so would evict a live neighbor to install a block that only ever reports
            // absent, which thrashes the local pool for no benefit. A miss here means "consult
            // storage," not "give this id a block."
            self.shared.mark_cache_miss();
        }
        hit
    }

    /// Evicts down to `target`, oldest-first, skipping the frontier.
    fn evict_to(&mut self, target: usize) {
        if self.local_pool.len() <= target {
            return;
        }

        let keys: Vec<BlockKey> = self.local_pool.keys().copied().collect();
        for key in keys {
            if self.local_pool.len() <= target {
                break;
            }
            if Some(key) == self.frontier {
                continue;
            }
            if let Some(block) = self.local_pool.shift_remove(&key) {
                trace!(target: "feed_cache", ?key, "evicting block from local pool");
                self.shared.check_in(block);
                metrics::counter!("feed_cache.blocks_evicted").increment(1);
            }
        }
    }

    fn clear_locked(&mut self) {
        let local_pool = std::mem::take(&mut self.local_pool);
        self.shared.check_in_all(local_pool.into_values());
        self.frontier = None;
    }
}

impl fmt::Debug for PartitionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PartitionCache")
            .field("partition_id", &inner.partition_id)
            .field("num_blocks", &inner.local_pool.len())
            .field("frontier", &inner.frontier)
            .field("max_blocks", &inner.max_blocks)
            .field("ref_count", &inner.ref_count)
            .finish_non_exhaustive()
    }
}
