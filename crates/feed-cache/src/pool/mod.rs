//! The shared, process-wide block pool.
//!
//! `SharedPool` is the leaf in the crate's lock order: [`PartitionCache`] holds its own lock
//! while calling into `SharedPool`, so these methods must never block on a `PartitionCache` lock
//! or call back into one.

use crate::{
    block::Block,
    config::FeedCacheConfig,
    error::ConfigResult,
    identifier::{BlockKey, PartitionId},
};
use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::atomic::{AtomicU64, Ordering}, sync::Arc};
use tracing::{debug, trace};

pub mod partition;
pub use partition::PartitionCache;

/// Outcome of a [`SharedPool::check_out`] call.
pub(crate) enum Checkout {
    /// A block bound to the requested key.
    Block(Block),
    /// The pool is at its global capacity; the caller should fall back to storage.
    Exhausted,
    /// The pool has been shut down; the caller should treat the partition as inactive.
    Closed,
}

struct SharedPoolState {
    /// Drained blocks ready to be rebound to a new key on the next checkout.
    free: Vec<Block>,
    /// Blocks currently allocated, whether free or checked out. Never exceeds `capacity`.
    allocated: usize,
    closed: bool,
}

/// Process-wide allocator and reservoir of [`Block`]s, shared across all partitions.
pub struct SharedPool {
    config: FeedCacheConfig,
    state: Mutex<SharedPoolState>,
    miss_counter: AtomicU64,
    partitions: Mutex<HashMap<PartitionId, PartitionCache>>,
}

impl SharedPool {
    /// Creates a new, empty pool. Fails if `config` cannot describe a pool that can hold at
    /// least one block.
    pub fn new(config: FeedCacheConfig) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            config,
            state: Mutex::new(SharedPoolState { free: Vec::new(), allocated: 0, closed: false }),
            miss_counter: AtomicU64::new(0),
            partitions: Mutex::new(HashMap::new()),
        }))
    }

    /// Looks up the registered [`PartitionCache`] for `partition_id`, or creates and registers a
    /// fresh one with `refCount == 0`. Callers are expected to follow this with
    /// [`PartitionCache::open`].
    pub fn partition(self: &Arc<Self>, partition_id: PartitionId) -> PartitionCache {
        let mut partitions = self.partitions.lock();
        if let Some(existing) = partitions.get(&partition_id) {
            return existing.clone();
        }

        let cache = PartitionCache::new(
            partition_id,
            Arc::clone(self),
            self.config.max_blocks_per_partition,
        );
        partitions.insert(partition_id, cache.clone());
        metrics::gauge!("feed_cache.partitions_active").set(partitions.len() as f64);
        cache
    }

    /// Records per block, pool-wide.
    pub(crate) fn block_size(&self) -> u64 {
        self.config.block_size
    }

    /// Shuts the pool down. All subsequent checkouts return [`Checkout::Closed`]; already
    /// checked-out blocks are unaffected until their owning partition checks them back in.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// Whether the pool has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Total cache misses recorded via [`Self::mark_cache_miss`].
    pub fn miss_count(&self) -> u64 {
        self.miss_counter.load(Ordering::Relaxed)
    }

    pub(crate) fn check_out(&self, key: BlockKey) -> Checkout {
        let mut state = self.state.lock();
        if state.closed {
            return Checkout::Closed;
        }

        if let Some(mut block) = state.free.pop() {
            block.reset(key);
            metrics::counter!("feed_cache.blocks_recycled").increment(1);
            trace!(target: "feed_cache", ?key, "recycled block from free list");
            return Checkout::Block(block);
        }

        if state.allocated >= self.config.shared_pool_capacity {
            metrics::counter!("feed_cache.checkouts_exhausted").increment(1);
            debug!(target: "feed_cache", ?key, "shared pool exhausted, falling back to storage");
            return Checkout::Exhausted;
        }

        state.allocated += 1;
        metrics::counter!("feed_cache.blocks_allocated").increment(1);
        trace!(target: "feed_cache", ?key, "allocated new block");
        Checkout::Block(Block::new(key, self.config.block_size))
    }

    pub(crate) fn check_in(&self, block: Block) {
        let mut state = self.state.lock();
        if state.closed {
            state.allocated = state.allocated.saturating_sub(1);
            return;
        }
        state.free.push(block);
    }

    pub(crate) fn check_in_all(&self, blocks: impl IntoIterator<Item = Block>) {
        let mut state = self.state.lock();
        for block in blocks {
            if state.closed {
                state.allocated = state.allocated.saturating_sub(1);
            } else {
                state.free.push(block);
            }
        }
    }

    pub(crate) fn remove_partition(&self, partition_id: PartitionId) {
        let mut partitions = self.partitions.lock();
        partitions.remove(&partition_id);
        metrics::gauge!("feed_cache.partitions_active").set(partitions.len() as f64);
    }

    pub(crate) fn mark_cache_miss(&self) {
        self.miss_counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("feed_cache.cache_misses").increment(1);
    }
}

impl fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPool")
            .field("config", &self.config)
            .field("miss_count", &self.miss_count())
            .field("partitions_active", &self.partitions.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::ReqId;

    fn req(byte: u8) -> ReqId {
        ReqId([byte; 24])
    }

    #[test]
    fn checkout_recycles_before_allocating() {
        let pool =
            SharedPool::new(FeedCacheConfig { shared_pool_capacity: 1, ..Default::default() })
                .unwrap();

        let key_a = BlockKey { partition_id: 1, base_transaction_id: 0 };
        let block = match pool.check_out(key_a) {
            Checkout::Block(block) => block,
            _ => panic!("expected a block"),
        };

        let key_b = BlockKey { partition_id: 2, base_transaction_id: 0 };
        assert!(matches!(pool.check_out(key_b), Checkout::Exhausted));

        pool.check_in(block);
        match pool.check_out(key_b) {
            Checkout::Block(block) => assert_eq!(block.key(), key_b),
            _ => panic!("expected the recycled block"),
        }
    }

    #[test]
    fn closed_pool_refuses_checkouts() {
        let pool = SharedPool::new(FeedCacheConfig::default()).unwrap();
        pool.close();
        let key = BlockKey { partition_id: 1, base_transaction_id: 0 };
        assert!(matches!(pool.check_out(key), Checkout::Closed));
    }

    #[test]
    fn partition_factory_shares_one_instance() {
        let pool = SharedPool::new(FeedCacheConfig::default()).unwrap();
        let a = pool.partition(7);
        let b = pool.partition(7);

        a.open();
        b.open();
        assert!(a.add(0, req(0), 1));
        assert_eq!(b.get(0).map(|d| d.transaction_id), Some(0), "shares one local pool");
    }

    #[test]
    fn mark_cache_miss_is_counted() {
        let pool = SharedPool::new(FeedCacheConfig::default()).unwrap();
        assert_eq!(pool.miss_count(), 0);
        pool.mark_cache_miss();
        pool.mark_cache_miss();
        assert_eq!(pool.miss_count(), 2);
    }
}
