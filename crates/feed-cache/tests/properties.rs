//! Property-based tests for the invariants named in the design: frontier membership, capacity
//! bounds, refcount balance, and add/get round-tripping.

use feed_cache::{block::ReqId, config::FeedCacheConfig, pool::SharedPool};
use proptest::prelude::*;

const BLOCK_SIZE: u64 = 4;

fn req(byte: u8) -> ReqId {
    ReqId([byte; 24])
}

fn config(max_blocks: usize) -> FeedCacheConfig {
    FeedCacheConfig { block_size: BLOCK_SIZE, max_blocks_per_partition: max_blocks, ..Default::default() }
}

proptest! {
    /// P1/P8: every id added while its block is still resident round-trips through `get`.
    #[test]
    fn round_trip_while_resident(ids in prop::collection::vec(0u64..16, 1..16)) {
        let mut ids = ids;
        ids.sort_unstable();
        ids.dedup();

        // A partition large enough to hold every block touched by this id range so nothing is
        // evicted mid-test.
        let shared = SharedPool::new(config(16)).unwrap();
        let cache = shared.partition(1);
        cache.open();

        for &id in &ids {
            cache.add(id, req((id % 256) as u8), id as i32);
        }

        for &id in &ids {
            let data = cache.get(id);
            prop_assert_eq!(data.map(|d| d.transaction_id), Some(id));
            prop_assert_eq!(data.map(|d| d.header), Some(id as i32));
        }
    }

    /// P2: the local pool never exceeds its configured capacity once an operation returns.
    #[test]
    fn local_pool_never_exceeds_capacity(
        ids in prop::collection::vec(0u64..64, 1..64),
        max_blocks in 1usize..5,
    ) {
        let mut ids = ids;
        ids.sort_unstable();

        let shared = SharedPool::new(config(max_blocks)).unwrap();
        let cache = shared.partition(1);
        cache.open();

        for &id in &ids {
            cache.add(id, req((id % 256) as u8), 0);
            prop_assert!(cache.num_blocks() <= max_blocks);
        }
    }

    /// P4: balanced open/close pairs return the partition to an empty, inactive state.
    #[test]
    fn balanced_open_close_empties_partition(opens in 1usize..8, ids in prop::collection::vec(0u64..32, 0..16)) {
        let shared = SharedPool::new(config(8)).unwrap();
        let cache = shared.partition(1);

        for _ in 0..opens {
            cache.open();
        }
        for &id in &ids {
            cache.add(id, req((id % 256) as u8), 0);
        }
        for _ in 0..opens {
            cache.close();
        }

        prop_assert_eq!(cache.ref_count(), 0);
        prop_assert_eq!(cache.num_blocks(), 0);
    }

    /// P6: shrinking capacity never evicts the frontier, and the result respects the new cap.
    #[test]
    fn shrinking_capacity_spares_frontier(
        ids in prop::collection::vec(0u64..64, 1..32),
        new_cap in 1usize..4,
    ) {
        let mut ids = ids;
        ids.sort_unstable();
        ids.dedup();

        let shared = SharedPool::new(config(8)).unwrap();
        let cache = shared.partition(1);
        cache.open();
        for &id in &ids {
            cache.add(id, req((id % 256) as u8), 0);
        }

        let frontier_id = *ids.last().unwrap();
        cache.set_max_blocks(new_cap);

        prop_assert!(cache.num_blocks() <= new_cap);
        prop_assert_eq!(
            cache.get(frontier_id).map(|d| d.transaction_id),
            Some(frontier_id),
            "the block holding the most recently written id must survive"
        );
    }
}
