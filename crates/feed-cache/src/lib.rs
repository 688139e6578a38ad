#![warn(missing_docs)]
#![deny(
    unused_must_use,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Per-partition feed cache for a transaction log server.
//!
//! The log server streams a totally ordered sequence of committed transaction records per
//! partition to many concurrent subscribers. Each record carries a monotonically increasing
//! transaction id and a small fixed-size triple of metadata -- ([`FeedData`]) -- that subscribers
//! repeatedly ask for by id. This crate is the in-memory cache in front of storage that answers
//! those queries without round-tripping to disk on every ask.
//!
//! ## Architecture
//!
//! Two tiers, leaves first:
//!
//! - [`Block`](block::Block): a fixed-capacity, append-only, reusable container for a contiguous
//!   run of [`FeedData`] triples.
//! - [`SharedPool`](pool::SharedPool): the process-wide allocator and reservoir of blocks, shared
//!   across every partition.
//! - [`PartitionCache`](pool::PartitionCache): one partition's working set -- an insertion-ordered
//!   map of checked-out blocks, a frontier pointer for O(1) sequential access, and a
//!   reference-counted open/close lifecycle so overlapping subscribers on one partition share a
//!   single working set.
//!
//! Callers obtain a [`PartitionCache`](pool::PartitionCache) through
//! [`SharedPool::partition`](pool::SharedPool::partition), bracket their session with
//! [`open`](pool::PartitionCache::open)/[`close`](pool::PartitionCache::close), and call
//! [`add`](pool::PartitionCache::add)/[`add_all`](pool::PartitionCache::add_all) on the ingest
//! path and [`get`](pool::PartitionCache::get) on the read path.
//!
//! ## Non-goals
//!
//! This cache is not authoritative: a miss means "consult storage", not "this id doesn't exist".
//! It is not a write-through buffer, does not coalesce requests or batch I/O, and holds nothing
//! across process restarts.
//!
//! ## Example
//!
//! ```
//! use feed_cache::{config::FeedCacheConfig, block::ReqId, pool::SharedPool};
//!
//! let shared = SharedPool::new(FeedCacheConfig { block_size: 64, ..Default::default() }).unwrap();
//! let partition = shared.partition(7);
//! partition.open();
//!
//! partition.add(0, ReqId([0; 24]), 0);
//! assert_eq!(partition.get(0).map(|d| d.transaction_id), Some(0));
//!
//! partition.close();
//! ```

pub mod block;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;

mod identifier;

pub use crate::{
    block::{Block, FeedData, ReqId},
    config::FeedCacheConfig,
    error::{ConfigError, ConfigResult},
    identifier::{BlockKey, PartitionId},
    pool::{PartitionCache, SharedPool},
};
