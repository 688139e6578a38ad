//! Error types.
//!
//! Nothing on the `add`/`get` hot path returns a `Result` -- per the design, the cache is a hint
//! and misuse is tolerated silently (see [`crate::pool::partition::PartitionCache`]). The only
//! fallible operation in this crate is constructing a misconfigured pool.

/// Error returned when a [`FeedCacheConfig`](crate::config::FeedCacheConfig) describes a pool
/// that can never hold any blocks.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `block_size` was zero; every transaction id would divide into an empty range.
    #[error("block_size must be non-zero")]
    ZeroBlockSize,
    /// `shared_pool_capacity` was zero; no block could ever be allocated.
    #[error("shared_pool_capacity must be non-zero")]
    ZeroPoolCapacity,
}

/// Result alias for construction-time fallibility.
pub type ConfigResult<T> = Result<T, ConfigError>;
