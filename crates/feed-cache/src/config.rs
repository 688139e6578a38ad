//! Pool-wide configuration.

use crate::error::{ConfigError, ConfigResult};

/// Default number of records per block. A power of two so that `base_id` computation is a cheap
/// mask in practice, even though this implementation uses `%` for clarity.
pub const DEFAULT_BLOCK_SIZE: u64 = 64;

/// Default per-partition block budget.
pub const DEFAULT_MAX_BLOCKS_PER_PARTITION: usize = 64;

/// Default ceiling on blocks in circulation across all partitions.
pub const DEFAULT_SHARED_POOL_CAPACITY: usize = 4096;

/// Configuration for a [`SharedPool`](crate::pool::SharedPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeedCacheConfig {
    /// Records per block (`N`). Pool-wide and fixed for the lifetime of the pool.
    pub block_size: u64,
    /// Default per-partition block budget; adjustable live via `PartitionCache::set_max_blocks`.
    pub max_blocks_per_partition: usize,
    /// Maximum blocks in circulation across all partitions.
    pub shared_pool_capacity: usize,
}

impl Default for FeedCacheConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_blocks_per_partition: DEFAULT_MAX_BLOCKS_PER_PARTITION,
            shared_pool_capacity: DEFAULT_SHARED_POOL_CAPACITY,
        }
    }
}

impl FeedCacheConfig {
    /// Validates the configuration, returning the first violated invariant.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.shared_pool_capacity == 0 {
            return Err(ConfigError::ZeroPoolCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(FeedCacheConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_block_size() {
        let config = FeedCacheConfig { block_size: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBlockSize));
    }

    #[test]
    fn rejects_zero_pool_capacity() {
        let config = FeedCacheConfig { shared_pool_capacity: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPoolCapacity));
    }
}
