//! Identifiers used to address blocks within the shared pool.

/// Identifies a partition of the transaction log.
pub type PartitionId = i32;

/// Identity of a [`Block`](crate::block::Block): the partition it belongs to and the base
/// transaction id of the range it covers.
///
/// Two keys with the same fields are indistinguishable; `BlockKey` interns by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    /// The partition this block belongs to.
    pub partition_id: PartitionId,
    /// `transactionId - (transactionId mod blockSize)` for every id the block can hold.
    pub base_transaction_id: u64,
}

impl BlockKey {
    /// Returns the key of the block that would hold `transaction_id`, given a pool-wide
    /// `block_size`.
    pub fn for_transaction(
        partition_id: PartitionId,
        transaction_id: u64,
        block_size: u64,
    ) -> Self {
        Self { partition_id, base_transaction_id: transaction_id - (transaction_id % block_size) }
    }
}
