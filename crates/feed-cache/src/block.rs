//! The fixed-capacity block: a contiguous run of feed-data triples for one [`BlockKey`].

use crate::identifier::BlockKey;

/// Opaque 24-byte request id carried alongside every committed record.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReqId(pub [u8; 24]);

impl std::fmt::Debug for ReqId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReqId(0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Feed data: the immutable triple a subscriber asks for by transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedData {
    /// Monotonically increasing transaction identifier.
    pub transaction_id: u64,
    /// Opaque request id of the client that submitted the transaction.
    pub req_id: ReqId,
    /// Header flags committed with the record.
    pub header: i32,
}

/// A fixed-capacity, append-only, reusable container for [`FeedData`] covering
/// `[base_id, base_id + capacity)`.
///
/// Slots below `fill_level` are always populated; there are never holes. Once allocated a block
/// is never resized: it is returned to the shared pool and [`reset`](Block::reset) for reuse
/// under a different [`BlockKey`] instead.
#[derive(Debug)]
pub struct Block {
    key: BlockKey,
    fill_level: u64,
    slots: Box<[Option<FeedData>]>,
}

impl Block {
    /// Allocates a new, empty block for `key` with room for `capacity` records.
    pub fn new(key: BlockKey, capacity: u64) -> Self {
        Self {
            key,
            fill_level: 0,
            slots: vec![None; capacity as usize].into_boxed_slice(),
        }
    }

    /// The block's identity.
    pub fn key(&self) -> BlockKey {
        self.key
    }

    /// Number of contiguously filled slots.
    pub fn fill_level(&self) -> u64 {
        self.fill_level
    }

    /// Capacity in records (`N`).
    pub fn capacity(&self) -> u64 {
        self.slots.len() as u64
    }

    /// Whether `transaction_id` falls within this block's `[base_id, base_id + N)` range.
    pub fn covers(&self, transaction_id: u64) -> bool {
        let base = self.key.base_transaction_id;
        transaction_id >= base && transaction_id < base + self.capacity()
    }

    /// Appends `(transaction_id, req_id, header)`.
    ///
    /// Succeeds only if `transaction_id` is within range and equal to the next expected slot
    /// (`base_id + fill_level`). Returns `false` and mutates nothing otherwise -- including when
    /// `transaction_id` was already added.
    pub fn add(&mut self, transaction_id: u64, req_id: ReqId, header: i32) -> bool {
        let expected = self.key.base_transaction_id + self.fill_level;
        if !self.covers(transaction_id) || transaction_id != expected {
            return false;
        }

        self.slots[self.fill_level as usize] = Some(FeedData { transaction_id, req_id, header });
        self.fill_level += 1;
        true
    }

    /// Returns the triple for `transaction_id` if it has been filled.
    pub fn get(&self, transaction_id: u64) -> Option<FeedData> {
        if transaction_id < self.key.base_transaction_id || transaction_id >= self.fill_level + self.key.base_transaction_id {
            return None;
        }
        let offset = (transaction_id - self.key.base_transaction_id) as usize;
        self.slots[offset]
    }

    /// Drains the block so it can be handed out for a new `key`.
    ///
    /// Invoked by the shared pool when a block returns to the free list; the new `key` is bound
    /// the next time the block is checked out.
    pub(crate) fn reset(&mut self, key: BlockKey) {
        self.key = key;
        self.fill_level = 0;
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}
