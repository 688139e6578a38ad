//! Process-wide counters for the shared pool.
//!
//! These are plain [`metrics`] facade calls rather than a derived metrics struct: the crate has
//! exactly one long-lived pool per process, so there is no per-instance scope to derive.

/// Registers descriptions for every metric this crate emits. Call once at startup; harmless if
/// called more than once (the facade just overwrites the description).
pub fn describe() {
    metrics::describe_counter!(
        "feed_cache.cache_misses",
        "Number of get() calls that found a resident block without the requested id"
    );
    metrics::describe_counter!(
        "feed_cache.blocks_allocated",
        "Number of blocks freshly allocated by the shared pool"
    );
    metrics::describe_counter!(
        "feed_cache.blocks_recycled",
        "Number of blocks reused from the shared pool's free list"
    );
    metrics::describe_counter!(
        "feed_cache.blocks_evicted",
        "Number of blocks evicted from a partition's local pool"
    );
    metrics::describe_counter!(
        "feed_cache.checkouts_exhausted",
        "Number of checkouts that failed because the shared pool was at capacity"
    );
    metrics::describe_gauge!(
        "feed_cache.partitions_active",
        "Number of partitions currently registered with the shared pool"
    );
}
