/// Decoded image cache
///
/// This module handles:
/// - Cache key derivation from (asset, variant)
/// - Cache entries with validity and in-use flags
/// - The `CacheStore` seam the pipelines write through
/// - A byte-bounded in-memory store

mod entry;
mod key;
mod memory;

use std::sync::Arc;

pub use entry::CacheEntry;
pub use key::{CacheKey, Variant};
pub use memory::{CacheStats, MemoryCache};

/// Capacity-bounded concurrent store of decoded images.
///
/// Eviction policy belongs to the implementation. Implementations must
/// not reclaim an entry while its in-use flag is set.
pub trait CacheStore: Send + Sync {
    /// Look up an entry. Invalid entries may be returned; callers check.
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>>;

    /// Store an entry under its own key, replacing any previous one.
    ///
    /// Entries whose bitmap is no longer valid are rejected rather than
    /// stored as tombstones. Returns whether the entry was stored.
    fn put(&self, entry: Arc<CacheEntry>) -> bool;

    /// Drop the entry under `key`, if any
    fn remove(&self, key: &CacheKey);
}
