//! In-memory image cache with LRU eviction
//!
//! Bounded by the total byte size of cached pixel buffers. Entries marked
//! in-use are skipped by eviction until their flag is cleared.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{CacheEntry, CacheKey, CacheStore};

/// Byte-bounded LRU store of decoded images
pub struct MemoryCache {
    inner: Mutex<Inner>,
    max_bytes: usize,
}

struct Inner {
    entries: HashMap<CacheKey, Slot>,
    current_bytes: usize,
    /// Access counter for LRU
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

struct Slot {
    entry: Arc<CacheEntry>,
    last_access: u64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl MemoryCache {
    /// Create a cache holding at most `max_bytes` of pixel data
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                current_bytes: 0,
                clock: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_bytes,
        }
    }

    /// Create with a capacity given in megabytes
    pub fn with_capacity_mb(megabytes: usize) -> Self {
        Self::new(megabytes.saturating_mul(1024 * 1024))
    }

    pub fn capacity(&self) -> usize {
        self.max_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Keys currently stored, in no particular order
    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            bytes: inner.current_bytes,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }

    /// Drop every entry that is not in use
    pub fn trim(&self) {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, slot| slot.entry.is_in_use());
        inner.current_bytes = inner.entries.values().map(|slot| slot.entry.byte_size()).sum();
        debug!(dropped = before - inner.entries.len(), "Trimmed image cache");
    }
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Slot> {
        let slot = self.entries.remove(key)?;
        self.current_bytes -= slot.entry.byte_size();
        Some(slot)
    }

    /// Evict least recently used entries that are not in use until
    /// `incoming` bytes fit in place of whatever `key` currently holds.
    /// The entry under `key` is never a victim. Evicts nothing and returns
    /// false if the room cannot be made.
    fn make_room(&mut self, key: &CacheKey, incoming: usize, max_bytes: usize) -> bool {
        let replaced = self.entries.get(key).map_or(0, |slot| slot.entry.byte_size());
        let evictable: usize = self
            .entries
            .iter()
            .filter(|(k, slot)| *k != key && !slot.entry.is_in_use())
            .map(|(_, slot)| slot.entry.byte_size())
            .sum();

        if self.current_bytes - replaced - evictable + incoming > max_bytes {
            return false;
        }

        while self.current_bytes - replaced + incoming > max_bytes {
            let victim = self
                .entries
                .iter()
                .filter(|(k, slot)| *k != key && !slot.entry.is_in_use())
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(k, _)| k.clone());

            match victim {
                Some(victim) => {
                    trace!(key = %victim, "Evicting cached image");
                    self.remove(&victim);
                    self.evictions += 1;
                }
                None => return false,
            }
        }
        true
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let mut inner = self.inner.lock();
        let now = inner.tick();

        match inner.entries.get_mut(key) {
            Some(slot) => {
                slot.last_access = now;
                let entry = Arc::clone(&slot.entry);
                inner.hits += 1;
                Some(entry)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    fn put(&self, entry: Arc<CacheEntry>) -> bool {
        if !entry.is_valid() {
            debug!(key = %entry.key(), "Rejected cache entry with recycled bitmap");
            return false;
        }

        let size = entry.byte_size();
        // Don't cache if image is larger than entire cache
        if size > self.max_bytes {
            debug!(key = %entry.key(), size, capacity = self.max_bytes, "Image larger than cache");
            return false;
        }

        let mut inner = self.inner.lock();
        let key = entry.key().clone();

        if let Some(existing) = inner.entries.get(&key) {
            if Arc::ptr_eq(&existing.entry, &entry) {
                return true;
            }
            // A filter job is reading the current entry
            if existing.entry.is_in_use() {
                debug!(key = %key, "Kept in-use entry, replacement refused");
                return false;
            }
        }

        if !inner.make_room(&key, size, self.max_bytes) {
            debug!(key = %key, "No evictable space for image");
            return false;
        }

        // The replaced entry's bytes no longer count against capacity
        inner.remove(&key);
        let now = inner.tick();
        inner.current_bytes += size;
        inner.entries.insert(key, Slot { entry, last_access: now });
        true
    }

    fn remove(&self, key: &CacheKey) {
        if self.inner.lock().remove(key).is_some() {
            trace!(key = %key, "Removed cached image");
        }
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MemoryCache")
            .field("capacity", &self.max_bytes)
            .field("entries", &stats.entries)
            .field("bytes", &stats.bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::cache::Variant;
    use image::{DynamicImage, RgbaImage};

    /// An entry whose bitmap occupies `pixels * 4` bytes
    fn entry(name: &str, pixels: u32) -> Arc<CacheEntry> {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(pixels, 1));
        Arc::new(CacheEntry::new(CacheKey::derive(name, Variant::Thumbnail), Bitmap::new(image)))
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::derive(name, Variant::Thumbnail)
    }

    #[test]
    fn test_cache_put_get() {
        let cache = MemoryCache::new(1024);
        let stored = entry("a.png", 10);

        assert!(cache.put(Arc::clone(&stored)));

        let found = cache.get(&key("a.png")).unwrap();
        assert!(Arc::ptr_eq(&found, &stored));
        assert_eq!(cache.stats().hits, 1);
        assert!(cache.get(&key("b.png")).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_eviction() {
        // 1000 bytes holds two 400-byte entries
        let cache = MemoryCache::new(1000);

        cache.put(entry("img1", 100));
        cache.put(entry("img2", 100));
        // Touch img1 so img2 becomes least recently used
        cache.get(&key("img1"));
        cache.put(entry("img3", 100));

        assert!(cache.contains(&key("img1")));
        assert!(!cache.contains(&key("img2")));
        assert!(cache.contains(&key("img3")));
        assert!(cache.stats().bytes <= cache.capacity());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_in_use_entry_is_not_evicted() {
        let cache = MemoryCache::new(1000);
        let pinned = entry("pinned", 100);
        pinned.set_in_use(true);
        cache.put(Arc::clone(&pinned));
        cache.put(entry("other", 100));

        cache.put(entry("incoming", 100));

        assert!(cache.contains(&key("pinned")));
        assert!(!cache.contains(&key("other")));

        // Nothing evictable left: the put is refused
        let blocker = cache.get(&key("incoming")).unwrap();
        blocker.set_in_use(true);
        assert!(!cache.put(entry("refused", 100)));
        assert!(cache.contains(&key("pinned")));
    }

    #[test]
    fn test_pinned_entry_survives_refused_replacement() {
        let cache = MemoryCache::new(1000);
        let pinned = entry("k", 100);
        pinned.set_in_use(true);
        cache.put(Arc::clone(&pinned));
        let other = entry("other", 100);
        other.set_in_use(true);
        cache.put(other);

        assert!(!cache.put(entry("k", 200)));

        let kept = cache.get(&key("k")).unwrap();
        assert!(Arc::ptr_eq(&kept, &pinned));
        assert_eq!(cache.stats().bytes, 800);

        // Once released the replacement goes through
        pinned.set_in_use(false);
        assert!(cache.put(entry("k", 50)));
        assert!(!Arc::ptr_eq(&cache.get(&key("k")).unwrap(), &pinned));
    }

    #[test]
    fn test_replacement_reuses_old_entry_bytes() {
        let cache = MemoryCache::new(1000);
        cache.put(entry("k", 100));
        let other = entry("other", 100);
        other.set_in_use(true);
        cache.put(other);

        // 800 - 400 + 600 fits exactly without touching `other`
        assert!(cache.put(entry("k", 150)));

        assert!(cache.contains(&key("other")));
        assert_eq!(cache.stats().bytes, 1000);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_refused_put_evicts_nothing() {
        let cache = MemoryCache::new(1000);
        cache.put(entry("loose", 100));
        let pinned = entry("pinned", 100);
        pinned.set_in_use(true);
        cache.put(pinned);

        assert!(!cache.put(entry("big", 200)));

        assert!(cache.contains(&key("loose")));
        assert!(cache.contains(&key("pinned")));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_rejects_recycled_bitmap() {
        let cache = MemoryCache::new(1024);
        let recycled = entry("gone", 10);
        recycled.bitmap().recycle();

        assert!(!cache.put(recycled));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rejects_oversized_image() {
        let cache = MemoryCache::new(100);
        assert!(!cache.put(entry("huge", 100)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_and_remove_keep_byte_count() {
        let cache = MemoryCache::new(1024);
        cache.put(entry("a", 10));
        cache.put(entry("a", 20));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().bytes, 80);

        cache.remove(&key("a"));
        assert_eq!(cache.stats().bytes, 0);
        // Removing a missing key is a no-op
        cache.remove(&key("a"));
    }

    #[test]
    fn test_trim_keeps_in_use_entries() {
        let cache = MemoryCache::with_capacity_mb(1);
        let pinned = entry("pinned", 10);
        pinned.set_in_use(true);
        cache.put(pinned);
        cache.put(entry("loose", 10));

        cache.trim();

        assert_eq!(cache.keys(), vec![key("pinned")]);
        assert_eq!(cache.stats().bytes, 40);
    }
}
