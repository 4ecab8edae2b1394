use std::sync::atomic::{AtomicBool, Ordering};

use super::CacheKey;
use crate::bitmap::Bitmap;

/// A decoded image stored under a cache key.
///
/// The in-use flag is advisory: it tells the store not to reclaim the entry
/// while a filter job is reading its pixels. It is not a lock. It is only
/// sound because filter jobs run one at a time on the serialized pool, so a
/// single writer touches it at any moment. Allowing concurrent filter jobs
/// on the same key would require a real guard here.
#[derive(Debug)]
pub struct CacheEntry {
    key: CacheKey,
    bitmap: Bitmap,
    in_use: AtomicBool,
}

impl CacheEntry {
    pub fn new(key: CacheKey, bitmap: Bitmap) -> Self {
        Self {
            key,
            bitmap,
            in_use: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// False once the wrapped bitmap has been recycled
    pub fn is_valid(&self) -> bool {
        self.bitmap.is_valid()
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Relaxed)
    }

    pub fn set_in_use(&self, in_use: bool) {
        self.in_use.store(in_use, Ordering::Relaxed);
    }

    pub fn byte_size(&self) -> usize {
        self.bitmap.byte_size()
    }
}
