//! Scriptable assets and a pipeline harness for tests

use image::{DynamicImage, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{Dispatcher, ExecutorPools};
use crate::asset::SourceAsset;
use crate::bitmap::Bitmap;
use crate::cache::{CacheEntry, CacheKey, CacheStore, MemoryCache, Variant};
use crate::ui::UiLoop;

pub(crate) const TIMEOUT: Duration = Duration::from_secs(5);

/// Asset that counts every call and can be slowed down or made to fail
pub(crate) struct ScriptedAsset {
    id: String,
    processing: bool,
    fail_decode: bool,
    decode_delay: Duration,
    filter_delay: Duration,
    needs_tags: AtomicBool,
    pub decodes: AtomicUsize,
    pub filters: AtomicUsize,
    pub taggings: AtomicUsize,
    active_filters: AtomicUsize,
    pub peak_filters: AtomicUsize,
    /// Entry whose in-use flag is sampled while filtering
    watched: Mutex<Option<(Arc<MemoryCache>, CacheKey)>>,
    pub in_use_during_filter: AtomicBool,
}

impl ScriptedAsset {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            processing: false,
            fail_decode: false,
            decode_delay: Duration::ZERO,
            filter_delay: Duration::ZERO,
            needs_tags: AtomicBool::new(false),
            decodes: AtomicUsize::new(0),
            filters: AtomicUsize::new(0),
            taggings: AtomicUsize::new(0),
            active_filters: AtomicUsize::new(0),
            peak_filters: AtomicUsize::new(0),
            watched: Mutex::new(None),
            in_use_during_filter: AtomicBool::new(false),
        }
    }

    pub fn with_filter(mut self) -> Self {
        self.processing = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_decode = true;
        self
    }

    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = delay;
        self
    }

    pub fn with_filter_delay(mut self, delay: Duration) -> Self {
        self.filter_delay = delay;
        self
    }

    pub fn needing_tags(self) -> Self {
        self.needs_tags.store(true, Ordering::SeqCst);
        self
    }

    pub fn watch(&self, cache: Arc<MemoryCache>, key: CacheKey) {
        *self.watched.lock() = Some((cache, key));
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Solid image whose size depends on the variant
pub(crate) fn sample_image(variant: Variant) -> DynamicImage {
    let side = match variant {
        Variant::Thumbnail => 8,
        Variant::Full => 32,
    };
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(side, side, Rgba([200, 100, 50, 255])))
}

impl SourceAsset for ScriptedAsset {
    fn id(&self) -> &str {
        &self.id
    }

    fn decode(&self, variant: Variant) -> Option<DynamicImage> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.decode_delay);
        if self.fail_decode {
            None
        } else {
            Some(sample_image(variant))
        }
    }

    fn requires_processing(&self) -> bool {
        self.processing
    }

    fn filter(&self, image: &DynamicImage) -> DynamicImage {
        let now = self.active_filters.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_filters.fetch_max(now, Ordering::SeqCst);

        if let Some((cache, key)) = self.watched.lock().as_ref() {
            if cache.get(key).is_some_and(|entry| entry.is_in_use()) {
                self.in_use_during_filter.store(true, Ordering::SeqCst);
            }
        }

        thread::sleep(self.filter_delay);
        let mut filtered = image.clone();
        filtered.invert();

        self.filters.fetch_add(1, Ordering::SeqCst);
        self.active_filters.fetch_sub(1, Ordering::SeqCst);
        filtered
    }

    fn needs_tagging(&self) -> bool {
        self.needs_tags.load(Ordering::SeqCst)
    }

    fn run_tagging(&self, _image: &DynamicImage) {
        self.taggings.fetch_add(1, Ordering::SeqCst);
        self.needs_tags.store(false, Ordering::SeqCst);
    }
}

/// Pools, cache, UI loop and dispatcher wired together on the test thread
pub(crate) struct Harness {
    pub ui: UiLoop,
    pub cache: Arc<MemoryCache>,
    pub pools: Arc<ExecutorPools>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new() -> Self {
        let ui = UiLoop::new();
        let cache = Arc::new(MemoryCache::with_capacity_mb(4));
        let pools = Arc::new(ExecutorPools::new(2).unwrap());
        let store: Arc<dyn CacheStore> = cache.clone();
        let dispatcher = Dispatcher::new(store, Arc::clone(&pools), ui.handle());
        Self { ui, cache, pools, dispatcher }
    }

    /// Pump the UI loop until `done` holds; panics on timeout
    pub fn pump_until(&self, done: impl FnMut() -> bool) {
        assert!(self.ui.run_until(TIMEOUT, done), "timed out waiting for pipeline");
    }

    /// Give already-finished background work a chance to publish
    pub fn settle(&self) {
        self.ui.run_for(Duration::from_millis(100));
    }

    /// Store a valid decoded entry for `asset`'s `variant`
    pub fn prefill(&self, asset: &dyn SourceAsset, variant: Variant) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(asset.key_for(variant), Bitmap::new(sample_image(variant))));
        assert!(self.cache.put(Arc::clone(&entry)));
        entry
    }
}
