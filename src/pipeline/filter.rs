//! Serialized filter jobs
//!
//! Filtering is the heaviest work in the pipeline, so every filter job goes
//! through the single-worker pool: at most one runs at a time, process-wide.
//! The unfiltered source is cached like any decode; the filtered result is
//! shown but never cached, so each filtered request recomputes it.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::fetch::decode_source;
use super::ExecutorPools;
use crate::asset::SourceAsset;
use crate::bitmap::Bitmap;
use crate::cache::{CacheEntry, CacheKey, CacheStore, Variant};
use crate::ui::{ImageView, UiHandle, ViewHandle};

pub struct FilterPipeline {
    cache: Arc<dyn CacheStore>,
    pools: Arc<ExecutorPools>,
    ui: UiHandle,
}

impl FilterPipeline {
    pub fn new(cache: Arc<dyn CacheStore>, pools: Arc<ExecutorPools>, ui: UiHandle) -> Self {
        Self { cache, pools, ui }
    }

    /// Queue a filter job that shows the filtered `variant` of `asset` on
    /// `target`. Must be called on the owning thread.
    pub fn request_filtered(&self, target: &Arc<ImageView>, asset: Arc<dyn SourceAsset>, variant: Variant) {
        let generation = target.begin_request();
        debug!(asset = asset.id(), variant = %variant, view = target.id(), generation, "Queueing filter job");

        let job = FilterJob {
            asset,
            variant,
            generation,
            view: target.handle(),
            cache: Arc::clone(&self.cache),
            ui: self.ui.clone(),
        };
        self.pools.spawn_filter(move || job.run());
    }
}

struct FilterJob {
    asset: Arc<dyn SourceAsset>,
    variant: Variant,
    generation: u64,
    view: ViewHandle,
    cache: Arc<dyn CacheStore>,
    ui: UiHandle,
}

impl FilterJob {
    /// Runs on the filter pool
    fn run(self) {
        let key = self.asset.key_for(self.variant);
        let Some(source) = self.acquire_source(&key) else {
            return;
        };

        let filtered = source.bitmap().image().map(|pixels| self.asset.filter(&pixels));
        source.set_in_use(false);

        let Some(filtered) = filtered else {
            warn!(key = %key, "Source image recycled before filtering");
            return;
        };

        if self.variant.is_full() && self.asset.needs_tagging() {
            self.asset.run_tagging(&filtered);
        }

        let bitmap = Bitmap::new(filtered);
        let ui = self.ui.clone();
        ui.post(move || self.publish(bitmap));
    }

    /// Cached source entry for `key`, decoding and caching it on a miss.
    /// The returned entry is marked in use.
    fn acquire_source(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        if let Some(cached) = self.cache.get(key) {
            if cached.is_valid() {
                cached.set_in_use(true);
                return Some(cached);
            }
            self.cache.remove(key);
        }

        let image = decode_source(self.asset.as_ref(), self.variant)?;
        let entry = Arc::new(CacheEntry::new(key.clone(), Bitmap::new(image)));
        entry.set_in_use(true);
        if !self.cache.put(Arc::clone(&entry)) {
            debug!(key = %key, "Cache declined filter source");
        }
        Some(entry)
    }

    /// Runs on the owning thread
    fn publish(self, bitmap: Bitmap) {
        match self.view.get() {
            Some(view) if view.is_current(self.generation) => view.set_displayed_image(Some(bitmap)),
            Some(view) => debug!(
                view = view.id(),
                generation = self.generation,
                current = view.generation(),
                "Discarding stale filter result"
            ),
            None => trace!(view = self.view.id(), "View gone before filter publish"),
        }
    }
}
