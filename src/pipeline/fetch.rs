//! Cached or background-decoded image requests
//!
//! A request is answered straight from the cache when a valid entry exists.
//! Otherwise one decode job is queued on the decode pool and the view
//! tracks it. The job's result is always cached once it exists, even if
//! the view has moved on; it is only shown if the view is still waiting
//! for it.

use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::{Dispatch, ExecutorPools, TaskHandle};
use crate::asset::SourceAsset;
use crate::bitmap::Bitmap;
use crate::cache::{CacheEntry, CacheKey, CacheStore, Variant};
use crate::ui::{ImageView, UiHandle, ViewHandle};

pub struct FetchPipeline {
    cache: Arc<dyn CacheStore>,
    pools: Arc<ExecutorPools>,
    ui: UiHandle,
}

impl FetchPipeline {
    pub fn new(cache: Arc<dyn CacheStore>, pools: Arc<ExecutorPools>, ui: UiHandle) -> Self {
        Self { cache, pools, ui }
    }

    /// Show `variant` of `asset` on `target`. Must be called on the owning
    /// thread.
    pub fn request_image(
        &self,
        target: &Arc<ImageView>,
        asset: Arc<dyn SourceAsset>,
        variant: Variant,
    ) -> Dispatch {
        let generation = target.begin_request();
        let key = asset.key_for(variant);

        if let Some(cached) = self.cache.get(&key) {
            if cached.is_valid() {
                debug!(key = %key, view = target.id(), "Cache hit");
                target.set_displayed_image(Some(cached.bitmap().clone()));
                return Dispatch::CacheHit;
            }

            // Means we have an entry whose bitmap was recycled, so remove it
            debug!(key = %key, "Evicting recycled cache entry");
            self.cache.remove(&key);
        }

        debug!(key = %key, view = target.id(), generation, "Cache miss, queueing decode");

        let task = TaskHandle::new(key.clone(), generation);
        target.track_task(task.clone());
        target.clear_display();

        let job = DecodeJob {
            asset,
            variant,
            key,
            task: task.clone(),
            view: target.handle(),
            cache: Arc::clone(&self.cache),
            ui: self.ui.clone(),
        };
        self.pools.spawn_decode(move || job.run());

        Dispatch::Decoding(task)
    }
}

/// Decode the source image for `variant`, logging failures
pub(crate) fn decode_source(asset: &dyn SourceAsset, variant: Variant) -> Option<DynamicImage> {
    let image = asset.decode(variant);
    if image.is_none() {
        warn!(asset = asset.id(), variant = %variant, "Failed to decode image");
    }
    image
}

struct DecodeJob {
    asset: Arc<dyn SourceAsset>,
    variant: Variant,
    key: CacheKey,
    task: TaskHandle,
    view: ViewHandle,
    cache: Arc<dyn CacheStore>,
    ui: UiHandle,
}

impl DecodeJob {
    /// Runs on the decode pool
    fn run(self) {
        let entry = decode_source(self.asset.as_ref(), self.variant).map(|image| {
            if self.variant.is_full() && self.asset.needs_tagging() {
                self.asset.run_tagging(&image);
            }
            Arc::new(CacheEntry::new(self.key.clone(), Bitmap::new(image)))
        });

        let ui = self.ui.clone();
        ui.post(move || self.publish(entry));
    }

    /// Runs on the owning thread
    fn publish(self, entry: Option<Arc<CacheEntry>>) {
        let view = self.view.get();
        if let Some(view) = &view {
            view.finish_task(&self.task);
        }

        let Some(entry) = entry else {
            return;
        };

        match view {
            Some(view) if !self.task.is_cancelled() && view.is_current(self.task.generation()) => {
                view.set_displayed_image(Some(entry.bitmap().clone()));
            }
            Some(view) => debug!(
                key = %self.key,
                view = view.id(),
                generation = self.task.generation(),
                current = view.generation(),
                "Discarding stale decode"
            ),
            None => trace!(key = %self.key, view = self.view.id(), "View gone before publish"),
        }

        // Finished work is cached whether or not anyone still wants it
        if !self.cache.put(entry) {
            debug!(key = %self.key, "Cache declined decoded image");
        }
    }
}
