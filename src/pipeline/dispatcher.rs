use std::sync::Arc;

use super::{ExecutorPools, FetchPipeline, FilterPipeline, TaskHandle};
use crate::asset::SourceAsset;
use crate::cache::{CacheStore, Variant};
use crate::ui::{ImageView, UiHandle};

/// A display request, immutable once submitted
#[derive(Clone)]
pub struct ImageRequest {
    pub asset: Arc<dyn SourceAsset>,
    pub variant: Variant,
    /// Show the asset's filter, if it has one
    pub filter_requested: bool,
}

impl ImageRequest {
    pub fn thumbnail(asset: Arc<dyn SourceAsset>, filter_requested: bool) -> Self {
        Self { asset, variant: Variant::Thumbnail, filter_requested }
    }

    pub fn full_size(asset: Arc<dyn SourceAsset>, filter_requested: bool) -> Self {
        Self { asset, variant: Variant::Full, filter_requested }
    }
}

impl std::fmt::Debug for ImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRequest")
            .field("asset", &self.asset.id())
            .field("variant", &self.variant)
            .field("filter_requested", &self.filter_requested)
            .finish()
    }
}

/// Route a request took
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Shown straight from the cache, nothing scheduled
    CacheHit,
    /// A decode job was queued
    Decoding(TaskHandle),
    /// A filter job was queued
    Filtering,
}

impl Dispatch {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Dispatch::CacheHit)
    }
}

/// Entry point for display requests
pub struct Dispatcher {
    fetch: FetchPipeline,
    filter: FilterPipeline,
    ui: UiHandle,
}

impl Dispatcher {
    pub fn new(cache: Arc<dyn CacheStore>, pools: Arc<ExecutorPools>, ui: UiHandle) -> Self {
        Self {
            fetch: FetchPipeline::new(Arc::clone(&cache), Arc::clone(&pools), ui.clone()),
            filter: FilterPipeline::new(cache, pools, ui.clone()),
            ui,
        }
    }

    pub fn request_thumbnail(
        &self,
        target: &Arc<ImageView>,
        asset: Arc<dyn SourceAsset>,
        honor_filter: bool,
    ) -> Dispatch {
        self.request(target, ImageRequest::thumbnail(asset, honor_filter))
    }

    pub fn request_full_size(
        &self,
        target: &Arc<ImageView>,
        asset: Arc<dyn SourceAsset>,
        honor_filter: bool,
    ) -> Dispatch {
        self.request(target, ImageRequest::full_size(asset, honor_filter))
    }

    /// Filtered requests for assets that carry a filter go to the filter
    /// queue; everything else is fetched.
    pub fn request(&self, target: &Arc<ImageView>, request: ImageRequest) -> Dispatch {
        debug_assert!(
            self.ui.is_owning_thread(),
            "display requests must be issued on the owning thread"
        );

        if request.filter_requested && request.asset.requires_processing() {
            self.filter.request_filtered(target, request.asset, request.variant);
            Dispatch::Filtering
        } else {
            self.fetch.request_image(target, request.asset, request.variant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{Harness, ScriptedAsset};

    #[test]
    fn test_filter_route_needs_request_and_filter() {
        let harness = Harness::new();
        let plain = Arc::new(ScriptedAsset::new("plain"));
        let filtered = Arc::new(ScriptedAsset::new("filtered").with_filter());
        let unrequested = Arc::new(ScriptedAsset::new("unrequested").with_filter());

        assert!(matches!(
            harness.dispatcher.request_thumbnail(&ImageView::new(), filtered, true),
            Dispatch::Filtering
        ));
        assert!(matches!(
            harness.dispatcher.request_thumbnail(&ImageView::new(), unrequested, false),
            Dispatch::Decoding(_)
        ));
        assert!(matches!(
            harness.dispatcher.request_full_size(&ImageView::new(), plain, true),
            Dispatch::Decoding(_)
        ));

        assert_eq!(harness.pools.filter_jobs_submitted(), 1);
        assert_eq!(harness.pools.decode_jobs_submitted(), 2);
    }

    #[test]
    fn test_request_carries_variant() {
        let harness = Harness::new();
        let asset = Arc::new(ScriptedAsset::new("a"));
        let view = ImageView::new();

        let request = ImageRequest::full_size(asset.clone(), false);
        assert_eq!(request.variant, Variant::Full);

        match harness.dispatcher.request(&view, request) {
            Dispatch::Decoding(task) => assert_eq!(task.key(), &asset.key_for(Variant::Full)),
            other => panic!("expected a decode, got {:?}", other),
        }
    }
}
