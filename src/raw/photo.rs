//! Photo files as source assets
//!
//! Ordinary image files are decoded whole. Camera RAW files are never
//! demosaiced here; the largest embedded JPEG preview stands in for them.
//! Thumbnails scan only a prefix of the file first since small previews
//! usually sit near the start.

use image::{imageops::FilterType, DynamicImage};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::embedded::{self, FAST_SCAN_BYTES};
use super::filter::FilterParams;
use super::tags::{PhotoTag, Tagger};
use crate::asset::SourceAsset;
use crate::cache::Variant;
use crate::config::{PipelineConfig, DEFAULT_DISPLAY_SIZE, DEFAULT_THUMBNAIL_SIZE};
use crate::error::Result;

/// Non-RAW formats decoded through the `image` crate
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif"];

/// Check if a path looks like something we can show
pub fn is_photo_file(path: &Path) -> bool {
    embedded::is_raw_file(path)
        || path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// A photo on disk
pub struct PhotoAsset {
    path: PathBuf,
    id: String,
    thumbnail_size: u32,
    display_size: u32,
    filter: RwLock<FilterParams>,
    tagger: Option<Arc<dyn Tagger>>,
    tags: Mutex<Vec<PhotoTag>>,
    tagged: AtomicBool,
}

impl PhotoAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path.to_string_lossy().to_string();
        Self {
            path,
            id,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            display_size: DEFAULT_DISPLAY_SIZE,
            filter: RwLock::new(FilterParams::default()),
            tagger: None,
            tags: Mutex::new(Vec::new()),
            tagged: AtomicBool::new(false),
        }
    }

    pub fn from_config(path: impl Into<PathBuf>, config: &PipelineConfig) -> Self {
        Self::new(path).with_sizes(config.thumbnail_size, config.display_size)
    }

    pub fn with_sizes(mut self, thumbnail_size: u32, display_size: u32) -> Self {
        self.thumbnail_size = thumbnail_size;
        self.display_size = display_size;
        self
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn Tagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn with_filter(self, params: FilterParams) -> Self {
        self.set_filter(params);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filter_params(&self) -> FilterParams {
        *self.filter.read()
    }

    /// Replace the filter. Takes effect on the next filtered request.
    pub fn set_filter(&self, params: FilterParams) {
        *self.filter.write() = params;
    }

    /// Pick up the filter saved next to the photo. Returns whether a saved
    /// filter was found.
    pub fn load_saved_filter(&self) -> Result<bool> {
        match FilterParams::load_sidecar(&self.path)? {
            Some(params) => {
                self.set_filter(params);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist the current filter next to the photo
    pub fn save_filter(&self) -> Result<()> {
        self.filter_params().save_sidecar(&self.path)
    }

    /// Tags found by the last tagging run
    pub fn tags(&self) -> Vec<PhotoTag> {
        self.tags.lock().clone()
    }

    fn load(&self, variant: Variant) -> Result<Option<DynamicImage>> {
        if !embedded::is_raw_file(&self.path) {
            return Ok(Some(image::open(&self.path)?));
        }

        if variant == Variant::Thumbnail {
            if let Some(preview) = embedded::read_embedded_jpeg(&self.path, Some(FAST_SCAN_BYTES))? {
                return Ok(Some(preview));
            }
        }
        Ok(embedded::read_embedded_jpeg(&self.path, None)?)
    }

    /// Shrink to the configured size for `variant`, never enlarging
    fn fit(&self, image: DynamicImage, variant: Variant) -> DynamicImage {
        match variant {
            Variant::Thumbnail => {
                let size = self.thumbnail_size;
                if image.width() > size || image.height() > size {
                    image.resize(size, size, FilterType::Lanczos3)
                } else {
                    image
                }
            }
            Variant::Full => {
                if image.width() > self.display_size {
                    let height = image.height();
                    image.resize(self.display_size, height, FilterType::Lanczos3)
                } else {
                    image
                }
            }
        }
    }
}

impl SourceAsset for PhotoAsset {
    fn id(&self) -> &str {
        &self.id
    }

    fn decode(&self, variant: Variant) -> Option<DynamicImage> {
        match self.load(variant) {
            Ok(Some(image)) => Some(self.fit(image, variant)),
            Ok(None) => {
                debug!(path = %self.path.display(), "No embedded preview found");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load photo");
                None
            }
        }
    }

    fn requires_processing(&self) -> bool {
        !self.filter.read().is_unedited()
    }

    fn filter(&self, image: &DynamicImage) -> DynamicImage {
        let params = self.filter_params();
        params.apply(image)
    }

    fn needs_tagging(&self) -> bool {
        self.tagger.is_some() && !self.tagged.load(Ordering::Acquire)
    }

    fn run_tagging(&self, image: &DynamicImage) {
        let Some(tagger) = &self.tagger else {
            return;
        };
        let tags = tagger.detect(image);
        debug!(path = %self.path.display(), count = tags.len(), "Tagged photo");
        *self.tags.lock() = tags;
        self.tagged.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for PhotoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoAsset")
            .field("path", &self.path)
            .field("filter", &self.filter_params())
            .field("tagged", &self.tagged.load(Ordering::Relaxed))
            .finish()
    }
}
