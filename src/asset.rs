//! Source assets
//!
//! A source asset knows how to decode itself at each size variant, whether
//! it wants a filter applied, and whether it still needs tagging. The pixel
//! algorithms behind those operations live with the implementation.

use image::DynamicImage;

use crate::cache::{CacheKey, Variant};

/// One displayable photo
pub trait SourceAsset: Send + Sync {
    /// Stable identity of the asset, e.g. its path
    fn id(&self) -> &str;

    /// Decode the image for `variant`. `None` means the decode failed.
    fn decode(&self, variant: Variant) -> Option<DynamicImage>;

    /// Cache key for `variant`
    fn key_for(&self, variant: Variant) -> CacheKey {
        CacheKey::derive(self.id(), variant)
    }

    /// Whether the asset carries a filter that should be applied on display
    fn requires_processing(&self) -> bool;

    /// Produce a filtered copy of `image`
    fn filter(&self, image: &DynamicImage) -> DynamicImage;

    /// Whether tagging still has to run on this asset
    fn needs_tagging(&self) -> bool;

    /// Analyse `image` and record the result on the asset
    fn run_tagging(&self, image: &DynamicImage);
}
