/// Photo decoding module
///
/// This module handles:
/// - Extracting embedded JPEGs from RAW files
/// - Decoding photos at thumbnail and display size
/// - Filter parameters and their pixel transform
/// - Tagging regions of interest

pub mod embedded;
pub mod filter;
pub mod photo;
pub mod tags;

pub use embedded::{is_raw_file, RAW_EXTENSIONS};
pub use filter::FilterParams;
pub use photo::{is_photo_file, PhotoAsset, IMAGE_EXTENSIONS};
pub use tags::{HighlightTagger, PhotoTag, Tagger};
