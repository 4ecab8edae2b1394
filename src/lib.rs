//! Asynchronous photo loading for image views
//!
//! Display requests go through a [`Dispatcher`]. Decoded images are kept in
//! a [`CacheStore`]; misses are decoded on a bounded worker pool and filters
//! run one at a time on a dedicated worker. Results are handed back to the
//! thread that owns the views through a [`UiLoop`].

pub mod asset;
pub mod bitmap;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod raw;
pub mod ui;

pub use asset::SourceAsset;
pub use bitmap::Bitmap;
pub use cache::{CacheEntry, CacheKey, CacheStore, MemoryCache, Variant};
pub use config::PipelineConfig;
pub use error::{PhotoloadError, Result};
pub use pipeline::{Dispatch, Dispatcher, ExecutorPools, ImageRequest, TaskHandle};
pub use raw::{FilterParams, PhotoAsset};
pub use ui::{ImageView, UiHandle, UiLoop};
