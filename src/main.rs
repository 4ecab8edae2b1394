use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use photoload::raw::{is_photo_file, HighlightTagger};
use photoload::{
    logging, CacheStore, Dispatcher, ExecutorPools, FilterParams, ImageView, MemoryCache,
    PhotoAsset, PipelineConfig, UiLoop, Variant,
};

/// Load every photo in a folder through the decode pipeline
#[derive(Parser, Debug)]
#[command(name = "photoload", version, about)]
struct Cli {
    /// Folder to scan (recursively) for photos
    folder: PathBuf,

    /// Pipeline config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Request full-size images instead of thumbnails
    #[arg(long)]
    full: bool,

    /// Show photos through their filter: the adjustment flags if any are
    /// given, else the filter saved next to each photo
    #[arg(long)]
    filtered: bool,

    /// Save the adjustment flags next to each photo
    #[arg(long)]
    save_filter: bool,

    /// Exposure in stops
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    exposure: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    contrast: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    saturation: f32,

    /// Blur sigma in pixels
    #[arg(long, default_value_t = 0.0)]
    blur: f32,

    /// Tag highlights on full-size decodes
    #[arg(long)]
    tag: bool,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

impl Cli {
    fn filter_params(&self) -> FilterParams {
        FilterParams {
            exposure: self.exposure,
            contrast: self.contrast,
            saturation: self.saturation,
            blur: self.blur,
        }
    }
}

/// Result of a folder load
#[derive(Debug, Default)]
struct LoadSummary {
    requested: usize,
    cache_hits: usize,
    displayed: usize,
    failed: usize,
    tagged: usize,
}

fn main() -> photoload::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    debug!(?config, "Using pipeline config");

    let photos = scan_folder(&cli.folder);
    if photos.is_empty() {
        println!("No photos found in {}", cli.folder.display());
        return Ok(());
    }
    info!(count = photos.len(), folder = %cli.folder.display(), "Found photos");

    let pools = Arc::new(ExecutorPools::from_config(&config)?);
    let cache = Arc::new(MemoryCache::with_capacity_mb(config.cache_capacity_mb));
    let ui = UiLoop::new();
    let dispatcher = Dispatcher::new(
        Arc::clone(&cache) as Arc<dyn CacheStore>,
        Arc::clone(&pools),
        ui.handle(),
    );

    let started = Instant::now();
    let params = cli.filter_params();
    let tagger = Arc::new(HighlightTagger::default());
    let mut summary = LoadSummary::default();
    let mut loaded = Vec::with_capacity(photos.len());

    for path in photos {
        let mut asset = PhotoAsset::from_config(path, &config).with_filter(params);
        if cli.tag {
            asset = asset.with_tagger(tagger.clone());
        }
        if params.is_unedited() {
            if let Err(e) = asset.load_saved_filter() {
                warn!(path = %asset.path().display(), error = %e, "Ignoring saved filter");
            }
        } else if cli.save_filter {
            if let Err(e) = asset.save_filter() {
                warn!(path = %asset.path().display(), error = %e, "Failed to save filter");
            }
        }
        let asset = Arc::new(asset);
        let view = ImageView::new();

        let dispatch = if cli.full {
            dispatcher.request_full_size(&view, asset.clone(), cli.filtered)
        } else {
            dispatcher.request_thumbnail(&view, asset.clone(), cli.filtered)
        };
        if dispatch.is_cache_hit() {
            summary.cache_hits += 1;
        }
        summary.requested += 1;
        loaded.push((asset, view));
    }

    let finished = ui.run_until(Duration::from_secs(cli.timeout_secs), || pools.jobs_in_flight() == 0);
    // Publishes posted just before the last job returned
    ui.run_pending();
    if !finished {
        warn!(timeout_secs = cli.timeout_secs, "Timed out waiting for photos");
    }

    for (asset, view) in &loaded {
        if view.displayed().is_some() {
            summary.displayed += 1;
        } else {
            summary.failed += 1;
            println!("  failed: {}", asset.path().display());
        }
        if !asset.tags().is_empty() {
            summary.tagged += 1;
        }
    }

    let stats = cache.stats();
    let variant = if cli.full { Variant::Full } else { Variant::Thumbnail };
    println!(
        "Loaded {} {} photos in {:.2?}: {} shown ({} from cache), {} failed",
        summary.requested,
        variant,
        started.elapsed(),
        summary.displayed,
        summary.cache_hits,
        summary.failed
    );
    println!(
        "Cache: {} entries, {:.1} MB, {} hits, {} misses, {} evictions",
        stats.entries,
        stats.bytes as f64 / (1024.0 * 1024.0),
        stats.hits,
        stats.misses,
        stats.evictions
    );
    if cli.tag {
        println!("Tagged: {}", summary.tagged);
    }
    debug!(?summary, "Load finished");

    for (_, view) in &loaded {
        view.destroy();
    }
    drop(dispatcher);
    match Arc::try_unwrap(pools) {
        Ok(pools) => pools.shutdown(config.shutdown_timeout()),
        Err(_) => warn!("Executor pools still shared at exit"),
    }

    Ok(())
}

/// Walk the directory tree for photo files, sorted by path
fn scan_folder(folder: &Path) -> Vec<PathBuf> {
    let mut photos: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_photo_file(path))
        .collect();
    photos.sort();
    photos
}
