/// Pipeline configuration
///
/// Stored as JSON, loaded once at startup. Every field has a default so a
/// partial (or missing) file is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PhotoloadError, Result};

/// Size of generated thumbnails (square)
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;
/// Width of full-size decodes
pub const DEFAULT_DISPLAY_SIZE: u32 = 1280;
pub const DEFAULT_CACHE_CAPACITY_MB: usize = 64;
/// Cap on the platform-derived decode pool size
const MAX_DEFAULT_DECODE_WORKERS: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent decodes on the decode pool
    pub decode_workers: usize,
    /// Memory budget of the decoded image cache
    pub cache_capacity_mb: usize,
    /// Bounding square of thumbnail decodes
    pub thumbnail_size: u32,
    /// Maximum width of full-size decodes
    pub display_size: u32,
    /// Grace period for running jobs at shutdown
    pub shutdown_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decode_workers: default_decode_workers(),
            cache_capacity_mb: DEFAULT_CACHE_CAPACITY_MB,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            display_size: DEFAULT_DISPLAY_SIZE,
            shutdown_timeout_ms: 5000,
        }
    }
}

/// Pool size for the host: available cores, capped
fn default_decode_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_DECODE_WORKERS)
}

impl PipelineConfig {
    /// Parse from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| PhotoloadError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded pipeline config");
        Self::from_json(&json)
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Get the path where the config file is looked up by default
    /// - Linux: ~/.config/photoload/config.json
    /// - macOS: ~/Library/Application Support/photoload/config.json
    /// - Windows: %APPDATA%\photoload\config.json
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("photoload");
        path.push("config.json");
        Some(path)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.decode_workers == 0, "decode_workers must be at least 1"),
            (self.cache_capacity_mb == 0, "cache_capacity_mb must be at least 1"),
            (self.thumbnail_size == 0, "thumbnail_size must be positive"),
            (self.display_size == 0, "display_size must be positive"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(PhotoloadError::InvalidConfig((*message).to_string())),
            None => Ok(()),
        }
    }

    pub fn cache_capacity_bytes(&self) -> usize {
        self.cache_capacity_mb.saturating_mul(1024 * 1024)
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.shutdown_timeout_ms)
    }
}
