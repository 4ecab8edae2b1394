use std::path::PathBuf;
use thiserror::Error;

/// Errors from setting up or driving the pipeline.
///
/// Expected absence (a failed decode, a destroyed view) is not an error;
/// the pipeline carries it as `None`.
#[derive(Debug, Error)]
pub enum PhotoloadError {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to start executor pool: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Invalid filter sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PhotoloadError>;
