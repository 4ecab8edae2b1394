/// Embedded preview extraction for camera RAW files
///
/// RAW files carry one or more JPEG previews next to the sensor data. We
/// find them by scanning for JPEG start/end markers and keep the largest
/// candidate that actually decodes.

use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

/// Supported RAW file extensions (common formats)
pub const RAW_EXTENSIONS: [&str; 16] = [
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2",
    "pef", "srw", "erf", "kdc", "dcr", "mos", "raw", "rwl",
];

/// Prefix scanned first when only a thumbnail is needed
pub const FAST_SCAN_BYTES: usize = 256 * 1024;

const JPEG_START: [u8; 3] = [0xFF, 0xD8, 0xFF]; // SOI followed by a marker
const JPEG_END: [u8; 2] = [0xFF, 0xD9]; // EOI

/// Stop after finding a few starts
const MAX_CANDIDATES: usize = 8;
/// End markers tried per start before giving up on it
const MAX_END_ATTEMPTS: usize = 4;

/// Check if a path has a RAW extension
pub fn is_raw_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| RAW_EXTENSIONS.contains(&ext.as_str()))
}

/// Decode the largest embedded JPEG found in the first `limit` bytes of the
/// file, or the whole file when `limit` is `None`
pub fn read_embedded_jpeg(path: &Path, limit: Option<usize>) -> io::Result<Option<DynamicImage>> {
    let file = File::open(path)?;
    let mut data = Vec::new();
    match limit {
        Some(max_bytes) => file.take(max_bytes as u64).read_to_end(&mut data)?,
        None => (&file).read_to_end(&mut data)?,
    };

    Ok(largest_embedded_jpeg(&data))
}

/// Extract the largest decodable JPEG from already-loaded data
pub fn largest_embedded_jpeg(data: &[u8]) -> Option<DynamicImage> {
    let starts: Vec<usize> = data
        .windows(JPEG_START.len())
        .enumerate()
        .filter(|(_, window)| *window == JPEG_START)
        .map(|(i, _)| i)
        .take(MAX_CANDIDATES)
        .collect();

    let mut largest: Option<(usize, DynamicImage)> = None;

    for start in starts {
        let Some((size, image)) = decode_from(data, start) else {
            continue;
        };
        if largest.as_ref().map_or(true, |(best, _)| size > *best) {
            largest = Some((size, image));
        }
    }

    largest.map(|(size, image)| {
        trace!(size_kb = size / 1024, width = image.width(), height = image.height(), "Found embedded JPEG");
        image
    })
}

/// Try successive end markers after `start` until a slice decodes
fn decode_from(data: &[u8], start: usize) -> Option<(usize, DynamicImage)> {
    let tail = &data[start..];
    tail.windows(JPEG_END.len())
        .enumerate()
        .filter(|(_, window)| *window == JPEG_END)
        .map(|(offset, _)| offset + JPEG_END.len())
        .take(MAX_END_ATTEMPTS)
        .find_map(|end| {
            image::load_from_memory_with_format(&tail[..end], ImageFormat::Jpeg)
                .ok()
                .map(|image| (end, image))
        })
}
