use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A tagged region of a photo
///
/// Coordinates are normalized to 0.0..=1.0 so tags survive resizing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoTag {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Finds regions of interest in a decoded photo
pub trait Tagger: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Vec<PhotoTag>;
}

/// Tags the bounding box of all pixels brighter than a luma threshold
#[derive(Debug, Clone, Copy)]
pub struct HighlightTagger {
    pub threshold: u8,
}

impl Default for HighlightTagger {
    fn default() -> Self {
        Self { threshold: 240 }
    }
}

impl Tagger for HighlightTagger {
    fn detect(&self, image: &DynamicImage) -> Vec<PhotoTag> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in luma.enumerate_pixels() {
            if pixel.0[0] < self.threshold {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        bounds
            .map(|(x0, y0, x1, y1)| PhotoTag {
                x: x0 as f32 / width as f32,
                y: y0 as f32 / height as f32,
                width: (x1 - x0 + 1) as f32 / width as f32,
                height: (y1 - y0 + 1) as f32 / height as f32,
                label: Some("highlight".to_string()),
            })
            .into_iter()
            .collect()
    }
}
