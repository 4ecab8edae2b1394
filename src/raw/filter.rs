/// Non-destructive filter parameters for photos
///
/// A photo carries one set of adjustments. They are applied to a copy of
/// the decoded image every time a filtered view is requested; the decoded
/// original is what gets cached. Adjustments persist in a JSON sidecar
/// next to the photo, which is never modified.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PhotoloadError, Result};

/// Appended to the photo's file name
pub const SIDECAR_SUFFIX: &str = ".filter.json";

/// Rec. 709 luma weights
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// All filter parameters for a photo
///
/// These values are stored as JSON alongside the photo (see
/// [`FilterParams::save_sidecar`]), so a filter set in one session is shown
/// again in the next.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FilterParams {
    /// Exposure adjustment in stops (-5.0 to +5.0)
    /// - Negative values darken the image
    /// - Positive values brighten the image
    /// - 0.0 = no adjustment
    pub exposure: f32,

    /// Contrast adjustment (-100.0 to +100.0)
    /// - Negative values reduce contrast (flatten)
    /// - Positive values increase contrast
    /// - 0.0 = no adjustment
    pub contrast: f32,

    /// Saturation adjustment (-100.0 to +100.0)
    /// - -100.0 = grayscale, 0.0 = original, +100.0 = double saturation
    pub saturation: f32,

    /// Gaussian blur sigma in pixels (0.0 = no blur)
    pub blur: f32,
}

impl Default for FilterParams {
    /// Create default filter parameters (no adjustments)
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            blur: 0.0,
        }
    }
}

impl FilterParams {
    /// Convert to JSON string for storage
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Check if this represents an unfiltered photo (all values at default)
    pub fn is_unedited(&self) -> bool {
        *self == Self::default()
    }

    /// Sidecar location for `photo`: `DSC_0001.NEF` -> `DSC_0001.NEF.filter.json`
    pub fn sidecar_path(photo: &Path) -> PathBuf {
        let mut name = photo.as_os_str().to_owned();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }

    /// Read the filter saved next to `photo`. `None` if there is no sidecar.
    pub fn load_sidecar(photo: &Path) -> Result<Option<Self>> {
        let path = Self::sidecar_path(photo);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let params = Self::from_json(&json).map_err(|source| PhotoloadError::Sidecar {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded filter sidecar");
        Ok(Some(params))
    }

    /// Write the filter next to `photo`. Saving an unedited filter removes
    /// the sidecar instead.
    pub fn save_sidecar(&self, photo: &Path) -> Result<()> {
        let path = Self::sidecar_path(photo);

        if self.is_unedited() {
            return match fs::remove_file(&path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        let json = self.to_json().map_err(|source| PhotoloadError::Sidecar {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "Saved filter sidecar");
        Ok(())
    }

    /// Produce a filtered copy of `image`
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        let mut rgba = image.to_rgba8();

        if self.exposure != 0.0 || self.saturation != 0.0 {
            let gain = 2f32.powf(self.exposure.clamp(-5.0, 5.0));
            let saturation = 1.0 + self.saturation.clamp(-100.0, 100.0) / 100.0;

            for pixel in rgba.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                let rgb = [r as f32 * gain, g as f32 * gain, b as f32 * gain];
                let luma = rgb[0] * LUMA[0] + rgb[1] * LUMA[1] + rgb[2] * LUMA[2];
                let channel = |c: f32| (luma + (c - luma) * saturation).round().clamp(0.0, 255.0) as u8;
                pixel.0 = [channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), a];
            }
        }

        let mut filtered = DynamicImage::ImageRgba8(rgba);
        if self.contrast != 0.0 {
            filtered = filtered.adjust_contrast(self.contrast.clamp(-100.0, 100.0));
        }
        if self.blur > 0.0 {
            filtered = filtered.blur(self.blur);
        }
        filtered
    }
}
