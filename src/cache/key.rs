//! Cache key derivation
//!
//! Keys are a pure function of (asset identity, variant). The variant tag is
//! a prefix drawn from a prefix-free set, so two different inputs can never
//! produce the same key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size variant of a source asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Small square preview for grids
    Thumbnail,
    /// Display-sized decode
    Full,
}

impl Variant {
    /// Tag used in the key prefix
    pub fn tag(self) -> &'static str {
        match self {
            Variant::Thumbnail => "thumbnail",
            Variant::Full => "full",
        }
    }

    pub fn is_full(self) -> bool {
        self == Variant::Full
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Key under which a decoded image is cached
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for an asset's variant
    pub fn derive(asset_id: &str, variant: Variant) -> Self {
        Self(format!("{}:{}", variant.tag(), asset_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
