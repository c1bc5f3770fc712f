//! Loaded items and their metadata.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for ImageDimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Per-item metadata carried alongside the transformed tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Identifier of the entry this item was loaded from.
    pub identifier: String,
    /// Pixel size of the source image before any transform.
    pub original_size: ImageDimensions,
}

/// One loaded, transformed image plus its metadata.
///
/// Produced fresh on every access; nothing is cached.
#[derive(Debug, Clone)]
pub struct Item {
    /// Output of the transform.
    pub image: Tensor,
    /// Identifier and original size.
    pub meta: ItemMeta,
}

impl Item {
    /// Creates a new item.
    #[must_use]
    pub fn new(
        image: Tensor,
        identifier: impl Into<String>,
        original_size: ImageDimensions,
    ) -> Self {
        Self {
            image,
            meta: ItemMeta {
                identifier: identifier.into(),
                original_size,
            },
        }
    }
}
