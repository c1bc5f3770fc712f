//! Stacked batches ready for a training step.

use candle_core::Tensor;

use super::ItemMeta;

/// A stacked group of items.
///
/// `meta[i]` describes the image at `images.get(i)`.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Images stacked along a new leading batch dimension.
    pub images: Tensor,
    /// Per-item metadata in input order.
    pub meta: Vec<ItemMeta>,
}

impl Batch {
    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    /// Returns true if the batch holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Identifiers in batch order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.meta.iter().map(|m| m.identifier.as_str())
    }
}
