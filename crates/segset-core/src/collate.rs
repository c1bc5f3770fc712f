//! Batch assembly: stack item tensors and collect their metadata.

use candle_core::Tensor;
use tracing::debug;

use crate::domain::{Batch, Item, ItemMeta};
use crate::error::{DatasetError, Result};

/// Stacks `items` into one [`Batch`].
///
/// Images are stacked along a new leading dimension; metadata keeps input
/// order so `batch.meta[i]` describes `batch.images.get(i)`. Either the whole
/// batch is produced or nothing is.
///
/// # Errors
///
/// - [`DatasetError::EmptyBatch`] if `items` is empty
/// - [`DatasetError::ShapeMismatch`] if any image shape differs from the first
/// - [`DatasetError::Tensor`] if stacking fails (e.g. mixed dtypes or devices)
pub fn collate(items: Vec<Item>) -> Result<Batch> {
    let Some(first) = items.first() else {
        return Err(DatasetError::EmptyBatch);
    };

    let expected = first.image.dims().to_vec();
    for (index, item) in items.iter().enumerate().skip(1) {
        if item.image.dims() != expected.as_slice() {
            return Err(DatasetError::ShapeMismatch {
                index,
                expected,
                actual: item.image.dims().to_vec(),
            });
        }
    }

    let (images, meta): (Vec<Tensor>, Vec<ItemMeta>) =
        items.into_iter().map(|item| (item.image, item.meta)).unzip();
    let images = Tensor::stack(&images, 0)?;
    debug!("Collated batch {:?}", images.dims());

    Ok(Batch { images, meta })
}
