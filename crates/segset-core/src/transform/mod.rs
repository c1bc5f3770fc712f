//! Caller-supplied image transforms and the shared item-loading step.
//!
//! Every source ends item access the same way: force the decoded image to
//! three-channel RGB, record its original size, run the transform.

mod device;
mod resize;

use candle_core::Tensor;
use image::{DynamicImage, GenericImageView};

use crate::domain::{Entry, ImageDimensions, Item};
use crate::error::Result;

pub use device::{select_device, DevicePreference};
pub use resize::{Normalize, ResizeFilter, ResizeToTensor};

/// Maps a decoded RGB image to a tensor.
///
/// Batching requires every call to produce the same shape; that is the
/// transform's responsibility and is only checked at collation.
pub trait Transform: Send + Sync {
    /// Transforms one image.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor construction fails.
    fn apply(&self, image: &DynamicImage) -> candle_core::Result<Tensor>;
}

impl<F> Transform for F
where
    F: Fn(&DynamicImage) -> candle_core::Result<Tensor> + Send + Sync,
{
    fn apply(&self, image: &DynamicImage) -> candle_core::Result<Tensor> {
        self(image)
    }
}

/// Converts a decoded image into an [`Item`] for `entry`.
///
/// The recorded size is taken before conversion, so it always reflects the
/// source file regardless of what the transform resizes to.
///
/// # Errors
///
/// Returns [`DatasetError::Tensor`](crate::DatasetError::Tensor) if the
/// transform fails.
pub fn transform_item(
    entry: &Entry,
    decoded: DynamicImage,
    transform: &dyn Transform,
) -> Result<Item> {
    let original_size = ImageDimensions::from(decoded.dimensions());
    let rgb = if matches!(decoded, DynamicImage::ImageRgb8(_)) {
        decoded
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    };
    let image = transform.apply(&rgb)?;
    Ok(Item::new(image, entry.identifier.clone(), original_size))
}
