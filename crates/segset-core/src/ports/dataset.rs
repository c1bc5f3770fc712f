//! Indexed dataset port implemented by every image source.

use crate::domain::{Entry, Item};
use crate::error::Result;

/// A fixed-length, randomly accessible collection of image items.
///
/// Implementations build their entry list once at construction; `len()` and
/// `entries()` never change afterwards. `get` re-reads and re-decodes the
/// source on every call.
pub trait ImageDataset: Send + Sync {
    /// Number of available items.
    fn len(&self) -> usize;

    /// Returns true if the dataset has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discovered entries, in index order.
    fn entries(&self) -> &[Entry];

    /// Loads, decodes, and transforms the item at `index`.
    ///
    /// # Errors
    ///
    /// - [`IndexOutOfRange`](crate::DatasetError::IndexOutOfRange) if `index >= len()`
    /// - [`ResourceNotFound`](crate::DatasetError::ResourceNotFound) if the entry vanished
    /// - [`Transfer`](crate::DatasetError::Transfer) if a remote fetch failed
    /// - [`Decode`](crate::DatasetError::Decode) if the bytes are not an image
    /// - [`Tensor`](crate::DatasetError::Tensor) if the transform failed
    fn get(&self, index: usize) -> Result<Item>;
}

impl<D: ImageDataset + ?Sized> ImageDataset for Box<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn entries(&self) -> &[Entry] {
        (**self).entries()
    }

    fn get(&self, index: usize) -> Result<Item> {
        (**self).get(index)
    }
}
