//! segset core - domain types, ports, and batching for image datasets.
//!
//! This crate contains the dataset domain (entries, items, batches), the
//! shared extension matching and entry index, the [`ImageDataset`] and
//! [`ObjectStore`] ports implemented by storage adapters, the [`Transform`]
//! seam, and the batch assembler.

pub mod collate;
pub mod decode;
pub mod domain;
pub mod error;
pub mod indexing;
pub mod loader;
pub mod ports;
pub mod transform;

pub use collate::collate;
pub use decode::decode_image;
pub use domain::{Batch, Entry, ImageDimensions, Item, ItemMeta};
pub use error::{DatasetError, Result};
pub use indexing::{DuplicatePolicy, EntryIndex, IndexOptions, ListingOrder, IMAGE_EXTENSIONS};
pub use loader::{BatchLoader, LoaderOptions};
pub use ports::{ImageDataset, ObjectStore};
pub use transform::{
    select_device, transform_item, DevicePreference, Normalize, ResizeFilter, ResizeToTensor,
    Transform,
};
