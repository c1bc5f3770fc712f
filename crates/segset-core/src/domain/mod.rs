//! Core domain types for indexed image datasets.

mod batch;
mod entry;
mod item;

pub use batch::Batch;
pub use entry::Entry;
pub use item::{ImageDimensions, Item, ItemMeta};
