//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the dataset core and its
//! storage adapters.

mod dataset;
mod object_store;

pub use dataset::ImageDataset;
pub use object_store::ObjectStore;
