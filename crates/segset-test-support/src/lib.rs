//! Test support utilities for segset.
//!
//! Provides synthetic image fixtures, an in-memory object store, and
//! transforms with observable behaviour for testing dataset sources and
//! batching.
//!
//! # Example
//!
//! ```
//! use segset_test_support::{FixtureDir, MockObjectStore, SyntheticImageBuilder};
//!
//! // Write real image files into a temp directory
//! let dir = FixtureDir::new().unwrap();
//! dir.image("a.jpg", 100, 50).unwrap();
//!
//! // Serve encoded images from memory
//! let png = SyntheticImageBuilder::encode_png(&SyntheticImageBuilder::gradient(20, 20)).unwrap();
//! let store = MockObjectStore::new().with_object("bucket/train/b.png", png);
//! ```

mod builders;
mod mocks;

pub use builders::{FixtureDir, SyntheticImageBuilder};
pub use mocks::{CountingTransform, MockObjectStore, NativeSizeTransform};
