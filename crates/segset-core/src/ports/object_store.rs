//! Object store port used by remote datasets.

use std::io::Write;

use crate::error::Result;

/// Minimal object storage surface: list keys, stream one object.
///
/// Retry, authentication, and connection management belong to the
/// implementation. A dataset calls each method once per operation and
/// surfaces any error unchanged.
pub trait ObjectStore: Send + Sync {
    /// Lists object keys directly under `prefix`, in the store's order.
    ///
    /// # Errors
    ///
    /// Returns [`Transfer`](crate::DatasetError::Transfer) if the listing fails.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Streams the object at `key` into `sink`, returning bytes written.
    ///
    /// # Errors
    ///
    /// - [`ResourceNotFound`](crate::DatasetError::ResourceNotFound) if the key does not exist
    /// - [`Transfer`](crate::DatasetError::Transfer) on network, permission, or policy failure
    fn fetch(&self, key: &str, sink: &mut dyn Write) -> Result<u64>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix)
    }

    fn fetch(&self, key: &str, sink: &mut dyn Write) -> Result<u64> {
        (**self).fetch(key, sink)
    }
}
