//! Mock implementations of core port traits.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use candle_core::{DType, Device, Tensor};
use image::DynamicImage;
use segset_core::{DatasetError, ObjectStore, Result, Transform};

/// In-memory `ObjectStore` for testing remote datasets.
///
/// Keys are listed in insertion order. Listing is non-recursive: only keys
/// with no further `/` after the prefix are returned.
pub struct MockObjectStore {
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    failing: Mutex<HashSet<String>>,
    fetch_count: AtomicUsize,
}

impl MockObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Adds an object, builder style.
    #[must_use]
    pub fn with_object(self, key: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(key, bytes);
        self
    }

    /// Adds or replaces an object.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        let key = key.into();
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = objects.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = bytes;
        } else {
            objects.push((key, bytes));
        }
    }

    /// Deletes an object, simulating removal after listing.
    pub fn remove(&self, key: &str) {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(k, _)| k != key);
    }

    /// Makes fetches of `key` fail midway with a transfer error.
    pub fn fail_fetch(&self, key: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into());
    }

    /// Number of `fetch` calls so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MockObjectStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .iter()
            .filter_map(|(key, _)| {
                let rest = key.strip_prefix(prefix)?;
                (!rest.is_empty() && !rest.contains('/')).then(|| key.clone())
            })
            .collect())
    }

    fn fetch(&self, key: &str, sink: &mut dyn Write) -> Result<u64> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let bytes = self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| DatasetError::ResourceNotFound {
                location: key.to_string(),
            })?;

        let io_err = |e: std::io::Error| DatasetError::Transfer {
            location: key.to_string(),
            message: e.to_string(),
        };

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key);
        if failing {
            // Leave a partial body behind, as a dropped connection would.
            sink.write_all(&bytes[..bytes.len() / 2]).map_err(io_err)?;
            return Err(DatasetError::Transfer {
                location: key.to_string(),
                message: "connection reset by peer".into(),
            });
        }

        sink.write_all(&bytes).map_err(io_err)?;
        Ok(bytes.len() as u64)
    }
}

/// Transform that emits zeros shaped like the input image, `(3, h, w)`.
///
/// Items of different source sizes therefore fail to batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSizeTransform;

impl Transform for NativeSizeTransform {
    fn apply(&self, image: &DynamicImage) -> candle_core::Result<Tensor> {
        Tensor::zeros(
            (3, image.height() as usize, image.width() as usize),
            DType::F32,
            &Device::Cpu,
        )
    }
}

/// Wraps a transform and counts how often it runs.
///
/// Clones share one counter, so keep a clone to observe calls made through
/// the copy handed to a dataset.
#[derive(Debug, Clone)]
pub struct CountingTransform<T> {
    inner: T,
    calls: Arc<AtomicUsize>,
}

impl<T: Transform> CountingTransform<T> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `apply` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T: Transform> Transform for CountingTransform<T> {
    fn apply(&self, image: &DynamicImage) -> candle_core::Result<Tensor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(image)
    }
}
