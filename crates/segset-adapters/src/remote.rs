//! Object-store adapter: images under one bucket prefix.
//!
//! Each access stages the object in a named temporary file, decodes it from
//! there, and lets the file drop. The temp file never outlives the call,
//! whether the fetch, the decode, or the transform fails.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use segset_core::indexing::{file_name_of, IndexOptions};
use segset_core::{
    decode_image, transform_item, DatasetError, Entry, EntryIndex, ImageDataset, Item,
    ObjectStore, Result, Transform,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Options for [`RemoteImageDataset`].
#[derive(Debug, Clone, Default)]
pub struct RemoteOptions {
    /// Ordering and duplicate-identifier policy.
    pub index: IndexOptions,
    /// Directory for staging files; the system temp dir when `None`.
    pub staging_dir: Option<PathBuf>,
}

/// Dataset over the image objects directly under a prefix in an object store.
pub struct RemoteImageDataset<S> {
    store: S,
    prefix: String,
    index: EntryIndex,
    transform: Box<dyn Transform>,
    staging_dir: Option<PathBuf>,
}

impl<S: ObjectStore> RemoteImageDataset<S> {
    /// Lists `prefix` and builds the dataset.
    ///
    /// A non-empty prefix is treated as a directory: `"bucket/train"` lists
    /// the objects inside `bucket/train/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails or two keys share an identifier
    /// under a rejecting policy.
    pub fn open(
        store: S,
        prefix: impl Into<String>,
        transform: impl Transform + 'static,
        options: RemoteOptions,
    ) -> Result<Self> {
        let prefix = directory_prefix(prefix.into());
        let keys = store.list(&prefix)?;
        let index = EntryIndex::from_locations(keys, options.index)?;
        info!("Indexed {} remote images under '{}'", index.len(), prefix);

        Ok(Self {
            store,
            prefix,
            index,
            transform: Box::new(transform),
            staging_dir: options.staging_dir,
        })
    }

    /// Prefix this dataset was listed from.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying object store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The underlying entry index.
    #[must_use]
    pub const fn index(&self) -> &EntryIndex {
        &self.index
    }

    /// Downloads `entry` into a fresh temp file.
    fn stage(&self, entry: &Entry) -> Result<NamedTempFile> {
        let name = file_name_of(&entry.location);
        let suffix = name.rfind('.').map_or("", |dot| &name[dot..]);

        let mut builder = tempfile::Builder::new();
        builder.prefix("segset-").suffix(suffix);
        let staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|source| DatasetError::Io {
            location: entry.location.clone(),
            source,
        })?;

        let mut sink = BufWriter::new(staged.as_file());
        let bytes = self.store.fetch(&entry.location, &mut sink)?;
        sink.flush().map_err(|e| staging_write_error(&entry.location, e))?;
        drop(sink);

        debug!(
            "Staged {} ({} bytes) at {}",
            entry.location,
            bytes,
            staged.path().display()
        );
        Ok(staged)
    }
}

impl<S: ObjectStore> ImageDataset for RemoteImageDataset<S> {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn entries(&self) -> &[Entry] {
        self.index.entries()
    }

    fn get(&self, index: usize) -> Result<Item> {
        let entry = self.index.get(index)?;
        let staged = self.stage(entry)?;
        let decoded = decode_image(staged.path(), &entry.location)?;
        drop(staged);

        transform_item(entry, decoded, self.transform.as_ref())
    }
}

/// Appends the `/` that makes a listing return the prefix's contents.
fn directory_prefix(mut prefix: String) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// A failed write to the local staging file is a disk problem, not a
/// transfer one.
fn staging_write_error(location: &str, source: std::io::Error) -> DatasetError {
    DatasetError::Io {
        location: location.to_string(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use segset_core::ResizeToTensor;
    use segset_test_support::MockObjectStore;

    #[test]
    fn test_staged_file_keeps_extension() {
        let store = MockObjectStore::new().with_object("b/p/cat.jpeg", vec![7; 16]);
        let dataset = RemoteImageDataset::open(
            store,
            "b/p/",
            ResizeToTensor::new(2, 2),
            RemoteOptions::default(),
        )
        .unwrap();

        let staged = dataset.stage(dataset.index().get(0).unwrap()).unwrap();
        let name = staged.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("segset-"));
        assert!(name.ends_with(".jpeg"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), vec![7; 16]);

        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(directory_prefix("bucket/train".into()), "bucket/train/");
        assert_eq!(directory_prefix("bucket/train/".into()), "bucket/train/");
        assert_eq!(directory_prefix(String::new()), "");
    }

    #[test]
    fn test_staging_write_failure_is_local_io() {
        let err = staging_write_error(
            "b/p/cat.jpeg",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(
            matches!(err, DatasetError::Io { ref location, .. } if location == "b/p/cat.jpeg")
        );
        assert!(!err.is_retryable());
    }
}
