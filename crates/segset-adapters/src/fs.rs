//! Filesystem adapter: images in one local directory.

use std::path::{Path, PathBuf};

use segset_core::indexing::IndexOptions;
use segset_core::{
    decode_image, transform_item, DatasetError, Entry, EntryIndex, ImageDataset, Item, Result,
    Transform,
};
use tracing::{debug, info, warn};

/// Dataset over the images directly inside a local directory.
///
/// The directory is scanned once, non-recursively, at construction. Files
/// added or removed afterwards are not picked up; a removed file fails its
/// own access with `ResourceNotFound`.
pub struct LocalImageDataset {
    root: PathBuf,
    index: EntryIndex,
    transform: Box<dyn Transform>,
}

impl LocalImageDataset {
    /// Scans `root` and builds the dataset.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory to scan (subdirectories are ignored)
    /// * `transform` - Applied to every decoded RGB image
    /// * `options` - Ordering and duplicate-identifier policy
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be read ([`DatasetError::Listing`])
    /// - Two files share an identifier under a rejecting policy
    pub fn open(
        root: impl Into<PathBuf>,
        transform: impl Transform + 'static,
        options: IndexOptions,
    ) -> Result<Self> {
        let root = root.into();
        let locations = scan_dir(&root)?;
        let index = EntryIndex::from_locations(locations, options)?;
        info!("Indexed {} images in {}", index.len(), root.display());

        Ok(Self {
            root,
            index,
            transform: Box::new(transform),
        })
    }

    /// Directory this dataset was scanned from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying entry index.
    #[must_use]
    pub const fn index(&self) -> &EntryIndex {
        &self.index
    }
}

impl ImageDataset for LocalImageDataset {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn entries(&self) -> &[Entry] {
        self.index.entries()
    }

    fn get(&self, index: usize) -> Result<Item> {
        let entry = self.index.get(index)?;
        debug!("Loading {} from {}", entry.identifier, entry.location);

        let decoded = decode_image(Path::new(&entry.location), &entry.location)?;
        transform_item(entry, decoded, self.transform.as_ref())
    }
}

/// Lists regular files in `dir`, in directory order.
fn scan_dir(dir: &Path) -> Result<Vec<String>> {
    let listing_err = |source| DatasetError::Listing {
        location: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(listing_err)? {
        let path = entry.map_err(listing_err)?.path();
        if !path.is_file() {
            continue;
        }
        match path.to_str() {
            Some(p) => files.push(p.to_string()),
            None => warn!("Skipping non UTF-8 path: {}", path.display()),
        }
    }

    Ok(files)
}
