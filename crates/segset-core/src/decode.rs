//! Image decoding from a local path.

use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::error::{DatasetError, Result};

/// Opens and decodes the image at `path`.
///
/// The format is sniffed from the file contents, falling back to the path's
/// extension. `location` is the entry location reported in errors; for a
/// staged remote object it is the object key, not the temp path.
///
/// # Errors
///
/// - [`DatasetError::ResourceNotFound`] if `path` does not exist
/// - [`DatasetError::Io`] if the file cannot be opened or sniffed
/// - [`DatasetError::Decode`] if the contents are not a supported image
pub fn decode_image(path: &Path, location: &str) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| DatasetError::from_open(location, e))?
        .with_guessed_format()
        .map_err(|source| DatasetError::Io {
            location: location.to_string(),
            source,
        })?;

    reader.decode().map_err(|source| DatasetError::Decode {
        location: location.to_string(),
        source,
    })
}
