//! Synthetic images and on-disk fixtures.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

/// Builder for in-memory synthetic test images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates an RGB gradient so resized output is not uniform.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let r = ((u32::from(u8::MAX) * x) / width.max(1)) as u8;
            let g = ((u32::from(u8::MAX) * y) / height.max(1)) as u8;
            Rgb([r, g, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Creates a uniform RGB image.
    #[must_use]
    pub fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| Rgb(rgb)))
    }

    /// Encodes `image` in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder rejects the image.
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, format)
            .with_context(|| format!("Failed to encode {format:?}"))?;
        Ok(buf.into_inner())
    }

    /// Encodes `image` as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        Self::encode(image, ImageFormat::Png)
    }

    /// Encodes `image` as JPEG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
        Self::encode(image, ImageFormat::Jpeg)
    }

    /// Bytes that no decoder accepts.
    #[must_use]
    pub fn garbage() -> Vec<u8> {
        b"definitely not an image".to_vec()
    }
}

/// Temporary directory of image fixtures, removed on drop.
pub struct FixtureDir {
    dir: TempDir,
}

impl FixtureDir {
    /// Creates an empty fixture directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create fixture dir")?;
        Ok(Self { dir })
    }

    /// Root of the fixture directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a gradient image of the given size, format taken from `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unknown or the write fails.
    pub fn image(&self, name: &str, width: u32, height: u32) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        let format = ImageFormat::from_path(&path)
            .with_context(|| format!("No image format for {name}"))?;
        let image = SyntheticImageBuilder::gradient(width, height);
        let bytes = SyntheticImageBuilder::encode(&image, format)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Writes raw bytes to `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Creates a subdirectory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_fixture_image_has_requested_size() {
        let dir = FixtureDir::new().unwrap();
        let path = dir.image("a.jpg", 100, 50).unwrap();
        let img = image::open(path).unwrap();
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn test_encode_png_round_trips_size() {
        let image = SyntheticImageBuilder::uniform(3, 7, [1, 2, 3]);
        let bytes = SyntheticImageBuilder::encode_png(&image).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), (3, 7));
    }
}
