//! Stock transform: exact resize to a CHW `f32` tensor.

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::Deserialize;

use super::Transform;

/// Resampling filter for [`ResizeToTensor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    /// Cubic.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with window 3.
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => Self::Nearest,
            ResizeFilter::Triangle => Self::Triangle,
            ResizeFilter::CatmullRom => Self::CatmullRom,
            ResizeFilter::Gaussian => Self::Gaussian,
            ResizeFilter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Per-channel normalisation applied after scaling to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    /// Channel means (R, G, B).
    pub mean: [f32; 3],
    /// Channel standard deviations (R, G, B). Must be non-zero.
    pub std: [f32; 3],
}

impl Normalize {
    /// ImageNet statistics.
    pub const IMAGENET: Self = Self {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    #[inline]
    fn apply(&self, channel: usize, value: f32) -> f32 {
        (value - self.mean[channel]) / self.std[channel]
    }
}

/// Resizes to exactly `width x height` and emits a `(3, height, width)` tensor.
///
/// Pixel values are scaled to `[0, 1]`, then normalised if configured.
#[derive(Debug, Clone)]
pub struct ResizeToTensor {
    width: u32,
    height: u32,
    filter: ResizeFilter,
    normalize: Option<Normalize>,
    device: Device,
}

impl ResizeToTensor {
    /// Creates a resize transform producing CPU tensors.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: ResizeFilter::default(),
            normalize: None,
            device: Device::Cpu,
        }
    }

    /// Sets the resampling filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Enables per-channel normalisation.
    #[must_use]
    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = Some(normalize);
        self
    }

    /// Places output tensors on `device`.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Shape of every tensor this transform produces.
    #[must_use]
    pub const fn output_shape(&self) -> [usize; 3] {
        [3, self.height as usize, self.width as usize]
    }
}

impl Transform for ResizeToTensor {
    fn apply(&self, image: &DynamicImage) -> candle_core::Result<Tensor> {
        let rgb = if image.width() == self.width && image.height() == self.height {
            image.to_rgb8()
        } else {
            image
                .resize_exact(self.width, self.height, self.filter.into())
                .to_rgb8()
        };

        let data: Vec<f32> = rgb
            .pixels()
            .flat_map(|p| {
                let mut px = [
                    f32::from(p[0]) / 255.0,
                    f32::from(p[1]) / 255.0,
                    f32::from(p[2]) / 255.0,
                ];
                if let Some(norm) = &self.normalize {
                    for (c, v) in px.iter_mut().enumerate() {
                        *v = norm.apply(c, *v);
                    }
                }
                px
            })
            .collect();

        // HWC -> CHW
        Tensor::from_vec(
            data,
            (self.height as usize, self.width as usize, 3),
            &self.device,
        )?
        .permute((2, 0, 1))?
        .contiguous()
    }
}
