//! Immutable color images consumed by the comparator
//!
//! Pixels are stored as interleaved RGBA `f32` samples regardless of the
//! source channel count. Three-channel sources are expanded with an opaque
//! alpha so both backends can read every image through the same layout.

use crate::error::{Result, ValidationError};
use std::path::Path;
use std::sync::Arc;

/// Number of color channels carried by the source data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Red, green, blue
    Rgb,
    /// Red, green, blue, alpha
    Rgba,
}

impl Channels {
    /// Returns the number of samples per pixel for this layout
    pub fn count(self) -> usize {
        match self {
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

/// A read-only 2-D grid of normalized color samples
///
/// Cloning is cheap: the pixel storage is shared, so the same reference image
/// can be handed to any number of validation runs.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    channels: Channels,
    /// Interleaved RGBA samples, row-major, `width * height * 4` long
    rgba: Arc<[f32]>,
}

impl Image {
    /// Creates an image from interleaved samples
    ///
    /// # Arguments
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `channels` - Layout of `samples`
    /// * `samples` - Row-major interleaved samples in `[0, 1]`
    ///
    /// # Returns
    /// The image, or an error when the geometry is empty or the sample count does not match
    pub fn from_samples(width: u32, height: u32, channels: Channels, samples: &[f32]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ValidationError::EmptyImage { width, height });
        }

        let pixel_count = width as usize * height as usize;
        let expected = pixel_count * channels.count();
        if samples.len() != expected {
            return Err(ValidationError::InvalidImageData(format!(
                "expected {expected} samples for {width}x{height} {channels:?}, got {}",
                samples.len()
            )));
        }
        if let Some(bad) = samples.iter().find(|s| !s.is_finite()) {
            return Err(ValidationError::InvalidImageData(format!("non-finite sample {bad}")));
        }

        let rgba: Arc<[f32]> = match channels {
            Channels::Rgba => samples.into(),
            Channels::Rgb => samples.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 1.0]).collect(),
        };

        Ok(Self { width, height, channels, rgba })
    }

    /// Creates an RGBA image from a per-pixel generator function
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [f32; 4]) -> Result<Self> {
        let mut samples = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                samples.extend_from_slice(&f(x, y));
            }
        }
        Self::from_samples(width, height, Channels::Rgba, &samples)
    }

    /// Creates an image filled with a single color
    pub fn solid(width: u32, height: u32, color: [f32; 4]) -> Result<Self> {
        Self::from_fn(width, height, |_, _| color)
    }

    /// Converts a decoded image into normalized float samples
    pub fn from_dynamic(image: &image::DynamicImage) -> Result<Self> {
        if image.color().has_alpha() {
            let rgba = image.to_rgba32f();
            Self::from_samples(rgba.width(), rgba.height(), Channels::Rgba, rgba.as_raw())
        } else {
            let rgb = image.to_rgb32f();
            Self::from_samples(rgb.width(), rgb.height(), Channels::Rgb, rgb.as_raw())
        }
    }

    /// Loads and decodes an image file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_dynamic(&image::open(path)?)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Channel layout of the data this image was built from
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns the RGBA sample at `(x, y)`, or `None` outside the image bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.rgba[offset..offset + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Interleaved RGBA samples, suitable for uploading to an `Rgba32Float` texture
    pub fn as_rgba(&self) -> &[f32] {
        &self.rgba
    }

    /// Returns a copy of this image with the pixel at `(x, y)` replaced
    ///
    /// Coordinates outside the image leave the copy unchanged.
    pub fn with_pixel(&self, x: u32, y: u32, color: [f32; 4]) -> Self {
        let mut samples = self.rgba.to_vec();
        if x < self.width && y < self.height {
            let offset = (y as usize * self.width as usize + x as usize) * 4;
            samples[offset..offset + 4].copy_from_slice(&color);
        }
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            rgba: samples.into(),
        }
    }
}
