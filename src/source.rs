//! Image bank sources and cover-fit preparation

use std::collections::HashMap;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::LoadError;
use crate::raster::Color;

/// Something that can turn an image-bank entry into pixels
pub trait ImageSource {
    fn load(&self, url: &str) -> Result<DynamicImage, LoadError>;
}

/// Decode fetched bytes, attributing failures to `url`
pub fn decode_image(url: &str, bytes: &[u8]) -> Result<DynamicImage, LoadError> {
    let image = image::load_from_memory(bytes).map_err(|e| LoadError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(LoadError::Decode {
            url: url.to_string(),
            reason: "image has no pixels".to_string(),
        });
    }
    log::info!("Image loaded: {} ({}x{})", url, image.width(), image.height());
    Ok(image)
}

/// Reads image-bank entries as files relative to a root directory
#[derive(Debug, Clone, Default)]
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageSource for FsImageSource {
    fn load(&self, url: &str) -> Result<DynamicImage, LoadError> {
        let path = self.root.join(url);
        let bytes = std::fs::read(&path).map_err(|e| LoadError::Fetch {
            url: url.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        decode_image(url, &bytes)
    }
}

/// In-memory image bank (generated images, tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, DynamicImage>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, image: DynamicImage) {
        self.images.insert(url.into(), image);
    }

    pub fn with(mut self, url: impl Into<String>, image: DynamicImage) -> Self {
        self.insert(url, image);
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn load(&self, url: &str) -> Result<DynamicImage, LoadError> {
        self.images.get(url).cloned().ok_or_else(|| LoadError::Fetch {
            url: url.to_string(),
            reason: "not in image bank".to_string(),
        })
    }
}

/// Scale `image` to cover a `size` x `size` square, centered and cropped.
///
/// The square is filled with `fill` first so rounding never leaves
/// uninitialized margins.
pub fn cover_fit(image: &DynamicImage, size: u32, fill: Color) -> RgbaImage {
    let (w, h) = (image.width().max(1), image.height().max(1));
    let scale = (size as f64 / w as f64).max(size as f64 / h as f64);
    let scaled_w = ((w as f64 * scale).round() as u32).max(1);
    let scaled_h = ((h as f64 * scale).round() as u32).max(1);

    let resized = imageops::resize(&image.to_rgba8(), scaled_w, scaled_h, FilterType::Triangle);
    let x = (size as i64 - scaled_w as i64) / 2;
    let y = (size as i64 - scaled_h as i64) / 2;

    let mut canvas = RgbaImage::from_pixel(size, size, Rgba(fill));
    imageops::overlay(&mut canvas, &resized, x, y);
    log::debug!(
        "Cover fit {}x{} -> {}x{} at ({}, {}) on {}x{}",
        w,
        h,
        scaled_w,
        scaled_h,
        x,
        y,
        size,
        size
    );
    canvas
}
