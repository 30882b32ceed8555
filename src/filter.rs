//! Per-pixel filters
//!
//! Every filter walks an RGBA8 buffer with stride 4 and leaves alpha alone.
//! Channel results are rounded half-to-even and clamped, the same way a
//! canvas `Uint8ClampedArray` stores them.

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::consts::BRIGHTNESS_FACTOR;
use crate::error::FilterError;

/// Filter assigned to every tile of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum FilterKind {
    #[default]
    None,
    Grayscale,
    Brightness,
    Invert,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Brightness => "brightness",
            FilterKind::Invert => "invert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Some(FilterKind::None),
            "grayscale" | "greyscale" | "gray" => Some(FilterKind::Grayscale),
            "brightness" | "bright" => Some(FilterKind::Brightness),
            "invert" | "negative" => Some(FilterKind::Invert),
            _ => None,
        }
    }

    /// Like `from_str`, but unknown names become `None` with a warning
    pub fn parse_lossy(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            log::warn!("Unknown filter '{}', tiles will keep their original pixels", s);
            FilterKind::None
        })
    }

    /// Whether tiles with this kind have anything to apply
    pub fn is_active(&self) -> bool {
        *self != FilterKind::None
    }
}

/// Configuration may name filters loosely (or use `null` for none)
impl From<Option<String>> for FilterKind {
    fn from(name: Option<String>) -> Self {
        name.map(|n| Self::parse_lossy(&n)).unwrap_or_default()
    }
}

/// View an RGBA byte buffer as whole pixels (a trailing partial pixel is ignored)
#[inline]
fn pixels_mut(buffer: &mut [u8]) -> &mut [[u8; 4]] {
    let whole = buffer.len() - buffer.len() % 4;
    bytemuck::cast_slice_mut(&mut buffer[..whole])
}

#[inline]
fn clamp_channel(value: f32) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// R = G = B = average of the three channels
pub fn grayscale(buffer: &mut [u8]) {
    for px in pixels_mut(buffer) {
        let sum = px[0] as f32 + px[1] as f32 + px[2] as f32;
        let gray = clamp_channel(sum / 3.0);
        px[0] = gray;
        px[1] = gray;
        px[2] = gray;
    }
}

/// Multiply each color channel by `factor`, saturating at 255
pub fn brightness(buffer: &mut [u8], factor: f32) {
    for px in pixels_mut(buffer) {
        for c in &mut px[..3] {
            *c = clamp_channel((*c as f32 * factor).min(255.0));
        }
    }
}

/// 255 - channel for each color channel
pub fn invert(buffer: &mut [u8]) {
    for px in pixels_mut(buffer) {
        for c in &mut px[..3] {
            *c = 255 - *c;
        }
    }
}

/// Mutate `buffer` in place with the given filter
pub fn apply_in_place(buffer: &mut [u8], kind: FilterKind) {
    match kind {
        FilterKind::Grayscale => grayscale(buffer),
        FilterKind::Brightness => brightness(buffer, BRIGHTNESS_FACTOR),
        FilterKind::Invert => invert(buffer),
        FilterKind::None => {
            log::warn!("apply_in_place called without a filter, pixels left untouched");
        }
    }
}

/// Filter round trip used when building a board
pub type FilterFn = fn(&RgbaImage, FilterKind) -> Result<RgbaImage, FilterError>;

/// Produce a filtered copy of `image`
///
/// The image is copied to an off-screen buffer of its own size, filtered,
/// then encoded to PNG and decoded again into a fresh renderable image.
/// A failed encode or decode fails the whole operation; there are no retries.
pub fn apply_filter(image: &RgbaImage, kind: FilterKind) -> Result<RgbaImage, FilterError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(FilterError::Encode(format!("empty {}x{} region", width, height)));
    }
    let mut offscreen = image.clone();
    apply_in_place(&mut offscreen, kind);

    let mut encoded = Vec::new();
    PngEncoder::new(Cursor::new(&mut encoded))
        .write_image(&offscreen, width, height, ColorType::Rgba8)
        .map_err(|e| FilterError::Encode(e.to_string()))?;

    let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Png)
        .map_err(|e| FilterError::Decode(e.to_string()))?
        .to_rgba8();

    if decoded.dimensions() != (width, height) {
        return Err(FilterError::Dimensions {
            expected: (width, height),
            actual: decoded.dimensions(),
        });
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_region_rejected() {
        let empty = RgbaImage::new(0, 3);
        assert!(matches!(
            apply_filter(&empty, FilterKind::Grayscale),
            Err(FilterError::Encode(_))
        ));
    }

    #[test]
    fn test_grayscale_integer_average() {
        let mut px = [10u8, 20, 30, 255];
        grayscale(&mut px);
        assert_eq!(px, [20, 20, 20, 255]);
    }

    #[test]
    fn test_brightness_clamps() {
        let mut px = [200u8, 100, 0, 77];
        brightness(&mut px, 1.3);
        assert_eq!(px, [255, 130, 0, 77]);
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let mut px = [0u8, 128, 255, 12];
        invert(&mut px);
        assert_eq!(px, [255, 127, 0, 12]);
    }

    #[test]
    fn test_trailing_partial_pixel_untouched() {
        let mut buf = [10u8, 20, 30, 255, 9, 9];
        invert(&mut buf);
        assert_eq!(buf, [245, 235, 225, 255, 9, 9]);
    }

    #[test]
    fn test_filter_kind_parsing() {
        assert_eq!(FilterKind::from_str("Grayscale"), Some(FilterKind::Grayscale));
        assert_eq!(FilterKind::from_str("invert"), Some(FilterKind::Invert));
        assert_eq!(FilterKind::from_str("sepia"), None);
        assert_eq!(FilterKind::parse_lossy("sepia"), FilterKind::None);
        assert_eq!(
            serde_json::to_string(&FilterKind::Brightness).unwrap(),
            "\"brightness\""
        );
        let schedule: Vec<FilterKind> =
            serde_json::from_str(r#"[null, "grayscale", "sepia"]"#).unwrap();
        assert_eq!(
            schedule,
            vec![FilterKind::None, FilterKind::Grayscale, FilterKind::None]
        );
    }

    #[test]
    fn test_apply_filter_round_trip() {
        let image = RgbaImage::from_fn(3, 2, |x, y| image::Rgba([x as u8 * 50, y as u8 * 90, 7, 200]));
        let filtered = apply_filter(&image, FilterKind::Invert).unwrap();
        assert_eq!(filtered.dimensions(), (3, 2));
        assert_eq!(filtered.get_pixel(2, 1).0, [155, 165, 248, 200]);
        // Source untouched
        assert_eq!(image.get_pixel(2, 1).0, [100, 90, 7, 200]);
    }

    #[test]
    fn test_apply_filter_none_is_copy() {
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
        let filtered = apply_filter(&image, FilterKind::None).unwrap();
        assert_eq!(filtered, image);
    }

    proptest! {
        #[test]
        fn prop_invert_is_involution(r: u8, g: u8, b: u8, a: u8) {
            let mut px = [r, g, b, a];
            invert(&mut px);
            invert(&mut px);
            prop_assert_eq!(px, [r, g, b, a]);
        }

        #[test]
        fn prop_grayscale_equalizes_channels(r: u8, g: u8, b: u8, a: u8) {
            let mut px = [r, g, b, a];
            grayscale(&mut px);
            prop_assert_eq!(px[0], px[1]);
            prop_assert_eq!(px[1], px[2]);
            prop_assert_eq!(px[3], a);
        }

        #[test]
        fn prop_brightness_never_darkens(c: u8) {
            let mut px = [c, c, c, 255];
            brightness(&mut px, BRIGHTNESS_FACTOR);
            prop_assert!(px[0] >= c);
        }
    }
}
