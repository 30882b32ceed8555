//! Platform abstraction layer
//!
//! Browser specifics live here:
//! - `CanvasSurface`: `Surface` over a 2-D canvas context
//! - `fetch_image`: async image-bank fetch
//! - `css_color`: color formatting for canvas styles
//!
//! Natively the software surface and `FsImageSource` cover the same ground.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{CanvasSurface, fetch_image};

use crate::raster::Color;

/// `rgba(...)` string accepted by canvas fill/stroke styles
pub fn css_color(color: Color) -> String {
    let [r, g, b, a] = color;
    if a == 255 {
        format!("rgb({}, {}, {})", r, g, b)
    } else {
        format!("rgba({}, {}, {}, {:.3})", r, g, b, a as f32 / 255.0)
    }
}
