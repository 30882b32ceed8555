//! Drawing surface abstraction
//!
//! The board only needs four operations from whatever it draws on: clear,
//! fill a rectangle, draw a sub-image rotated about a point, and stroke a
//! line. `SoftwareSurface` implements them on an in-memory RGBA image; the
//! browser canvas implementation lives in `platform`.

use glam::Vec2;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// RGBA8 color
pub type Color = [u8; 4];

/// Axis-aligned rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.origin() + self.size() / 2.0
    }

    /// Half-open containment test
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// Same rectangle moved to `origin`
    pub fn at(&self, origin: Vec2) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    /// Integer pixel bounds `(x, y, width, height)` covering this rect
    pub fn to_pixels(&self) -> (u32, u32, u32, u32) {
        let x0 = self.x.round().max(0.0) as u32;
        let y0 = self.y.round().max(0.0) as u32;
        let x1 = (self.x + self.width).round().max(0.0) as u32;
        let y1 = (self.y + self.height).round().max(0.0) as u32;
        (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// A 2-D raster target
pub trait Surface {
    /// Surface size in pixels
    fn size(&self) -> (u32, u32);

    /// Fill the whole surface with `color`
    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw `src` (a region of `image`) centered on `center`, rotated
    /// clockwise by `radians` around `center`
    fn draw_rotated(&mut self, image: &RgbaImage, src: Rect, center: Vec2, radians: f32);

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color);
}

/// Source-over blend of `src` onto `dst`
#[inline]
fn blend(dst: &mut Rgba<u8>, src: Color) {
    match src[3] {
        0 => {}
        255 => dst.0 = src,
        a => {
            let a = a as u32;
            for i in 0..3 {
                dst.0[i] = ((src[i] as u32 * a + dst.0[i] as u32 * (255 - a) + 127) / 255) as u8;
            }
            dst.0[3] = (a + dst.0[3] as u32 * (255 - a) / 255) as u8;
        }
    }
}

/// CPU surface backed by an RGBA image
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    image: RgbaImage,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Clip a float rect to integer pixel bounds `[x0, x1) x [y0, y1)`
    fn clip(&self, rect: Rect) -> (u32, u32, u32, u32) {
        let (w, h) = self.image.dimensions();
        let x0 = rect.x.floor().clamp(0.0, w as f32) as u32;
        let y0 = rect.y.floor().clamp(0.0, h as f32) as u32;
        let x1 = (rect.x + rect.width).ceil().clamp(0.0, w as f32) as u32;
        let y1 = (rect.y + rect.height).ceil().clamp(0.0, h as f32) as u32;
        (x0, y0, x1, y1)
    }
}

impl Surface for SoftwareSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self, color: Color) {
        for px in self.image.pixels_mut() {
            px.0 = color;
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (x0, y0, x1, y1) = self.clip(rect);
        for y in y0..y1 {
            for x in x0..x1 {
                blend(self.image.get_pixel_mut(x, y), color);
            }
        }
    }

    fn draw_rotated(&mut self, image: &RgbaImage, src: Rect, center: Vec2, radians: f32) {
        let (cos, sin) = (radians.cos(), radians.sin());
        let half = src.size() / 2.0;

        // Bounding box of the rotated rect
        let extent = Vec2::new(
            (half.x * cos).abs() + (half.y * sin).abs(),
            (half.x * sin).abs() + (half.y * cos).abs(),
        );
        let bounds = Rect::new(
            center.x - extent.x,
            center.y - extent.y,
            extent.x * 2.0,
            extent.y * 2.0,
        );
        let (x0, y0, x1, y1) = self.clip(bounds);
        let (img_w, img_h) = image.dimensions();

        for y in y0..y1 {
            for x in x0..x1 {
                // Inverse-rotate the destination pixel center into source space
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let local = Vec2::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos);
                if local.x < -half.x || local.y < -half.y || local.x >= half.x || local.y >= half.y {
                    continue;
                }
                let sx = (src.x + half.x + local.x).floor();
                let sy = (src.y + half.y + local.y).floor();
                if sx < 0.0 || sy < 0.0 || sx >= img_w as f32 || sy >= img_h as f32 {
                    continue;
                }
                let color = image.get_pixel(sx as u32, sy as u32).0;
                blend(self.image.get_pixel_mut(x, y), color);
            }
        }
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        let half = width / 2.0;
        let min = from.min(to);
        let max = from.max(to);

        // Axis-aligned strokes are plain rects with butt caps
        if from.x == to.x {
            self.fill_rect(Rect::new(from.x - half, min.y, width, max.y - min.y), color);
            return;
        }
        if from.y == to.y {
            self.fill_rect(Rect::new(min.x, from.y - half, max.x - min.x, width), color);
            return;
        }

        // Diagonal: stamp a square brush along the segment
        let steps = from.distance(to).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let p = from.lerp(to, i as f32 / steps as f32);
            self.fill_rect(Rect::new(p.x - half, p.y - half, width, width), color);
        }
    }
}
