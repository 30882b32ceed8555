//! Browser canvas surface and image fetch

use glam::Vec2;
use image::{DynamicImage, RgbaImage, imageops};
use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData, Response};

use super::css_color;
use crate::error::LoadError;
use crate::raster::{Color, Rect, Surface};
use crate::source::decode_image;

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

/// `Surface` drawing onto an HTML canvas.
///
/// Tile pixels are staged through a scratch canvas so they can be drawn with
/// the context's transform (`putImageData` ignores it).
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    scratch: HtmlCanvasElement,
    scratch_ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Option<Self> {
        let ctx = context_2d(&canvas)?;
        let scratch: HtmlCanvasElement = web_sys::window()?
            .document()?
            .create_element("canvas")
            .ok()?
            .dyn_into()
            .ok()?;
        let scratch_ctx = context_2d(&scratch)?;
        Some(Self {
            canvas,
            ctx,
            scratch,
            scratch_ctx,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Resize the backing store (clears it)
    pub fn resize(&self, size: u32) {
        self.canvas.set_width(size);
        self.canvas.set_height(size);
    }

    fn stage(&self, pixels: &RgbaImage) -> Result<(), JsValue> {
        let (w, h) = pixels.dimensions();
        self.scratch.set_width(w);
        self.scratch.set_height(h);
        let data =
            ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels.as_raw().as_slice()), w, h)?;
        self.scratch_ctx.put_image_data(&data, 0.0, 0.0)
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn clear(&mut self, color: Color) {
        let (w, h) = self.size();
        self.ctx.clear_rect(0.0, 0.0, w as f64, h as f64);
        self.fill_rect(Rect::new(0.0, 0.0, w as f32, h as f32), color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.fill_rect(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        );
    }

    fn draw_rotated(&mut self, image: &RgbaImage, src: Rect, center: Vec2, radians: f32) {
        let (sx, sy, sw, sh) = src.to_pixels();
        if sw == 0 || sh == 0 {
            return;
        }
        let region = imageops::crop_imm(image, sx, sy, sw, sh).to_image();
        if let Err(e) = self.stage(&region) {
            log::warn!("Failed to stage tile pixels: {:?}", e);
            return;
        }

        let (w, h) = (sw as f64, sh as f64);
        self.ctx.save();
        let drawn = self
            .ctx
            .translate(center.x as f64, center.y as f64)
            .and_then(|_| self.ctx.rotate(radians as f64))
            .and_then(|_| {
                self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
                    &self.scratch,
                    -w / 2.0,
                    -h / 2.0,
                    w,
                    h,
                )
            });
        self.ctx.restore();
        if let Err(e) = drawn {
            log::warn!("Failed to draw tile: {:?}", e);
        }
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        self.ctx.set_stroke_style_str(&css_color(color));
        self.ctx.set_line_width(width as f64);
        self.ctx.begin_path();
        self.ctx.move_to(from.x as f64, from.y as f64);
        self.ctx.line_to(to.x as f64, to.y as f64);
        self.ctx.stroke();
    }
}

fn fetch_error(url: &str, err: JsValue) -> LoadError {
    LoadError::Fetch {
        url: url.to_string(),
        reason: format!("{:?}", err),
    }
}

/// Fetch and decode one image-bank entry
pub async fn fetch_image(url: &str) -> Result<DynamicImage, LoadError> {
    let window = web_sys::window().ok_or_else(|| LoadError::Fetch {
        url: url.to_string(),
        reason: "no window".to_string(),
    })?;

    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .and_then(|r| r.dyn_into())
        .map_err(|e| fetch_error(url, e))?;
    if !response.ok() {
        return Err(LoadError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let buffer = response
        .array_buffer()
        .map(JsFuture::from)
        .map_err(|e| fetch_error(url, e))?
        .await
        .map_err(|e| fetch_error(url, e))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    decode_image(url, &bytes)
}
