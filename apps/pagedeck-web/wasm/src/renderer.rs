//! Bridge to the JavaScript rasterizer
//!
//! The core asks this renderer for preview pixels; the actual drawing
//! happens in JavaScript (pdf.js onto a canvas). The callback receives
//! `(bytes: Uint8Array, pageIndex: number, scale: number)` and returns
//! `{ width, height, pixels }` with RGBA pixels.

use image::Rgba;
use pagedeck_core::{PageDeckError, PageRenderer, RasterSurface, SourceDocument};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct RenderedThumb {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

pub(crate) struct JsRenderer {
    callback: Option<js_sys::Function>,
}

impl JsRenderer {
    pub(crate) fn new() -> Self {
        Self { callback: None }
    }

    pub(crate) fn set_callback(&mut self, callback: js_sys::Function) {
        self.callback = Some(callback);
    }
}

impl PageRenderer for JsRenderer {
    fn render_page(
        &mut self,
        source: &SourceDocument,
        page_index: usize,
        scale: f32,
    ) -> Result<RasterSurface, PageDeckError> {
        let callback = match &self.callback {
            Some(callback) => callback,
            None => return Ok(placeholder(source, page_index, scale)),
        };

        let bytes = js_sys::Uint8Array::from(source.bytes());
        let value = callback
            .call3(
                &JsValue::NULL,
                &bytes.into(),
                &JsValue::from(page_index as u32),
                &JsValue::from(scale),
            )
            .map_err(|e| PageDeckError::RenderError(format!("render callback threw: {:?}", e)))?;

        let thumb: RenderedThumb = serde_wasm_bindgen::from_value(value).map_err(|e| {
            PageDeckError::RenderError(format!("bad render callback result: {}", e))
        })?;
        let (width, height) = (thumb.width, thumb.height);
        RasterSurface::from_raw(width, height, thumb.pixels).ok_or_else(|| {
            PageDeckError::RenderError(format!(
                "pixel buffer does not match {}x{} RGBA",
                width, height
            ))
        })
    }
}

/// White stand-in sized from the page's media box, used when no render
/// callback is registered.
fn placeholder(source: &SourceDocument, page_index: usize, scale: f32) -> RasterSurface {
    let (width, height) = source.page_media_size(page_index);
    RasterSurface::from_pixel(
        (width as f32 * scale).round().max(1.0) as u32,
        (height as f32 * scale).round().max(1.0) as u32,
        Rgba([255, 255, 255, 255]),
    )
}
