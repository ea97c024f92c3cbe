//! Rasterization seam and preview surfaces
//!
//! The core never rasterizes PDF content itself; it drives an external
//! renderer (pdf.js in the browser, a stub in tests) through the
//! [`PageRenderer`] trait and keeps the results as plain RGBA buffers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::PageDeckError;
use crate::source::SourceDocument;

/// Previews are rendered at half resolution. Export is unaffected: it
/// copies pages at their native dimensions.
pub const PREVIEW_SCALE: f32 = 0.5;

/// Default page size in PDF points (A4), used for synthetic blank pages.
pub const BLANK_PAGE_WIDTH: u32 = 595;
pub const BLANK_PAGE_HEIGHT: u32 = 842;

/// A rendered page preview: plain RGBA pixels.
pub type RasterSurface = RgbaImage;

/// Solid white surface for a synthetic blank page.
pub fn blank_page_surface() -> RasterSurface {
    RgbaImage::from_pixel(
        BLANK_PAGE_WIDTH,
        BLANK_PAGE_HEIGHT,
        Rgba([255, 255, 255, 255]),
    )
}

/// Rasterizes a single page of a loaded document at the given scale.
///
/// Failures are per-page and non-fatal: the caller logs them and skips the
/// page rather than substituting a blank.
pub trait PageRenderer {
    fn render_page(
        &mut self,
        source: &SourceDocument,
        page_index: usize,
        scale: f32,
    ) -> Result<RasterSurface, PageDeckError>;
}

/// Cooperative cancellation flag, polled between page rasterizations.
///
/// Cancelling a bulk load keeps whatever pages were already rendered;
/// there is no rollback.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_surface_is_white_a4() {
        let surface = blank_page_surface();
        assert_eq!(surface.width(), 595);
        assert_eq!(surface.height(), 842);
        assert_eq!(surface.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(surface.get_pixel(594, 841), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
