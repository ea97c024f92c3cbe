//! WASM bindings for the page-organizer workspace
//!
//! State lives in Rust via [`PageDeckSession`]; JavaScript handles DOM
//! events, file I/O, rasterization (pdf.js), and downloads.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PageDeckSession } from './pkg/pagedeck_wasm.js';
//!
//! await init();
//!
//! const session = new PageDeckSession(false);
//! session.setProgressCallback((current, total) => updateBar(current, total));
//! session.setRenderCallback((bytes, pageIndex, scale) => renderWithPdfJs(bytes, pageIndex, scale));
//!
//! session.queueFile("report.pdf", bytes);
//! session.loadQueued();
//!
//! session.rotatePage(0, 90);
//! session.toggleSplitMarker(2);
//! const result = session.exportAll();
//! downloadBlob(result.bytes(), result.filename);
//! ```

mod renderer;
pub mod session;

use wasm_bindgen::prelude::*;

pub use session::{ExportResult, PageDeckSession};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Page count of a PDF without creating a session, for showing file info
/// before the user commits to an upload.
#[wasm_bindgen(js_name = getPageCount)]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pagedeck_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}
