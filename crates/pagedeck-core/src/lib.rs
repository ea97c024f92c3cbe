//! Page-level PDF workspace
//!
//! This crate is the engine behind a browser page-management tool: load
//! PDFs into one flat page collection, then rotate, duplicate, delete,
//! reorder, insert blanks, mark split points, undo and redo, and export
//! the result as a single PDF or a ZIP of split documents.
//!
//! Rasterization is delegated through [`render::PageRenderer`]; document
//! assembly uses lopdf directly.

pub mod cache;
pub mod command;
pub mod error;
pub mod export;
pub mod history;
pub mod page;
pub mod render;
pub mod source;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::RenderCache;
pub use command::Command;
pub use error::{PageDeckError, Severity};
pub use export::{
    ExportOutput, ARCHIVE_EXPORT_NAME, SELECTED_EXPORT_NAME, SINGLE_EXPORT_NAME,
};
pub use history::{History, Snapshot};
pub use page::{PageRecord, PageSource, Rotation, Thumbnail};
pub use render::{CancelToken, PageRenderer, RasterSurface, PREVIEW_SCALE};
pub use source::SourceDocument;
pub use store::{InputFile, LoadFailure, LoadReport, PageStore, ReorderPolicy};

/// Parse PDF bytes and return the page count.
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PageDeckError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PageDeckError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_page_count() {
        let pdf = testutil::create_test_pdf(3);
        assert_eq!(get_page_count(&pdf).unwrap(), 3);
    }

    #[test]
    fn test_get_page_count_rejects_garbage() {
        assert!(matches!(
            get_page_count(b"nope"),
            Err(PageDeckError::ParseError(_))
        ));
    }
}
