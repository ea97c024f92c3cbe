//! Export engine
//!
//! Assembles the current page collection into downloadable PDFs. Source
//! objects are imported wholesale with id-offset remapping, then each
//! output slot gets its own cloned page dictionary so rotation and
//! duplication apply per slot while content streams stay shared. With
//! split markers set, each segment becomes `document-{n}.pdf` inside a
//! ZIP archive.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use lopdf::{dictionary, Document, Object};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::PageDeckError;
use crate::page::PageSource;
use crate::render::{BLANK_PAGE_HEIGHT, BLANK_PAGE_WIDTH};
use crate::store::PageStore;

/// Download name when exporting the whole collection as one PDF.
pub const SINGLE_EXPORT_NAME: &str = "all-pages.pdf";
/// Download name when exporting the selected pages.
pub const SELECTED_EXPORT_NAME: &str = "selected-pages.pdf";
/// Download name for a split export archive.
pub const ARCHIVE_EXPORT_NAME: &str = "split-documents.zip";

/// A finished export, ready to hand to the browser as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    Pdf {
        filename: String,
        bytes: Vec<u8>,
    },
    Archive {
        filename: String,
        bytes: Vec<u8>,
        segments: usize,
    },
}

impl ExportOutput {
    pub fn filename(&self) -> &str {
        match self {
            ExportOutput::Pdf { filename, .. } | ExportOutput::Archive { filename, .. } => filename,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportOutput::Pdf { bytes, .. } | ExportOutput::Archive { bytes, .. } => bytes,
        }
    }
}

impl PageStore {
    /// Export every page in collection order. With no split markers the
    /// result is a single PDF; with markers, one PDF per segment packed
    /// into a ZIP archive. Any per-page failure aborts the whole export.
    pub fn export_all(&self) -> Result<ExportOutput, PageDeckError> {
        if self.is_busy() {
            return Err(PageDeckError::Busy);
        }
        if self.is_empty() {
            return Err(PageDeckError::EmptyCollection);
        }

        if self.split_markers().is_empty() {
            let indices: Vec<usize> = (0..self.len()).collect();
            return self.export_subset(&indices, SINGLE_EXPORT_NAME);
        }

        let segments = self.split_segments();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (n, segment) in segments.iter().enumerate() {
            let bytes = self.build_pdf(segment)?;
            writer
                .start_file(format!("document-{}.pdf", n + 1), SimpleFileOptions::default())
                .map_err(|e| {
                    PageDeckError::ExportError(format!("Failed to open archive entry: {}", e))
                })?;
            writer.write_all(&bytes).map_err(|e| {
                PageDeckError::ExportError(format!("Failed to write archive entry: {}", e))
            })?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| PageDeckError::ExportError(format!("Failed to finish archive: {}", e)))?;

        Ok(ExportOutput::Archive {
            filename: ARCHIVE_EXPORT_NAME.to_string(),
            bytes: cursor.into_inner(),
            segments: segments.len(),
        })
    }

    /// Export the selected pages, in collection order, as a single PDF.
    /// Split markers are ignored here.
    pub fn export_selected(&self) -> Result<ExportOutput, PageDeckError> {
        if self.is_busy() {
            return Err(PageDeckError::Busy);
        }
        if self.selected().is_empty() {
            return Err(PageDeckError::NothingSelected);
        }
        let indices: Vec<usize> = self.selected().iter().copied().collect();
        self.export_subset(&indices, SELECTED_EXPORT_NAME)
    }

    /// Export an explicit list of collection indices as a single PDF.
    pub fn export_subset(
        &self,
        indices: &[usize],
        filename: &str,
    ) -> Result<ExportOutput, PageDeckError> {
        let bytes = self.build_pdf(indices)?;
        Ok(ExportOutput::Pdf {
            filename: filename.to_string(),
            bytes,
        })
    }

    /// Partition the collection into contiguous runs. A marker on slot i
    /// ends a segment after that slot; a trailing run without a marker
    /// still becomes a segment.
    pub fn split_segments(&self) -> Vec<Vec<usize>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for index in 0..self.len() {
            current.push(index);
            if self.split_markers().contains(&index) {
                segments.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    /// Assemble one PDF from the given collection indices.
    ///
    /// Each source document's object graph is imported once with an id
    /// offset; every slot then clones its page dictionary, materializes
    /// inheritable attributes, and gets `/Rotate` set to the source's
    /// base rotation plus the slot's accumulated delta. Blank slots
    /// become empty A4 pages, ignoring any rotation on the record.
    fn build_pdf(&self, indices: &[usize]) -> Result<Vec<u8>, PageDeckError> {
        let mut dest = Document::with_version("1.7");
        let pages_id = dest.new_object_id();

        // doc_index -> id offset of the already-imported object graph
        let mut imported: HashMap<usize, u32> = HashMap::new();
        let mut kids = Vec::with_capacity(indices.len());

        for &index in indices {
            let record = self
                .page(index)
                .ok_or(PageDeckError::IndexOutOfBounds(index))?;

            let page_id = match record.source {
                None => dest.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![
                        0.into(),
                        0.into(),
                        (BLANK_PAGE_WIDTH as i64).into(),
                        (BLANK_PAGE_HEIGHT as i64).into(),
                    ],
                }),
                Some(source) => {
                    let offset = match imported.get(&source.doc_index) {
                        Some(&offset) => offset,
                        None => {
                            let offset = self.import_document_objects(&mut dest, source)?;
                            imported.insert(source.doc_index, offset);
                            offset
                        }
                    };
                    let mut page_dict =
                        self.cloned_page_dict(&dest, source, offset)?;

                    // Reparenting severs the source page tree, so pull
                    // inheritable attributes down into the page itself.
                    let doc = self
                        .document(source.doc_index)
                        .ok_or_else(|| missing_document(source.doc_index))?;
                    for key in [b"MediaBox".as_slice(), b"Resources", b"CropBox"] {
                        if !page_dict.has(key) {
                            if let Some(value) = doc.inherited_page_attr(source.page_index, key) {
                                page_dict.set(key, offset_object_refs(value, offset));
                            }
                        }
                    }

                    let total = (doc.page_rotation(source.page_index)
                        + record.rotation.degrees() as i64)
                        .rem_euclid(360);
                    page_dict.set("Rotate", Object::Integer(total));
                    page_dict.set("Parent", pages_id);

                    dest.add_object(page_dict)
                }
            };
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        dest.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = dest.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        dest.trailer.set("Root", Object::Reference(catalog_id));

        // Imported page objects are superseded by the per-slot clones;
        // pruning drops them along with anything else unreachable.
        dest.prune_objects();
        dest.compress();

        let mut buffer = Vec::new();
        dest.save_to(&mut buffer)
            .map_err(|e| PageDeckError::ExportError(format!("Failed to save PDF: {}", e)))?;
        Ok(buffer)
    }

    /// Import a source document's whole object graph into `dest`,
    /// remapping ids past `dest.max_id`. Returns the id offset.
    fn import_document_objects(
        &self,
        dest: &mut Document,
        source: PageSource,
    ) -> Result<u32, PageDeckError> {
        let doc = self
            .document(source.doc_index)
            .ok_or_else(|| missing_document(source.doc_index))?;

        let offset = dest.max_id;
        for (old_id, object) in doc.document().objects.iter() {
            let new_id = (old_id.0 + offset, old_id.1);
            dest.objects
                .insert(new_id, offset_object_refs(object.clone(), offset));
        }
        dest.max_id = dest.max_id.max(doc.document().max_id + offset);
        Ok(offset)
    }

    /// Clone the imported page dictionary for one output slot.
    fn cloned_page_dict(
        &self,
        dest: &Document,
        source: PageSource,
        offset: u32,
    ) -> Result<lopdf::Dictionary, PageDeckError> {
        let doc = self
            .document(source.doc_index)
            .ok_or_else(|| missing_document(source.doc_index))?;
        let page_id = doc.page_id(source.page_index).ok_or_else(|| {
            PageDeckError::ExportError(format!(
                "{}: page {} not found",
                doc.name(),
                source.page_index
            ))
        })?;
        let imported_id = (page_id.0 + offset, page_id.1);
        let dict = dest
            .get_object(imported_id)
            .and_then(Object::as_dict)
            .map_err(|e| {
                PageDeckError::ExportError(format!("Imported page is not a dictionary: {}", e))
            })?;
        Ok(dict.clone())
    }
}

fn missing_document(doc_index: usize) -> PageDeckError {
    PageDeckError::ExportError(format!("Source document {} is no longer loaded", doc_index))
}

/// Recursively shift object references by an id offset.
fn offset_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| offset_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = offset_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = offset_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::testutil::{load_store, load_store_named};
    use lopdf::Document;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn page_dict(doc: &Document, page_number: u32) -> &lopdf::Dictionary {
        let id = doc.get_pages()[&page_number];
        doc.get_object(id).unwrap().as_dict().unwrap()
    }

    fn rotate_of(doc: &Document, page_number: u32) -> i64 {
        page_dict(doc, page_number).get(b"Rotate").unwrap().as_i64().unwrap()
    }

    #[test]
    fn test_export_all_without_markers_is_single_pdf() {
        let store = load_store(&[3]);
        let output = store.export_all().unwrap();
        match output {
            ExportOutput::Pdf { filename, bytes } => {
                assert_eq!(filename, "all-pages.pdf");
                let doc = Document::load_mem(&bytes).unwrap();
                assert_eq!(doc.get_pages().len(), 3);
            }
            other => panic!("expected single PDF, got {:?}", other.filename()),
        }
    }

    #[test]
    fn test_export_all_empty_collection_fails() {
        let store = crate::store::PageStore::new();
        assert!(matches!(
            store.export_all(),
            Err(PageDeckError::EmptyCollection)
        ));
    }

    #[test]
    fn test_export_writes_accumulated_rotation() {
        let mut store = load_store(&[3]);
        store.apply(Command::Rotate { index: 1, delta: 90 }).unwrap();
        store.apply(Command::Rotate { index: 1, delta: 90 }).unwrap();

        let output = store.export_all().unwrap();
        let doc = Document::load_mem(output.bytes()).unwrap();
        assert_eq!(rotate_of(&doc, 1), 0);
        assert_eq!(rotate_of(&doc, 2), 180);
        assert_eq!(rotate_of(&doc, 3), 0);
    }

    #[test]
    fn test_duplicated_slots_rotate_independently_in_output() {
        let mut store = load_store(&[1]);
        store.apply(Command::Duplicate { index: 0 }).unwrap();
        store.apply(Command::Rotate { index: 1, delta: 90 }).unwrap();

        let output = store.export_all().unwrap();
        let doc = Document::load_mem(output.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert_eq!(rotate_of(&doc, 1), 0);
        assert_eq!(rotate_of(&doc, 2), 90);
    }

    #[test]
    fn test_exported_pages_carry_media_box() {
        let store = load_store(&[1]);
        let output = store.export_all().unwrap();
        let doc = Document::load_mem(output.bytes()).unwrap();
        let media_box = page_dict(&doc, 1).get(b"MediaBox").unwrap().as_array().unwrap();
        let coords: Vec<i64> = media_box.iter().map(|o| o.as_i64().unwrap()).collect();
        assert_eq!(coords, vec![0, 0, 612, 792]);
    }

    #[test]
    fn test_blank_pages_export_as_empty_a4_ignoring_rotation() {
        let mut store = load_store(&[1]);
        store.apply(Command::AddBlankPage).unwrap();
        store.apply(Command::Rotate { index: 1, delta: 90 }).unwrap();

        let output = store.export_all().unwrap();
        let doc = Document::load_mem(output.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let blank = page_dict(&doc, 2);
        let media_box = blank.get(b"MediaBox").unwrap().as_array().unwrap();
        let coords: Vec<i64> = media_box.iter().map(|o| o.as_i64().unwrap()).collect();
        assert_eq!(coords, vec![0, 0, 595, 842]);
        assert!(blank.get(b"Rotate").is_err());
        assert!(blank.get(b"Contents").is_err());
    }

    #[test]
    fn test_export_preserves_collection_order_across_documents() {
        let mut store = load_store_named(&[("a.pdf", 2), ("b.pdf", 2)]);
        store.apply(Command::Reorder { old_index: 0, new_index: 3 }).unwrap();

        let output = store.export_all().unwrap();
        let doc = Document::load_mem(output.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn test_export_selected_uses_selection_in_collection_order() {
        let mut store = load_store(&[4]);
        store.apply(Command::ToggleSelect { index: 3 }).unwrap();
        store.apply(Command::ToggleSelect { index: 1 }).unwrap();

        let output = store.export_selected().unwrap();
        match output {
            ExportOutput::Pdf { filename, bytes } => {
                assert_eq!(filename, "selected-pages.pdf");
                let doc = Document::load_mem(&bytes).unwrap();
                assert_eq!(doc.get_pages().len(), 2);
            }
            other => panic!("expected single PDF, got {:?}", other.filename()),
        }
    }

    #[test]
    fn test_export_selected_without_selection_fails() {
        let store = load_store(&[2]);
        assert!(matches!(
            store.export_selected(),
            Err(PageDeckError::NothingSelected)
        ));
    }

    #[test]
    fn test_split_segments_end_at_markers() {
        let mut store = load_store(&[8]);
        store.apply(Command::ToggleSplitMarker { index: 2 }).unwrap();
        store.apply(Command::ToggleSplitMarker { index: 5 }).unwrap();
        assert_eq!(
            store.split_segments(),
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7]]
        );
    }

    #[test]
    fn test_split_segment_marker_on_last_page_adds_no_empty_segment() {
        let mut store = load_store(&[3]);
        store.apply(Command::ToggleSplitMarker { index: 2 }).unwrap();
        assert_eq!(store.split_segments(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_export_all_with_markers_builds_archive() {
        let mut store = load_store(&[8]);
        store.apply(Command::ToggleSplitMarker { index: 2 }).unwrap();
        store.apply(Command::ToggleSplitMarker { index: 5 }).unwrap();

        let output = store.export_all().unwrap();
        let (filename, bytes, segments) = match output {
            ExportOutput::Archive { filename, bytes, segments } => (filename, bytes, segments),
            other => panic!("expected archive, got {:?}", other.filename()),
        };
        assert_eq!(filename, "split-documents.zip");
        assert_eq!(segments, 3);

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let expected = [("document-1.pdf", 3), ("document-2.pdf", 3), ("document-3.pdf", 2)];
        assert_eq!(archive.len(), expected.len());
        for (name, pages) in expected {
            let mut entry = archive.by_name(name).unwrap();
            let mut pdf = Vec::new();
            entry.read_to_end(&mut pdf).unwrap();
            let doc = Document::load_mem(&pdf).unwrap();
            assert_eq!(doc.get_pages().len(), pages, "{}", name);
        }
    }

    #[test]
    fn test_exported_pdf_survives_source_reset_in_history() {
        // Export must work from a state restored by undo, where the live
        // document list was rebuilt from a snapshot.
        let mut store = load_store(&[2]);
        store.apply(Command::Reset).unwrap();
        store.apply(Command::Undo).unwrap();

        let output = store.export_all().unwrap();
        let doc = Document::load_mem(output.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
