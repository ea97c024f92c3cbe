//! Loaded source documents
//!
//! A [`SourceDocument`] is a decoded input PDF. It is immutable after
//! loading and shared via `Arc` between page records, undo snapshots, and
//! the export engine, so document identity is its load position, never its
//! content.

use lopdf::{Document, Object, ObjectId};

use crate::error::PageDeckError;

pub struct SourceDocument {
    name: String,
    bytes: Vec<u8>,
    document: Document,
    /// Page object ids in document order.
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("pages", &self.page_ids.len())
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl SourceDocument {
    /// Decode PDF bytes. Fails on malformed input or an empty page tree;
    /// the caller reports the failure per file and continues.
    pub fn load(name: &str, bytes: &[u8]) -> Result<Self, PageDeckError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| PageDeckError::ParseError(format!("{}: {}", name, e)))?;

        let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();
        if page_ids.is_empty() {
            return Err(PageDeckError::ParseError(format!("{}: PDF has no pages", name)));
        }

        Ok(Self {
            name: name.to_string(),
            bytes: bytes.to_vec(),
            document,
            page_ids,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original file bytes, handed to external rasterizers.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Object id of a 0-based page, if it exists.
    pub fn page_id(&self, page_index: usize) -> Option<ObjectId> {
        self.page_ids.get(page_index).copied()
    }

    /// Effective `/Rotate` of a page in degrees, following the page-tree
    /// inheritance chain. Defaults to 0.
    pub fn page_rotation(&self, page_index: usize) -> i64 {
        self.inherited_page_attr(page_index, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0)
    }

    /// Media box (width, height) of a page in points, following
    /// inheritance. Defaults to A4 when the document omits it.
    pub fn page_media_size(&self, page_index: usize) -> (f64, f64) {
        if let Some(Object::Array(values)) = self.inherited_page_attr(page_index, b"MediaBox") {
            let coords: Vec<f64> = values.iter().filter_map(number).collect();
            if let [x0, y0, x1, y1] = coords[..] {
                return ((x1 - x0).abs(), (y1 - y0).abs());
            }
        }
        (595.0, 842.0)
    }

    /// Look up a page attribute, walking `/Parent` links for inheritable
    /// keys. References are resolved to their target objects.
    pub fn inherited_page_attr(&self, page_index: usize, key: &[u8]) -> Option<Object> {
        let mut id = self.page_id(page_index)?;
        // Bounded walk in case of a cyclic page tree.
        for _ in 0..64 {
            let dict = self.document.get_object(id).ok()?.as_dict().ok()?;
            if let Ok(value) = dict.get(key) {
                return match value {
                    Object::Reference(target) => self.document.get_object(*target).ok().cloned(),
                    other => Some(other.clone()),
                };
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => id = parent,
                Err(_) => return None,
            }
        }
        None
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
