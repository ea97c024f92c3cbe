//! Render cache
//!
//! Memoizes one preview surface per (document, page) so repeated inserts
//! and duplicates of already-rendered pages skip rasterization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::render::RasterSurface;

/// Cache key: a document's load position and a 0-based page index.
/// Keyed by position, not content, so two uploads of the same file stay
/// distinct documents.
pub type PageKey = (usize, usize);

/// `put` never replaces an existing entry (memoization, not
/// invalidation). Entries live until a full reset, except when undo
/// shrinks the document list and frees load positions for reuse.
#[derive(Debug, Default)]
pub struct RenderCache {
    surfaces: HashMap<PageKey, Arc<RasterSurface>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, doc_index: usize, page_index: usize) -> Option<Arc<RasterSurface>> {
        self.surfaces.get(&(doc_index, page_index)).cloned()
    }

    /// Store a surface, keeping any entry already present for the key.
    /// Returns the surface that ended up in the cache.
    pub fn put(
        &mut self,
        doc_index: usize,
        page_index: usize,
        surface: Arc<RasterSurface>,
    ) -> Arc<RasterSurface> {
        Arc::clone(
            self.surfaces
                .entry((doc_index, page_index))
                .or_insert(surface),
        )
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Invoked only on a full reset.
    pub fn clear(&mut self) {
        self.surfaces.clear();
    }

    /// Drop entries for documents at load position `count` or above.
    /// Those positions can be handed to new documents once history
    /// restoration shrinks the document list; keeping their entries
    /// would serve another document's surfaces.
    pub fn invalidate_documents_from(&mut self, count: usize) {
        self.surfaces.retain(|&(doc_index, _), _| doc_index < count);
    }
}
