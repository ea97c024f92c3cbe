//! Page collection store
//!
//! Owns the ordered page records, the selection and split-marker sets, the
//! loaded source documents, the render cache, and the undo history. All
//! button-driven mutations funnel through [`PageStore::apply`]; bulk loads
//! and inserts are separate methods because they carry bytes and a
//! renderer.
//!
//! Invariant: every index in the selection and split-marker sets is below
//! the collection length. Structural mutations re-index or clear the sets
//! to keep it.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, warn};

use crate::cache::RenderCache;
use crate::command::Command;
use crate::error::PageDeckError;
use crate::history::{History, Snapshot};
use crate::page::{PageRecord, PageSource, Thumbnail};
use crate::render::{blank_page_surface, CancelToken, PageRenderer, PREVIEW_SCALE};
use crate::source::SourceDocument;

/// What a drag-drop reorder does to the selection and split-marker sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderPolicy {
    /// Drop the selection; markers keep their positional meaning
    /// ("segment ends after slot i").
    #[default]
    ClearSelection,
    /// Remap selection and marker indices through the move so they follow
    /// the pages they were attached to.
    PreserveByIdentity,
}

/// A file queued for loading.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

/// Outcome of a bulk load. Per-file decode failures are collected here,
/// never fatal to the batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub pages_added: usize,
    pub failures: Vec<LoadFailure>,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct LoadFailure {
    pub name: String,
    pub error: PageDeckError,
}

pub struct PageStore {
    documents: Vec<Arc<SourceDocument>>,
    pages: Vec<PageRecord>,
    selected: BTreeSet<usize>,
    split_markers: BTreeSet<usize>,
    cache: RenderCache,
    history: History,
    reorder_policy: ReorderPolicy,
    busy: bool,
}

impl Default for PageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore {
    pub fn new() -> Self {
        Self::with_policy(ReorderPolicy::default())
    }

    pub fn with_policy(reorder_policy: ReorderPolicy) -> Self {
        Self {
            documents: Vec::new(),
            pages: Vec::new(),
            selected: BTreeSet::new(),
            split_markers: BTreeSet::new(),
            cache: RenderCache::new(),
            history: History::new(),
            reorder_policy,
            busy: false,
        }
    }

    // ---- Accessors ----------------------------------------------------

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&PageRecord> {
        self.pages.get(index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    pub fn split_markers(&self) -> &BTreeSet<usize> {
        &self.split_markers
    }

    pub fn document(&self, index: usize) -> Option<&Arc<SourceDocument>> {
        self.documents.get(index)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn reorder_policy(&self) -> ReorderPolicy {
        self.reorder_policy
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    // ---- Command dispatch ---------------------------------------------

    /// Validate, snapshot (structural commands only), then mutate.
    ///
    /// Rejected commands (busy store, empty selection, index out of
    /// bounds) fail before the snapshot push, so the undo stack never
    /// grows for a no-op.
    pub fn apply(&mut self, command: Command) -> Result<(), PageDeckError> {
        if self.busy {
            return Err(PageDeckError::Busy);
        }
        self.validate(&command)?;
        if command.takes_snapshot() {
            self.record_snapshot();
        }
        self.execute(command);
        Ok(())
    }

    fn validate(&self, command: &Command) -> Result<(), PageDeckError> {
        match command {
            Command::Rotate { index, .. }
            | Command::Duplicate { index }
            | Command::Delete { index }
            | Command::ToggleSelect { index }
            | Command::ToggleSplitMarker { index } => self.check_index(*index),
            Command::Reorder { old_index, new_index } => {
                self.check_index(*old_index)?;
                self.check_index(*new_index)
            }
            Command::BulkRotate { .. }
            | Command::BulkDuplicate
            | Command::BulkDelete
            | Command::BulkSplitMarker => {
                if self.selected.is_empty() {
                    Err(PageDeckError::NothingSelected)
                } else {
                    Ok(())
                }
            }
            Command::AddBlankPage
            | Command::SelectAll
            | Command::DeselectAll
            | Command::Undo
            | Command::Redo
            | Command::Reset => Ok(()),
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Rotate { index, delta } => self.pages[index].rotate(delta),
            Command::BulkRotate { delta } => self.bulk_rotate(delta),
            Command::Duplicate { index } => self.duplicate(index),
            Command::BulkDuplicate => self.bulk_duplicate(),
            Command::Delete { index } => self.delete(index),
            Command::BulkDelete => self.bulk_delete(),
            Command::AddBlankPage => self.add_blank_page(),
            Command::Reorder { old_index, new_index } => self.reorder(old_index, new_index),
            Command::ToggleSelect { index } => self.toggle_select(index),
            Command::SelectAll => self.select_all(),
            Command::DeselectAll => self.selected.clear(),
            Command::ToggleSplitMarker { index } => self.toggle_split_marker(index),
            Command::BulkSplitMarker => self.bulk_split_marker(),
            Command::Undo => {
                self.undo();
            }
            Command::Redo => {
                self.redo();
            }
            Command::Reset => self.reset_state(),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), PageDeckError> {
        if index < self.pages.len() {
            Ok(())
        } else {
            Err(PageDeckError::IndexOutOfBounds(index))
        }
    }

    // ---- Undo/redo ----------------------------------------------------

    fn snapshot_state(&self) -> Snapshot {
        Snapshot {
            documents: self.documents.clone(),
            pages: self.pages.clone(),
            selected: self.selected.clone(),
            split_markers: self.split_markers.clone(),
        }
    }

    fn record_snapshot(&mut self) {
        let snapshot = self.snapshot_state();
        self.history.record(snapshot);
    }

    fn restore(&mut self, snapshot: Snapshot) {
        // Documents are only ever appended, so a shorter restored list
        // frees the trailing load positions for reuse by a later load.
        // Their cache entries would alias the documents that used to sit
        // there.
        self.cache.invalidate_documents_from(snapshot.documents.len());
        self.documents = snapshot.documents;
        self.pages = snapshot.pages;
        self.selected = snapshot.selected;
        self.split_markers = snapshot.split_markers;
    }

    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot_state();
        match self.history.undo(current) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot_state();
        match self.history.redo(current) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    // ---- Mutations ----------------------------------------------------

    fn bulk_rotate(&mut self, delta: i32) {
        let indices: Vec<usize> = self.selected.iter().copied().collect();
        for index in indices {
            self.pages[index].rotate(delta);
        }
    }

    fn duplicate(&mut self, index: usize) {
        let copy = self.pages[index].duplicate();
        self.pages.insert(index + 1, copy);
        self.selected = shift_after_insertion(&self.selected, index, 1);
        self.split_markers = shift_after_insertion(&self.split_markers, index, 1);
    }

    fn bulk_duplicate(&mut self) {
        // Descending order: each insertion lands above the indices still
        // to be visited.
        let indices: Vec<usize> = self.selected.iter().rev().copied().collect();
        for index in indices {
            let copy = self.pages[index].duplicate();
            self.pages.insert(index + 1, copy);
            self.split_markers = shift_after_insertion(&self.split_markers, index, 1);
        }
        self.selected.clear();
    }

    fn delete(&mut self, index: usize) {
        self.pages.remove(index);
        self.selected = remap_after_removal(&self.selected, index);
        self.split_markers = remap_after_removal(&self.split_markers, index);
        if self.pages.is_empty() {
            self.reset_state();
        }
    }

    fn bulk_delete(&mut self) {
        let doomed: Vec<usize> = self.selected.iter().rev().copied().collect();
        for index in doomed {
            self.pages.remove(index);
            self.split_markers = remap_after_removal(&self.split_markers, index);
        }
        self.selected.clear();
        if self.pages.is_empty() {
            self.reset_state();
        }
    }

    fn add_blank_page(&mut self) {
        self.pages
            .push(PageRecord::blank(Thumbnail::new(blank_page_surface())));
    }

    fn reorder(&mut self, old_index: usize, new_index: usize) {
        if old_index == new_index {
            return;
        }
        let record = self.pages.remove(old_index);
        self.pages.insert(new_index, record);
        match self.reorder_policy {
            ReorderPolicy::ClearSelection => self.selected.clear(),
            ReorderPolicy::PreserveByIdentity => {
                self.selected = remap_after_move(&self.selected, old_index, new_index);
                self.split_markers = remap_after_move(&self.split_markers, old_index, new_index);
            }
        }
    }

    fn toggle_select(&mut self, index: usize) {
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    fn select_all(&mut self) {
        self.selected = (0..self.pages.len()).collect();
    }

    fn toggle_split_marker(&mut self, index: usize) {
        if !self.split_markers.remove(&index) {
            self.split_markers.insert(index);
        }
    }

    fn bulk_split_marker(&mut self) {
        for &index in &self.selected {
            self.split_markers.insert(index);
        }
        self.selected.clear();
    }

    /// Full reset: pages, selection, markers, documents, and the render
    /// cache. History survives so the reset itself can be undone.
    fn reset_state(&mut self) {
        self.pages.clear();
        self.selected.clear();
        self.split_markers.clear();
        self.documents.clear();
        self.cache.clear();
        self.busy = false;
    }

    // ---- Loading ------------------------------------------------------

    /// Decode and rasterize a batch of files, appending one record per
    /// page. Decode failures are reported per file; rendering failures
    /// skip the page. Progress is cumulative `(current, total)` across
    /// every page of the batch. Not snapshotted (uploads are not
    /// undoable, matching the tool's behavior).
    pub fn load_documents<R: PageRenderer>(
        &mut self,
        files: &[InputFile],
        renderer: &mut R,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<LoadReport, PageDeckError> {
        if self.busy {
            return Err(PageDeckError::Busy);
        }
        self.busy = true;
        let report = self.load_documents_inner(files, renderer, cancel, progress);
        self.busy = false;
        Ok(report)
    }

    fn load_documents_inner<R: PageRenderer>(
        &mut self,
        files: &[InputFile],
        renderer: &mut R,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(usize, usize),
    ) -> LoadReport {
        let mut report = LoadReport::default();

        // First pass: decode everything so the page total is known before
        // any rendering starts.
        let mut decoded = Vec::new();
        let mut total_pages = 0;
        for file in files {
            match SourceDocument::load(&file.name, &file.bytes) {
                Ok(doc) => {
                    total_pages += doc.page_count();
                    decoded.push(doc);
                }
                Err(e) => {
                    error!(file = %file.name, "failed to load PDF: {e}");
                    report.failures.push(LoadFailure {
                        name: file.name.clone(),
                        error: e,
                    });
                }
            }
        }

        // Second pass: rasterize page by page, polling for cancellation
        // between pages. Cancellation keeps what was already appended.
        let mut current = 0;
        'files: for doc in decoded {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let doc = Arc::new(doc);
            self.documents.push(Arc::clone(&doc));
            let doc_index = self.documents.len() - 1;

            for page_index in 0..doc.page_count() {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'files;
                }
                current += 1;
                progress(current, total_pages);
                match self.append_rendered_page(&doc, doc_index, page_index, renderer) {
                    Ok(()) => report.pages_added += 1,
                    Err(e) => {
                        warn!(
                            file = %doc.name(),
                            page = page_index,
                            "skipping page that failed to render: {e}"
                        );
                    }
                }
            }
        }

        report
    }

    /// Insert every page of one document as a contiguous run immediately
    /// after `index`. Snapshotted once the file has decoded, so a corrupt
    /// file leaves the history untouched.
    pub fn insert_document_after<R: PageRenderer>(
        &mut self,
        index: usize,
        file: &InputFile,
        renderer: &mut R,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<LoadReport, PageDeckError> {
        if self.busy {
            return Err(PageDeckError::Busy);
        }
        self.check_index(index)?;
        let doc = SourceDocument::load(&file.name, &file.bytes)?;

        self.record_snapshot();
        self.busy = true;
        let report = self.insert_inner(index, doc, renderer, cancel, progress);
        self.busy = false;
        Ok(report)
    }

    fn insert_inner<R: PageRenderer>(
        &mut self,
        index: usize,
        doc: SourceDocument,
        renderer: &mut R,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(usize, usize),
    ) -> LoadReport {
        let mut report = LoadReport::default();
        let total_pages = doc.page_count();

        let doc = Arc::new(doc);
        self.documents.push(Arc::clone(&doc));
        let doc_index = self.documents.len() - 1;

        // Render to the end of the collection first, then splice the run
        // into place.
        let run_start = self.pages.len();
        for page_index in 0..total_pages {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            progress(page_index + 1, total_pages);
            match self.append_rendered_page(&doc, doc_index, page_index, renderer) {
                Ok(()) => report.pages_added += 1,
                Err(e) => {
                    warn!(
                        file = %doc.name(),
                        page = page_index,
                        "skipping page that failed to render: {e}"
                    );
                }
            }
        }

        let run: Vec<PageRecord> = self.pages.split_off(run_start);
        let count = run.len();
        self.pages.splice(index + 1..index + 1, run);
        self.selected = shift_after_insertion(&self.selected, index, count);
        self.split_markers = shift_after_insertion(&self.split_markers, index, count);

        report
    }

    fn append_rendered_page<R: PageRenderer>(
        &mut self,
        doc: &Arc<SourceDocument>,
        doc_index: usize,
        page_index: usize,
        renderer: &mut R,
    ) -> Result<(), PageDeckError> {
        let surface = match self.cache.get(doc_index, page_index) {
            Some(hit) => hit,
            None => {
                let rendered = renderer.render_page(doc, page_index, PREVIEW_SCALE)?;
                self.cache.put(doc_index, page_index, Arc::new(rendered))
            }
        };
        self.pages.push(PageRecord::from_source(
            PageSource { doc_index, page_index },
            Thumbnail::from_shared(surface),
        ));
        Ok(())
    }
}

// ---- Index-set remapping ----------------------------------------------

/// Entries above the removed index shift down by one; an entry at the
/// removed index is dropped; entries below keep their value.
fn remap_after_removal(set: &BTreeSet<usize>, removed: usize) -> BTreeSet<usize> {
    set.iter()
        .filter_map(|&i| {
            if i < removed {
                Some(i)
            } else if i > removed {
                Some(i - 1)
            } else {
                None
            }
        })
        .collect()
}

/// Entries strictly above `inserted_after` shift up by `count`.
fn shift_after_insertion(set: &BTreeSet<usize>, inserted_after: usize, count: usize) -> BTreeSet<usize> {
    set.iter()
        .map(|&i| if i > inserted_after { i + count } else { i })
        .collect()
}

/// Map indices through a single-element move from `old` to `new`.
fn remap_after_move(set: &BTreeSet<usize>, old: usize, new: usize) -> BTreeSet<usize> {
    set.iter().map(|&i| move_index(i, old, new)).collect()
}

fn move_index(i: usize, old: usize, new: usize) -> usize {
    if i == old {
        new
    } else if old < new && i > old && i <= new {
        i - 1
    } else if new < old && i >= new && i < old {
        i + 1
    } else {
        i
    }
}
