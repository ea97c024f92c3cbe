//! Stateful page-organizer session
//!
//! Holds the whole page collection in Rust; JavaScript only forwards DOM
//! events and handles file I/O and downloads. Commands arrive either
//! through the typed wrapper methods or as tagged JSON via
//! [`PageDeckSession::apply_command`].

use pagedeck_core::{
    Command, ExportOutput, InputFile, LoadReport, PageDeckError, PageStore, ReorderPolicy,
    Severity, CancelToken,
};
use wasm_bindgen::prelude::*;

use crate::renderer::JsRenderer;

/// Stateful session driving one page-collection workspace.
#[wasm_bindgen]
pub struct PageDeckSession {
    store: PageStore,
    renderer: JsRenderer,
    progress_callback: Option<js_sys::Function>,
    cancel: CancelToken,
    pending: Vec<InputFile>,
}

#[wasm_bindgen]
impl PageDeckSession {
    /// Create a session. `preserve_selection_on_reorder` keeps selection
    /// and split markers attached to their pages across drag-drop moves;
    /// off, a move clears the selection.
    #[wasm_bindgen(constructor)]
    pub fn new(preserve_selection_on_reorder: bool) -> Self {
        let policy = if preserve_selection_on_reorder {
            ReorderPolicy::PreserveByIdentity
        } else {
            ReorderPolicy::ClearSelection
        };
        Self {
            store: PageStore::with_policy(policy),
            renderer: JsRenderer::new(),
            progress_callback: None,
            cancel: CancelToken::new(),
            pending: Vec::new(),
        }
    }

    /// Callback signature: `(current: number, total: number) => void`,
    /// cumulative across every page of a load batch.
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Callback signature:
    /// `(bytes: Uint8Array, pageIndex: number, scale: number) => {width, height, pixels}`.
    #[wasm_bindgen(js_name = setRenderCallback)]
    pub fn set_render_callback(&mut self, callback: js_sys::Function) {
        self.renderer.set_callback(callback);
    }

    /// Stop the in-progress load after the current page. Already-rendered
    /// pages stay in the collection.
    #[wasm_bindgen(js_name = cancelRendering)]
    pub fn cancel_rendering(&self) {
        self.cancel.cancel();
    }

    // ---- Loading ------------------------------------------------------

    /// Stage a file for the next [`PageDeckSession::load_queued`] call.
    #[wasm_bindgen(js_name = queueFile)]
    pub fn queue_file(&mut self, name: &str, bytes: &[u8]) {
        self.pending.push(InputFile::new(name, bytes.to_vec()));
    }

    #[wasm_bindgen(js_name = queuedCount)]
    pub fn queued_count(&self) -> usize {
        self.pending.len()
    }

    /// Load every queued file, appending their pages to the collection.
    /// Returns `{pages_added, cancelled, failures: [{name, message}]}`.
    #[wasm_bindgen(js_name = loadQueued)]
    pub fn load_queued(&mut self) -> Result<JsValue, JsValue> {
        let report = self.load_queued_internal().map_err(|e| ui_error(&e))?;
        serde_wasm_bindgen::to_value(&LoadSummary::from(&report)).map_err(serialization_error)
    }

    /// Insert every page of one file right after the given slot.
    #[wasm_bindgen(js_name = insertDocumentAfter)]
    pub fn insert_document_after(
        &mut self,
        index: usize,
        name: &str,
        bytes: &[u8],
    ) -> Result<JsValue, JsValue> {
        let report = self
            .insert_after_internal(index, name, bytes)
            .map_err(|e| ui_error(&e))?;
        serde_wasm_bindgen::to_value(&LoadSummary::from(&report)).map_err(serialization_error)
    }

    fn load_queued_internal(&mut self) -> Result<LoadReport, PageDeckError> {
        let files = std::mem::take(&mut self.pending);
        self.cancel = CancelToken::new();
        let cancel = self.cancel.clone();
        let callback = self.progress_callback.clone();
        let mut progress =
            move |current: usize, total: usize| report_progress(&callback, current, total);
        self.store
            .load_documents(&files, &mut self.renderer, &cancel, &mut progress)
    }

    fn insert_after_internal(
        &mut self,
        index: usize,
        name: &str,
        bytes: &[u8],
    ) -> Result<LoadReport, PageDeckError> {
        let file = InputFile::new(name, bytes.to_vec());
        self.cancel = CancelToken::new();
        let cancel = self.cancel.clone();
        let callback = self.progress_callback.clone();
        let mut progress =
            move |current: usize, total: usize| report_progress(&callback, current, total);
        self.store
            .insert_document_after(index, &file, &mut self.renderer, &cancel, &mut progress)
    }

    // ---- Commands -----------------------------------------------------

    /// Dispatch a tagged-JSON command, e.g. `{"type":"Rotate","index":2,"delta":90}`.
    #[wasm_bindgen(js_name = applyCommand)]
    pub fn apply_command(&mut self, json: &str) -> Result<(), JsValue> {
        let command: Command = serde_json::from_str(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid command: {}", e)))?;
        self.dispatch(command)
    }

    #[wasm_bindgen(js_name = rotatePage)]
    pub fn rotate_page(&mut self, index: usize, delta: i32) -> Result<(), JsValue> {
        self.dispatch(Command::Rotate { index, delta })
    }

    #[wasm_bindgen(js_name = rotateSelected)]
    pub fn rotate_selected(&mut self, delta: i32) -> Result<(), JsValue> {
        self.dispatch(Command::BulkRotate { delta })
    }

    #[wasm_bindgen(js_name = duplicatePage)]
    pub fn duplicate_page(&mut self, index: usize) -> Result<(), JsValue> {
        self.dispatch(Command::Duplicate { index })
    }

    #[wasm_bindgen(js_name = duplicateSelected)]
    pub fn duplicate_selected(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::BulkDuplicate)
    }

    #[wasm_bindgen(js_name = deletePage)]
    pub fn delete_page(&mut self, index: usize) -> Result<(), JsValue> {
        self.dispatch(Command::Delete { index })
    }

    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::BulkDelete)
    }

    #[wasm_bindgen(js_name = addBlankPage)]
    pub fn add_blank_page(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::AddBlankPage)
    }

    #[wasm_bindgen(js_name = movePage)]
    pub fn move_page(&mut self, old_index: usize, new_index: usize) -> Result<(), JsValue> {
        self.dispatch(Command::Reorder { old_index, new_index })
    }

    #[wasm_bindgen(js_name = toggleSelect)]
    pub fn toggle_select(&mut self, index: usize) -> Result<(), JsValue> {
        self.dispatch(Command::ToggleSelect { index })
    }

    #[wasm_bindgen(js_name = selectAll)]
    pub fn select_all(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::SelectAll)
    }

    #[wasm_bindgen(js_name = deselectAll)]
    pub fn deselect_all(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::DeselectAll)
    }

    #[wasm_bindgen(js_name = toggleSplitMarker)]
    pub fn toggle_split_marker(&mut self, index: usize) -> Result<(), JsValue> {
        self.dispatch(Command::ToggleSplitMarker { index })
    }

    #[wasm_bindgen(js_name = markSelectedForSplit)]
    pub fn mark_selected_for_split(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::BulkSplitMarker)
    }

    pub fn undo(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::Undo)
    }

    pub fn redo(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::Redo)
    }

    #[wasm_bindgen(js_name = resetAll)]
    pub fn reset_all(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::Reset)
    }

    fn dispatch(&mut self, command: Command) -> Result<(), JsValue> {
        self.store.apply(command).map_err(|e| ui_error(&e))
    }

    // ---- State queries ------------------------------------------------

    #[wasm_bindgen(js_name = pageCount)]
    pub fn page_count(&self) -> usize {
        self.store.len()
    }

    #[wasm_bindgen(js_name = documentCount)]
    pub fn document_count(&self) -> usize {
        self.store.document_count()
    }

    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.store.is_busy()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    #[wasm_bindgen(js_name = selectedIndices)]
    pub fn selected_indices(&self) -> Vec<u32> {
        self.store.selected().iter().map(|&i| i as u32).collect()
    }

    #[wasm_bindgen(js_name = splitMarkerIndices)]
    pub fn split_marker_indices(&self) -> Vec<u32> {
        self.store.split_markers().iter().map(|&i| i as u32).collect()
    }

    /// Per-slot state the UI renders from:
    /// `{blank, doc_index, page_index, rotation, display_rotation, width, height}`.
    #[wasm_bindgen(js_name = pageState)]
    pub fn page_state(&self, index: usize) -> Result<JsValue, JsValue> {
        let record = self
            .store
            .page(index)
            .ok_or_else(|| ui_error(&PageDeckError::IndexOutOfBounds(index)))?;
        let surface = record.thumbnail.surface();
        let state = PageStateJs {
            blank: record.is_blank(),
            doc_index: record.source.map(|s| s.doc_index),
            page_index: record.source.map(|s| s.page_index),
            rotation: record.rotation.degrees(),
            display_rotation: record.display_rotation.degrees(),
            width: surface.width(),
            height: surface.height(),
        };
        serde_wasm_bindgen::to_value(&state).map_err(serialization_error)
    }

    /// RGBA pixels of a slot's preview, row-major, for `putImageData`.
    #[wasm_bindgen(js_name = thumbnailPixels)]
    pub fn thumbnail_pixels(&self, index: usize) -> Result<js_sys::Uint8Array, JsValue> {
        let record = self
            .store
            .page(index)
            .ok_or_else(|| ui_error(&PageDeckError::IndexOutOfBounds(index)))?;
        Ok(js_sys::Uint8Array::from(
            record.thumbnail.surface().as_raw().as_slice(),
        ))
    }

    // ---- Export -------------------------------------------------------

    /// Export the whole collection: one PDF, or a ZIP of split documents
    /// when split markers are set.
    #[wasm_bindgen(js_name = exportAll)]
    pub fn export_all(&self) -> Result<ExportResult, JsValue> {
        self.store
            .export_all()
            .map(ExportResult::from)
            .map_err(|e| ui_error(&e))
    }

    /// Export the selected pages as one PDF.
    #[wasm_bindgen(js_name = exportSelected)]
    pub fn export_selected(&self) -> Result<ExportResult, JsValue> {
        self.store
            .export_selected()
            .map(ExportResult::from)
            .map_err(|e| ui_error(&e))
    }
}

/// A finished export, handed to JavaScript for download.
#[wasm_bindgen]
pub struct ExportResult {
    filename: String,
    bytes: Vec<u8>,
    archive: bool,
    segments: u32,
}

#[wasm_bindgen]
impl ExportResult {
    #[wasm_bindgen(getter)]
    pub fn filename(&self) -> String {
        self.filename.clone()
    }

    #[wasm_bindgen(getter, js_name = isArchive)]
    pub fn is_archive(&self) -> bool {
        self.archive
    }

    /// Number of PDFs inside an archive; 1 for a plain PDF export.
    #[wasm_bindgen(getter)]
    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.bytes.as_slice())
    }
}

impl From<ExportOutput> for ExportResult {
    fn from(output: ExportOutput) -> Self {
        match output {
            ExportOutput::Pdf { filename, bytes } => Self {
                filename,
                bytes,
                archive: false,
                segments: 1,
            },
            ExportOutput::Archive {
                filename,
                bytes,
                segments,
            } => Self {
                filename,
                bytes,
                archive: true,
                segments: segments as u32,
            },
        }
    }
}

#[derive(serde::Serialize)]
struct PageStateJs {
    blank: bool,
    doc_index: Option<usize>,
    page_index: Option<usize>,
    rotation: u16,
    display_rotation: u16,
    width: u32,
    height: u32,
}

#[derive(serde::Serialize)]
struct LoadSummary {
    pages_added: usize,
    cancelled: bool,
    failures: Vec<LoadFailureJs>,
}

#[derive(serde::Serialize)]
struct LoadFailureJs {
    name: String,
    message: String,
}

impl From<&LoadReport> for LoadSummary {
    fn from(report: &LoadReport) -> Self {
        Self {
            pages_added: report.pages_added,
            cancelled: report.cancelled,
            failures: report
                .failures
                .iter()
                .map(|f| LoadFailureJs {
                    name: f.name.clone(),
                    message: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Errors cross to JavaScript as `{severity: "info"|"error", message}`;
/// advisory rejections become informational modals.
fn ui_error(error: &PageDeckError) -> JsValue {
    let severity = match error.severity() {
        Severity::Advisory => "info",
        Severity::Error => "error",
    };
    let payload = UiError {
        severity,
        message: error.to_string(),
    };
    serde_wasm_bindgen::to_value(&payload)
        .unwrap_or_else(|_| JsValue::from_str(&payload.message))
}

#[derive(serde::Serialize)]
struct UiError {
    severity: &'static str,
    message: String,
}

fn serialization_error(e: serde_wasm_bindgen::Error) -> JsValue {
    JsValue::from_str(&format!("Serialization error: {}", e))
}

fn report_progress(callback: &Option<js_sys::Function>, current: usize, total: usize) {
    if let Some(callback) = callback {
        let _ = callback.call2(
            &JsValue::NULL,
            &JsValue::from(current as u32),
            &JsValue::from(total as u32),
        );
    }
}
