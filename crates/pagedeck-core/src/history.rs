//! Snapshot-based undo/redo
//!
//! Linear history over full-collection snapshots: a snapshot is pushed
//! before every structural mutation, undo and redo swap whole states, and
//! any new mutation invalidates the redo stack. Depth is unbounded.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::page::PageRecord;
use crate::source::SourceDocument;

/// Captured collection state.
///
/// Page records share thumbnail surfaces with the live collection (rasters
/// are immutable; only duplication copies pixels). Source documents are
/// shared handles so a snapshot stays restorable even after a reset has
/// cleared the live document list.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub documents: Vec<Arc<SourceDocument>>,
    pub pages: Vec<PageRecord>,
    pub selected: BTreeSet<usize>,
    pub split_markers: BTreeSet<usize>,
}

#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state preceding a mutation. Clears the redo stack.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.undo.push(snapshot);
        self.redo.clear();
    }

    /// Pop the last recorded state, parking `current` for redo.
    /// Returns `None` (and leaves `current` unused) when there is nothing
    /// to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Symmetric to [`History::undo`]; does not clear the redo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
