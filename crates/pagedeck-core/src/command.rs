//! Commands: one variant per multi-tool button
//!
//! Every mutation that does not carry file bytes goes through
//! [`crate::store::PageStore::apply`], which validates, snapshots
//! (structural commands only), and mutates as one atomic sequence. The
//! tagged serde form lets a UI dispatch commands as plain JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    Rotate { index: usize, delta: i32 },
    BulkRotate { delta: i32 },
    Duplicate { index: usize },
    BulkDuplicate,
    Delete { index: usize },
    BulkDelete,
    AddBlankPage,
    Reorder { old_index: usize, new_index: usize },
    ToggleSelect { index: usize },
    SelectAll,
    DeselectAll,
    ToggleSplitMarker { index: usize },
    BulkSplitMarker,
    Undo,
    Redo,
    Reset,
}

impl Command {
    /// Structural commands capture an undo snapshot before mutating.
    /// Selection is ephemeral UI state and never snapshotted; undo and
    /// redo manage the stacks themselves.
    pub fn takes_snapshot(&self) -> bool {
        matches!(
            self,
            Command::Rotate { .. }
                | Command::BulkRotate { .. }
                | Command::Duplicate { .. }
                | Command::BulkDuplicate
                | Command::Delete { .. }
                | Command::BulkDelete
                | Command::AddBlankPage
                | Command::Reorder { .. }
                | Command::ToggleSplitMarker { .. }
                | Command::BulkSplitMarker
                | Command::Reset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_deserializes_rotate() {
        let json = r#"{"type":"Rotate","index":2,"delta":-90}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, Command::Rotate { index: 2, delta: -90 });
    }

    #[test]
    fn test_command_deserializes_reorder() {
        let json = r#"{"type":"Reorder","old_index":0,"new_index":3}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, Command::Reorder { .. }));
    }

    #[test]
    fn test_command_deserializes_unit_variants() {
        let cmd: Command = serde_json::from_str(r#"{"type":"Undo"}"#).unwrap();
        assert_eq!(cmd, Command::Undo);
        let cmd: Command = serde_json::from_str(r#"{"type":"AddBlankPage"}"#).unwrap();
        assert_eq!(cmd, Command::AddBlankPage);
    }

    #[test]
    fn test_selection_commands_do_not_snapshot() {
        assert!(!Command::ToggleSelect { index: 0 }.takes_snapshot());
        assert!(!Command::SelectAll.takes_snapshot());
        assert!(!Command::DeselectAll.takes_snapshot());
        assert!(!Command::Undo.takes_snapshot());
        assert!(!Command::Redo.takes_snapshot());
    }

    #[test]
    fn test_structural_commands_snapshot() {
        assert!(Command::Rotate { index: 0, delta: 90 }.takes_snapshot());
        assert!(Command::Delete { index: 0 }.takes_snapshot());
        assert!(Command::Reorder { old_index: 0, new_index: 1 }.takes_snapshot());
        assert!(Command::Reset.takes_snapshot());
    }
}
