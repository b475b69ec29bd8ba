#![forbid(unsafe_code)]

//! Reference editor backed by a [`SnapshotHistory`].

use undosync_core::{EditHistory, SnapshotConfig, SnapshotHistory};

/// A plain-text editor with its own undo history.
///
/// Counts every history call so tests can assert exactly-once handling.
#[derive(Debug)]
pub struct SimEditor {
    history: SnapshotHistory<String>,
    undo_calls: u32,
    redo_calls: u32,
}

impl SimEditor {
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self {
            history: SnapshotHistory::new(initial.to_owned(), SnapshotConfig::unlimited()),
            undo_calls: 0,
            redo_calls: 0,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.history.current().as_str()
    }

    /// Record a new document state.
    pub fn commit(&mut self, text: &str) {
        self.history.commit(text.to_owned());
    }

    #[must_use]
    pub fn undo_calls(&self) -> u32 {
        self.undo_calls
    }

    #[must_use]
    pub fn redo_calls(&self) -> u32 {
        self.redo_calls
    }

    #[must_use]
    pub fn history(&self) -> &SnapshotHistory<String> {
        &self.history
    }
}

impl EditHistory for SimEditor {
    fn undo(&mut self) -> bool {
        self.undo_calls += 1;
        self.history.undo()
    }

    fn redo(&mut self) -> bool {
        self.redo_calls += 1;
        self.history.redo()
    }

    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
