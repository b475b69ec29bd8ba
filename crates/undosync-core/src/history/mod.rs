#![forbid(unsafe_code)]

//! The editor-owned edit history the engine redirects native triggers into.
//!
//! The engine only consumes [`EditHistory`]; the real history normally lives
//! in the embedding editor framework. [`SnapshotHistory`] is a ready-made
//! implementation for Rust embedders and for the test harness.

pub mod snapshot;

pub use snapshot::{SnapshotConfig, SnapshotHistory};

/// An application-level undo/redo history over the document model.
///
/// All calls are synchronous and side-effecting on the document.
pub trait EditHistory {
    /// Undo one step. Returns `false` when there was nothing to undo.
    fn undo(&mut self) -> bool;

    /// Redo one step. Returns `false` when there was nothing to redo.
    fn redo(&mut self) -> bool;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;
}

impl<H: EditHistory + ?Sized> EditHistory for &mut H {
    fn undo(&mut self) -> bool {
        (**self).undo()
    }

    fn redo(&mut self) -> bool {
        (**self).redo()
    }

    fn can_undo(&self) -> bool {
        (**self).can_undo()
    }

    fn can_redo(&self) -> bool {
        (**self).can_redo()
    }
}
