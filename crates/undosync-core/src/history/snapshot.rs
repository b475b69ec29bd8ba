#![forbid(unsafe_code)]

//! Snapshot-based edit history.
//!
//! [`SnapshotHistory`] keeps whole document states behind [`Arc`]s. The
//! current state is the back of the undo stack:
//!
//! ```text
//! commit(s3)
//! ┌──────────────────────────────────────────────────┐
//! │ Undo Stack:  [Arc(s0), Arc(s1), Arc(s2), Arc(s3)]│
//! │ Redo Stack:  []                                   │
//! │ Current:     Arc(s3)                              │
//! └──────────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌──────────────────────────────────────────────────┐
//! │ Undo Stack:  [Arc(s0), Arc(s1)]                  │
//! │ Redo Stack:  [Arc(s2), Arc(s3)]                  │
//! │ Current:     Arc(s1)                              │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. The undo stack always holds at least the initial state.
//! 2. `undo_stack.len() <= config.max_depth` after any operation.
//! 3. The redo stack is cleared on every commit.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use super::EditHistory;

/// Configuration for a [`SnapshotHistory`].
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Maximum number of states (including the current one) kept for undo.
    /// Oldest states are evicted first. Values below 1 are treated as 1.
    pub max_depth: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl SnapshotConfig {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// No depth limit (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// Undo/redo over whole document states.
pub struct SnapshotHistory<T> {
    undo_stack: VecDeque<Arc<T>>,
    redo_stack: VecDeque<Arc<T>>,
    config: SnapshotConfig,
}

impl<T: fmt::Debug> fmt::Debug for SnapshotHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotHistory")
            .field("current", &self.current())
            .field("undo_depth", &self.undo_depth())
            .field("redo_depth", &self.redo_stack.len())
            .finish()
    }
}

impl<T> SnapshotHistory<T> {
    /// Start a history at `initial`.
    #[must_use]
    pub fn new(initial: T, config: SnapshotConfig) -> Self {
        let mut undo_stack = VecDeque::new();
        undo_stack.push_back(Arc::new(initial));
        Self {
            undo_stack,
            redo_stack: VecDeque::new(),
            config,
        }
    }

    /// Start a history at `initial` with the default depth limit.
    #[must_use]
    pub fn with_default_config(initial: T) -> Self {
        Self::new(initial, SnapshotConfig::default())
    }

    /// Record a new document state, clearing the redo stack.
    pub fn commit(&mut self, state: T) {
        self.redo_stack.clear();
        self.undo_stack.push_back(Arc::new(state));
        self.enforce_depth();
    }

    /// Step back one state and return it.
    pub fn undo_snapshot(&mut self) -> Option<Arc<T>> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let current = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(current);
        self.undo_stack.back().cloned()
    }

    /// Step forward one state and return it.
    pub fn redo_snapshot(&mut self) -> Option<Arc<T>> {
        let snapshot = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(snapshot);
        self.undo_stack.back().cloned()
    }

    /// The current document state.
    #[must_use]
    pub fn current(&self) -> &Arc<T> {
        // Invariant 1: never empty.
        &self.undo_stack[self.undo_stack.len() - 1]
    }

    /// Number of steps that can be undone.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len() - 1
    }

    /// Number of steps that can be redone.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Drop all history, keeping only the current state.
    pub fn clear(&mut self) {
        let current = Arc::clone(self.current());
        self.undo_stack.clear();
        self.undo_stack.push_back(current);
        self.redo_stack.clear();
    }

    fn enforce_depth(&mut self) {
        let max = self.config.max_depth.max(1);
        while self.undo_stack.len() > max {
            self.undo_stack.pop_front();
        }
    }
}

impl<T> EditHistory for SnapshotHistory<T> {
    fn undo(&mut self) -> bool {
        self.undo_snapshot().is_some()
    }

    fn redo(&mut self) -> bool {
        self.redo_snapshot().is_some()
    }

    fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
