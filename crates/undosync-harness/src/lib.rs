#![forbid(unsafe_code)]

//! Deterministic fixtures for exercising `undosync-core` without a browser.
//!
//! - [`SimBrowser`]: a document-level native undo manager with a real and a
//!   shadow editing surface, a selection, engine-family profiles, and fault
//!   injection.
//! - [`SimEditor`]: a reference editor whose document lives in a
//!   [`SnapshotHistory`](undosync_core::SnapshotHistory).
//! - [`SimSession`]: wires both to a [`SyncEngine`](undosync_core::SyncEngine)
//!   and drives user gestures the way each host family delivers them.

pub mod browser;
pub mod editor;
pub mod session;

pub use browser::{DispatchRecord, Fault, FaultMode, NativeEntry, SimBrowser, SimRange};
pub use editor::SimEditor;
pub use session::{GestureReport, SimNotification, SimSession};
