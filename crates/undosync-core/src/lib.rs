#![forbid(unsafe_code)]

//! `undosync-core` keeps a host platform's native undo/redo facility in step
//! with an editor-owned edit history.
//!
//! Native history triggers (keyboard shortcuts, OS gestures, dictation,
//! accessibility tooling) are intercepted and redirected into the editor's
//! [`EditHistory`] instead of being allowed to mutate the visible document.
//! A hidden, editable shadow surface absorbs synthetic native edits so the
//! host's native stacks stay primed without ever pointing at the real
//! document.
//!
//! # Architecture
//!
//! ```text
//!  host notification (historyUndo / historyRedo)
//!        │
//!        ▼
//!  ┌──────────────┐  reentrant?  ┌──────────────┐
//!  │  SyncEngine  │─────────────►│  ignore      │
//!  └──────┬───────┘              └──────────────┘
//!         │ suppress default / compensate
//!         ▼
//!  ┌──────────────┐  undo()/redo()/can_*()
//!  │ EditHistory  │◄─────────────────────────
//!  └──────────────┘
//!         │ replenish native stacks
//!         ▼
//!  ┌──────────────────┐  insertText / undo   ┌────────────────┐
//!  │ ShadowController │─────────────────────►│ NativeHost     │
//!  └──────────────────┘  (selection-scoped)  └────────────────┘
//! ```
//!
//! Everything runs synchronously inside the host's notification turn. The
//! only mutable shared state is the [`SyncState`] flag, which is held through
//! RAII [`GuardToken`]s so that neither an error nor a panic can leave it
//! closed.

pub mod config;
pub mod engine;
pub mod guard;
pub mod history;
pub mod host;
pub mod selection;
pub mod shadow;
pub mod trigger;

pub use config::{ConfigError, ShadowAttachment, SyncConfig};
pub use engine::{Disposition, SyncEngine, SyncOutcome, SyncPhase, SyncStats};
pub use guard::{GuardToken, Screen, SyncState, run_guarded_native_command};
pub use history::{EditHistory, SnapshotConfig, SnapshotHistory};
pub use host::{HostCapabilities, HostError, NativeCommand, NativeHost};
pub use selection::{SelectionScope, capture_and_replace};
pub use shadow::ShadowController;
pub use trigger::{HistoryDirection, HistoryNotification, HistoryTrigger, Surface};
