#![forbid(unsafe_code)]

//! Reentrancy guard shared between the engine and the host listeners.
//!
//! Synthetic native undo/redo commands issued by the engine make the host
//! deliver history notifications of their own, synchronously, while the
//! engine is still on the stack. [`SyncState`] tells those apart from user
//! gestures.
//!
//! # Invariants
//!
//! 1. The flag is set only while a [`GuardToken`] that acquired it is alive.
//! 2. Dropping the acquiring token clears the flag on every exit path,
//!    including `?` returns and unwinding panics.
//! 3. A token taken while the flag is already set never clears it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::host::{HostError, NativeCommand, NativeHost};
use crate::trigger::HistoryTrigger;

/// Result of screening a notification against the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// A genuine user trigger; run the state machine.
    Handle,
    /// A byproduct of the engine's own synthetic command; ignore it.
    Ignore,
}

/// Session-lifetime synchronization state.
///
/// Cloning yields another handle to the same flag, so listeners can check
/// it without borrowing the engine.
#[derive(Clone, Default)]
pub struct SyncState {
    reentrant: Rc<Cell<bool>>,
}

impl fmt::Debug for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncState")
            .field("reentrant", &self.reentrant.get())
            .finish()
    }
}

impl SyncState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True only while a synthetic command issued by the engine is in flight.
    #[must_use]
    pub fn is_reentrant(&self) -> bool {
        self.reentrant.get()
    }

    /// Close the gate for the lifetime of the returned token.
    pub fn enter(&self) -> GuardToken {
        let owned = !self.reentrant.replace(true);
        GuardToken {
            state: self.clone(),
            owned,
        }
    }

    /// Decide whether a notification should reach the state machine.
    #[must_use]
    pub fn screen(&self, trigger: &HistoryTrigger) -> Screen {
        if self.is_reentrant() {
            trace!(
                target: "undosync.guard",
                direction = %trigger.direction,
                source = %trigger.source,
                "screened synthetic notification"
            );
            Screen::Ignore
        } else {
            Screen::Handle
        }
    }
}

/// Scoped hold on the [`SyncState`] flag.
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken {
    state: SyncState,
    owned: bool,
}

impl GuardToken {
    /// Whether this token acquired the flag (and will release it).
    #[must_use]
    pub fn is_outermost(&self) -> bool {
        self.owned
    }
}

impl fmt::Debug for GuardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardToken")
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        if self.owned {
            self.state.reentrant.set(false);
        }
    }
}

/// Run a native editing command with the guard held.
///
/// The guard is released before this returns, whatever the command does.
pub fn run_guarded_native_command<H: NativeHost + ?Sized>(
    state: &SyncState,
    host: &mut H,
    command: NativeCommand<'_>,
) -> Result<bool, HostError> {
    let _token = state.enter();
    host.exec(command)
}
