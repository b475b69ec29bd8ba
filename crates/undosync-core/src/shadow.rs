#![forbid(unsafe_code)]

//! Shadow surface controller.
//!
//! The shadow surface is a detached, focusable, editable region the user
//! never sees. Editing it is the only way to make the host's native undo
//! manager record an entry without touching the real document:
//!
//! ```text
//! push_synthetic_undo_entry          push_synthetic_redo_entry
//! ┌──────────────────────────┐       ┌──────────────────────────┐
//! │ select shadow contents   │       │ push_synthetic_undo_entry│
//! │ insertText(filler)       │       │ undo   (guarded)         │
//! │ restore caller selection │       │ restore caller selection │
//! └──────────────────────────┘       └──────────────────────────┘
//!   native undo +1, redo cleared       native undo ±0, redo +1
//! ```
//!
//! Command failures are counted and logged, never retried: a failed
//! synthetic command leaves the native stacks slightly out of step but
//! cannot reach the real document.

use tracing::{debug, warn};

use crate::config::ShadowAttachment;
use crate::guard::{SyncState, run_guarded_native_command};
use crate::host::{HostError, NativeCommand, NativeHost};
use crate::selection::SelectionScope;

/// Default text inserted into the shadow surface.
pub const DEFAULT_FILLER: &str = "x";

/// Owns the shadow surface lifecycle and the two stack primitives.
#[derive(Debug)]
pub struct ShadowController {
    state: SyncState,
    attachment: ShadowAttachment,
    filler: String,
    /// Nesting depth of operations currently holding the shadow attached.
    attach_depth: usize,
    /// Whether a permanent attachment has been made.
    installed: bool,
    failures: u64,
}

impl ShadowController {
    /// Create a controller sharing `state` with the engine's listeners.
    #[must_use]
    pub fn new(state: SyncState, attachment: ShadowAttachment, filler: impl Into<String>) -> Self {
        Self {
            state,
            attachment,
            filler: filler.into(),
            attach_depth: 0,
            installed: false,
            failures: 0,
        }
    }

    /// The shared reentrancy state.
    #[must_use]
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    #[must_use]
    pub fn attachment(&self) -> ShadowAttachment {
        self.attachment
    }

    /// Native command failures swallowed so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Attach a permanent shadow surface up front.
    ///
    /// Per-operation controllers attach lazily instead; this is a no-op for
    /// them.
    pub fn install<H: NativeHost + ?Sized>(&mut self, host: &mut H) -> Result<(), HostError> {
        if self.attachment == ShadowAttachment::Permanent && !self.installed {
            host.attach_shadow()?;
            self.installed = true;
            debug!(target: "undosync.shadow", "shadow surface attached");
        }
        Ok(())
    }

    /// Detach a permanently attached shadow surface.
    pub fn uninstall<H: NativeHost + ?Sized>(&mut self, host: &mut H) {
        if self.installed {
            host.detach_shadow();
            self.installed = false;
            debug!(target: "undosync.shadow", "shadow surface detached");
        }
    }

    /// Push one native undo entry that targets the shadow surface only.
    ///
    /// Returns the caller's selection, which is already restored when this
    /// returns. Also clears the host's native redo stack.
    pub fn push_synthetic_undo_entry<H: NativeHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Option<H::Range> {
        if self.filler.is_empty() {
            // The host would report success without recording an entry.
            self.note_failure("insertText", &HostError::CommandFailed("insertText"));
            return host.selection();
        }
        if !self.acquire(host) {
            return host.selection();
        }
        let mut attached = AttachScope { ctl: self, host };
        let range = match attached.host.shadow_range() {
            Ok(range) => range,
            Err(err) => {
                attached.ctl.note_failure("shadow_range", &err);
                return attached.host.selection();
            }
        };

        let mut scope = SelectionScope::replace(&mut *attached.host, &range);
        let outcome = scope.exec(NativeCommand::InsertText(&attached.ctl.filler));
        let captured = scope.restore();
        attached.ctl.check("insertText", outcome);

        drop(attached);
        debug!(target: "undosync.shadow", "pushed synthetic undo entry");
        captured
    }

    /// Push one native redo entry that targets the shadow surface only.
    ///
    /// A synthetic undo entry is pushed and immediately undone under the
    /// guard, which the host records as a redo entry.
    pub fn push_synthetic_redo_entry<H: NativeHost + ?Sized>(&mut self, host: &mut H) {
        if !self.acquire(host) {
            return;
        }
        let mut attached = AttachScope { ctl: self, host };
        let failures = attached.ctl.failures;
        let captured = attached.ctl.push_synthetic_undo_entry(&mut *attached.host);
        if attached.ctl.failures != failures {
            // Without a fresh shadow entry on top, undo would hit a real one.
            return;
        }
        let outcome = attached
            .ctl
            .run_guarded_native_command(&mut *attached.host, NativeCommand::Undo);
        attached.ctl.check("undo", outcome);
        attached.host.set_selection(captured.as_ref());

        drop(attached);
        debug!(target: "undosync.shadow", "pushed synthetic redo entry");
    }

    /// Run a native command with the reentrancy guard held.
    pub fn run_guarded_native_command<H: NativeHost + ?Sized>(
        &self,
        host: &mut H,
        command: NativeCommand<'_>,
    ) -> Result<bool, HostError> {
        run_guarded_native_command(&self.state, host, command)
    }

    /// Record the outcome of a best-effort native command.
    pub(crate) fn check(&mut self, command: &'static str, outcome: Result<bool, HostError>) {
        match outcome {
            Ok(true) => {}
            Ok(false) => self.note_failure(command, &HostError::CommandFailed(command)),
            Err(err) => self.note_failure(command, &err),
        }
    }

    fn note_failure(&mut self, op: &'static str, err: &HostError) {
        self.failures += 1;
        warn!(target: "undosync.shadow", op, error = %err, "native command failed; ignoring");
    }

    fn acquire<H: NativeHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let needs_attach = match self.attachment {
            ShadowAttachment::Permanent => !self.installed,
            ShadowAttachment::PerOperation => self.attach_depth == 0,
        };
        if needs_attach {
            if let Err(err) = host.attach_shadow() {
                self.note_failure("attach_shadow", &err);
                return false;
            }
            if self.attachment == ShadowAttachment::Permanent {
                self.installed = true;
            }
        }
        self.attach_depth += 1;
        true
    }

    fn release<H: NativeHost + ?Sized>(&mut self, host: &mut H) {
        self.attach_depth = self.attach_depth.saturating_sub(1);
        if self.attach_depth == 0 && self.attachment == ShadowAttachment::PerOperation {
            host.detach_shadow();
        }
    }
}

/// One operation's hold on the shadow attachment, released on drop.
struct AttachScope<'a, H: NativeHost + ?Sized> {
    ctl: &'a mut ShadowController,
    host: &'a mut H,
}

impl<H: NativeHost + ?Sized> Drop for AttachScope<'_, H> {
    fn drop(&mut self) {
        self.ctl.release(&mut *self.host);
    }
}
