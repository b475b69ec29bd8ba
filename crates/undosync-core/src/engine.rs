#![forbid(unsafe_code)]

//! Event interception and the per-trigger synchronization state machine.
//!
//! # State Machine
//!
//! ```text
//!            reentrant ─────────────────────────────┐
//!   Idle ──► screen ──► SuppressingNative ──► Replenishing ──► Idle
//!                        │ cancelable: prevent_default
//!                        │ applied:    guarded reverse native command
//! ```
//!
//! Every step runs synchronously inside one call to [`SyncEngine::handle`],
//! in a fixed order: suppress (or compensate), apply the history operation,
//! replenish the native stacks. Nothing is deferred to a later turn, so a
//! second rapid gesture can never interleave with an unfinished one.
//!
//! The reentrancy guard is held for the whole of `handle`, history calls
//! included, not only around the synthetic native commands. Anything the
//! host or the editor delivers synchronously during the call is screened.
//! The phase returns to [`SyncPhase::Idle`] on every exit path, unwinding
//! included.
//!
//! # Notification Timing
//!
//! | Cancelable | Default applied | Action                             |
//! |------------|-----------------|------------------------------------|
//! | yes        | no              | `prevent_default`, then handle     |
//! | no         | yes             | compensate, then handle            |
//! | no         | no              | defer to the after-the-fact report |
//!
//! A trigger that is neither cancelable nor marked applied counts as applied
//! when the host is configured without cancelable history notifications,
//! since such hosts only ever report afterwards.
//!
//! # Replenishment
//!
//! | Trigger | History call | Native undo entry        | Native redo entry        |
//! |---------|--------------|--------------------------|--------------------------|
//! | Undo    | `undo()`     | if `can_undo()`, first   | always, second           |
//! | Redo    | `redo()`     | always, first            | if `can_redo()`, second  |
//!
//! Pushing a native undo entry clears the host's native redo stack, so the
//! undo entry always goes first. For a redo with nothing left to redo this
//! is what empties the native redo stack.
//!
//! # Failure Modes
//!
//! Every native command failure is logged and swallowed. The worst outcome
//! is that native undo/redo stops reaching the engine; the real document is
//! never touched by a synthetic command.

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::{debug, debug_span, trace};

use crate::config::{ConfigError, SyncConfig};
use crate::guard::{Screen, SyncState};
use crate::history::EditHistory;
use crate::host::{HostError, NativeCommand, NativeHost};
use crate::shadow::ShadowController;
use crate::trigger::{HistoryDirection, HistoryNotification, HistoryTrigger};

/// Where the engine is within the handling of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Notification received; default action being canceled or compensated.
    SuppressingNative,
    /// History applied; shadow operations in flight.
    Replenishing,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::SuppressingNative => f.write_str("suppressing_native"),
            Self::Replenishing => f.write_str("replenishing"),
        }
    }
}

/// Whether the engine took ownership of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// A synthetic byproduct of the engine's own commands; nothing happened.
    #[default]
    Ignored,
    /// Not cancelable and not yet applied. The host reports the same gesture
    /// again once its default action has run.
    Deferred,
    /// Redirected into the edit history.
    Intercepted,
}

/// What one call to [`SyncEngine::handle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub disposition: Disposition,
    /// The host's default action was canceled.
    pub default_prevented: bool,
    /// A guarded reverse native command undid the host's own mutation.
    pub compensated: bool,
    /// The edit history reported a change.
    pub history_applied: bool,
    /// A synthetic native undo entry was pushed without failures.
    pub replenished_undo: bool,
    /// A synthetic native redo entry was pushed without failures.
    pub replenished_redo: bool,
}

impl SyncOutcome {
    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        self.disposition == Disposition::Intercepted
    }
}

/// Session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    pub undo_intercepted: u64,
    pub redo_intercepted: u64,
    /// Notifications screened out by the reentrancy guard.
    pub ignored_reentrant: u64,
    /// Early non-cancelable notifications left for the after-the-fact one.
    pub deferred: u64,
    pub compensations: u64,
    /// Native command failures swallowed by the shadow controller.
    pub command_failures: u64,
}

/// Keeps a host's native undo/redo stacks in step with an [`EditHistory`].
#[derive(Debug)]
pub struct SyncEngine {
    config: SyncConfig,
    state: SyncState,
    shadow: ShadowController,
    phase: SyncPhase,
    stats: SyncStats,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::build(SyncConfig::default())
    }
}

impl SyncEngine {
    /// Build an engine for a configuration that passes
    /// [`SyncConfig::validate`].
    pub fn new(config: SyncConfig) -> Result<Self, ConfigError> {
        Ok(Self::build(config.validated()?))
    }

    fn build(config: SyncConfig) -> Self {
        let state = SyncState::new();
        let shadow = ShadowController::new(
            state.clone(),
            config.shadow_attachment,
            config.filler_text.clone(),
        );
        Self {
            config,
            state,
            shadow,
            phase: SyncPhase::Idle,
            stats: SyncStats::default(),
        }
    }

    /// Handle to the reentrancy flag for host listeners.
    ///
    /// Listeners must screen with it before borrowing the engine.
    #[must_use]
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    #[must_use]
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            command_failures: self.shadow.failures(),
            ..self.stats
        }
    }

    #[must_use]
    pub fn shadow(&self) -> &ShadowController {
        &self.shadow
    }

    pub fn shadow_mut(&mut self) -> &mut ShadowController {
        &mut self.shadow
    }

    /// Attach the shadow surface for the session.
    pub fn install<H: NativeHost + ?Sized>(&mut self, host: &mut H) -> Result<(), HostError> {
        self.shadow.install(host)
    }

    /// Detach the shadow surface at the end of the session.
    pub fn uninstall<H: NativeHost + ?Sized>(&mut self, host: &mut H) {
        self.shadow.uninstall(host);
    }

    /// Handle one native history notification.
    ///
    /// The whole call runs with the reentrancy guard held, so any
    /// notification the host delivers synchronously while this runs (from
    /// either surface) is screened out.
    pub fn handle<N, E, H>(
        &mut self,
        notification: &mut N,
        history: &mut E,
        host: &mut H,
    ) -> SyncOutcome
    where
        N: HistoryNotification + ?Sized,
        E: EditHistory + ?Sized,
        H: NativeHost + ?Sized,
    {
        let trigger = notification.trigger();
        if self.state.screen(&trigger) == Screen::Ignore {
            self.stats.ignored_reentrant += 1;
            return SyncOutcome::default();
        }
        let applied = self.is_applied(&trigger);
        if !trigger.cancelable && !applied {
            self.stats.deferred += 1;
            debug!(
                target: "undosync.engine",
                direction = %trigger.direction,
                source = %trigger.source,
                "too early to compensate; waiting for the applied notification"
            );
            return SyncOutcome {
                disposition: Disposition::Deferred,
                ..SyncOutcome::default()
            };
        }

        let _token = self.state.enter();
        let span = debug_span!(
            target: "undosync.engine",
            "history_trigger",
            direction = %trigger.direction,
            cancelable = trigger.cancelable,
            source = %trigger.source
        );
        let _enter = span.enter();
        let mut engine = PhaseScope { engine: self };

        let mut outcome = SyncOutcome {
            disposition: Disposition::Intercepted,
            ..SyncOutcome::default()
        };

        engine.transition(SyncPhase::SuppressingNative);
        if !applied {
            notification.prevent_default();
            outcome.default_prevented = true;
        } else if engine.config.compensate_non_cancelable {
            // The host already applied its own history step; walk it back.
            let reverse = match trigger.direction {
                HistoryDirection::Undo => NativeCommand::Redo,
                HistoryDirection::Redo => NativeCommand::Undo,
            };
            let result = engine.shadow.run_guarded_native_command(host, reverse);
            engine.shadow.check(reverse.name(), result);
            outcome.compensated = true;
            engine.stats.compensations += 1;
            debug!(
                target: "undosync.engine",
                command = reverse.name(),
                "compensated native mutation"
            );
        }

        engine.transition(SyncPhase::Replenishing);
        match trigger.direction {
            HistoryDirection::Undo => {
                engine.stats.undo_intercepted += 1;
                outcome.history_applied = history.undo();
                if history.can_undo() {
                    outcome.replenished_undo = engine.replenish(host, HistoryDirection::Undo);
                }
                outcome.replenished_redo = engine.replenish(host, HistoryDirection::Redo);
            }
            HistoryDirection::Redo => {
                engine.stats.redo_intercepted += 1;
                outcome.history_applied = history.redo();
                outcome.replenished_undo = engine.replenish(host, HistoryDirection::Undo);
                if history.can_redo() {
                    outcome.replenished_redo = engine.replenish(host, HistoryDirection::Redo);
                }
            }
        }

        engine.transition(SyncPhase::Idle);
        debug!(
            target: "undosync.engine",
            history_applied = outcome.history_applied,
            replenished_undo = outcome.replenished_undo,
            replenished_redo = outcome.replenished_redo,
            "trigger handled"
        );
        outcome
    }

    /// Whether the host already ran its default action for `trigger`.
    fn is_applied(&self, trigger: &HistoryTrigger) -> bool {
        trigger.default_applied
            || (!trigger.cancelable && !self.config.capabilities.cancelable_history_events)
    }

    /// Push one synthetic entry onto the given native stack.
    ///
    /// Returns `false` if any native command failed along the way.
    fn replenish<H: NativeHost + ?Sized>(&mut self, host: &mut H, stack: HistoryDirection) -> bool {
        let before = self.shadow.failures();
        match stack {
            HistoryDirection::Undo => {
                self.shadow.push_synthetic_undo_entry(host);
            }
            HistoryDirection::Redo => self.shadow.push_synthetic_redo_entry(host),
        }
        self.shadow.failures() == before
    }

    fn transition(&mut self, next: SyncPhase) {
        trace!(target: "undosync.engine", from = %self.phase, to = %next, "phase");
        self.phase = next;
    }
}

/// Engine borrow for one handled trigger; the phase is back to idle on drop.
struct PhaseScope<'a> {
    engine: &'a mut SyncEngine,
}

impl Deref for PhaseScope<'_> {
    type Target = SyncEngine;

    fn deref(&self) -> &SyncEngine {
        self.engine
    }
}

impl DerefMut for PhaseScope<'_> {
    fn deref_mut(&mut self) -> &mut SyncEngine {
        self.engine
    }
}

impl Drop for PhaseScope<'_> {
    fn drop(&mut self) {
        if self.engine.phase != SyncPhase::Idle {
            self.engine.transition(SyncPhase::Idle);
        }
    }
}
