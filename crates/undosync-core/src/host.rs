#![forbid(unsafe_code)]

//! The host platform's native editing facility.
//!
//! [`NativeHost`] is the seam between the engine and whatever actually owns
//! the native undo manager: a browser document in `undosync-web`, a
//! simulated one in `undosync-harness`. Engine-family differences are
//! expressed as [`HostCapabilities`] picked once at initialization rather
//! than sniffed inside the state machine.

use std::fmt;

use crate::trigger::Surface;

/// A native editing command issued against the ambient focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCommand<'a> {
    /// Insert text at the current selection; always registers one native
    /// undo entry.
    InsertText(&'a str),
    Undo,
    Redo,
}

impl NativeCommand<'_> {
    /// The host command identifier (`document.execCommand` name).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InsertText(_) => "insertText",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

/// Errors reported by a [`NativeHost`].
///
/// None of these are surfaced to the end user; the engine logs and swallows
/// them at its boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host reported that the command did not run.
    CommandFailed(&'static str),
    /// The command raised an exception in the host.
    CommandThrew { command: &'static str, message: String },
    /// No selection object is available.
    SelectionUnavailable,
    /// The shadow surface could not be created, attached, or selected.
    ShadowUnavailable(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed(command) => write!(f, "native command `{command}` failed"),
            Self::CommandThrew { command, message } => {
                write!(f, "native command `{command}` threw: {message}")
            }
            Self::SelectionUnavailable => write!(f, "selection unavailable"),
            Self::ShadowUnavailable(msg) => write!(f, "shadow surface unavailable: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// Engine-family capabilities of the host, selected at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct HostCapabilities {
    /// Whether history notifications arrive before the host mutates anything
    /// and can be canceled.
    pub cancelable_history_events: bool,
    /// Which surface the host delivers user-initiated history notifications to.
    pub history_event_target: Surface,
}

impl HostCapabilities {
    /// Cancelable `beforeinput` delivered to the focused editing host.
    #[must_use]
    pub const fn chromium() -> Self {
        Self {
            cancelable_history_events: true,
            history_event_target: Surface::Real,
        }
    }

    /// Cancelable notification routed to the element owning the top native
    /// undo entry, which is the shadow surface once the stacks are primed.
    #[must_use]
    pub const fn webkit() -> Self {
        Self {
            cancelable_history_events: true,
            history_event_target: Surface::Shadow,
        }
    }

    /// Hosts that only report history operations after they happened.
    #[must_use]
    pub const fn non_cancelable() -> Self {
        Self {
            cancelable_history_events: false,
            history_event_target: Surface::Real,
        }
    }

    /// DOM event names to listen on for history notifications.
    ///
    /// Hosts that notify before mutating still report after the fact when
    /// the early notification was not cancelable, so they need both.
    #[must_use]
    pub const fn listen_events(&self) -> &'static [&'static str] {
        if self.cancelable_history_events {
            &["beforeinput", "input"]
        } else {
            &["input"]
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::chromium()
    }
}

/// The host's native editing facility, as seen by the engine.
///
/// All methods are synchronous. A native undo/redo issued through
/// [`exec`](Self::exec) may synchronously deliver a history notification
/// back to the engine's listeners; those listeners must screen it with the
/// shared [`SyncState`](crate::SyncState) before doing anything else.
pub trait NativeHost {
    /// Opaque snapshot of a selection range.
    type Range: Clone + fmt::Debug;

    /// The active selection range, if any.
    fn selection(&self) -> Option<Self::Range>;

    /// Replace the active selection; `None` clears every range.
    fn set_selection(&mut self, range: Option<&Self::Range>);

    /// A range covering the full contents of the shadow surface.
    fn shadow_range(&self) -> Result<Self::Range, HostError>;

    /// Insert the shadow surface into the live document.
    fn attach_shadow(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    /// Remove the shadow surface from the live document.
    fn detach_shadow(&mut self) {}

    /// Run a native editing command against the ambient focus.
    ///
    /// `Ok(false)` means the host declined the command without raising.
    fn exec(&mut self, command: NativeCommand<'_>) -> Result<bool, HostError>;
}
