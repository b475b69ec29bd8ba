#![forbid(unsafe_code)]

//! Native history-trigger notifications.

use std::fmt;

/// Which way a native history trigger moves through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryDirection {
    Undo,
    Redo,
}

impl HistoryDirection {
    /// The other direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }

    /// Map a DOM `InputEvent.inputType` onto a history direction.
    ///
    /// Returns `None` for every input type that is not a history trigger;
    /// those must be left to the host untouched.
    #[must_use]
    pub fn from_input_type(input_type: &str) -> Option<Self> {
        match input_type {
            "historyUndo" => Some(Self::Undo),
            "historyRedo" => Some(Self::Redo),
            _ => None,
        }
    }

    /// The DOM `inputType` that carries this direction.
    #[must_use]
    pub const fn input_type(self) -> &'static str {
        match self {
            Self::Undo => "historyUndo",
            Self::Redo => "historyRedo",
        }
    }
}

impl fmt::Display for HistoryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

/// An editable region the host can deliver notifications to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum Surface {
    /// The visible editor surface backed by the document model.
    #[default]
    Real,
    /// The hidden proxy region that absorbs synthetic native edits.
    Shadow,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => f.write_str("real"),
            Self::Shadow => f.write_str("shadow"),
        }
    }
}

/// A single native history trigger as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTrigger {
    pub direction: HistoryDirection,
    /// Whether the host still allows the default action to be suppressed.
    pub cancelable: bool,
    /// The surface the host delivered the notification to.
    pub source: Surface,
    /// The host ran its own undo/redo before notifying.
    pub default_applied: bool,
}

impl HistoryTrigger {
    #[must_use]
    pub const fn new(direction: HistoryDirection, cancelable: bool, source: Surface) -> Self {
        Self {
            direction,
            cancelable,
            source,
            default_applied: false,
        }
    }

    /// A cancelable undo delivered to the real surface.
    #[must_use]
    pub const fn undo() -> Self {
        Self::new(HistoryDirection::Undo, true, Surface::Real)
    }

    /// A cancelable redo delivered to the real surface.
    #[must_use]
    pub const fn redo() -> Self {
        Self::new(HistoryDirection::Redo, true, Surface::Real)
    }

    #[must_use]
    pub const fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    #[must_use]
    pub const fn with_source(mut self, source: Surface) -> Self {
        self.source = source;
        self
    }

    /// Mark the trigger as reported after the host's default action.
    ///
    /// Such a trigger can no longer be canceled.
    #[must_use]
    pub const fn with_default_applied(mut self, applied: bool) -> Self {
        self.default_applied = applied;
        if applied {
            self.cancelable = false;
        }
        self
    }
}

/// A live host notification carrying a [`HistoryTrigger`].
///
/// The engine calls [`prevent_default`](Self::prevent_default) from inside
/// the handler turn, before it touches the history, when the trigger is
/// cancelable.
pub trait HistoryNotification {
    /// The trigger this notification carries.
    fn trigger(&self) -> HistoryTrigger;

    /// Cancel the host's default action for this notification.
    fn prevent_default(&mut self);
}

/// Plain triggers can stand in for notifications whose default action is
/// handled elsewhere.
impl HistoryNotification for HistoryTrigger {
    fn trigger(&self) -> HistoryTrigger {
        *self
    }

    fn prevent_default(&mut self) {}
}
