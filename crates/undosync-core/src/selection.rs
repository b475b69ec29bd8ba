#![forbid(unsafe_code)]

//! Selection preservation around shadow-surface operations.
//!
//! Native editing commands act on the ambient selection, so every shadow
//! operation moves the selection into the shadow surface first. The caller's
//! selection must be back on the real surface before the operation returns,
//! whether or not the intermediate native command succeeded.

use std::ops::{Deref, DerefMut};

use crate::host::NativeHost;

/// Replace the active selection with `range` and return the previous one.
///
/// The previous selection is `None` before the first interaction.
pub fn capture_and_replace<H: NativeHost + ?Sized>(
    host: &mut H,
    range: &H::Range,
) -> Option<H::Range> {
    let previous = host.selection();
    host.set_selection(Some(range));
    previous
}

/// Borrow of a host whose selection was moved, restored on drop.
///
/// Derefs to the host so native commands can be issued while the scope is
/// open. [`restore`](Self::restore) ends the scope early and hands back the
/// captured selection.
pub struct SelectionScope<'a, H: NativeHost + ?Sized> {
    host: &'a mut H,
    previous: Option<H::Range>,
    restored: bool,
}

impl<'a, H: NativeHost + ?Sized> SelectionScope<'a, H> {
    /// Capture the current selection and move it to `range`.
    pub fn replace(host: &'a mut H, range: &H::Range) -> Self {
        let previous = capture_and_replace(host, range);
        Self {
            host,
            previous,
            restored: false,
        }
    }

    /// The selection that will be restored.
    #[must_use]
    pub fn captured(&self) -> Option<&H::Range> {
        self.previous.as_ref()
    }

    /// Put the captured selection back and return it.
    pub fn restore(mut self) -> Option<H::Range> {
        self.host.set_selection(self.previous.as_ref());
        self.restored = true;
        self.previous.take()
    }
}

impl<H: NativeHost + ?Sized> Deref for SelectionScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: NativeHost + ?Sized> DerefMut for SelectionScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: NativeHost + ?Sized> Drop for SelectionScope<'_, H> {
    fn drop(&mut self) {
        if !self.restored {
            self.host.set_selection(self.previous.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, NativeCommand};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RangeHost {
        selection: Option<&'static str>,
        history: Vec<Option<&'static str>>,
    }

    impl NativeHost for RangeHost {
        type Range = &'static str;

        fn selection(&self) -> Option<&'static str> {
            self.selection
        }

        fn set_selection(&mut self, range: Option<&&'static str>) {
            self.selection = range.copied();
            self.history.push(self.selection);
        }

        fn shadow_range(&self) -> Result<&'static str, HostError> {
            Ok("shadow")
        }

        fn exec(&mut self, command: NativeCommand<'_>) -> Result<bool, HostError> {
            Err(HostError::CommandFailed(command.name()))
        }
    }

    #[test]
    fn capture_returns_previous() {
        let mut host = RangeHost {
            selection: Some("caret"),
            ..Default::default()
        };
        let prev = capture_and_replace(&mut host, &"shadow");
        assert_eq!(prev, Some("caret"));
        assert_eq!(host.selection, Some("shadow"));
    }

    #[test]
    fn capture_tolerates_absent_selection() {
        let mut host = RangeHost::default();
        assert_eq!(capture_and_replace(&mut host, &"shadow"), None);
    }

    #[test]
    fn scope_restores_on_drop() {
        let mut host = RangeHost {
            selection: Some("caret"),
            ..Default::default()
        };
        {
            let mut scope = SelectionScope::replace(&mut host, &"shadow");
            assert_eq!(scope.selection(), Some("shadow"));
            let _ = scope.exec(NativeCommand::InsertText("x"));
        }
        assert_eq!(host.selection, Some("caret"));
        assert_eq!(host.history, vec![Some("shadow"), Some("caret")]);
    }

    #[test]
    fn explicit_restore_returns_capture_once() {
        let mut host = RangeHost {
            selection: Some("caret"),
            ..Default::default()
        };
        let scope = SelectionScope::replace(&mut host, &"shadow");
        assert_eq!(scope.captured(), Some(&"caret"));
        assert_eq!(scope.restore(), Some("caret"));
        // Dropping after restore() must not set the selection again.
        assert_eq!(host.history, vec![Some("shadow"), Some("caret")]);
    }

    #[test]
    fn absent_selection_is_cleared_on_restore() {
        let mut host = RangeHost::default();
        drop(SelectionScope::replace(&mut host, &"shadow"));
        assert_eq!(host.selection, None);
    }
}
