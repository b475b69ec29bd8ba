#![forbid(unsafe_code)]

//! Simulated browser host.
//!
//! Models exactly what the engine depends on: one document-level native
//! undo manager shared by every editable surface, a single selection, and
//! `insertText`/`undo`/`redo` commands that act on whichever surface the
//! selection (or the stack entry) belongs to.
//!
//! ```text
//!   real:   "ab"          undo stack: [Real "a"→"ab", Shadow ""→"x"]
//!   shadow: "x"           redo stack: []
//!   selection: Real 2..2
//! ```
//!
//! Native undo/redo issued through [`NativeHost::exec`] synchronously
//! dispatches a history notification to the surface that owned the entry.
//! The dispatch is screened through the listener's [`SyncState`] and
//! recorded, so tests can assert that every synthetic notification was
//! ignored.

use tracing::trace;
use undosync_core::{
    HistoryDirection, HistoryTrigger, HostCapabilities, HostError, NativeCommand, NativeHost,
    Screen, Surface, SyncState,
};

/// A selection inside one surface, as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimRange {
    pub surface: Surface,
    pub start: usize,
    pub end: usize,
}

impl SimRange {
    #[must_use]
    pub const fn caret(surface: Surface, at: usize) -> Self {
        Self {
            surface,
            start: at,
            end: at,
        }
    }
}

/// One entry on the native undo or redo stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEntry {
    pub surface: Surface,
    pub before: String,
    pub after: String,
    /// The content this entry recorded was replaced by a script, so
    /// applying it no longer changes anything.
    pub stale: bool,
}

/// How an injected fault manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// The command reports failure (`execCommand` returning `false`).
    Decline,
    /// The command throws.
    Throw,
    /// The command panics mid-flight.
    Panic,
}

/// A one-shot fault armed against the next command with a given name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// Matches [`NativeCommand::name`].
    pub command: &'static str,
    pub mode: FaultMode,
}

impl Fault {
    #[must_use]
    pub const fn on(command: &'static str, mode: FaultMode) -> Self {
        Self { command, mode }
    }
}

/// A history notification the browser dispatched on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRecord {
    pub trigger: HistoryTrigger,
    /// `None` when no listener was registered.
    pub screen: Option<Screen>,
}

/// Deterministic stand-in for a browser's editing facilities.
#[derive(Debug, Default)]
pub struct SimBrowser {
    profile: HostCapabilities,
    real: String,
    shadow: String,
    shadow_attached: bool,
    selection: Option<SimRange>,
    undo_stack: Vec<NativeEntry>,
    redo_stack: Vec<NativeEntry>,
    listener: Option<SyncState>,
    dispatches: Vec<DispatchRecord>,
    faults: Vec<Fault>,
    commands: Vec<String>,
    attach_count: u32,
}

impl SimBrowser {
    /// A browser showing `initial` in the real surface, caret at the end.
    #[must_use]
    pub fn new(profile: HostCapabilities, initial: &str) -> Self {
        Self {
            profile,
            real: initial.to_owned(),
            selection: Some(SimRange::caret(Surface::Real, initial.len())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn profile(&self) -> HostCapabilities {
        self.profile
    }

    /// Register the state a page listener would screen with.
    pub fn listen(&mut self, state: SyncState) {
        self.listener = Some(state);
    }

    #[must_use]
    pub fn real_text(&self) -> &str {
        &self.real
    }

    #[must_use]
    pub fn shadow_text(&self) -> &str {
        &self.shadow
    }

    #[must_use]
    pub fn is_shadow_attached(&self) -> bool {
        self.shadow_attached
    }

    /// Number of times the shadow surface was inserted into the document.
    #[must_use]
    pub fn attach_count(&self) -> u32 {
        self.attach_count
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn undo_stack(&self) -> &[NativeEntry] {
        &self.undo_stack
    }

    #[must_use]
    pub fn redo_stack(&self) -> &[NativeEntry] {
        &self.redo_stack
    }

    /// Notifications dispatched by native commands, in order.
    #[must_use]
    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    /// Names of every command executed, in order.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Arm a one-shot fault.
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Disarm every pending fault.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Whether any armed fault has not fired yet.
    #[must_use]
    pub fn has_pending_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    /// A user edit in the real surface. Records a native undo entry and
    /// clears the native redo stack, as any fresh edit does.
    pub fn user_edit(&mut self, next: &str) {
        let entry = NativeEntry {
            surface: Surface::Real,
            before: std::mem::replace(&mut self.real, next.to_owned()),
            after: next.to_owned(),
            stale: false,
        };
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        self.selection = Some(SimRange::caret(Surface::Real, next.len()));
    }

    /// The editor re-rendering its document into the real surface.
    ///
    /// Not an edit: nothing is pushed, but entries recorded against the
    /// replaced real content go stale.
    pub fn render(&mut self, text: &str) {
        if self.real == text {
            return;
        }
        self.real = text.to_owned();
        for entry in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            if entry.surface == Surface::Real {
                entry.stale = true;
            }
        }
    }

    /// The surface a user gesture's notification is delivered to.
    #[must_use]
    pub fn gesture_target(&self, direction: HistoryDirection) -> Surface {
        match self.profile.history_event_target {
            Surface::Real => Surface::Real,
            Surface::Shadow => self
                .top(direction)
                .map_or(Surface::Real, |entry| entry.surface),
        }
    }

    /// Apply the native default action of a history gesture, without
    /// dispatching anything. Returns `false` if the stack was empty.
    pub fn apply_default(&mut self, direction: HistoryDirection) -> bool {
        self.step(direction).is_some()
    }

    fn top(&self, direction: HistoryDirection) -> Option<&NativeEntry> {
        match direction {
            HistoryDirection::Undo => self.undo_stack.last(),
            HistoryDirection::Redo => self.redo_stack.last(),
        }
    }

    /// Pop one entry from the stack for `direction`, apply it, and move it
    /// to the opposite stack. Returns the surface it touched.
    fn step(&mut self, direction: HistoryDirection) -> Option<Surface> {
        let entry = match direction {
            HistoryDirection::Undo => self.undo_stack.pop()?,
            HistoryDirection::Redo => self.redo_stack.pop()?,
        };
        let surface = entry.surface;
        if !entry.stale {
            let text = match direction {
                HistoryDirection::Undo => entry.before.clone(),
                HistoryDirection::Redo => entry.after.clone(),
            };
            self.selection = Some(SimRange::caret(surface, text.len()));
            *self.surface_mut(surface) = text;
        }
        match direction {
            HistoryDirection::Undo => self.redo_stack.push(entry),
            HistoryDirection::Redo => self.undo_stack.push(entry),
        }
        Some(surface)
    }

    fn surface_mut(&mut self, surface: Surface) -> &mut String {
        match surface {
            Surface::Real => &mut self.real,
            Surface::Shadow => &mut self.shadow,
        }
    }

    fn insert_text(&mut self, text: &str) -> bool {
        let Some(range) = self.selection else {
            return false;
        };
        if range.surface == Surface::Shadow && !self.shadow_attached {
            return false;
        }
        let attached = self.surface_mut(range.surface);
        let end = range.end.min(attached.len());
        let start = range.start.min(end);
        let before = attached.clone();
        attached.replace_range(start..end, text);
        let after = attached.clone();
        self.undo_stack.push(NativeEntry {
            surface: range.surface,
            before,
            after,
            stale: false,
        });
        self.redo_stack.clear();
        self.selection = Some(SimRange::caret(range.surface, start + text.len()));
        true
    }

    fn native_history(&mut self, direction: HistoryDirection) -> bool {
        let Some(surface) = self.step(direction) else {
            return false;
        };
        // Reported after the step; scripts cannot cancel their own execCommand.
        let trigger = HistoryTrigger::new(direction, false, surface).with_default_applied(true);
        let screen = self.listener.as_ref().map(|state| state.screen(&trigger));
        trace!(target: "undosync.harness", %direction, %surface, ?screen, "dispatched");
        self.dispatches.push(DispatchRecord { trigger, screen });
        true
    }

    fn take_fault(&mut self, command: &str) -> Option<FaultMode> {
        let index = self.faults.iter().position(|f| f.command == command)?;
        Some(self.faults.remove(index).mode)
    }
}

impl NativeHost for SimBrowser {
    type Range = SimRange;

    fn selection(&self) -> Option<SimRange> {
        self.selection
    }

    fn set_selection(&mut self, range: Option<&SimRange>) {
        self.selection = range.copied();
    }

    fn shadow_range(&self) -> Result<SimRange, HostError> {
        if !self.shadow_attached {
            return Err(HostError::ShadowUnavailable("not attached".into()));
        }
        Ok(SimRange {
            surface: Surface::Shadow,
            start: 0,
            end: self.shadow.len(),
        })
    }

    fn attach_shadow(&mut self) -> Result<(), HostError> {
        if !self.shadow_attached {
            self.shadow_attached = true;
            self.attach_count += 1;
        }
        Ok(())
    }

    fn detach_shadow(&mut self) {
        self.shadow_attached = false;
    }

    fn exec(&mut self, command: NativeCommand<'_>) -> Result<bool, HostError> {
        let name = command.name();
        self.commands.push(name.to_owned());
        match self.take_fault(name) {
            Some(FaultMode::Decline) => return Ok(false),
            Some(FaultMode::Throw) => {
                return Err(HostError::CommandThrew {
                    command: name,
                    message: "injected".into(),
                });
            }
            Some(FaultMode::Panic) => panic!("injected panic in {name}"),
            None => {}
        }
        Ok(match command {
            NativeCommand::InsertText(text) => self.insert_text(text),
            NativeCommand::Undo => self.native_history(HistoryDirection::Undo),
            NativeCommand::Redo => self.native_history(HistoryDirection::Redo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attached(initial: &str) -> SimBrowser {
        let mut browser = SimBrowser::new(HostCapabilities::chromium(), initial);
        browser.attach_shadow().unwrap();
        browser
    }

    #[test]
    fn insert_targets_selected_surface() {
        let mut browser = attached("ab");
        let range = browser.shadow_range().unwrap();
        browser.set_selection(Some(&range));
        assert!(browser.exec(NativeCommand::InsertText("x")).unwrap());
        assert_eq!(browser.real_text(), "ab");
        assert_eq!(browser.shadow_text(), "x");
        assert_eq!(browser.undo_stack().last().unwrap().surface, Surface::Shadow);
    }

    #[test]
    fn insert_into_detached_shadow_fails() {
        let mut browser = SimBrowser::new(HostCapabilities::chromium(), "");
        browser.set_selection(Some(&SimRange::caret(Surface::Shadow, 0)));
        assert!(!browser.exec(NativeCommand::InsertText("x")).unwrap());
        assert_eq!(browser.undo_depth(), 0);
    }

    #[test]
    fn native_undo_moves_entry_and_dispatches() {
        let mut browser = attached("");
        browser.listen(SyncState::new());
        browser.user_edit("a");
        assert!(browser.exec(NativeCommand::Undo).unwrap());
        assert_eq!(browser.real_text(), "");
        assert_eq!(browser.redo_depth(), 1);
        assert_eq!(
            browser.dispatches(),
            &[DispatchRecord {
                trigger: HistoryTrigger::undo().with_default_applied(true),
                screen: Some(Screen::Handle),
            }]
        );
    }

    #[test]
    fn empty_stack_undo_reports_failure() {
        let mut browser = attached("");
        assert!(!browser.exec(NativeCommand::Undo).unwrap());
        assert!(browser.dispatches().is_empty());
    }

    #[test]
    fn fresh_edit_clears_redo() {
        let mut browser = attached("");
        browser.user_edit("a");
        browser.apply_default(HistoryDirection::Undo);
        assert_eq!(browser.redo_depth(), 1);
        browser.user_edit("b");
        assert_eq!(browser.redo_depth(), 0);
    }

    #[test]
    fn render_makes_real_entries_stale() {
        let mut browser = attached("");
        browser.user_edit("a");
        browser.render("");
        assert!(browser.undo_stack()[0].stale);
        browser.apply_default(HistoryDirection::Undo);
        browser.apply_default(HistoryDirection::Redo);
        assert_eq!(browser.real_text(), "");
    }

    #[test]
    fn faults_fire_once() {
        let mut browser = attached("");
        browser.inject(Fault::on("insertText", FaultMode::Throw));
        assert!(browser.exec(NativeCommand::InsertText("x")).is_err());
        assert!(!browser.has_pending_faults());
        assert!(browser.exec(NativeCommand::InsertText("x")).unwrap());
    }

    #[test]
    fn webkit_routes_gesture_to_top_entry_owner() {
        let mut browser = SimBrowser::new(HostCapabilities::webkit(), "");
        browser.attach_shadow().unwrap();
        assert_eq!(browser.gesture_target(HistoryDirection::Undo), Surface::Real);
        browser.user_edit("a");
        let range = browser.shadow_range().unwrap();
        browser.set_selection(Some(&range));
        browser.exec(NativeCommand::InsertText("x")).unwrap();
        assert_eq!(browser.gesture_target(HistoryDirection::Undo), Surface::Shadow);
    }
}
