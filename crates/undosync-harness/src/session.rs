#![forbid(unsafe_code)]

//! A simulated editing session: browser, editor and engine wired together.
//!
//! User gestures follow the host family's delivery order:
//!
//! ```text
//! cancelable:      notify ──► handler ──► default action unless prevented
//!                                           └──► applied notify ──► handler
//! non-cancelable:  default action ──► applied notify ──► handler
//! ```
//!
//! Cancelable profiles can also deliver a gesture too late to cancel (see
//! [`SimSession::late_gesture`]); the engine then waits for the applied
//! notification.
//!
//! After every gesture the editor's DOM observer runs: any real-surface
//! change the editor did not render itself is read back as a new edit,
//! which is exactly the corruption the engine exists to prevent. Then the
//! editor renders its document.

use tracing::{debug, warn};
use undosync_core::{
    ConfigError, Disposition, HistoryDirection, HistoryNotification, HistoryTrigger, SyncConfig,
    SyncEngine, SyncOutcome,
};

use crate::browser::SimBrowser;
use crate::editor::SimEditor;

/// A notification whose default action can be prevented.
#[derive(Debug, Clone, Copy)]
pub struct SimNotification {
    trigger: HistoryTrigger,
    prevented: bool,
}

impl SimNotification {
    #[must_use]
    pub fn new(trigger: HistoryTrigger) -> Self {
        Self {
            trigger,
            prevented: false,
        }
    }

    #[must_use]
    pub fn is_prevented(&self) -> bool {
        self.prevented
    }
}

impl HistoryNotification for SimNotification {
    fn trigger(&self) -> HistoryTrigger {
        self.trigger
    }

    fn prevent_default(&mut self) {
        if self.trigger.cancelable {
            self.prevented = true;
        }
    }
}

/// What one user gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureReport {
    /// The browser had an entry to act on and notified the page.
    pub delivered: bool,
    /// Outcome of the notification the engine acted on.
    pub outcome: SyncOutcome,
    /// The browser ran its own undo/redo.
    pub default_applied: bool,
    /// The real surface changed behind the editor's back.
    pub foreign_mutation: bool,
}

/// Browser, editor and engine for one page.
#[derive(Debug)]
pub struct SimSession {
    pub browser: SimBrowser,
    pub editor: SimEditor,
    pub engine: SyncEngine,
}

impl SimSession {
    pub fn new(config: SyncConfig, initial: &str) -> Result<Self, ConfigError> {
        let mut browser = SimBrowser::new(config.capabilities, initial);
        let mut engine = SyncEngine::new(config)?;
        browser.listen(engine.state().clone());
        if let Err(err) = engine.install(&mut browser) {
            warn!(target: "undosync.harness", error = %err, "shadow install failed");
        }
        Ok(Self {
            browser,
            editor: SimEditor::new(initial),
            engine,
        })
    }

    /// Append `text` to the document as a user edit.
    pub fn type_text(&mut self, text: &str) {
        let next = format!("{}{text}", self.editor.text());
        self.editor.commit(&next);
        self.browser.user_edit(&next);
    }

    /// The user presses the platform undo shortcut.
    pub fn undo(&mut self) -> GestureReport {
        let cancelable = self.browser.profile().cancelable_history_events;
        self.gesture(HistoryDirection::Undo, cancelable)
    }

    /// The user presses the platform redo shortcut.
    pub fn redo(&mut self) -> GestureReport {
        let cancelable = self.browser.profile().cancelable_history_events;
        self.gesture(HistoryDirection::Redo, cancelable)
    }

    /// The browser announces the gesture before acting but does not let
    /// the page cancel it.
    pub fn late_gesture(&mut self, direction: HistoryDirection) -> GestureReport {
        self.gesture(direction, false)
    }

    /// End the session, detaching the shadow surface.
    pub fn close(&mut self) {
        self.engine.uninstall(&mut self.browser);
    }

    fn gesture(&mut self, direction: HistoryDirection, cancelable: bool) -> GestureReport {
        let mut report = GestureReport::default();
        let available = match direction {
            HistoryDirection::Undo => self.browser.undo_depth() > 0,
            HistoryDirection::Redo => self.browser.redo_depth() > 0,
        };
        if !available {
            debug!(
                target: "undosync.harness",
                %direction,
                "native stack empty; nothing delivered"
            );
            return report;
        }
        report.delivered = true;

        let rendered = self.browser.real_text().to_owned();
        let target = self.browser.gesture_target(direction);
        let trigger = HistoryTrigger::new(direction, cancelable, target);
        let announces = self.browser.profile().cancelable_history_events;
        if announces {
            let mut note = SimNotification::new(trigger);
            report.outcome = self.notify(&mut note);
            if note.is_prevented() {
                return self.finish(report, &rendered);
            }
        }
        report.default_applied = self.browser.apply_default(direction);
        let mut applied = SimNotification::new(trigger.with_default_applied(true));
        let outcome = self.notify(&mut applied);
        if !announces || report.outcome.disposition == Disposition::Deferred {
            report.outcome = outcome;
        }
        self.finish(report, &rendered)
    }

    fn notify(&mut self, note: &mut SimNotification) -> SyncOutcome {
        self.engine.handle(note, &mut self.editor, &mut self.browser)
    }

    fn finish(&mut self, mut report: GestureReport, rendered: &str) -> GestureReport {
        if self.browser.real_text() != rendered {
            report.foreign_mutation = true;
            let observed = self.browser.real_text().to_owned();
            warn!(target: "undosync.harness", %observed, "real surface mutated natively");
            self.editor.commit(&observed);
        }
        self.browser.render(self.editor.text());
        report
    }
}
