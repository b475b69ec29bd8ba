#![forbid(unsafe_code)]

//! End-to-end gesture scenarios against the simulated browser.
//!
//! Run:
//!   cargo test -p undosync-harness --test scenarios

use std::panic::{AssertUnwindSafe, catch_unwind};

use pretty_assertions::assert_eq;
use undosync_core::{
    EditHistory, HistoryDirection, HostCapabilities, NativeHost, Screen, ShadowAttachment,
    Surface, SyncConfig, SyncPhase,
};
use undosync_harness::{Fault, FaultMode, SimSession};

fn profiles() -> [(&'static str, HostCapabilities); 3] {
    [
        ("chromium", HostCapabilities::chromium()),
        ("webkit", HostCapabilities::webkit()),
        ("non_cancelable", HostCapabilities::non_cancelable()),
    ]
}

fn session_with_one_edit(capabilities: HostCapabilities) -> SimSession {
    let mut session = SimSession::new(SyncConfig::for_host(capabilities), "").unwrap();
    session.type_text("a");
    session
}

// ============================================================================
// Scenario 1: undo one edit
// ============================================================================

#[test]
fn undo_reverts_single_edit() {
    for (name, caps) in profiles() {
        let mut session = session_with_one_edit(caps);

        let report = session.undo();

        assert!(report.delivered, "{name}");
        assert!(report.outcome.history_applied, "{name}");
        assert!(!report.foreign_mutation, "{name}");
        assert_eq!(session.editor.text(), "", "{name}");
        assert_eq!(session.browser.real_text(), "", "{name}");
        assert!(!session.editor.can_undo(), "{name}");
        assert!(session.editor.can_redo(), "{name}");
        assert!(session.browser.redo_depth() > 0, "{name}");
        assert_eq!(session.engine.phase(), SyncPhase::Idle, "{name}");
    }
}

#[test]
fn cancelable_undo_is_prevented() {
    let mut session = session_with_one_edit(HostCapabilities::chromium());
    let report = session.undo();
    assert!(report.outcome.default_prevented);
    assert!(!report.default_applied);
    assert!(!report.outcome.compensated);
}

// ============================================================================
// Scenario 2: redo after undo
// ============================================================================

#[test]
fn redo_restores_post_edit_state() {
    for (name, caps) in profiles() {
        let mut session = session_with_one_edit(caps);
        session.undo();

        let report = session.redo();

        assert!(report.delivered, "{name}");
        assert!(report.outcome.history_applied, "{name}");
        assert!(!report.foreign_mutation, "{name}");
        assert_eq!(session.editor.text(), "a", "{name}");
        assert_eq!(session.browser.real_text(), "a", "{name}");
        assert!(!session.editor.can_redo(), "{name}");
        assert!(session.browser.undo_depth() > 0, "{name}");
    }
}

#[test]
fn redo_leaves_native_redo_stack_empty_when_nothing_left() {
    let mut session = session_with_one_edit(HostCapabilities::chromium());
    session.undo();
    session.redo();
    assert_eq!(session.browser.redo_depth(), 0);
    assert!(!session.redo().delivered);
}

// ============================================================================
// Scenario 3: undo with nothing to undo
// ============================================================================

#[test]
fn undo_with_empty_history_still_primes_redo() {
    for (name, caps) in profiles() {
        let mut session = session_with_one_edit(caps);
        session.undo();
        let redo_before = session.browser.redo_depth();
        let calls_before = session.editor.undo_calls();

        let report = session.undo();

        assert!(report.delivered, "{name}");
        assert!(!report.outcome.history_applied, "{name}");
        assert!(!report.foreign_mutation, "{name}");
        assert!(report.outcome.replenished_redo, "{name}");
        assert!(!report.outcome.replenished_undo, "{name}");
        assert_eq!(session.editor.undo_calls(), calls_before + 1, "{name}");
        assert_eq!(session.editor.text(), "", "{name}");
        assert_eq!(session.browser.real_text(), "", "{name}");
        assert!(session.browser.redo_depth() >= redo_before, "{name}");
    }
}

// ============================================================================
// Scenario 4: non-cancelable undo after native mutation
// ============================================================================

#[test]
fn late_undo_is_compensated_then_applied() {
    let mut session = session_with_one_edit(HostCapabilities::non_cancelable());

    let report = session.undo();

    assert!(report.default_applied);
    assert!(report.outcome.compensated);
    assert!(!report.outcome.default_prevented);
    assert!(!report.foreign_mutation);
    assert_eq!(session.browser.commands()[0], "redo");
    assert_eq!(session.engine.stats().compensations, 1);

    // Same end state as the cancelable path.
    let mut reference = session_with_one_edit(HostCapabilities::chromium());
    reference.undo();
    assert_eq!(session.editor.text(), reference.editor.text());
    assert_eq!(session.browser.real_text(), reference.browser.real_text());
    assert_eq!(session.editor.can_undo(), reference.editor.can_undo());
    assert_eq!(session.editor.can_redo(), reference.editor.can_redo());
}

#[test]
fn early_non_cancelable_undo_waits_for_applied_report() {
    for (name, caps) in [
        ("chromium", HostCapabilities::chromium()),
        ("webkit", HostCapabilities::webkit()),
    ] {
        let mut session = session_with_one_edit(caps);

        let report = session.late_gesture(HistoryDirection::Undo);

        assert!(report.default_applied, "{name}");
        assert!(report.outcome.compensated, "{name}");
        assert!(!report.foreign_mutation, "{name}");
        assert_eq!(session.engine.stats().deferred, 1, "{name}");
        assert_eq!(session.editor.undo_calls(), 1, "{name}");
        assert_eq!(session.editor.text(), "", "{name}");
        assert_eq!(session.browser.real_text(), "", "{name}");
        assert!(session.editor.can_redo(), "{name}");
        assert!(session.browser.redo_depth() > 0, "{name}");
    }
}

#[test]
fn late_undo_without_compensation_leaks_into_editor() {
    let config = SyncConfig::for_host(HostCapabilities::non_cancelable()).with_compensation(false);
    let mut session = SimSession::new(config, "").unwrap();
    session.type_text("a");
    session.type_text("b");

    let report = session.undo();

    assert!(report.foreign_mutation);
    // The observer committed the native result as a fresh edit.
    assert!(!session.editor.can_redo());
}

// ============================================================================
// Reentrancy and shadow lifecycle
// ============================================================================

#[test]
fn synthetic_dispatches_are_all_screened() {
    for (name, caps) in profiles() {
        let mut session = session_with_one_edit(caps);
        session.type_text("b");
        session.undo();
        session.undo();
        session.redo();
        session.undo();

        let dispatches = session.browser.dispatches();
        assert!(!dispatches.is_empty(), "{name}");
        assert!(
            dispatches.iter().all(|d| d.screen == Some(Screen::Ignore)),
            "{name}: {dispatches:?}"
        );
        assert_eq!(session.editor.undo_calls(), 3, "{name}");
        assert_eq!(session.editor.redo_calls(), 1, "{name}");
        assert_eq!(
            session.engine.stats().ignored_reentrant,
            0,
            "{name}: dispatches never reach the engine"
        );
    }
}

#[test]
fn shadow_content_never_reaches_real_surface() {
    let config = SyncConfig::default().with_filler_text("#");
    let mut session = SimSession::new(config, "").unwrap();
    session.type_text("a");
    session.type_text("b");
    session.undo();
    session.redo();
    session.undo();
    session.undo();

    assert!(!session.browser.real_text().contains('#'));
    assert!(
        session
            .browser
            .undo_stack()
            .iter()
            .any(|entry| entry.surface == Surface::Shadow)
    );
}

#[test]
fn per_operation_shadow_is_detached_between_gestures() {
    let config = SyncConfig::default().with_shadow_attachment(ShadowAttachment::PerOperation);
    let mut session = SimSession::new(config, "").unwrap();
    assert!(!session.browser.is_shadow_attached());
    session.type_text("a");
    session.type_text("b");

    session.undo();
    assert!(!session.browser.is_shadow_attached());
    // One attachment per replenished stack.
    assert_eq!(session.browser.attach_count(), 2);

    session.redo();
    assert!(!session.browser.is_shadow_attached());
    assert_eq!(session.editor.text(), "ab");
}

#[test]
fn per_operation_shadow_is_detached_after_a_panicking_command() {
    let config = SyncConfig::default().with_shadow_attachment(ShadowAttachment::PerOperation);
    let mut session = SimSession::new(config, "").unwrap();
    session.type_text("a");
    session.type_text("b");
    session.browser.inject(Fault::on("undo", FaultMode::Panic));

    let result = catch_unwind(AssertUnwindSafe(|| session.undo()));

    assert!(result.is_err());
    assert!(!session.browser.is_shadow_attached());
    assert_eq!(session.engine.phase(), SyncPhase::Idle);
    assert!(!session.engine.state().is_reentrant());

    let text = session.editor.text().to_owned();
    session.browser.render(&text);
    assert!(session.undo().delivered);
    assert!(!session.browser.is_shadow_attached());
}

#[test]
fn permanent_shadow_attaches_once_and_closes() {
    let mut session = session_with_one_edit(HostCapabilities::chromium());
    assert!(session.browser.is_shadow_attached());
    session.undo();
    session.redo();
    assert_eq!(session.browser.attach_count(), 1);

    session.close();
    assert!(!session.browser.is_shadow_attached());
}

#[test]
fn selection_survives_replenishment() {
    let mut session = session_with_one_edit(HostCapabilities::chromium());
    session.type_text("b");
    let before = session.browser.selection();

    session.undo();

    assert_eq!(session.browser.selection(), before);
}
