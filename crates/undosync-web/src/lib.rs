#![forbid(unsafe_code)]

//! Browser binding for `undosync-core`.
//!
//! The DOM-facing half lives in the `wasm` module and is only compiled for
//! `wasm32`. Everything here is plain Rust so it can be unit tested on the
//! host:
//!
//! - the shadow element's attributes,
//! - mapping a DOM `InputEvent` to a [`HistoryTrigger`],
//! - parsing the optional JSON configuration,
//! - the shape of the `stats()` object handed back to JS.
//!
//! # JS usage
//!
//! ```text
//! const sync = new NativeHistorySync(editorElement, {
//!   undo: () => undo(view.state, view.dispatch),
//!   redo: () => redo(view.state, view.dispatch),
//!   canUndo: () => undo(view.state),
//!   canRedo: () => redo(view.state),
//! }, JSON.stringify({ shadow_attachment: "per_operation" }));
//! ...
//! sync.dispose();
//! ```

use undosync_core::{ConfigError, HistoryDirection, HistoryTrigger, Surface, SyncConfig, SyncStats};

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::NativeHistorySync;

/// Tag of the shadow element.
pub const SHADOW_TAG: &str = "div";

/// Keeps the shadow element focusable but out of view.
pub const SHADOW_STYLE: &str = "position:fixed; bottom:-5em;";

/// Attributes set on the shadow element at creation.
pub const SHADOW_ATTRIBUTES: [(&str, &str); 3] = [
    ("contenteditable", "true"),
    ("aria-hidden", "true"),
    ("style", SHADOW_STYLE),
];

/// JS method names the history object must provide.
pub const HISTORY_METHODS: [&str; 4] = ["undo", "redo", "canUndo", "canRedo"];

/// Map an `InputEvent` to a history trigger.
///
/// `event_type` is the DOM event name. An `input` event fires after the
/// browser applied its default action. Returns `None` for every input type
/// other than `historyUndo` and `historyRedo`; those events are left to the
/// browser.
#[must_use]
pub fn classify_input(
    event_type: &str,
    input_type: &str,
    cancelable: bool,
    source: Surface,
) -> Option<HistoryTrigger> {
    let applied = event_type == "input";
    HistoryDirection::from_input_type(input_type).map(|direction| {
        HistoryTrigger::new(direction, cancelable, source).with_default_applied(applied)
    })
}

/// Build the engine configuration from the optional JSON argument.
pub fn parse_config(json: Option<&str>) -> Result<SyncConfig, ConfigError> {
    match json {
        Some(json) if !json.trim().is_empty() => SyncConfig::from_json_str(json),
        _ => Ok(SyncConfig::default()),
    }
}

/// `stats()` fields, keyed the way JS callers read them.
#[must_use]
pub fn stats_entries(stats: &SyncStats) -> [(&'static str, u64); 6] {
    [
        ("undoIntercepted", stats.undo_intercepted),
        ("redoIntercepted", stats.redo_intercepted),
        ("ignoredReentrant", stats.ignored_reentrant),
        ("deferred", stats.deferred),
        ("compensations", stats.compensations),
        ("commandFailures", stats.command_failures),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use undosync_core::{HostCapabilities, ShadowAttachment};

    #[test]
    fn only_history_input_types_are_classified() {
        assert_eq!(
            classify_input("beforeinput", "historyUndo", true, Surface::Real),
            Some(HistoryTrigger::undo())
        );
        assert_eq!(
            classify_input("beforeinput", "historyRedo", false, Surface::Shadow),
            Some(
                HistoryTrigger::redo()
                    .with_cancelable(false)
                    .with_source(Surface::Shadow)
            )
        );
        assert_eq!(classify_input("beforeinput", "insertText", true, Surface::Real), None);
        assert_eq!(classify_input("input", "deleteContentBackward", false, Surface::Real), None);
    }

    #[test]
    fn input_events_are_marked_applied() {
        let trigger = classify_input("input", "historyUndo", false, Surface::Real).unwrap();
        assert!(trigger.default_applied);
        assert!(!trigger.cancelable);

        let early = classify_input("beforeinput", "historyUndo", false, Surface::Real).unwrap();
        assert!(!early.default_applied);
    }

    #[test]
    fn shadow_is_editable_hidden_and_off_screen() {
        assert!(SHADOW_ATTRIBUTES.contains(&("contenteditable", "true")));
        assert!(SHADOW_ATTRIBUTES.contains(&("aria-hidden", "true")));
        assert!(SHADOW_STYLE.contains("position:fixed"));
    }

    #[test]
    fn missing_or_blank_config_is_default() {
        assert_eq!(parse_config(None).unwrap(), SyncConfig::default());
        assert_eq!(parse_config(Some("  ")).unwrap(), SyncConfig::default());
    }

    #[test]
    fn json_config_selects_host_profile() {
        let json = r#"{
            "capabilities": { "cancelable_history_events": false },
            "shadow_attachment": "per_operation"
        }"#;
        let config = parse_config(Some(json)).unwrap();
        assert_eq!(config.capabilities, HostCapabilities::non_cancelable());
        assert_eq!(config.shadow_attachment, ShadowAttachment::PerOperation);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(parse_config(Some(r#"{"filler_text":""}"#)).is_err());
        assert!(parse_config(Some("{")).is_err());
    }

    #[test]
    fn stats_use_camel_case_keys() {
        let stats = SyncStats {
            undo_intercepted: 2,
            compensations: 1,
            ..SyncStats::default()
        };
        let entries = stats_entries(&stats);
        assert_eq!(entries[0], ("undoIntercepted", 2));
        assert_eq!(entries[3], ("deferred", 0));
        assert_eq!(entries[4], ("compensations", 1));
    }
}
