#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use undosync_core::{HistoryDirection, HostCapabilities, ShadowAttachment, SyncConfig};
use undosync_harness::SimSession;

#[derive(Arbitrary, Debug)]
enum Profile {
    Chromium,
    Webkit,
    NonCancelable,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Type(u8),
    Undo,
    LateUndo,
    Redo,
    LateRedo,
}

#[derive(Arbitrary, Debug)]
struct Input {
    profile: Profile,
    per_operation: bool,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let caps = match input.profile {
        Profile::Chromium => HostCapabilities::chromium(),
        Profile::Webkit => HostCapabilities::webkit(),
        Profile::NonCancelable => HostCapabilities::non_cancelable(),
    };
    let attachment = if input.per_operation {
        ShadowAttachment::PerOperation
    } else {
        ShadowAttachment::Permanent
    };
    let config = SyncConfig::for_host(caps)
        .with_shadow_attachment(attachment)
        .with_filler_text("#");
    let Ok(mut session) = SimSession::new(config, "") else {
        return;
    };

    for op in input.ops.iter().take(256) {
        let report = match op {
            Op::Type(byte) => {
                // Printable ASCII other than the filler.
                let c = char::from(b'a' + byte % 26);
                session.type_text(&c.to_string());
                continue;
            }
            Op::Undo => session.undo(),
            Op::LateUndo => session.late_gesture(HistoryDirection::Undo),
            Op::Redo => session.redo(),
            Op::LateRedo => session.late_gesture(HistoryDirection::Redo),
        };

        // Post-conditions that must always hold:
        assert!(!report.foreign_mutation, "real surface mutated: {report:?}");
        assert_eq!(session.browser.real_text(), session.editor.text());
        assert!(!session.browser.real_text().contains('#'));
        assert!(!session.engine.state().is_reentrant());
    }
});
