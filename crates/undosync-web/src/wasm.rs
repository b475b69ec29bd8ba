#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and the DOM host.
//!
//! Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget, HtmlDocument, HtmlElement, InputEvent, Range, Selection};

use undosync_core::{
    EditHistory, HistoryNotification, HistoryTrigger, HostError, NativeCommand, NativeHost, Screen,
    Surface, SyncEngine, SyncState,
};

use crate::{
    HISTORY_METHODS, SHADOW_ATTRIBUTES, SHADOW_TAG, classify_input, parse_config, stats_entries,
};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            Reflect::get(value, &"message".into())
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

// ============================================================================
// DOM host
// ============================================================================

/// The page's document plus the shadow element.
struct DomHost {
    document: HtmlDocument,
    shadow: HtmlElement,
}

impl DomHost {
    fn new(document: HtmlDocument) -> Result<Self, JsValue> {
        let shadow = document
            .create_element(SHADOW_TAG)?
            .dyn_into::<HtmlElement>()
            .map_err(JsValue::from)?;
        for (name, value) in SHADOW_ATTRIBUTES {
            shadow.set_attribute(name, value)?;
        }
        Ok(Self { document, shadow })
    }

    fn dom_selection(&self) -> Option<Selection> {
        self.document.get_selection().ok().flatten()
    }
}

impl NativeHost for DomHost {
    type Range = Range;

    fn selection(&self) -> Option<Range> {
        let selection = self.dom_selection()?;
        if selection.range_count() == 0 {
            return None;
        }
        selection.get_range_at(0).ok()
    }

    fn set_selection(&mut self, range: Option<&Range>) {
        let Some(selection) = self.dom_selection() else {
            return;
        };
        let _ = selection.remove_all_ranges();
        if let Some(range) = range {
            let _ = selection.add_range(range);
        }
    }

    fn shadow_range(&self) -> Result<Range, HostError> {
        let range = self
            .document
            .create_range()
            .map_err(|err| HostError::ShadowUnavailable(js_message(&err)))?;
        range
            .select_node_contents(&self.shadow)
            .map_err(|err| HostError::ShadowUnavailable(js_message(&err)))?;
        Ok(range)
    }

    fn attach_shadow(&mut self) -> Result<(), HostError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| HostError::ShadowUnavailable("document has no body".into()))?;
        body.append_child(&self.shadow)
            .map_err(|err| HostError::ShadowUnavailable(js_message(&err)))?;
        Ok(())
    }

    fn detach_shadow(&mut self) {
        self.shadow.remove();
    }

    fn exec(&mut self, command: NativeCommand<'_>) -> Result<bool, HostError> {
        let value = match command {
            NativeCommand::InsertText(text) => text,
            NativeCommand::Undo | NativeCommand::Redo => "",
        };
        self.document
            .exec_command_with_show_ui_and_value(command.name(), false, value)
            .map_err(|err| HostError::CommandThrew {
                command: command.name(),
                message: js_message(&err),
            })
    }
}

// ============================================================================
// JS history and events
// ============================================================================

/// Editor history reached through a JS object's methods.
struct JsEditHistory {
    target: JsValue,
}

impl JsEditHistory {
    fn new(target: JsValue) -> Result<Self, JsValue> {
        for method in HISTORY_METHODS {
            let value = Reflect::get(&target, &JsValue::from_str(method))?;
            if !value.is_function() {
                return Err(JsValue::from_str(&format!(
                    "history object is missing `{method}()`"
                )));
            }
        }
        Ok(Self { target })
    }

    fn call(&self, method: &str) -> bool {
        let result = Reflect::get(&self.target, &JsValue::from_str(method))
            .and_then(|value| value.dyn_into::<Function>().map_err(JsValue::from))
            .and_then(|function| function.call0(&self.target));
        match result {
            Ok(value) => value.is_truthy(),
            Err(err) => {
                warn!(
                    target: "undosync.web",
                    method,
                    error = %js_message(&err),
                    "history call failed"
                );
                false
            }
        }
    }
}

impl EditHistory for JsEditHistory {
    fn undo(&mut self) -> bool {
        self.call("undo")
    }

    fn redo(&mut self) -> bool {
        self.call("redo")
    }

    fn can_undo(&self) -> bool {
        self.call("canUndo")
    }

    fn can_redo(&self) -> bool {
        self.call("canRedo")
    }
}

struct DomHistoryEvent {
    event: InputEvent,
    trigger: HistoryTrigger,
}

impl HistoryNotification for DomHistoryEvent {
    fn trigger(&self) -> HistoryTrigger {
        self.trigger
    }

    fn prevent_default(&mut self) {
        self.event.prevent_default();
    }
}

// ============================================================================
// Exported handle
// ============================================================================

struct Inner {
    engine: SyncEngine,
    history: JsEditHistory,
    host: DomHost,
}

struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// Keeps the browser's native undo/redo in step with an editor history.
#[wasm_bindgen]
pub struct NativeHistorySync {
    inner: Rc<RefCell<Inner>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl NativeHistorySync {
    /// Attach to `editor`, redirecting native undo/redo into `history`.
    ///
    /// `config` is an optional JSON-encoded engine configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(
        editor: HtmlElement,
        history: JsValue,
        config: Option<String>,
    ) -> Result<NativeHistorySync, JsValue> {
        install_panic_hook();
        let config =
            parse_config(config.as_deref()).map_err(|err| JsValue::from_str(&err.to_string()))?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?
            .dyn_into::<HtmlDocument>()
            .map_err(JsValue::from)?;

        let events = config.capabilities.listen_events();
        let mut engine =
            SyncEngine::new(config).map_err(|err| JsValue::from_str(&err.to_string()))?;
        let mut host = DomHost::new(document)?;
        engine
            .install(&mut host)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let shadow: EventTarget = host.shadow.clone().into();
        let state = engine.state().clone();

        let inner = Rc::new(RefCell::new(Inner {
            engine,
            history: JsEditHistory::new(history)?,
            host,
        }));

        let mut sync = Self {
            inner,
            listeners: Vec::with_capacity(events.len() * 2),
        };
        let editor: EventTarget = editor.into();
        for &event in events {
            sync.listen(editor.clone(), Surface::Real, event, state.clone())?;
            sync.listen(shadow.clone(), Surface::Shadow, event, state.clone())?;
        }
        debug!(target: "undosync.web", ?events, "native history sync attached");
        Ok(sync)
    }

    /// Session counters as a plain object.
    pub fn stats(&self) -> JsValue {
        let obj = Object::new();
        let Ok(inner) = self.inner.try_borrow() else {
            return obj.into();
        };
        for (key, value) in stats_entries(&inner.engine.stats()) {
            let _ = Reflect::set(&obj, &JsValue::from_str(key), &JsValue::from_f64(value as f64));
        }
        obj.into()
    }

    /// Remove every listener and the shadow element.
    pub fn dispose(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.event,
                listener.callback.as_ref().unchecked_ref(),
            );
        }
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            let Inner { engine, host, .. } = &mut *inner;
            engine.uninstall(host);
            host.detach_shadow();
        }
        debug!(target: "undosync.web", "native history sync disposed");
    }
}

impl Drop for NativeHistorySync {
    fn drop(&mut self) {
        // Listeners must not outlive their closures.
        self.dispose();
    }
}

impl NativeHistorySync {
    fn listen(
        &mut self,
        target: EventTarget,
        surface: Surface,
        event: &'static str,
        state: SyncState,
    ) -> Result<(), JsValue> {
        let inner = Rc::clone(&self.inner);
        let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Ok(event) = event.dyn_into::<InputEvent>() else {
                return;
            };
            let Some(trigger) = classify_input(
                &event.type_(),
                &event.input_type(),
                event.cancelable(),
                surface,
            ) else {
                return;
            };
            // Synthetic notifications arrive while the engine is borrowed.
            if state.screen(&trigger) == Screen::Ignore {
                return;
            }
            let Ok(mut inner) = inner.try_borrow_mut() else {
                return;
            };
            let Inner {
                engine,
                history,
                host,
            } = &mut *inner;
            let mut notification = DomHistoryEvent { event, trigger };
            engine.handle(&mut notification, history, host);
        });
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        self.listeners.push(Listener {
            target,
            event,
            callback,
        });
        Ok(())
    }
}
