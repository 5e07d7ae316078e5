#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Function, JSON, Promise, Reflect};
use tracing::{Level, debug, info, trace, warn};
use vidlift_core::controller::{ContentScript, EventDisposition, HostEvent};
use vidlift_core::error::{DomError, MediaError};
use vidlift_core::geometry::{Point, Rect};
use vidlift_core::host::{HostDocument, HostMedia, HostPreferences};
use vidlift_core::media::{self, MediaState};
use vidlift_core::picker::PickerPhase;
use vidlift_core::{Command, VidliftConfig};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AddEventListenerOptions, CssStyleDeclaration, Document, Element, Event, EventTarget,
    HtmlInputElement, HtmlMediaElement, HtmlVideoElement, KeyboardEvent, MouseEvent,
    MutationObserver, MutationObserverInit, Window,
};

use crate::console::{self, ConsoleSink};
use crate::listeners::{self, ListenerKind, ListenerSpec};
use crate::style::{join_priority, split_priority};

const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

/// Best-effort text for a thrown JS value (`DOMException` name and message,
/// or whatever the value stringifies to).
fn describe(error: &JsValue) -> String {
    if let Some(text) = error.as_string() {
        return text;
    }
    let field = |name: &str| {
        Reflect::get(error, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.as_string())
    };
    match (field("name"), field("message")) {
        (Some(name), Some(message)) if !message.is_empty() => format!("{name}: {message}"),
        (Some(name), _) => name,
        (None, Some(message)) => message,
        (None, None) => format!("{error:?}"),
    }
}

/// Log the rejection of a fire-and-forget media promise once it settles.
fn watch_media_promise(operation: &'static str, promise: Promise) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(error) = JsFuture::from(promise).await {
            media::log_rejection(&MediaError::Rejected {
                operation,
                reason: describe(&error),
            });
        }
    });
}

fn as_media(node: &Element) -> Result<&HtmlMediaElement, MediaError> {
    node.dyn_ref::<HtmlMediaElement>()
        .ok_or_else(|| MediaError::NotMedia(node.tag_name()))
}

#[derive(Debug, Default)]
struct SelectionListeners {
    click: Option<Function>,
    keydown: Option<Function>,
    installed: bool,
}

/// [`vidlift_core::host::Host`] over the live page.
#[derive(Debug)]
pub struct WebHost {
    window: Window,
    document: Document,
    /// Used when the page has no `<body>` (framesets, documents mid-swap).
    fallback_body: Element,
    preferences: HashMap<String, String>,
    selection: SelectionListeners,
}

impl WebHost {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        let fallback_body = document
            .body()
            .map(Element::from)
            .or_else(|| document.document_element())
            .ok_or_else(|| JsValue::from_str("document has no root element"))?;
        Ok(Self {
            window,
            document,
            fallback_body,
            preferences: HashMap::new(),
            selection: SelectionListeners::default(),
        })
    }

    /// Cache a stored preference. The extension reads storage asynchronously
    /// and pushes values in before `start`.
    pub fn set_preference(&mut self, key: &str, value: &str) {
        self.preferences.insert(key.to_owned(), value.to_owned());
    }

    fn bind_selection(&mut self, click: Function, keydown: Function) {
        self.selection.click = Some(click);
        self.selection.keydown = Some(keydown);
    }

    /// Switch the picker listeners off and forget them. Their closures are
    /// about to be dropped.
    fn unbind_selection(&mut self) {
        self.set_selection_listeners(false);
        self.selection = SelectionListeners::default();
    }

    fn window_target(&self) -> &EventTarget {
        &self.window
    }

    fn inline_style(node: &Element) -> Option<CssStyleDeclaration> {
        // Not every element is an HtmlElement (SVG overlays are common on
        // video sites), so go through the `style` property directly.
        Reflect::get(node, &JsValue::from_str("style"))
            .ok()?
            .dyn_into::<CssStyleDeclaration>()
            .ok()
    }
}

impl HostDocument for WebHost {
    type Node = Element;

    fn body(&self) -> Element {
        self.document
            .body()
            .map(Element::from)
            .unwrap_or_else(|| self.fallback_body.clone())
    }

    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn element_from_point(&self, point: Point) -> Option<Element> {
        self.document.element_from_point(point.x as f32, point.y as f32)
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn create_element(&mut self, tag: &str) -> Result<Element, DomError> {
        self.document
            .create_element(tag)
            .map_err(|error| DomError::Operation(describe(&error)))
    }

    fn append_child(&mut self, parent: &Element, child: &Element) {
        if let Err(error) = parent.append_child(child) {
            warn!(error = %describe(&error), "appendChild failed");
        }
    }

    fn insert_before(&mut self, node: &Element, reference: &Element) -> Result<(), DomError> {
        let parent = reference.parent_node().ok_or(DomError::Detached)?;
        let reference: &web_sys::Node = reference;
        parent
            .insert_before(node, Some(reference))
            .map(drop)
            .map_err(|error| DomError::Operation(describe(&error)))
    }

    fn remove(&mut self, node: &Element) {
        node.remove();
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        if let Err(error) = node.set_attribute(name, value) {
            warn!(name, error = %describe(&error), "setAttribute failed");
        }
    }

    fn remove_attribute(&mut self, node: &Element, name: &str) {
        if let Err(error) = node.remove_attribute(name) {
            warn!(name, error = %describe(&error), "removeAttribute failed");
        }
    }

    fn style(&self, node: &Element, property: &str) -> String {
        let Some(style) = Self::inline_style(node) else {
            return String::new();
        };
        let value = style.get_property_value(property).unwrap_or_default();
        join_priority(value, &style.get_property_priority(property))
    }

    fn set_style(&mut self, node: &Element, property: &str, value: &str) {
        let Some(style) = Self::inline_style(node) else {
            trace!(property, "element has no inline style");
            return;
        };
        let result = if value.is_empty() {
            style.remove_property(property).map(drop)
        } else {
            let (value, priority) = split_priority(value);
            style.set_property_with_priority(property, value, priority)
        };
        if let Err(error) = result {
            trace!(property, error = %describe(&error), "style write rejected");
        }
    }

    fn computed_display(&self, node: &Element) -> String {
        self.window
            .get_computed_style(node)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("display").ok())
            .filter(|display| !display.is_empty())
            .unwrap_or_else(|| "block".to_owned())
    }

    fn bounding_rect(&self, node: &Element) -> Rect {
        let rect = node.get_bounding_client_rect();
        Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
    }

    fn scroll_offset(&self) -> Point {
        Point::new(
            self.window.scroll_x().unwrap_or(0.0),
            self.window.scroll_y().unwrap_or(0.0),
        )
    }

    fn set_text(&mut self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(selector) else {
            warn!(selector, "invalid selector");
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn set_input_value(&mut self, node: &Element, value: &str) {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
    }

    fn set_checked(&mut self, node: &Element, checked: bool) {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_checked(checked);
        }
    }

    fn set_selection_listeners(&mut self, installed: bool) {
        if installed == self.selection.installed {
            return;
        }
        let (Some(click), Some(keydown)) = (&self.selection.click, &self.selection.keydown)
        else {
            warn!("selection listeners were never bound");
            return;
        };
        let target = self.window_target();
        let result = if installed {
            target
                .add_event_listener_with_callback_and_bool("click", click, true)
                .and_then(|()| {
                    target
                        .add_event_listener_with_callback_and_bool("keydown", keydown, true)
                        .inspect_err(|_| {
                            let _ = target
                                .remove_event_listener_with_callback_and_bool("click", click, true);
                        })
                })
        } else {
            // The pair counts as removed even when one removal fails.
            let click_removed =
                target.remove_event_listener_with_callback_and_bool("click", click, true);
            let keydown_removed =
                target.remove_event_listener_with_callback_and_bool("keydown", keydown, true);
            self.selection.installed = false;
            click_removed.and(keydown_removed)
        };
        match result {
            Ok(()) => {
                self.selection.installed = installed;
                trace!(installed, "selection listeners switched");
            }
            Err(error) => warn!(installed, error = %describe(&error), "selection listener switch failed"),
        }
    }
}

impl HostMedia for WebHost {
    fn media_state(&self, video: &Element) -> MediaState {
        let Ok(media) = as_media(video) else {
            return MediaState::default();
        };
        MediaState {
            paused: media.paused(),
            muted: media.muted(),
            volume: media.volume(),
            current_time: media.current_time(),
            duration: media.duration(),
            looping: media.loop_(),
        }
    }

    fn native_controls(&self, video: &Element) -> bool {
        as_media(video).is_ok_and(HtmlMediaElement::controls)
    }

    fn set_native_controls(&mut self, video: &Element, enabled: bool) {
        if let Ok(media) = as_media(video) {
            media.set_controls(enabled);
        }
    }

    fn play(&mut self, video: &Element) -> Result<(), MediaError> {
        let promise = as_media(video)?
            .play()
            .map_err(|error| MediaError::Rejected {
                operation: "play",
                reason: describe(&error),
            })?;
        watch_media_promise("play", promise);
        Ok(())
    }

    fn pause(&mut self, video: &Element) {
        if let Ok(media) = as_media(video) {
            if let Err(error) = media.pause() {
                warn!(error = %describe(&error), "pause failed");
            }
        }
    }

    fn set_muted(&mut self, video: &Element, muted: bool) {
        if let Ok(media) = as_media(video) {
            media.set_muted(muted);
        }
    }

    fn set_volume(&mut self, video: &Element, volume: f64) {
        if let Ok(media) = as_media(video) {
            media.set_volume(volume);
        }
    }

    fn set_current_time(&mut self, video: &Element, seconds: f64) {
        if let Ok(media) = as_media(video) {
            media.set_current_time(seconds);
        }
    }

    fn set_loop(&mut self, video: &Element, looping: bool) {
        if let Ok(media) = as_media(video) {
            media.set_loop(looping);
        }
    }

    fn request_picture_in_picture(&mut self, video: &Element) -> Result<(), MediaError> {
        const OPERATION: &str = "requestPictureInPicture";
        if video.dyn_ref::<HtmlVideoElement>().is_none() {
            return Err(MediaError::NotMedia(video.tag_name()));
        }
        let rejected = |reason: String| MediaError::Rejected {
            operation: OPERATION,
            reason,
        };
        let method = Reflect::get(video, &JsValue::from_str(OPERATION))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
            .ok_or_else(|| rejected("picture-in-picture is not supported".to_owned()))?;
        let result = method
            .call0(video)
            .map_err(|error| rejected(describe(&error)))?;
        if let Ok(promise) = result.dyn_into::<Promise>() {
            watch_media_promise(OPERATION, promise);
        }
        Ok(())
    }
}

impl HostPreferences for WebHost {
    fn preference(&self, key: &str) -> Option<String> {
        self.preferences.get(key).cloned()
    }

    fn prefers_dark_scheme(&self) -> bool {
        self.window
            .match_media(DARK_SCHEME_QUERY)
            .ok()
            .flatten()
            .is_some_and(|query| query.matches())
    }
}

struct BrowserConsole;

impl ConsoleSink for BrowserConsole {
    fn write_line(&self, level: Level, line: &str) {
        let line = JsValue::from_str(line);
        match level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }
}

type Shared = Rc<RefCell<ContentScript<WebHost>>>;

fn apply(event: &Event, disposition: EventDisposition) {
    if disposition.prevent_default {
        event.prevent_default();
    }
    if disposition.stop_propagation {
        event.stop_propagation();
    }
}

/// Dispatch into the core unless a dispatch is already running on this
/// thread (a DOM write that synchronously fires another event).
fn dispatch(script: &Shared, event: &Event, host_event: HostEvent<Element>) {
    let disposition = match script.try_borrow_mut() {
        Ok(mut script) => script.dispatch(host_event),
        Err(_) => {
            trace!(kind = %event.type_(), "nested event dropped");
            return;
        }
    };
    apply(event, disposition);
}

fn event_target(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn page_point(mouse: &MouseEvent) -> Point {
    Point::new(f64::from(mouse.page_x()), f64::from(mouse.page_y()))
}

fn client_point(mouse: &MouseEvent) -> Point {
    Point::new(f64::from(mouse.client_x()), f64::from(mouse.client_y()))
}

/// Translate a native event caught by a delegated listener.
fn translate(kind: ListenerKind, event: &Event) -> Option<HostEvent<Element>> {
    match kind {
        ListenerKind::Click => Some(HostEvent::Click {
            target: event_target(event)?,
        }),
        ListenerKind::PointerDown => {
            let mouse = event.dyn_ref::<MouseEvent>()?;
            if !listeners::is_primary_button(mouse.button()) {
                return None;
            }
            Some(HostEvent::PointerDown {
                target: event_target(event)?,
                client: client_point(mouse),
                page: page_point(mouse),
            })
        }
        ListenerKind::PointerMove => Some(HostEvent::PointerMove {
            page: page_point(event.dyn_ref::<MouseEvent>()?),
        }),
        ListenerKind::PointerUp => Some(HostEvent::PointerUp),
        ListenerKind::ControlInput => {
            let input = event.target()?.dyn_into::<HtmlInputElement>().ok()?;
            let value = listeners::control_value(&input.type_(), &input.value(), input.checked())?;
            Some(HostEvent::ControlInput {
                target: input.into(),
                value,
            })
        }
        ListenerKind::Media(media_event) => Some(HostEvent::Media {
            video: event_target(event)?,
            event: media_event,
        }),
    }
}

struct Registration {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Registration {
    fn install(
        target: EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> Result<Self, JsValue> {
        let options = AddEventListenerOptions::new();
        options.set_capture(true);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self {
            target,
            event,
            callback,
        })
    }

    fn uninstall(&self) {
        let _ = self.target.remove_event_listener_with_callback_and_bool(
            self.event,
            self.callback.as_ref().unchecked_ref(),
            true,
        );
    }
}

struct NavigationObserver {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

/// The content script as seen from the extension's JS glue.
///
/// ```js
/// const script = new VidliftContentScript(null);
/// script.setPreference("autoResizeAll", String(stored.autoResizeAll));
/// script.start();
/// chrome.runtime.onMessage.addListener((message) => script.handleMessage(message));
/// ```
#[wasm_bindgen]
pub struct VidliftContentScript {
    script: Shared,
    registrations: Vec<Registration>,
    selection: Vec<Closure<dyn FnMut(Event)>>,
    navigation: Option<NavigationObserver>,
    disposed: bool,
}

#[wasm_bindgen]
impl VidliftContentScript {
    /// Create the content script and wire every document listener.
    /// `config_json` overrides [`VidliftConfig`] defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<VidliftContentScript, JsValue> {
        console::install(BrowserConsole, Level::INFO);
        let config = match config_json.as_deref() {
            Some(json) => VidliftConfig::from_json_str(json)
                .map_err(|error| JsValue::from_str(&error.to_string()))?,
            None => VidliftConfig::default(),
        };
        let host = WebHost::new()?;
        let window: EventTarget = host.window.clone().into();
        let document: EventTarget = host.document.clone().into();
        let script: Shared = Rc::new(RefCell::new(ContentScript::new(host, config)));

        let mut this = Self {
            script,
            registrations: Vec::new(),
            selection: Vec::new(),
            navigation: None,
            disposed: false,
        };
        this.bind_selection_listeners();
        for spec in listeners::delegated_listeners() {
            let target = if spec.on_document { &document } else { &window };
            this.register(target.clone(), spec)?;
        }
        this.observe_mutations()?;
        debug!(listeners = this.registrations.len(), "content script wired");
        Ok(this)
    }

    /// Push a stored preference. Non-string values are stored as their JSON
    /// text, so `true` becomes `"true"`.
    #[wasm_bindgen(js_name = setPreference)]
    pub fn set_preference(&self, key: &str, value: JsValue) {
        if self.disposed {
            return;
        }
        let value = value.as_string().or_else(|| {
            JSON::stringify(&value)
                .ok()
                .and_then(|text| text.as_string())
        });
        let Some(value) = value else {
            warn!(key, "preference value is not serializable");
            return;
        };
        if let Ok(mut script) = self.script.try_borrow_mut() {
            script.host_mut().set_preference(key, &value);
        }
    }

    /// Apply start-up preferences. Returns the number of overlays created.
    pub fn start(&self) -> u32 {
        if self.disposed {
            return 0;
        }
        match self.script.try_borrow_mut() {
            Ok(mut script) => u32::try_from(script.start()).unwrap_or(u32::MAX),
            Err(_) => 0,
        }
    }

    /// Handle a runtime message (a command object or its JSON text).
    /// Returns whether it was understood.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, message: JsValue) -> bool {
        if self.disposed {
            debug!("message after dispose ignored");
            return false;
        }
        let json = message.as_string().or_else(|| {
            JSON::stringify(&message)
                .ok()
                .and_then(|text| text.as_string())
        });
        let command = match json.as_deref().map(Command::from_json_str) {
            Some(Ok(command)) => command,
            Some(Err(error)) => {
                warn!(%error, "message ignored");
                return false;
            }
            None => {
                warn!("message is not serializable");
                return false;
            }
        };
        match self.script.try_borrow_mut() {
            Ok(mut script) => {
                script.handle_command(command);
                true
            }
            Err(_) => false,
        }
    }

    #[wasm_bindgen(js_name = overlayCount)]
    pub fn overlay_count(&self) -> u32 {
        self.script
            .try_borrow()
            .map_or(0, |script| u32::try_from(script.overlays().len()).unwrap_or(u32::MAX))
    }

    #[wasm_bindgen(js_name = isSelecting)]
    pub fn is_selecting(&self) -> bool {
        self.script
            .try_borrow()
            .is_ok_and(|script| script.picker().phase() == PickerPhase::Selecting)
    }

    /// Remove every overlay and leave selection mode.
    pub fn reset(&self) {
        if self.disposed {
            return;
        }
        if let Ok(mut script) = self.script.try_borrow_mut() {
            script.reset();
        }
    }

    /// Reset and unhook every listener and observer. The instance is inert
    /// afterwards: every other method is a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.reset();
        self.disposed = true;
        if let Ok(mut script) = self.script.try_borrow_mut() {
            script.host_mut().unbind_selection();
        }
        for registration in self.registrations.drain(..) {
            registration.uninstall();
        }
        if let Some(navigation) = self.navigation.take() {
            navigation.observer.disconnect();
        }
        self.selection.clear();
        info!("content script disposed");
    }
}

impl VidliftContentScript {
    fn register(&mut self, target: EventTarget, spec: ListenerSpec) -> Result<(), JsValue> {
        let script = Rc::clone(&self.script);
        let kind = spec.kind;
        let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Some(host_event) = translate(kind, &event) {
                dispatch(&script, &event, host_event);
            }
        });
        self.registrations
            .push(Registration::install(target, spec.event, callback)?);
        Ok(())
    }

    /// Create the picker's click-capture and keydown callbacks and hand them
    /// to the host, which switches them on and off as a pair.
    fn bind_selection_listeners(&mut self) {
        let script = Rc::clone(&self.script);
        let click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let point = client_point(mouse);
            dispatch(&script, &event, HostEvent::SelectionClick { point });
        });
        let script = Rc::clone(&self.script);
        let keydown = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            let key = keyboard.key();
            dispatch(&script, &event, HostEvent::KeyDown { key });
        });

        let click_fn: Function = click.as_ref().unchecked_ref::<Function>().clone();
        let keydown_fn: Function = keydown.as_ref().unchecked_ref::<Function>().clone();
        if let Ok(mut shared) = self.script.try_borrow_mut() {
            shared.host_mut().bind_selection(click_fn, keydown_fn);
        }
        self.selection.push(click);
        self.selection.push(keydown);
    }

    fn observe_mutations(&mut self) -> Result<(), JsValue> {
        let script = Rc::clone(&self.script);
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |_records: js_sys::Array, _observer: MutationObserver| {
                if let Ok(mut script) = script.try_borrow_mut() {
                    script.dispatch(HostEvent::DocumentMutated);
                }
            },
        );
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        let root = self
            .script
            .try_borrow()
            .map_err(|_| JsValue::from_str("content script busy"))?
            .host()
            .document
            .clone();
        observer.observe_with_options(&root, &init)?;
        self.navigation = Some(NavigationObserver {
            observer,
            _callback: callback,
        });
        Ok(())
    }
}

impl Drop for VidliftContentScript {
    fn drop(&mut self) {
        self.dispose();
    }
}
