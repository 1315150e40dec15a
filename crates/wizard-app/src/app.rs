//! Browser chat page: binds DOM controls to the chat runtime and repaints
//! the projection on a timer.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlButtonElement, HtmlTextAreaElement, KeyboardEvent};

use wizard_core::event_bus::EventBus;
use wizard_core::images::{resolve, ImageRef};
use wizard_core::ports::{AssetPort, ChatTransport, StoragePort};
use wizard_core::runtime::ChatRuntime;
use wizard_platform::assets::HttpAssetFetcher;
use wizard_platform::storage::auto_detect_storage;
use wizard_platform::transport::HttpChatTransport;
use wizard_types::config::{ChatConfig, StorageKeys};
use wizard_types::{ChatError, Result};
use wizard_ui::state::UiState;

const REPAINT_INTERVAL_MS: u32 = 50;

/// The page's controls
struct Dom {
    log: Element,
    input: HtmlTextAreaElement,
    send: HtmlButtonElement,
    stop: HtmlButtonElement,
    new_chat: HtmlButtonElement,
    list: Element,
    status: Element,
}

impl Dom {
    fn find(document: &Document) -> Result<Self> {
        Ok(Self {
            log: element(document, "chat-log")?,
            input: typed(document, "chat-input")?,
            send: typed(document, "send-btn")?,
            stop: typed(document, "stop-btn")?,
            new_chat: typed(document, "new-chat-btn")?,
            list: element(document, "conversation-list")?,
            status: element(document, "status-line")?,
        })
    }

    fn paint(&self, ui: &UiState) {
        self.list.set_inner_html(&ui.conversations_html());
        self.log.set_inner_html(&ui.messages_html());
        if ui.is_streaming_here() {
            self.log.set_scroll_top(self.log.scroll_height());
        }

        let status = match &ui.progress {
            Some(progress) => format!("{} {}", ui.status_text, progress),
            None => ui.status_text.clone(),
        };
        self.status.set_text_content(Some(&status));

        self.send.set_disabled(ui.is_busy());
        self.stop.set_hidden(!ui.is_streaming_here());
    }
}

fn element(document: &Document, id: &str) -> Result<Element> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| ChatError::Config(format!("missing #{} element", id)))
}

fn typed<T: JsCast>(document: &Document, id: &str) -> Result<T> {
    element(document, id)?
        .dyn_into::<T>()
        .map_err(|_| ChatError::JsInterop(format!("#{} has an unexpected element type", id)))
}

/// The main application state
#[derive(Clone)]
pub struct ChatApp {
    inner: Rc<AppInner>,
}

struct AppInner {
    runtime: ChatRuntime,
    transport: Rc<dyn ChatTransport>,
    assets: Rc<dyn AssetPort>,
    ui_state: RefCell<UiState>,
    dom: Dom,
}

impl ChatApp {
    pub async fn mount(document: &Document) -> Result<Self> {
        let dom = Dom::find(document)?;
        let storage = auto_detect_storage();
        let config = restore_config(storage.as_ref()).await;

        let transport: Rc<dyn ChatTransport> =
            Rc::new(HttpChatTransport::new(config.endpoints.clone()));
        let assets: Rc<dyn AssetPort> = Rc::new(HttpAssetFetcher::new());
        let runtime = ChatRuntime::load(config, storage, EventBus::new()).await;

        let app = Self {
            inner: Rc::new(AppInner {
                runtime,
                transport,
                assets,
                ui_state: RefCell::new(UiState::new()),
                dom,
            }),
        };
        app.bind_controls();
        Ok(app)
    }

    /// Paint once and keep repainting whenever the runtime reports changes.
    pub fn start(&self) {
        self.tick();
        let app = self.clone();
        Interval::new(REPAINT_INTERVAL_MS, move || app.tick()).forget();
        log::info!("Chat UI mounted");
    }

    fn tick(&self) {
        let inner = &self.inner;
        let events = inner.runtime.event_bus.drain();

        let unresolved = {
            let mut ui = inner.ui_state.borrow_mut();
            if !ui.process_events(events) {
                return;
            }
            ui.refresh(&inner.runtime);
            inner.dom.paint(&ui);
            ui.take_unresolved()
        };

        for image in unresolved {
            self.resolve_image(image);
        }
    }

    /// Resolve one image slot in its own task so slow lookups never block
    /// the others.
    fn resolve_image(&self, image: ImageRef) {
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let inner = &app.inner;
            let resolved = resolve(&image, inner.assets.as_ref(), &inner.runtime.config.assets).await;
            inner.ui_state.borrow_mut().set_resolved(&image, resolved);
        });
    }

    fn submit(&self) {
        let inner = &self.inner;
        let text = inner.dom.input.value();
        if text.trim().is_empty() || inner.runtime.is_generating() {
            return;
        }
        inner.dom.input.set_value("");

        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let inner = &app.inner;
            match inner.runtime.send(&text, inner.transport.as_ref()).await {
                Ok(Some(outcome)) => log::debug!("Reply finished: {:?}", outcome.reason),
                Ok(None) => {}
                Err(e) => log::error!("Send failed: {}", e),
            }
        });
    }

    fn bind_controls(&self) {
        let dom = &self.inner.dom;

        let app = self.clone();
        on(dom.send.as_ref(), "click", move |_| app.submit());

        let app = self.clone();
        on(dom.input.as_ref(), "keydown", move |event| {
            let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if key.key() == "Enter" && !key.shift_key() {
                event.prevent_default();
                app.submit();
            }
        });

        let app = self.clone();
        on(dom.stop.as_ref(), "click", move |_| app.inner.runtime.cancel());

        let app = self.clone();
        on(dom.new_chat.as_ref(), "click", move |_| {
            let app = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                app.inner.runtime.create_conversation().await;
            });
        });

        let app = self.clone();
        on(dom.list.as_ref(), "click", move |event| app.on_list_click(&event));
    }

    /// Sidebar clicks are delegated: rename and delete buttons first, then
    /// the row itself.
    fn on_list_click(&self, event: &Event) {
        let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };
        let closest_id = |selector: &str| {
            target
                .closest(selector)
                .ok()
                .flatten()
                .and_then(|el| el.get_attribute("data-id"))
        };

        let app = self.clone();
        if let Some(id) = closest_id(".delete-btn") {
            event.stop_propagation();
            let confirmed = gloo_utils::window()
                .confirm_with_message("Delete this conversation?")
                .unwrap_or(false);
            if confirmed {
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = app.inner.runtime.delete(&id).await {
                        log::warn!("Delete rejected: {}", e);
                    }
                });
            }
        } else if let Some(id) = closest_id(".rename-btn") {
            event.stop_propagation();
            let current = self
                .inner
                .runtime
                .store()
                .get(&id)
                .map(|c| c.title.clone())
                .unwrap_or_default();
            let input = gloo_utils::window()
                .prompt_with_message_and_default("Rename conversation", &current)
                .ok()
                .flatten();
            if let Some(input) = input {
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = app.inner.runtime.rename(&id, &input).await {
                        log::warn!("Rename rejected: {}", e);
                    }
                });
            }
        } else if let Some(id) = closest_id("li.conversation") {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = app.inner.runtime.switch_to(&id).await {
                    log::warn!("Switch rejected: {}", e);
                }
            });
        }
    }
}

/// Attach a listener for the lifetime of the page.
fn on(target: &web_sys::EventTarget, kind: &str, handler: impl FnMut(Event) + 'static) {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    if let Err(e) = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref()) {
        log::error!("Could not bind {} listener: {:?}", kind, e);
    }
    closure.forget();
}

/// Restore config from storage, falling back to defaults.
async fn restore_config(storage: &dyn StoragePort) -> ChatConfig {
    let key = StorageKeys::default().config;
    match storage.get(&key).await {
        Ok(Some(json)) => match serde_json::from_str::<ChatConfig>(&json) {
            Ok(config) => {
                log::info!("Config restored from storage");
                config
            }
            Err(e) => {
                log::warn!("Ignoring malformed stored config: {}", e);
                ChatConfig::default()
            }
        },
        Ok(None) => {
            let config = ChatConfig::default();
            save_config(storage, &key, &config).await;
            config
        }
        Err(e) => {
            log::warn!("Could not read stored config: {}", e);
            ChatConfig::default()
        }
    }
}

/// Write the config so it can be edited in place; failures only log.
async fn save_config(storage: &dyn StoragePort, key: &str, config: &ChatConfig) {
    let result = match serde_json::to_string(config) {
        Ok(json) => storage.set(key, &json).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(()) => log::info!("Config saved to storage"),
        Err(e) => log::warn!("Could not save config: {}", e),
    }
}
