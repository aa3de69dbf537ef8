//! Browser entry point: DOM surfaces, localStorage, history and fetch
//! collaborators, and the event wiring of the edit page.

use std::future::Future;
use std::time::Duration;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Document, Element, Event, HtmlElement, HtmlImageElement, HtmlInputElement, KeyboardEvent,
    Request, RequestInit, RequestMode, Response, Storage, WheelEvent, Window,
};

use crate::config::EditorConfig;
use crate::constants::panels;
use crate::context::EditorContext;
use crate::error::EditorError;
use crate::model::{Page, PageId, PartEndpoint};
use crate::navigator::{LoadOutcome, Location, PageSource};
use crate::panel::{Overlay, OverlayKind, Surface};
use crate::shell::{EditorShell, KeyAction};
use crate::viewport::ViewportState;
use crate::visibility::{KeyValueStore, MemoryStore, PanelVisibilityStore, now_ms};

/// Zoom change per wheel notch.
const WHEEL_STEP: f32 = 0.1;

type Shell = EditorShell<FetchPageSource>;

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

// ============================================================================
// Surfaces
// ============================================================================

/// A panel container (or toolbar) element.
///
/// The container holds a `.panel-viewport` element that receives the CSS
/// transform; the image and overlay layer live inside it and are created on
/// first use.
pub struct DomSurface {
    root: HtmlElement,
    document: Document,
    viewport: Option<HtmlElement>,
    image: Option<HtmlImageElement>,
    overlays: Option<Element>,
}

impl DomSurface {
    pub fn new(document: &Document, root: HtmlElement) -> Self {
        Self {
            root,
            document: document.clone(),
            viewport: None,
            image: None,
            overlays: None,
        }
    }

    /// Surface for the element with `id`, or a detached one if it is missing.
    pub fn boxed(document: &Document, id: &str) -> Box<dyn Surface> {
        match document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
        {
            Some(root) => Box::new(Self::new(document, root)),
            None => {
                log::warn!("No element #{}, panel output is discarded", id);
                Box::new(DetachedSurface)
            }
        }
    }

    fn child(&self, parent: &Element, selector: &str, tag: &str, class: &str) -> Option<Element> {
        if let Ok(Some(found)) = parent.query_selector(selector) {
            return Some(found);
        }
        let created = self.document.create_element(tag).ok()?;
        created.set_class_name(class);
        parent.append_child(&created).ok()?;
        Some(created)
    }

    fn viewport_element(&mut self) -> Option<HtmlElement> {
        if self.viewport.is_none() {
            self.viewport = self
                .child(&self.root, ".panel-viewport", "div", "panel-viewport")
                .and_then(|e| e.dyn_into().ok());
        }
        self.viewport.clone()
    }

    fn image_element(&mut self) -> Option<HtmlImageElement> {
        if self.image.is_none() {
            let viewport = self.viewport_element()?;
            self.image = self
                .child(&viewport, "img", "img", "panel-image")
                .and_then(|e| e.dyn_into().ok());
        }
        self.image.clone()
    }

    fn overlay_element(&mut self) -> Option<Element> {
        if self.overlays.is_none() {
            let viewport = self.viewport_element()?;
            self.overlays = self.child(&viewport, ".panel-overlays", "div", "panel-overlays");
        }
        self.overlays.clone()
    }
}

impl Surface for DomSurface {
    fn show(&mut self) {
        if let Err(e) = self.root.style().remove_property("display") {
            log::warn!("Failed to show #{}: {}", self.root.id(), js_message(&e));
        }
    }

    fn hide(&mut self) {
        if let Err(e) = self.root.style().set_property("display", "none") {
            log::warn!("Failed to hide #{}: {}", self.root.id(), js_message(&e));
        }
    }

    fn size(&self) -> (f32, f32) {
        (
            self.root.client_width() as f32,
            self.root.client_height() as f32,
        )
    }

    fn set_image(&mut self, uri: &str) {
        if let Some(image) = self.image_element() {
            image.set_src(uri);
        }
    }

    fn apply_transform(&mut self, viewport: &ViewportState) {
        if let Some(element) = self.viewport_element() {
            let style = element.style();
            let _ = style.set_property("transform-origin", "0 0");
            let _ = style.set_property("transform", &viewport.css_transform());
        }
    }

    fn draw_overlays(&mut self, overlays: &[Overlay]) {
        let Some(layer) = self.overlay_element() else {
            return;
        };
        let html: String = overlays
            .iter()
            .map(|o| {
                let class = match o.kind {
                    OverlayKind::Block => "overlay-block",
                    OverlayKind::Line => "overlay-line",
                };
                format!(
                    r#"<div class="{}" data-id="{}" style="position:absolute;left:{}px;top:{}px;width:{}px;height:{}px"></div>"#,
                    class,
                    o.id,
                    o.rect.x1,
                    o.rect.y1,
                    o.rect.x2 - o.rect.x1,
                    o.rect.y2 - o.rect.y1
                )
            })
            .collect();
        layer.set_inner_html(&html);
    }
}

/// Stand-in for a panel whose container is missing from the page.
struct DetachedSurface;

impl Surface for DetachedSurface {
    fn show(&mut self) {}

    fn hide(&mut self) {}
}

// ============================================================================
// Collaborators
// ============================================================================

/// `localStorage` with expiry kept under a sibling `<key>.expires` entry.
pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn expires_key(key: &str) -> String {
        format!("{key}.expires")
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        let expires_at = self
            .storage
            .get_item(&Self::expires_key(key))
            .ok()
            .flatten()
            .and_then(|v| v.parse::<u64>().ok());
        if expires_at.is_some_and(|at| now_ms() >= at) {
            return None;
        }
        self.storage.get_item(key).ok().flatten()
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires_in: Option<Duration>,
    ) -> Result<(), EditorError> {
        let storage_error = |e: JsValue| EditorError::Storage(js_message(&e));
        self.storage.set_item(key, value).map_err(storage_error)?;
        let expires_key = Self::expires_key(key);
        match expires_in {
            Some(d) => {
                let at = now_ms().saturating_add(d.as_millis() as u64);
                self.storage
                    .set_item(&expires_key, &at.to_string())
                    .map_err(storage_error)
            }
            None => self
                .storage
                .remove_item(&expires_key)
                .map_err(storage_error),
        }
    }
}

/// Address bar, updated through the History API.
pub struct BrowserLocation {
    window: Window,
}

impl BrowserLocation {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Location for BrowserLocation {
    fn href(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn push(&mut self, url: &str) {
        let pushed = self
            .window
            .history()
            .and_then(|h| h.push_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = pushed {
            log::warn!("Failed to update address to {}: {}", url, js_message(&e));
        }
    }
}

/// Part records from the REST endpoint; images through `<img>` preloading.
pub struct FetchPageSource {
    endpoint: PartEndpoint,
}

impl FetchPageSource {
    pub fn new(endpoint: PartEndpoint) -> Self {
        Self { endpoint }
    }
}

async fn fetch_text(url: &str, id: PageId) -> Result<String, EditorError> {
    let fail = |e: JsValue| EditorError::fetch(id, js_message(&e));
    let window = web_sys::window().ok_or_else(|| EditorError::fetch(id, "no window"))?;

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_mode(RequestMode::SameOrigin);
    let request = Request::new_with_str_and_init(url, &init).map_err(fail)?;

    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(fail)?
        .dyn_into()
        .map_err(fail)?;
    if !response.ok() {
        return Err(EditorError::fetch(id, format!("HTTP {}", response.status())));
    }
    let text = JsFuture::from(response.text().map_err(fail)?)
        .await
        .map_err(fail)?;
    text.as_string()
        .ok_or_else(|| EditorError::fetch(id, "response body is not text"))
}

impl PageSource for FetchPageSource {
    fn fetch_page(&self, id: PageId) -> impl Future<Output = Result<Page, EditorError>> {
        let url = self.endpoint.url(id);
        async move {
            let json = fetch_text(&url, id).await?;
            Ok(Page::from_json(&json)?)
        }
    }

    fn preload_image(
        &self,
        page_id: PageId,
        uri: &str,
    ) -> impl Future<Output = Result<(), EditorError>> {
        let uri = uri.to_string();
        async move {
            let fail = |e: JsValue| EditorError::fetch(page_id, js_message(&e));
            let image = HtmlImageElement::new().map_err(fail)?;
            let loaded = js_sys::Promise::new(&mut |resolve, reject| {
                image.set_onload(Some(&resolve));
                image.set_onerror(Some(&reject));
            });
            image.set_src(&uri);
            JsFuture::from(loaded)
                .await
                .map_err(|_| EditorError::fetch(page_id, format!("image {} failed to load", uri)))?;
            Ok(())
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = EditorConfig::load_from_local_storage().unwrap_or_default();
    if console_log::init_with_level(config.log_level.to_level()).is_err() {
        web_sys::console::log_1(&"Logger already initialized".into());
    }

    if let Err(e) = mount(config) {
        log::error!("Editor failed to start: {}", js_message(&e));
    }
}

/// Read `data-<name>` from the `#part-edit` element (or `<body>`).
fn page_attribute(document: &Document, name: &str) -> Option<u64> {
    let host: Element = document
        .get_element_by_id("part-edit")
        .or_else(|| document.body().map(Into::into))?;
    host.get_attribute(&format!("data-{name}"))?.parse().ok()
}

fn mount(mut config: EditorConfig) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    if let Some(document_id) = page_attribute(&document, "document") {
        config.document_id = document_id;
    }
    let start_part = page_attribute(&document, "part");

    let backend: Box<dyn KeyValueStore> = match window.local_storage() {
        Ok(Some(storage)) => Box::new(LocalStorageStore::new(storage)),
        _ => {
            log::warn!("localStorage unavailable, panel visibility will not persist");
            Box::new(MemoryStore::new())
        }
    };
    let visibility = PanelVisibilityStore::with_expiry_days(backend, config.visibility_expiry_days);

    let endpoint = config.endpoint();
    let mut context = EditorContext::new(
        config,
        visibility,
        Box::new(BrowserLocation::new(window.clone())),
    );
    context
        .add_standard_panels(|name| {
            (
                DomSurface::boxed(&document, &panels::container_id(name)),
                DomSurface::boxed(&document, &panels::tools_id(name)),
            )
        })
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    style_toggle_buttons(&document, &context);
    bind_slider_display(&document, &mut context);

    let shell = EditorShell::new(context, FetchPageSource::new(endpoint));
    bind_keys(&document, &shell)?;
    bind_toggle_buttons(&document, &shell)?;
    bind_zoom_controls(&document, &shell)?;
    bind_wheel(&document, &shell)?;
    bind_navigation_buttons(&document, &shell)?;
    bind_resize(&window, &shell)?;

    match start_part {
        Some(id) => spawn_load(&shell, PageId(id)),
        None => log::warn!("No part id on the page; nothing to load"),
    }
    Ok(())
}

fn listen<E, F>(target: &web_sys::EventTarget, event: &str, mut handler: F) -> Result<(), JsValue>
where
    E: JsCast,
    F: FnMut(E) + 'static,
{
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        if let Ok(event) = event.dyn_into::<E>() {
            handler(event);
        }
    });
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    // Listeners live as long as the page
    closure.forget();
    Ok(())
}

fn report(error: &EditorError) {
    log::error!("{}", error);
}

fn spawn_full_resolution(shell: &Shell) {
    let shell = shell.clone();
    spawn_local(async move {
        if let Err(e) = shell.fetch_full_resolution().await {
            report(&e);
        }
    });
}

fn spawn_load(shell: &Shell, id: PageId) {
    let shell = shell.clone();
    spawn_local(async move {
        match shell.load_page(id).await {
            Ok(LoadOutcome::Loaded(_)) => {
                show_nav(&shell);
                spawn_full_resolution(&shell);
            }
            Ok(LoadOutcome::Stale) => {}
            Err(e) => report(&e),
        }
    });
}

/// Title, filename label and previous/next button state.
fn show_nav(shell: &Shell) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let nav = shell.nav();
    if let Some(title) = document.get_element_by_id("part-title") {
        title.set_text_content(Some(&nav.title));
    }
    if let Some(label) = document.get_element_by_id("part-filename") {
        label.set_text_content(Some(&nav.filename_label));
    }
    for (id, target) in [("prev-part", nav.previous), ("next-part", nav.next)] {
        if let Some(button) = document.get_element_by_id(id) {
            let _ = match target {
                Some(_) => button.remove_attribute("disabled"),
                None => button.set_attribute("disabled", ""),
            };
        }
    }
}

fn bind_keys(document: &Document, shell: &Shell) -> Result<(), JsValue> {
    let shell = shell.clone();
    listen(document, "keydown", move |event: KeyboardEvent| {
        let action = shell.handle_key(event.key_code());
        if action.prevent_default() {
            event.prevent_default();
        }
        if let KeyAction::Navigate(id) = action {
            spawn_load(&shell, id);
        }
    })
}

fn set_button_state(document: &Document, name: &str, open: bool) {
    let selector = format!(r#".open-panel[data-target="{}"]"#, name);
    if let Ok(Some(button)) = document.query_selector(&selector) {
        let classes = button.class_list();
        let _ = classes.toggle_with_force("btn-primary", open);
        let _ = classes.toggle_with_force("btn-secondary", !open);
    }
}

/// Keep `.open-panel` buttons styled after the persisted flags.
fn style_toggle_buttons(document: &Document, context: &EditorContext) {
    for panel in context.panels().iter() {
        let panel = panel.borrow();
        set_button_state(document, panel.name(), panel.is_open());
    }
    let document = document.clone();
    context
        .visibility()
        .subscribe(move |change| set_button_state(&document, &change.panel, change.open));
}

fn bind_toggle_buttons(document: &Document, shell: &Shell) -> Result<(), JsValue> {
    let buttons = document.query_selector_all(".open-panel")?;
    for i in 0..buttons.length() {
        let Some(button) = buttons.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
            continue;
        };
        let Some(name) = button.get_attribute("data-target") else {
            continue;
        };
        let shell = shell.clone();
        listen(&button, "click", move |_: Event| {
            if let Err(e) = shell.toggle_panel(&name) {
                report(&e);
            }
        })?;
    }
    Ok(())
}

fn zoom_input(document: &Document) -> Option<HtmlInputElement> {
    document
        .get_element_by_id("zoom-range")?
        .dyn_into::<HtmlInputElement>()
        .ok()
}

/// Mirror the viewport scale into the range input.
fn bind_slider_display(document: &Document, context: &mut EditorContext) {
    let Some(input) = zoom_input(document) else {
        return;
    };
    let viewport = context.viewport();
    input.set_min(&viewport.min_scale().to_string());
    input.set_max(&viewport.max_scale().to_string());
    input.set_step(&context.config().slider_step.to_string());
    input.set_value(&viewport.scale().to_string());
    context
        .viewport_mut()
        .subscribe(move |state| input.set_value(&state.scale.to_string()));
}

fn bind_zoom_controls(document: &Document, shell: &Shell) -> Result<(), JsValue> {
    if let Some(input) = zoom_input(document) {
        let shell = shell.clone();
        let target = input.clone();
        listen(&input, "input", move |_: Event| {
            let value = target.value_as_number() as f32;
            if value.is_finite() && shell.slider_input(value) {
                spawn_full_resolution(&shell);
            }
        })?;
    }
    if let Some(reset) = document.get_element_by_id("zoom-reset") {
        let shell = shell.clone();
        listen(&reset, "click", move |_: Event| shell.reset_zoom())?;
    }
    Ok(())
}

fn bind_wheel(document: &Document, shell: &Shell) -> Result<(), JsValue> {
    for name in [panels::SOURCE, panels::SEGMENTATION, panels::TRANSCRIPTION] {
        let Some(container) = document.get_element_by_id(&panels::container_id(name)) else {
            continue;
        };
        let shell = shell.clone();
        let target = container.clone();
        listen(&container, "wheel", move |event: WheelEvent| {
            if !event.ctrl_key() {
                return;
            }
            event.prevent_default();
            let delta = if event.delta_y() < 0.0 {
                WHEEL_STEP
            } else {
                -WHEEL_STEP
            };
            // offset_x/y are relative to the innermost (transformed) target
            let rect = target.get_bounding_client_rect();
            let anchor = (
                (event.client_x() as f64 - rect.left()) as f32,
                (event.client_y() as f64 - rect.top()) as f32,
            );
            if shell.wheel_over(name, anchor, delta) {
                spawn_full_resolution(&shell);
            }
        })?;
    }
    Ok(())
}

fn bind_navigation_buttons(document: &Document, shell: &Shell) -> Result<(), JsValue> {
    if let Some(prev) = document.get_element_by_id("prev-part") {
        let shell = shell.clone();
        listen(&prev, "click", move |event: Event| {
            event.prevent_default();
            if let Some(id) = shell.nav().previous {
                spawn_load(&shell, id);
            }
        })?;
    }
    if let Some(next) = document.get_element_by_id("next-part") {
        let shell = shell.clone();
        listen(&next, "click", move |event: Event| {
            event.prevent_default();
            if let Some(id) = shell.nav().next {
                spawn_load(&shell, id);
            }
        })?;
    }
    Ok(())
}

fn bind_resize(window: &Window, shell: &Shell) -> Result<(), JsValue> {
    let shell = shell.clone();
    listen(window, "resize", move |_: Event| shell.resize())
}
