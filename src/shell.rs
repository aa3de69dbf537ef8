//! Input wiring: keyboard shortcuts, zoom slider, panel toggles and the async
//! page load around [`EditorContext`].
//!
//! The shell is cheap to clone so event handlers can each hold one. The
//! context is only borrowed between awaits, never across one.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::keys;
use crate::context::EditorContext;
use crate::error::EditorError;
use crate::image_loader::ImageOutcome;
use crate::model::PageId;
use crate::navigator::{LoadOutcome, NavState, PageSource};

/// What a key press resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Load this page
    Navigate(PageId),
    /// A navigation key with nowhere to go
    Consumed,
    /// Not ours
    Ignored,
}

impl KeyAction {
    /// Whether the browser's default handling (page scroll) must be suppressed.
    pub fn prevent_default(&self) -> bool {
        !matches!(self, KeyAction::Ignored)
    }
}

pub struct EditorShell<S: PageSource> {
    context: Rc<RefCell<EditorContext>>,
    source: Rc<S>,
}

impl<S: PageSource> Clone for EditorShell<S> {
    fn clone(&self) -> Self {
        Self {
            context: Rc::clone(&self.context),
            source: Rc::clone(&self.source),
        }
    }
}

impl<S: PageSource> EditorShell<S> {
    pub fn new(context: EditorContext, source: S) -> Self {
        Self {
            context: Rc::new(RefCell::new(context)),
            source: Rc::new(source),
        }
    }

    /// Shared context, for wiring that needs more than the shell exposes.
    pub fn context(&self) -> &Rc<RefCell<EditorContext>> {
        &self.context
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and bind a page. Superseded loads resolve as
    /// [`LoadOutcome::Stale`]; failures leave the current page in place.
    pub async fn load_page(&self, id: PageId) -> Result<LoadOutcome, EditorError> {
        let ticket = self.context.borrow_mut().begin_load(id);
        let result = self.source.fetch_page(id).await;
        self.context.borrow_mut().finish_load(ticket, result)
    }

    /// Load the previous page, if there is one.
    pub async fn previous_page(&self) -> Result<Option<LoadOutcome>, EditorError> {
        let target = self.context.borrow().navigator().previous_target();
        match target {
            Some(id) => self.load_page(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Load the next page, if there is one.
    pub async fn next_page(&self) -> Result<Option<LoadOutcome>, EditorError> {
        let target = self.context.borrow().navigator().next_target();
        match target {
            Some(id) => self.load_page(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the full resolution image if the zoom level calls for it.
    /// Returns `None` when nothing needed fetching.
    pub async fn fetch_full_resolution(&self) -> Result<Option<ImageOutcome>, EditorError> {
        let request = self.context.borrow_mut().full_resolution_request();
        let Some(request) = request else {
            return Ok(None);
        };
        let result = self
            .source
            .preload_image(request.page_id(), &request.uri)
            .await;
        self.context
            .borrow_mut()
            .complete_full_resolution(&request, result)
            .map(Some)
    }

    /// Map a key code to a navigation action.
    pub fn handle_key(&self, key_code: u32) -> KeyAction {
        let ctx = self.context.borrow();
        let target = match key_code {
            keys::PAGE_UP => ctx.navigator().previous_target(),
            keys::PAGE_DOWN => ctx.navigator().next_target(),
            _ => return KeyAction::Ignored,
        };
        target.map_or(KeyAction::Consumed, KeyAction::Navigate)
    }

    pub fn nav(&self) -> NavState {
        self.context.borrow().navigator().nav().clone()
    }

    /// `(min, max, value)` for the zoom range input.
    pub fn slider_range(&self) -> (f32, f32, f32) {
        let ctx = self.context.borrow();
        let viewport = ctx.viewport();
        (viewport.min_scale(), viewport.max_scale(), viewport.scale())
    }

    pub fn slider_step(&self) -> f32 {
        self.context.borrow().config().slider_step
    }

    pub fn slider_input(&self, value: f32) -> bool {
        self.context.borrow_mut().slider_input(value)
    }

    /// Zoom by `delta` around a pointer position on the active panel.
    pub fn wheel(&self, anchor: (f32, f32), delta: f32) -> bool {
        self.context.borrow_mut().zoom_at(anchor, delta)
    }

    /// Name of the panel zoom input is anchored to.
    pub fn active_panel(&self) -> Option<String> {
        let context = self.context.borrow();
        let active = context.panels().active()?;
        let name = active.borrow().name().to_string();
        Some(name)
    }

    /// Wheel zoom over `panel`, with `anchor` relative to that panel's
    /// surface. Ignored unless `panel` is the active one.
    pub fn wheel_over(&self, panel: &str, anchor: (f32, f32), delta: f32) -> bool {
        if self.active_panel().as_deref() != Some(panel) {
            log::trace!("Wheel over inactive panel '{}' ignored", panel);
            return false;
        }
        self.wheel(anchor, delta)
    }

    pub fn pan_by(&self, dx: f32, dy: f32) {
        self.context.borrow_mut().pan_by(dx, dy);
    }

    pub fn reset_zoom(&self) {
        self.context.borrow_mut().reset_zoom();
    }

    pub fn toggle_panel(&self, name: &str) -> Result<bool, EditorError> {
        self.context.borrow_mut().toggle_panel(name)
    }

    pub fn resize(&self) {
        self.context.borrow_mut().resize();
    }
}
