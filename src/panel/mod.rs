//! Panels: independently toggleable surfaces bound to the current page.
//!
//! [`Panel`] carries the behavior every panel shares (visibility, persistence,
//! page binding, `on_show` bookkeeping). What a panel actually draws lives in
//! a [`PanelContent`] implementation: [`SourcePanel`], [`SegmentationPanel`]
//! or [`TranscriptionPanel`].

mod registry;
mod segmentation;
mod source;
mod transcription;

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub use registry::{PanelHandle, PanelRegistry};
pub use segmentation::{ColorMode, LineMove, SegmentationPanel};
pub use source::SourcePanel;
pub use transcription::TranscriptionPanel;

use crate::error::EditorError;
use crate::model::{BoxRect, Page, PageId, PartEndpoint};
use crate::observer::SubscriptionId;
use crate::viewport::{ViewportController, ViewportState};
use crate::visibility::PanelVisibilityStore;

/// What an overlay box outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Block,
    Line,
}

/// A box drawn over the page image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub id: u64,
    pub kind: OverlayKind,
    pub rect: BoxRect,
}

/// Opaque render surface (a DOM container, a toolbar, a test double).
///
/// Only `show`/`hide` are required; toolbars ignore the rest.
pub trait Surface {
    fn show(&mut self);

    fn hide(&mut self);

    /// Client size in surface pixels.
    fn size(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn set_image(&mut self, _uri: &str) {}

    fn apply_transform(&mut self, _viewport: &ViewportState) {}

    /// Replace all drawn overlays.
    fn draw_overlays(&mut self, _overlays: &[Overlay]) {}
}

/// Variant-specific panel behavior.
pub trait PanelContent: Any {
    /// Derive per-page state from a newly bound page.
    fn on_load(&mut self, _page: &Page) {}

    /// Render the bound page; runs once each time the panel becomes visible
    /// for a page.
    fn on_show(&mut self, page: &Page, surface: &mut dyn Surface, viewport: &ViewportState);

    /// Re-render against the current viewport without touching data.
    fn refresh(&mut self, surface: &mut dyn Surface, viewport: &ViewportState);

    /// Discard in-progress edits and restore a pristine view of `page`.
    fn reset(&mut self, page: &Page, surface: &mut dyn Surface, viewport: &ViewportState);

    /// A full resolution image for the bound page is available. Returns
    /// whether the panel switched to it.
    fn on_full_resolution(&mut self, _uri: &str, _surface: &mut dyn Surface) -> bool {
        false
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// One visual surface bound to the current page.
pub struct Panel {
    name: String,
    opened: bool,
    page: Option<Rc<Page>>,
    api: Option<String>,
    endpoint: PartEndpoint,
    viewport: ViewportState,
    /// Page `on_show` last ran for while visible
    shown_for: Option<PageId>,
    surface: Box<dyn Surface>,
    tools: Box<dyn Surface>,
    store: Rc<PanelVisibilityStore>,
    subscription: Option<SubscriptionId>,
    content: Box<dyn PanelContent>,
}

impl Panel {
    /// Create a panel; its initial visibility comes from the store.
    pub fn new(
        name: impl Into<String>,
        content: Box<dyn PanelContent>,
        mut surface: Box<dyn Surface>,
        mut tools: Box<dyn Surface>,
        store: Rc<PanelVisibilityStore>,
        endpoint: PartEndpoint,
    ) -> Self {
        let name = name.into();
        let opened = store.is_open(&name);
        if opened {
            surface.show();
            tools.show();
        } else {
            surface.hide();
            tools.hide();
        }
        log::debug!("Panel '{}' created (open: {})", name, opened);

        Self {
            name,
            opened,
            page: None,
            api: None,
            endpoint,
            viewport: ViewportState::identity(),
            shown_for: None,
            surface,
            tools,
            store,
            subscription: None,
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Currently bound page.
    pub fn page(&self) -> Option<&Rc<Page>> {
        self.page.as_ref()
    }

    /// Per-page API endpoint, derived on load.
    pub fn api(&self) -> Option<&str> {
        self.api.as_deref()
    }

    pub fn surface_size(&self) -> (f32, f32) {
        self.surface.size()
    }

    /// Viewport state last delivered to this panel.
    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    /// Downcast the content to a concrete panel type.
    pub fn content_mut<T: PanelContent>(&mut self) -> Option<&mut T> {
        self.content.as_any_mut().downcast_mut::<T>()
    }

    /// Bind to a page. Binding the same page again does nothing.
    pub fn load(&mut self, page: Rc<Page>) {
        if let Some(current) = &self.page {
            if Rc::ptr_eq(current, &page) || **current == *page {
                return;
            }
        }
        self.api = Some(self.endpoint.url(page.id));
        self.content.on_load(&page);
        self.page = Some(page);
        self.shown_for = None;
        if self.opened {
            self.show_content();
        }
    }

    /// Make the panel visible. Calling it while open is a no-op.
    ///
    /// The panel stays open if persisting the flag fails; the storage error
    /// is returned.
    pub fn open(&mut self) -> Result<(), EditorError> {
        if self.opened {
            return Ok(());
        }
        self.opened = true;
        self.surface.show();
        self.tools.show();
        log::debug!("Panel '{}' opened", self.name);
        self.show_content();
        self.store.set(&self.name, true)
    }

    /// Hide the panel. Calling it while closed is a no-op. A storage error
    /// is returned after the panel is hidden.
    pub fn close(&mut self) -> Result<(), EditorError> {
        if !self.opened {
            return Ok(());
        }
        self.opened = false;
        self.shown_for = None;
        self.surface.hide();
        self.tools.hide();
        log::debug!("Panel '{}' closed", self.name);
        self.store.set(&self.name, false)
    }

    pub fn toggle(&mut self) -> Result<(), EditorError> {
        if self.opened {
            self.close()
        } else {
            self.open()
        }
    }

    /// Re-render against the current viewport; data is untouched.
    pub fn refresh(&mut self) {
        if self.opened && self.shown_for.is_some() {
            self.content.refresh(self.surface.as_mut(), &self.viewport);
        }
    }

    /// Drop edit state and redraw the bound page as fetched.
    pub fn reset(&mut self) {
        if let Some(page) = &self.page {
            self.content
                .reset(page, self.surface.as_mut(), &self.viewport);
        }
    }

    /// Run `on_show` again for the bound page (e.g. after a mode switch).
    pub fn reshow(&mut self) {
        self.shown_for = None;
        if self.opened {
            self.show_content();
        }
    }

    /// Viewport change delivered by the controller.
    pub fn on_viewport(&mut self, viewport: &ViewportState) {
        self.viewport = *viewport;
        self.refresh();
    }

    /// Offer a full resolution image for `page_id`. Ignored if the panel is
    /// bound to another page.
    pub fn full_resolution(&mut self, page_id: PageId, uri: &str) -> bool {
        if self.page.as_ref().map(|p| p.id) != Some(page_id) {
            return false;
        }
        self.content.on_full_resolution(uri, self.surface.as_mut())
    }

    fn show_content(&mut self) {
        let Some(page) = &self.page else {
            return;
        };
        if self.shown_for == Some(page.id) {
            return;
        }
        self.content
            .on_show(page, self.surface.as_mut(), &self.viewport);
        self.shown_for = Some(page.id);
    }

    /// Subscribe a shared panel to viewport changes.
    pub fn attach(handle: &PanelHandle, viewport: &mut ViewportController) {
        let weak: Weak<RefCell<Panel>> = Rc::downgrade(handle);
        let initial = viewport.state();
        let id = viewport.subscribe(move |state| {
            let Some(panel) = weak.upgrade() else {
                return;
            };
            match panel.try_borrow_mut() {
                Ok(mut panel) => panel.on_viewport(state),
                Err(_) => log::warn!("Panel busy, skipped viewport update"),
            };
        });
        let mut panel = handle.borrow_mut();
        panel.viewport = initial;
        panel.subscription = Some(id);
    }

    /// Undo [`attach`](Self::attach).
    pub fn detach(&mut self, viewport: &mut ViewportController) {
        if let Some(id) = self.subscription.take() {
            viewport.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("name", &self.name)
            .field("opened", &self.opened)
            .field("page", &self.page.as_ref().map(|p| p.id))
            .finish()
    }
}
