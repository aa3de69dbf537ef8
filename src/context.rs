//! The editor context: single owner of the viewport, undo history, panels,
//! visibility store and navigator.

use std::rc::Rc;

use crate::config::EditorConfig;
use crate::constants::panels;
use crate::error::EditorError;
use crate::image_loader::{FullResolutionLoader, ImageOutcome, ImageRequest};
use crate::model::{Page, PageId};
use crate::navigator::{LoadOutcome, Location, PageNavigator};
use crate::panel::{
    ColorMode, Panel, PanelContent, PanelHandle, PanelRegistry, SegmentationPanel, SourcePanel,
    Surface, TranscriptionPanel,
};
use crate::request::RequestTicket;
use crate::undo::UndoController;
use crate::viewport::ViewportController;
use crate::visibility::PanelVisibilityStore;

/// Everything one editing session owns. Constructed once and handed to the
/// shell; nothing here is global.
#[derive(Debug)]
pub struct EditorContext {
    config: EditorConfig,
    viewport: ViewportController,
    undo: UndoController,
    panels: PanelRegistry,
    visibility: Rc<PanelVisibilityStore>,
    navigator: PageNavigator,
    images: FullResolutionLoader,
}

impl EditorContext {
    /// Create an empty context; panels are registered afterwards.
    pub fn new(
        config: EditorConfig,
        visibility: PanelVisibilityStore,
        location: Box<dyn Location>,
    ) -> Self {
        let config = config.validated();
        Self {
            viewport: ViewportController::with_bounds(config.min_scale, config.max_scale),
            undo: UndoController::with_limit(config.undo_history_limit),
            panels: PanelRegistry::new(),
            visibility: Rc::new(visibility),
            navigator: PageNavigator::new(config.endpoint(), location),
            images: FullResolutionLoader::new(),
            config,
        }
    }

    /// Register a panel. Its visibility is seeded from the store.
    pub fn add_panel(
        &mut self,
        name: &str,
        content: Box<dyn PanelContent>,
        surface: Box<dyn Surface>,
        tools: Box<dyn Surface>,
    ) -> Result<PanelHandle, EditorError> {
        let panel = Panel::new(
            name,
            content,
            surface,
            tools,
            Rc::clone(&self.visibility),
            self.config.endpoint(),
        );
        self.panels.register(panel, &mut self.viewport)
    }

    /// Register source, segmentation and transcription panels, in that order.
    /// `surfaces` returns the (container, toolbar) pair for a panel name.
    pub fn add_standard_panels<F>(&mut self, mut surfaces: F) -> Result<(), EditorError>
    where
        F: FnMut(&str) -> (Box<dyn Surface>, Box<dyn Surface>),
    {
        let standard: [(&str, Box<dyn PanelContent>); 3] = [
            (panels::SOURCE, Box::new(SourcePanel::new())),
            (panels::SEGMENTATION, Box::new(SegmentationPanel::new())),
            (panels::TRANSCRIPTION, Box::new(TranscriptionPanel::new())),
        ];
        for (name, content) in standard {
            let (surface, tools) = surfaces(name);
            self.add_panel(name, content, surface, tools)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    /// Mutable viewport access, for subscribing UI controls.
    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn undo_history(&self) -> &UndoController {
        &self.undo
    }

    pub fn panels(&self) -> &PanelRegistry {
        &self.panels
    }

    pub fn panel(&self, name: &str) -> Result<PanelHandle, EditorError> {
        self.panels.get(name)
    }

    pub fn visibility(&self) -> &Rc<PanelVisibilityStore> {
        &self.visibility
    }

    pub fn navigator(&self) -> &PageNavigator {
        &self.navigator
    }

    pub fn current_page(&self) -> Option<&Rc<Page>> {
        self.navigator.current()
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Start loading a page; see [`PageNavigator::begin_load`].
    pub fn begin_load(&mut self, id: PageId) -> RequestTicket {
        self.navigator.begin_load(id)
    }

    /// Settle a page load. A newly current page clears the undo history and
    /// invalidates any pending full resolution fetch.
    pub fn finish_load(
        &mut self,
        ticket: RequestTicket,
        result: Result<Page, EditorError>,
    ) -> Result<LoadOutcome, EditorError> {
        let outcome = self.navigator.finish_load(ticket, result, &self.panels)?;
        if let LoadOutcome::Loaded(_) = &outcome {
            self.undo.clear();
            self.images.on_page_changed();
        }
        Ok(outcome)
    }

    /// Whether navigating away would drop recorded edits.
    pub fn has_unsaved_edits(&self) -> bool {
        self.undo.can_undo()
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// Zoom around `anchor` (active panel surface coordinates). No-op when no
    /// panel is open.
    pub fn zoom_at(&mut self, anchor: (f32, f32), delta: f32) -> bool {
        if self.panels.active().is_none() {
            log::trace!("Zoom ignored: no open panel");
            return false;
        }
        self.viewport.zoom_to(anchor, delta)
    }

    /// Zoom range input: move to `value`, anchored at the centre of the
    /// active panel's surface.
    pub fn slider_input(&mut self, value: f32) -> bool {
        let Some(active) = self.panels.active() else {
            log::trace!("Zoom ignored: no open panel");
            return false;
        };
        let (width, height) = active.borrow().surface_size();
        let (pan_x, pan_y) = self.viewport.pan();
        let anchor = (width / 2.0 - pan_x, height / 2.0 - pan_y);
        let delta = value - self.viewport.scale();
        self.viewport.zoom_to(anchor, delta)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset();
    }

    /// Full resolution fetch warranted by the current zoom, if any.
    pub fn full_resolution_request(&mut self) -> Option<ImageRequest> {
        let page = Rc::clone(self.navigator.current()?);
        self.images.request_for(&page, self.viewport.scale())
    }

    /// Settle a full resolution fetch and hand the image to panels still
    /// bound to its page.
    pub fn complete_full_resolution(
        &mut self,
        request: &ImageRequest,
        result: Result<(), EditorError>,
    ) -> Result<ImageOutcome, EditorError> {
        let outcome = self.images.complete(request, result)?;
        if outcome == ImageOutcome::Applied {
            for panel in self.panels.iter() {
                let mut panel = panel.borrow_mut();
                if panel.full_resolution(request.page_id(), &request.uri) {
                    panel.refresh();
                }
            }
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Panels
    // ------------------------------------------------------------------

    /// Toggle a panel, then refresh every panel for the changed layout.
    /// Returns the new visibility.
    ///
    /// A failed persistence write is returned after the refresh; the panel
    /// keeps its new visibility either way.
    pub fn toggle_panel(&mut self, name: &str) -> Result<bool, EditorError> {
        let panel = self.panels.get(name)?;
        let (persisted, open) = {
            let mut panel = panel.borrow_mut();
            let persisted = panel.toggle();
            (persisted, panel.is_open())
        };
        self.panels.refresh_all();
        persisted.map(|()| open)
    }

    /// Window size changed.
    pub fn resize(&mut self) {
        self.panels.refresh_all();
    }

    /// Reset every panel to a pristine view of the current page.
    pub fn reset_panels(&mut self) {
        for panel in self.panels.iter() {
            panel.borrow_mut().reset();
        }
        self.undo.clear();
    }

    /// Switch the segmentation background image.
    pub fn set_color_mode(&mut self, mode: ColorMode) -> Result<(), EditorError> {
        let panel = self.panels.get(panels::SEGMENTATION)?;
        let mut panel = panel.borrow_mut();
        let changed = panel
            .content_mut::<SegmentationPanel>()
            .ok_or_else(|| EditorError::UnknownPanel(panels::SEGMENTATION.to_string()))?
            .set_color_mode(mode);
        if changed {
            panel.reshow();
        }
        Ok(())
    }

    /// Move a line box in the segmentation panel and record the edit.
    /// Returns false if the line does not exist.
    pub fn move_line(&mut self, line: u64, dx: f32, dy: f32) -> Result<bool, EditorError> {
        let panel = self.panels.get(panels::SEGMENTATION)?;
        let mut panel = panel.borrow_mut();
        let entry = panel
            .content_mut::<SegmentationPanel>()
            .ok_or_else(|| EditorError::UnknownPanel(panels::SEGMENTATION.to_string()))?
            .move_line(line, dx, dy);
        let Some(entry) = entry else {
            return Ok(false);
        };
        self.undo.record(Box::new(entry));
        panel.refresh();
        Ok(true)
    }

    /// Put the transcription input focus on a line of the current page.
    /// Returns false if the page has no such line.
    pub fn focus_line(&mut self, line: u64) -> Result<bool, EditorError> {
        let panel = self.panels.get(panels::TRANSCRIPTION)?;
        let mut panel = panel.borrow_mut();
        let transcription = panel
            .content_mut::<TranscriptionPanel>()
            .ok_or_else(|| EditorError::UnknownPanel(panels::TRANSCRIPTION.to_string()))?;
        Ok(transcription.focus(line))
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.undo.undo();
        if changed {
            self.panels.refresh_all();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.undo.redo();
        if changed {
            self.panels.refresh_all();
        }
        changed
    }

    /// Unsubscribe panels from the viewport.
    pub fn teardown(&mut self) {
        self.panels.detach_all(&mut self.viewport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::panel::OverlayKind;
    use crate::testing::{
        FlakyStore, RecordingSurface, SurfaceLog, TestContext, linked_page, page,
    };
    use crate::visibility::MemoryStore;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn loaded(open: &[&str]) -> TestContext {
        let mut t = TestContext::new(open);
        let ticket = t.ctx.begin_load(PageId(1));
        t.ctx
            .finish_load(ticket, Ok(linked_page(1, None, Some(2))))
            .unwrap();
        t
    }

    #[test]
    fn test_standard_panel_order() {
        let t = TestContext::new(&[]);
        assert_eq!(t.ctx.panels().names(), vec!["source", "seg", "trans"]);
    }

    #[test]
    fn test_zoom_without_open_panel_is_noop() {
        let mut t = loaded(&[]);
        assert!(!t.ctx.zoom_at((100.0, 100.0), 0.5));
        assert!(!t.ctx.slider_input(3.0));
        assert_eq!(t.ctx.viewport().scale(), 1.0);
    }

    #[test]
    fn test_zoom_renders_open_panels_only() {
        let mut t = loaded(&["source"]);
        let seg_before = t.surface("seg").borrow().transforms.len();

        assert!(t.ctx.zoom_at((100.0, 100.0), 0.5));

        let vp = t.ctx.viewport().state();
        assert!(approx_eq(vp.scale, 1.5));
        assert!(approx_eq(vp.pan_x, -50.0));
        assert!(approx_eq(vp.pan_y, -50.0));
        assert_eq!(t.surface("source").borrow().transforms.last(), Some(&vp));
        assert_eq!(t.surface("seg").borrow().transforms.len(), seg_before);
    }

    #[test]
    fn test_slider_anchors_on_active_panel_surface() {
        // source 800x600 is open; seg (400x400) is closed and must not matter
        let mut t = loaded(&["source"]);
        assert!(t.ctx.slider_input(2.0));

        let vp = t.ctx.viewport().state();
        assert!(approx_eq(vp.scale, 2.0));
        // anchor = (400, 300): pan = anchor - anchor * 2
        assert!(approx_eq(vp.pan_x, -400.0));
        assert!(approx_eq(vp.pan_y, -300.0));
    }

    #[test]
    fn test_active_panel_is_first_open() {
        let mut t = loaded(&["seg", "trans"]);
        t.ctx.slider_input(2.0);
        let vp = t.ctx.viewport().state();
        // seg surface is 400x400
        assert!(approx_eq(vp.pan_x, -200.0));
        assert!(approx_eq(vp.pan_y, -200.0));
    }

    #[test]
    fn test_slider_saturates() {
        let mut t = loaded(&["source"]);
        t.ctx.slider_input(9.8);
        t.ctx.slider_input(10.8);
        assert_eq!(t.ctx.viewport().scale(), 10.0);
    }

    #[test]
    fn test_viewport_persists_across_navigation() {
        let mut t = loaded(&["source"]);
        t.ctx.slider_input(3.0);
        let ticket = t.ctx.begin_load(PageId(2));
        t.ctx
            .finish_load(ticket, Ok(linked_page(2, Some(1), None)))
            .unwrap();
        assert!(approx_eq(t.ctx.viewport().scale(), 3.0));

        t.ctx.reset_zoom();
        assert_eq!(t.ctx.viewport().scale(), 1.0);
        assert_eq!(t.ctx.viewport().pan(), (0.0, 0.0));
    }

    #[test]
    fn test_toggle_refreshes_other_panels() {
        let mut t = loaded(&["source"]);
        let source_before = t.surface("source").borrow().transforms.len();

        assert!(t.ctx.toggle_panel("seg").unwrap());
        assert!(t.ctx.visibility().is_open("seg"));
        assert!(t.surface("source").borrow().transforms.len() > source_before);
        assert_eq!(t.surface("seg").borrow().images.len(), 1);

        assert!(!t.ctx.toggle_panel("seg").unwrap());
        assert_eq!(t.ctx.visibility().get("seg"), Some(false));
    }

    #[test]
    fn test_toggle_with_failing_storage_keeps_layout_consistent() {
        let (backend, failing) = FlakyStore::new();
        let mut t = TestContext::with_backend(&["source"], Box::new(backend));
        let ticket = t.ctx.begin_load(PageId(1));
        t.ctx
            .finish_load(ticket, Ok(linked_page(1, None, Some(2))))
            .unwrap();

        let styled = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&styled);
        t.ctx
            .visibility()
            .subscribe(move |change| s.borrow_mut().push((change.panel.clone(), change.open)));
        let source_before = t.surface("source").borrow().transforms.len();
        failing.set(true);

        let err = t.ctx.toggle_panel("seg").unwrap_err();
        assert!(matches!(err, EditorError::Storage(_)));
        assert!(t.ctx.panel("seg").unwrap().borrow().is_open());
        assert!(t.surface("seg").borrow().visible);
        assert!(t.surface("source").borrow().transforms.len() > source_before);
        assert_eq!(*styled.borrow(), vec![("seg".to_string(), true)]);

        // Storage recovers: the next toggle persists normally
        failing.set(false);
        assert!(!t.ctx.toggle_panel("seg").unwrap());
        assert_eq!(t.ctx.visibility().get("seg"), Some(false));
    }

    #[test]
    fn test_focus_line_follows_page() {
        let mut t = loaded(&["trans"]);
        assert!(t.ctx.focus_line(11).unwrap());
        assert!(!t.ctx.focus_line(99).unwrap());

        let focused = || {
            let panel = t.ctx.panel("trans").unwrap();
            let mut panel = panel.borrow_mut();
            panel.content_mut::<TranscriptionPanel>().unwrap().focused()
        };
        assert_eq!(focused(), Some(11));

        let ticket = t.ctx.begin_load(PageId(2));
        t.ctx
            .finish_load(ticket, Ok(linked_page(2, Some(1), None)))
            .unwrap();
        let panel = t.ctx.panel("trans").unwrap();
        let mut panel = panel.borrow_mut();
        assert_eq!(panel.content_mut::<TranscriptionPanel>().unwrap().focused(), None);
    }

    #[test]
    fn test_toggle_unknown_panel() {
        let mut t = loaded(&[]);
        let err = t.ctx.toggle_panel("minimap").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_navigation_clears_undo_history() {
        let mut t = loaded(&["seg"]);
        assert!(t.ctx.move_line(10, 4.0, 0.0).unwrap());
        assert!(t.ctx.has_unsaved_edits());

        // A failed load keeps history
        let ticket = t.ctx.begin_load(PageId(2));
        assert!(
            t.ctx
                .finish_load(ticket, Err(EditorError::fetch(PageId(2), "offline")))
                .is_err()
        );
        assert!(t.ctx.has_unsaved_edits());

        let ticket = t.ctx.begin_load(PageId(2));
        t.ctx
            .finish_load(ticket, Ok(linked_page(2, Some(1), None)))
            .unwrap();
        assert!(!t.ctx.has_unsaved_edits());
        assert!(t.ctx.undo_history().is_empty());
    }

    #[test]
    fn test_move_line_undo_redo_redraws() {
        let mut t = loaded(&["seg"]);
        let pristine = page(1).lines[0].bbox;

        assert!(t.ctx.move_line(10, 5.0, 5.0).unwrap());
        assert!(!t.ctx.move_line(404, 5.0, 5.0).unwrap());

        let line_rect = |log: &SurfaceLog| {
            log.borrow()
                .overlays
                .iter()
                .find(|o| o.kind == OverlayKind::Line && o.id == 10)
                .map(|o| o.rect)
        };
        assert_eq!(line_rect(&t.surface("seg")), Some(pristine.offset(5.0, 5.0)));

        assert!(t.ctx.undo());
        assert_eq!(line_rect(&t.surface("seg")), Some(pristine));
        assert!(t.ctx.redo());
        assert_eq!(line_rect(&t.surface("seg")), Some(pristine.offset(5.0, 5.0)));

        t.ctx.reset_panels();
        assert_eq!(line_rect(&t.surface("seg")), Some(pristine));
        assert!(!t.ctx.undo());
    }

    #[test]
    fn test_full_resolution_swap() {
        let mut t = loaded(&["source", "seg"]);
        assert!(t.ctx.full_resolution_request().is_none());

        t.ctx.slider_input(2.0);
        let req = t.ctx.full_resolution_request().unwrap();
        assert!(t.ctx.full_resolution_request().is_none());

        let outcome = t.ctx.complete_full_resolution(&req, Ok(())).unwrap();
        assert_eq!(outcome, ImageOutcome::Applied);
        assert_eq!(
            t.surface("source").borrow().images.last().unwrap(),
            "/media/1.jpg"
        );
        assert_eq!(
            t.surface("seg").borrow().images.last().unwrap(),
            "/media/1.jpg"
        );
    }

    #[test]
    fn test_full_resolution_skips_black_white_segmentation() {
        let mut t = TestContext::new(&["source", "seg"]);
        let ticket = t.ctx.begin_load(PageId(1));
        let mut p = linked_page(1, None, None);
        p.bw_image = Some(crate::model::PageImage::new("/media/1_bw.png", 10, 10));
        t.ctx.finish_load(ticket, Ok(p)).unwrap();
        t.ctx.set_color_mode(ColorMode::BlackWhite).unwrap();
        assert_eq!(
            t.surface("seg").borrow().images.last().unwrap(),
            "/media/1_bw.png"
        );

        t.ctx.slider_input(2.0);
        let req = t.ctx.full_resolution_request().unwrap();
        t.ctx.complete_full_resolution(&req, Ok(())).unwrap();
        assert_eq!(
            t.surface("seg").borrow().images.last().unwrap(),
            "/media/1_bw.png"
        );
    }

    #[test]
    fn test_full_resolution_after_navigation_is_discarded() {
        let mut t = loaded(&["source"]);
        t.ctx.slider_input(2.0);
        let req = t.ctx.full_resolution_request().unwrap();

        let ticket = t.ctx.begin_load(PageId(2));
        t.ctx
            .finish_load(ticket, Ok(linked_page(2, Some(1), None)))
            .unwrap();

        let outcome = t.ctx.complete_full_resolution(&req, Ok(())).unwrap();
        assert_eq!(outcome, ImageOutcome::Stale);
        assert!(
            t.surface("source")
                .borrow()
                .images
                .iter()
                .all(|uri| uri != "/media/1.jpg")
        );
    }

    #[test]
    fn test_persisted_visibility_seeds_new_session() {
        let store = PanelVisibilityStore::new(Box::new(MemoryStore::new()));
        store.set("trans", true).unwrap();

        let (location, _) = crate::testing::RecordingLocation::new("/part/1/edit");
        let mut ctx = EditorContext::new(EditorConfig::for_document(1), store, Box::new(location));
        ctx.add_standard_panels(|_| {
            (
                Box::new(RecordingSurface::new((10.0, 10.0)).0) as Box<dyn Surface>,
                Box::new(RecordingSurface::new((0.0, 0.0)).0) as Box<dyn Surface>,
            )
        })
        .unwrap();

        let open: Vec<String> = ctx
            .panels()
            .iter_open()
            .map(|p| p.borrow().name().to_string())
            .collect();
        assert_eq!(open, vec!["trans"]);
    }

    #[test]
    fn test_teardown_detaches_panels() {
        let mut t = loaded(&["source"]);
        t.ctx.teardown();
        let before = t.surface("source").borrow().transforms.len();
        t.ctx.zoom_at((0.0, 0.0), 1.0);
        assert_eq!(t.surface("source").borrow().transforms.len(), before);
    }
}
