//! Segmentation overlay panel.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::{Overlay, OverlayKind, PanelContent, Surface};
use crate::model::Page;
use crate::undo::UndoEntry;
use crate::viewport::ViewportState;

/// Background image used under the segmentation overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Original color image
    #[default]
    Color,
    /// Binarized image, when the page has one
    BlackWhite,
}

type Overlays = Rc<RefCell<Vec<Overlay>>>;

/// Draws block and line boxes over the page image and lets them be moved.
#[derive(Debug, Default)]
pub struct SegmentationPanel {
    color_mode: ColorMode,
    /// Boxes as fetched
    pristine: Vec<Overlay>,
    /// Boxes including in-progress edits; shared with undo entries
    working: Overlays,
    displayed: Option<String>,
    full_res: Option<String>,
}

impl SegmentationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Switch background image mode. Returns whether it changed; the caller
    /// re-shows the panel to apply it.
    pub fn set_color_mode(&mut self, mode: ColorMode) -> bool {
        if self.color_mode == mode {
            return false;
        }
        log::debug!("Segmentation color mode: {:?}", mode);
        self.color_mode = mode;
        true
    }

    /// Snapshot of the boxes currently drawn.
    pub fn overlays(&self) -> Vec<Overlay> {
        self.working.borrow().clone()
    }

    /// Whether edits diverge from the fetched boxes.
    pub fn is_modified(&self) -> bool {
        *self.working.borrow() != self.pristine
    }

    /// Move a line box. Returns the already-applied edit for the undo
    /// history, or `None` if the line is unknown.
    pub fn move_line(&mut self, line: u64, dx: f32, dy: f32) -> Option<LineMove> {
        let mut entry = LineMove {
            overlays: Rc::clone(&self.working),
            line,
            dx,
            dy,
        };
        if !entry.shift(1.0) {
            return None;
        }
        Some(entry)
    }

    fn image_uri(&self, page: &Page) -> String {
        match (self.color_mode, &page.bw_image) {
            (ColorMode::BlackWhite, Some(bw)) => bw.low_res_uri().to_string(),
            _ => self
                .full_res
                .clone()
                .unwrap_or_else(|| page.image.low_res_uri().to_string()),
        }
    }

    fn display(&mut self, uri: &str, surface: &mut dyn Surface) {
        if self.displayed.as_deref() != Some(uri) {
            surface.set_image(uri);
            self.displayed = Some(uri.to_string());
        }
    }

    fn draw(&self, surface: &mut dyn Surface, viewport: &ViewportState) {
        surface.apply_transform(viewport);
        surface.draw_overlays(&self.working.borrow());
    }
}

/// Block boxes (when known) followed by line boxes in reading order.
fn page_overlays(page: &Page) -> Vec<Overlay> {
    let blocks = page.blocks.iter().filter_map(|b| {
        b.bbox.map(|rect| Overlay {
            id: b.pk,
            kind: OverlayKind::Block,
            rect,
        })
    });
    let lines = page.lines_in_order().into_iter().map(|l| Overlay {
        id: l.pk,
        kind: OverlayKind::Line,
        rect: l.bbox,
    });
    blocks.chain(lines).collect()
}

impl PanelContent for SegmentationPanel {
    fn on_load(&mut self, page: &Page) {
        self.pristine = page_overlays(page);
        self.working = Rc::new(RefCell::new(self.pristine.clone()));
        self.full_res = None;
    }

    fn on_show(&mut self, page: &Page, surface: &mut dyn Surface, viewport: &ViewportState) {
        let uri = self.image_uri(page);
        self.display(&uri, surface);
        self.draw(surface, viewport);
    }

    fn refresh(&mut self, surface: &mut dyn Surface, viewport: &ViewportState) {
        self.draw(surface, viewport);
    }

    fn reset(&mut self, page: &Page, surface: &mut dyn Surface, viewport: &ViewportState) {
        *self.working.borrow_mut() = self.pristine.clone();
        self.on_show(page, surface, viewport);
    }

    fn on_full_resolution(&mut self, uri: &str, surface: &mut dyn Surface) -> bool {
        self.full_res = Some(uri.to_string());
        if self.color_mode != ColorMode::Color {
            return false;
        }
        self.display(uri, surface);
        true
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Undoable translation of one line box.
#[derive(Debug)]
pub struct LineMove {
    overlays: Overlays,
    line: u64,
    dx: f32,
    dy: f32,
}

impl LineMove {
    fn shift(&mut self, sign: f32) -> bool {
        let mut overlays = self.overlays.borrow_mut();
        let Some(overlay) = overlays
            .iter_mut()
            .find(|o| o.kind == OverlayKind::Line && o.id == self.line)
        else {
            return false;
        };
        overlay.rect = overlay.rect.offset(self.dx * sign, self.dy * sign);
        true
    }
}

impl UndoEntry for LineMove {
    fn apply(&mut self) {
        self.shift(1.0);
    }

    fn revert(&mut self) {
        self.shift(-1.0);
    }

    fn description(&self) -> String {
        format!("Move line {}", self.line)
    }
}
