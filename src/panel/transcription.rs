//! Transcription panel.

use std::any::Any;

use super::{Overlay, OverlayKind, PanelContent, Surface};
use crate::model::Page;
use crate::viewport::ViewportState;

/// Lays out the page's lines in reading order, without the image.
#[derive(Debug, Default)]
pub struct TranscriptionPanel {
    lines: Vec<Overlay>,
    /// Line with the input focus, if any
    focused: Option<u64>,
}

impl TranscriptionPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[Overlay] {
        &self.lines
    }

    pub fn focused(&self) -> Option<u64> {
        self.focused
    }

    /// Focus a line for editing. Unknown lines are ignored.
    pub fn focus(&mut self, line: u64) -> bool {
        if self.lines.iter().any(|l| l.id == line) {
            self.focused = Some(line);
            true
        } else {
            false
        }
    }

    fn draw(&self, surface: &mut dyn Surface, viewport: &ViewportState) {
        surface.apply_transform(viewport);
        surface.draw_overlays(&self.lines);
    }
}

impl PanelContent for TranscriptionPanel {
    fn on_load(&mut self, page: &Page) {
        self.lines = page
            .lines_in_order()
            .into_iter()
            .map(|l| Overlay {
                id: l.pk,
                kind: OverlayKind::Line,
                rect: l.bbox,
            })
            .collect();
        self.focused = None;
    }

    fn on_show(&mut self, _page: &Page, surface: &mut dyn Surface, viewport: &ViewportState) {
        self.draw(surface, viewport);
    }

    fn refresh(&mut self, surface: &mut dyn Surface, viewport: &ViewportState) {
        self.draw(surface, viewport);
    }

    fn reset(&mut self, _page: &Page, surface: &mut dyn Surface, viewport: &ViewportState) {
        self.focused = None;
        self.draw(surface, viewport);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
