//! Source image panel.

use std::any::Any;

use super::{PanelContent, Surface};
use crate::model::Page;
use crate::viewport::ViewportState;

/// Shows the page image, swapping to full resolution once available.
#[derive(Debug, Default)]
pub struct SourcePanel {
    /// URI currently set on the surface
    displayed: Option<String>,
    /// Full resolution URI for the bound page, once loaded
    full_res: Option<String>,
}

impl SourcePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    fn display(&mut self, uri: &str, surface: &mut dyn Surface) {
        if self.displayed.as_deref() != Some(uri) {
            surface.set_image(uri);
            self.displayed = Some(uri.to_string());
        }
    }
}

impl PanelContent for SourcePanel {
    fn on_load(&mut self, _page: &Page) {
        self.full_res = None;
    }

    fn on_show(&mut self, page: &Page, surface: &mut dyn Surface, viewport: &ViewportState) {
        let uri = self
            .full_res
            .clone()
            .unwrap_or_else(|| page.image.low_res_uri().to_string());
        self.display(&uri, surface);
        surface.apply_transform(viewport);
    }

    fn refresh(&mut self, surface: &mut dyn Surface, viewport: &ViewportState) {
        surface.apply_transform(viewport);
    }

    fn reset(&mut self, page: &Page, surface: &mut dyn Surface, viewport: &ViewportState) {
        self.on_show(page, surface, viewport);
    }

    fn on_full_resolution(&mut self, uri: &str, surface: &mut dyn Surface) -> bool {
        self.full_res = Some(uri.to_string());
        self.display(uri, surface);
        true
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
