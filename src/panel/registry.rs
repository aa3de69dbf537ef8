//! Ordered, name-keyed collection of panels.

use std::cell::RefCell;
use std::rc::Rc;

use super::Panel;
use crate::error::EditorError;
use crate::model::Page;
use crate::viewport::ViewportController;

/// Shared handle to a registered panel.
pub type PanelHandle = Rc<RefCell<Panel>>;

/// Registry of panels in registration order.
///
/// Names are unique. The first open panel is the "active" one, used to anchor
/// zoom input.
#[derive(Debug, Default)]
pub struct PanelRegistry {
    panels: Vec<PanelHandle>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a panel and subscribe it to viewport changes.
    pub fn register(
        &mut self,
        panel: Panel,
        viewport: &mut ViewportController,
    ) -> Result<PanelHandle, EditorError> {
        if self.contains(panel.name()) {
            return Err(EditorError::DuplicatePanel(panel.name().to_string()));
        }
        let handle = Rc::new(RefCell::new(panel));
        Panel::attach(&handle, viewport);
        self.panels.push(Rc::clone(&handle));
        Ok(handle)
    }

    /// Look up a panel by name.
    pub fn get(&self, name: &str) -> Result<PanelHandle, EditorError> {
        self.panels
            .iter()
            .find(|p| p.borrow().name() == name)
            .cloned()
            .ok_or_else(|| EditorError::UnknownPanel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.panels.iter().any(|p| p.borrow().name() == name)
    }

    /// All panels, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PanelHandle> {
        self.panels.iter()
    }

    /// Open panels, in registration order.
    pub fn iter_open(&self) -> impl Iterator<Item = &PanelHandle> {
        self.panels.iter().filter(|p| p.borrow().is_open())
    }

    /// First open panel, if any.
    pub fn active(&self) -> Option<PanelHandle> {
        self.iter_open().next().cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.panels
            .iter()
            .map(|p| p.borrow().name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Bind every panel to `page`, in registration order.
    pub fn load_all(&self, page: &Rc<Page>) {
        for panel in &self.panels {
            panel.borrow_mut().load(Rc::clone(page));
        }
    }

    /// Refresh every panel; closed panels ignore it.
    pub fn refresh_all(&self) {
        for panel in &self.panels {
            panel.borrow_mut().refresh();
        }
    }

    /// Unsubscribe every panel from the viewport.
    pub fn detach_all(&self, viewport: &mut ViewportController) {
        for panel in &self.panels {
            panel.borrow_mut().detach(viewport);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{SegmentationPanel, SourcePanel, TranscriptionPanel};
    use crate::testing::{TestPanels, page};

    #[test]
    fn test_duplicate_names_rejected() {
        let mut t = TestPanels::new(&[]);
        let dup = t.make_panel("source", Box::new(SourcePanel::new()));
        let err = t.registry.register(dup, &mut t.viewport).unwrap_err();
        assert!(matches!(err, EditorError::DuplicatePanel(name) if name == "source"));
        assert_eq!(t.registry.len(), 3);
    }

    #[test]
    fn test_unknown_name() {
        let t = TestPanels::new(&[]);
        assert!(matches!(
            t.registry.get("minimap"),
            Err(EditorError::UnknownPanel(_))
        ));
    }

    #[test]
    fn test_registration_order_and_open_filter() {
        let t = TestPanels::new(&["seg", "trans"]);
        assert_eq!(t.registry.names(), vec!["source", "seg", "trans"]);

        let open: Vec<String> = t
            .registry
            .iter_open()
            .map(|p| p.borrow().name().to_string())
            .collect();
        assert_eq!(open, vec!["seg", "trans"]);
        assert_eq!(t.registry.active().unwrap().borrow().name(), "seg");
    }

    #[test]
    fn test_no_active_when_all_closed() {
        let t = TestPanels::new(&[]);
        assert!(t.registry.active().is_none());
    }

    #[test]
    fn test_load_all_binds_every_panel() {
        let t = TestPanels::new(&["source"]);
        let p = Rc::new(page(4));
        t.registry.load_all(&p);
        for panel in t.registry.iter() {
            assert_eq!(panel.borrow().page().map(|p| p.id.0), Some(4));
        }
        assert_eq!(t.surface("source").borrow().images.len(), 1);
        assert!(t.surface("seg").borrow().images.is_empty());
    }

    #[test]
    fn test_content_downcast() {
        let t = TestPanels::new(&[]);
        let seg = t.registry.get("seg").unwrap();
        assert!(seg.borrow_mut().content_mut::<SegmentationPanel>().is_some());
        assert!(seg.borrow_mut().content_mut::<TranscriptionPanel>().is_none());
    }
}
