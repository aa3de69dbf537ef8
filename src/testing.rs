//! Test doubles shared by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::rc::Rc;
use std::task::Poll;
use std::time::Duration;

use crate::config::EditorConfig;
use crate::context::EditorContext;
use crate::error::EditorError;
use crate::model::{Block, BoxRect, Line, Page, PageId, PageImage, PartEndpoint};
use crate::navigator::{Location, PageSource};
use crate::panel::{
    Overlay, Panel, PanelContent, PanelRegistry, SegmentationPanel, SourcePanel, Surface,
    TranscriptionPanel,
};
use crate::viewport::{ViewportController, ViewportState};
use crate::visibility::{KeyValueStore, MemoryStore, PanelVisibilityStore};

/// Everything a [`RecordingSurface`] was asked to do.
#[derive(Debug, Default)]
pub struct SurfaceRecord {
    pub visible: bool,
    pub images: Vec<String>,
    pub transforms: Vec<ViewportState>,
    pub overlays: Vec<Overlay>,
}

pub type SurfaceLog = Rc<RefCell<SurfaceRecord>>;

/// Surface that records calls into a shared log.
pub struct RecordingSurface {
    size: (f32, f32),
    log: SurfaceLog,
}

impl RecordingSurface {
    pub fn new(size: (f32, f32)) -> (Self, SurfaceLog) {
        let log = SurfaceLog::default();
        (
            Self {
                size,
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl Surface for RecordingSurface {
    fn show(&mut self) {
        self.log.borrow_mut().visible = true;
    }

    fn hide(&mut self) {
        self.log.borrow_mut().visible = false;
    }

    fn size(&self) -> (f32, f32) {
        self.size
    }

    fn set_image(&mut self, uri: &str) {
        self.log.borrow_mut().images.push(uri.to_string());
    }

    fn apply_transform(&mut self, viewport: &ViewportState) {
        self.log.borrow_mut().transforms.push(*viewport);
    }

    fn draw_overlays(&mut self, overlays: &[Overlay]) {
        self.log.borrow_mut().overlays = overlays.to_vec();
    }
}

#[derive(Debug, Default)]
pub struct LocationRecord {
    pub initial: String,
    pub pushed: Vec<String>,
}

pub type LocationLog = Rc<RefCell<LocationRecord>>;

/// Location that records pushed addresses.
pub struct RecordingLocation {
    log: LocationLog,
}

impl RecordingLocation {
    pub fn new(href: &str) -> (Self, LocationLog) {
        let log = Rc::new(RefCell::new(LocationRecord {
            initial: href.to_string(),
            pushed: Vec::new(),
        }));
        (
            Self {
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl Location for RecordingLocation {
    fn href(&self) -> String {
        let log = self.log.borrow();
        log.pushed.last().unwrap_or(&log.initial).clone()
    }

    fn push(&mut self, url: &str) {
        self.log.borrow_mut().pushed.push(url.to_string());
    }
}

/// A page with one block, two lines, a `large` thumbnail and no links.
pub fn page(id: u64) -> Page {
    let image = PageImage::new(format!("/media/{id}.jpg"), 1000, 1500)
        .with_thumbnail("large", format!("/media/{id}_large.jpg"));
    let mut page = Page::new(PageId(id), format!("Element {id}"), image);
    page.blocks = vec![Block {
        pk: 100,
        order: 0,
        bbox: Some(BoxRect::new(50.0, 50.0, 950.0, 1450.0)),
    }];
    page.lines = vec![
        Line {
            pk: 10,
            order: 0,
            block: Some(100),
            bbox: BoxRect::new(60.0, 60.0, 940.0, 120.0),
        },
        Line {
            pk: 11,
            order: 1,
            block: Some(100),
            bbox: BoxRect::new(60.0, 130.0, 940.0, 190.0),
        },
    ];
    page
}

pub fn linked_page(id: u64, previous: Option<u64>, next: Option<u64>) -> Page {
    page(id).with_links(previous.map(PageId), next.map(PageId))
}

fn surface_size(name: &str) -> (f32, f32) {
    match name {
        "source" => (800.0, 600.0),
        "seg" => (400.0, 400.0),
        _ => (300.0, 300.0),
    }
}

fn content_for(name: &str) -> Box<dyn PanelContent> {
    match name {
        "source" => Box::new(SourcePanel::new()),
        "seg" => Box::new(SegmentationPanel::new()),
        _ => Box::new(TranscriptionPanel::new()),
    }
}

/// Registry with the three standard panels on recording surfaces.
pub struct TestPanels {
    pub registry: PanelRegistry,
    pub viewport: ViewportController,
    pub store: Rc<PanelVisibilityStore>,
    surfaces: HashMap<String, SurfaceLog>,
}

impl TestPanels {
    /// Panels named in `open` start visible.
    pub fn new(open: &[&str]) -> Self {
        let store = Rc::new(PanelVisibilityStore::in_memory());
        for name in open {
            store.set(name, true).unwrap();
        }
        let mut t = Self {
            registry: PanelRegistry::new(),
            viewport: ViewportController::new(),
            store,
            surfaces: HashMap::new(),
        };
        for name in ["source", "seg", "trans"] {
            let panel = t.make_panel(name, content_for(name));
            t.registry.register(panel, &mut t.viewport).unwrap();
        }
        t
    }

    /// Build a panel on a fresh recording surface. The surface log replaces
    /// any earlier one under the same name.
    pub fn make_panel(&mut self, name: &str, content: Box<dyn PanelContent>) -> Panel {
        let (surface, log) = RecordingSurface::new(surface_size(name));
        let (tools, _) = RecordingSurface::new((0.0, 0.0));
        self.surfaces.insert(name.to_string(), log);
        Panel::new(
            name,
            content,
            Box::new(surface),
            Box::new(tools),
            Rc::clone(&self.store),
            PartEndpoint::for_document(1),
        )
    }

    pub fn surface(&self, name: &str) -> SurfaceLog {
        Rc::clone(&self.surfaces[name])
    }
}

/// Recording logs of a [`TestContext`], usable after the context moved.
pub struct SessionLogs {
    pub location: LocationLog,
    surfaces: HashMap<String, SurfaceLog>,
}

impl SessionLogs {
    pub fn surface(&self, name: &str) -> SurfaceLog {
        Rc::clone(&self.surfaces[name])
    }
}

/// An [`EditorContext`] with the standard panels on recording surfaces.
pub struct TestContext {
    pub ctx: EditorContext,
    pub logs: SessionLogs,
}

impl TestContext {
    pub fn new(open: &[&str]) -> Self {
        Self::with_backend(open, Box::new(MemoryStore::new()))
    }

    /// Like [`new`](Self::new), persisting flags through `backend`.
    pub fn with_backend(open: &[&str], backend: Box<dyn KeyValueStore>) -> Self {
        let store = PanelVisibilityStore::new(backend);
        for name in open {
            store.set(name, true).unwrap();
        }
        let (location, location_log) =
            RecordingLocation::new("https://host/document/1/part/1/edit/");
        let mut ctx = EditorContext::new(EditorConfig::for_document(1), store, Box::new(location));

        let mut surfaces = HashMap::new();
        ctx.add_standard_panels(|name| {
            let (surface, log) = RecordingSurface::new(surface_size(name));
            surfaces.insert(name.to_string(), log);
            (
                Box::new(surface) as Box<dyn Surface>,
                Box::new(RecordingSurface::new((0.0, 0.0)).0) as Box<dyn Surface>,
            )
        })
        .unwrap();

        Self {
            ctx,
            logs: SessionLogs {
                location: location_log,
                surfaces,
            },
        }
    }

    pub fn surface(&self, name: &str) -> SurfaceLog {
        self.logs.surface(name)
    }

    /// Hand the context to an owner while keeping the logs.
    pub fn split(self) -> (EditorContext, SessionLogs) {
        (self.ctx, self.logs)
    }
}

/// Page source serving fixed records. Unknown ids fail like an HTTP 404.
#[derive(Default)]
pub struct StaticPageSource {
    pages: HashMap<PageId, Page>,
    pub fetched: RefCell<Vec<PageId>>,
    pub preloaded: RefCell<Vec<String>>,
}

impl StaticPageSource {
    pub fn new(pages: impl IntoIterator<Item = Page>) -> Self {
        Self {
            pages: pages.into_iter().map(|p| (p.id, p)).collect(),
            ..Self::default()
        }
    }
}

impl PageSource for StaticPageSource {
    fn fetch_page(&self, id: PageId) -> impl Future<Output = Result<Page, EditorError>> {
        self.fetched.borrow_mut().push(id);
        let result = self
            .pages
            .get(&id)
            .cloned()
            .ok_or_else(|| EditorError::fetch(id, "HTTP 404"));
        std::future::ready(result)
    }

    fn preload_image(
        &self,
        _page_id: PageId,
        uri: &str,
    ) -> impl Future<Output = Result<(), EditorError>> {
        self.preloaded.borrow_mut().push(uri.to_string());
        std::future::ready(Ok(()))
    }
}

/// Page source whose fetches stay pending until the page is released,
/// so tests decide the order responses arrive in.
#[derive(Default)]
pub struct DeferredPageSource {
    pages: HashMap<PageId, Page>,
    released: Rc<RefCell<HashSet<PageId>>>,
}

impl DeferredPageSource {
    pub fn new(pages: impl IntoIterator<Item = Page>) -> Self {
        Self {
            pages: pages.into_iter().map(|p| (p.id, p)).collect(),
            ..Self::default()
        }
    }

    /// Let pending and future fetches of `id` complete.
    pub fn release(&self, id: PageId) {
        self.released.borrow_mut().insert(id);
    }
}

impl PageSource for DeferredPageSource {
    fn fetch_page(&self, id: PageId) -> impl Future<Output = Result<Page, EditorError>> {
        let page = self.pages.get(&id).cloned();
        let released = Rc::clone(&self.released);
        std::future::poll_fn(move |_| {
            if !released.borrow().contains(&id) {
                return Poll::Pending;
            }
            Poll::Ready(
                page.clone()
                    .ok_or_else(|| EditorError::fetch(id, "HTTP 404")),
            )
        })
    }
}

/// Memory backend whose writes can be made to fail, as with a full or
/// blocked localStorage.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Rc<Cell<bool>>,
}

impl FlakyStore {
    /// The returned flag switches write failures on and off.
    pub fn new() -> (Self, Rc<Cell<bool>>) {
        let store = Self::default();
        let failing = Rc::clone(&store.failing);
        (store, failing)
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires_in: Option<Duration>,
    ) -> Result<(), EditorError> {
        if self.failing.get() {
            return Err(EditorError::Storage(format!("quota exceeded writing {key}")));
        }
        self.inner.set(key, value, expires_in)
    }
}
