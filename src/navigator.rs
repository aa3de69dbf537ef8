//! Page loading, broadcasting to panels, and address updates.
//!
//! A load is split into [`PageNavigator::begin_load`] (takes a ticket) and
//! [`PageNavigator::finish_load`] (settles the fetched result). Only the most
//! recently started load may apply its result; older ones resolve as
//! [`LoadOutcome::Stale`].

use std::future::Future;
use std::rc::Rc;

use crate::error::EditorError;
use crate::model::{Page, PageId, PartEndpoint};
use crate::panel::PanelRegistry;
use crate::request::{RequestTicket, RequestTracker};

/// Source of page records (the part-detail endpoint) and image bytes.
pub trait PageSource {
    /// Fetch one page record.
    fn fetch_page(&self, id: PageId) -> impl Future<Output = Result<Page, EditorError>>;

    /// Fetch an image of page `page_id` so it is cached before being
    /// displayed.
    fn preload_image(
        &self,
        _page_id: PageId,
        _uri: &str,
    ) -> impl Future<Output = Result<(), EditorError>> {
        std::future::ready(Ok(()))
    }
}

/// The address shown to the user.
pub trait Location {
    fn href(&self) -> String;

    /// Push a new address without reloading.
    fn push(&mut self, url: &str);
}

/// Result of settling a load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The page is now current and every panel is bound to it
    Loaded(Rc<Page>),
    /// A newer load started since; the result was discarded
    Stale,
}

/// Previous/next affordances and labels for the current page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavState {
    pub previous: Option<PageId>,
    pub next: Option<PageId>,
    pub title: String,
    pub filename_label: String,
}

impl NavState {
    fn from_page(page: &Page) -> Self {
        Self {
            previous: page.previous,
            next: page.next,
            title: page.title.clone(),
            filename_label: page.filename_label(),
        }
    }
}

/// Rewrite the `part/<id>/edit` segment of `href` to `id`. Falls back to a
/// `part` query parameter when the path has no such segment.
pub fn part_location(href: &str, id: PageId) -> String {
    const PREFIX: &str = "part/";
    const SUFFIX: &str = "/edit";

    let mut search_from = 0;
    while let Some(pos) = href[search_from..].find(PREFIX) {
        let digits_start = search_from + pos + PREFIX.len();
        let digits_len = href[digits_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let digits_end = digits_start + digits_len;
        if digits_len > 0 && href[digits_end..].starts_with(SUFFIX) {
            return format!("{}{}{}", &href[..digits_start], id, &href[digits_end..]);
        }
        search_from = digits_start;
    }

    let (base, fragment) = match href.find('#') {
        Some(i) => href.split_at(i),
        None => (href, ""),
    };
    let (path, query) = match base.find('?') {
        Some(i) => (&base[..i], &base[i + 1..]),
        None => (base, ""),
    };
    let mut params: Vec<String> = query
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("part="))
        .map(str::to_string)
        .collect();
    params.push(format!("part={id}"));
    format!("{}?{}{}", path, params.join("&"), fragment)
}

/// Owns the current page and the in-flight load.
pub struct PageNavigator {
    current: Option<Rc<Page>>,
    nav: NavState,
    tracker: RequestTracker,
    endpoint: PartEndpoint,
    location: Box<dyn Location>,
}

impl PageNavigator {
    pub fn new(endpoint: PartEndpoint, location: Box<dyn Location>) -> Self {
        Self {
            current: None,
            nav: NavState::default(),
            tracker: RequestTracker::new(),
            endpoint,
            location,
        }
    }

    pub fn current(&self) -> Option<&Rc<Page>> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<PageId> {
        self.current.as_ref().map(|p| p.id)
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn previous_target(&self) -> Option<PageId> {
        self.nav.previous
    }

    pub fn next_target(&self) -> Option<PageId> {
        self.nav.next
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.in_flight().is_some()
    }

    pub fn href(&self) -> String {
        self.location.href()
    }

    /// Start loading `id`, superseding any load in flight.
    pub fn begin_load(&mut self, id: PageId) -> RequestTicket {
        log::info!("Loading page {} from {}", id, self.endpoint.url(id));
        self.tracker.begin(id)
    }

    /// Settle a load started with [`begin_load`](Self::begin_load).
    ///
    /// On success the page is broadcast to every panel in registration order,
    /// becomes current, and the address is updated. A failed fetch leaves all
    /// state untouched and is returned as an error.
    pub fn finish_load(
        &mut self,
        ticket: RequestTicket,
        result: Result<Page, EditorError>,
        panels: &PanelRegistry,
    ) -> Result<LoadOutcome, EditorError> {
        if !self.tracker.finish(&ticket) {
            log::debug!("Discarding stale result for page {}", ticket.page_id);
            return Ok(LoadOutcome::Stale);
        }

        let page = match result {
            Ok(page) => Rc::new(page),
            Err(e) => {
                log::warn!("Page {} failed to load: {}", ticket.page_id, e);
                return Err(e);
            }
        };

        panels.load_all(&page);
        self.nav = NavState::from_page(&page);
        self.current = Some(Rc::clone(&page));

        let url = part_location(&self.location.href(), page.id);
        self.location.push(&url);
        log::info!("Page {} loaded: {}", page.id, self.nav.title);

        Ok(LoadOutcome::Loaded(page))
    }
}

impl std::fmt::Debug for PageNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageNavigator")
            .field("current", &self.current_id())
            .field("nav", &self.nav)
            .field("tracker", &self.tracker)
            .finish()
    }
}
