//! Progressive swap from the low resolution thumbnail to the full image.
//!
//! Panels start on the `large` thumbnail. Once the viewport zooms past 1x,
//! one background fetch of the full image is issued for the bound page. The
//! result is only applied if the page is still the bound one.

use crate::error::EditorError;
use crate::model::{Page, PageId};
use crate::request::{RequestTicket, RequestTracker};

/// A full resolution fetch to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub ticket: RequestTicket,
    pub uri: String,
}

impl ImageRequest {
    pub fn page_id(&self) -> PageId {
        self.ticket.page_id
    }
}

/// What happened to a completed image fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The image belongs to the bound page and may be displayed
    Applied,
    /// A newer page or request superseded it; discarded
    Stale,
}

/// Tracks full resolution fetches per bound page.
#[derive(Debug, Default)]
pub struct FullResolutionLoader {
    tracker: RequestTracker,
    loaded_for: Option<PageId>,
}

impl FullResolutionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous page; any in-flight fetch becomes stale.
    pub fn on_page_changed(&mut self) {
        self.tracker.supersede();
        self.loaded_for = None;
    }

    /// Whether the full image of `page_id` has been applied.
    pub fn is_loaded(&self, page_id: PageId) -> bool {
        self.loaded_for == Some(page_id)
    }

    /// Start a fetch if `scale` calls for more resolution than is shown.
    pub fn request_for(&mut self, page: &Page, scale: f32) -> Option<ImageRequest> {
        if scale <= 1.0 || self.is_loaded(page.id) {
            return None;
        }
        if self
            .tracker
            .in_flight()
            .is_some_and(|t| t.page_id == page.id)
        {
            return None;
        }
        if !page.image.has_low_res() {
            // Already showing the full image
            self.loaded_for = Some(page.id);
            return None;
        }
        let ticket = self.tracker.begin(page.id);
        log::debug!("Requesting full resolution image for page {}", page.id);
        Some(ImageRequest {
            ticket,
            uri: page.image.uri.clone(),
        })
    }

    /// Settle a fetch. Errors for the current request are returned so the
    /// shell can report them; the next zoom will try again.
    pub fn complete(
        &mut self,
        request: &ImageRequest,
        result: Result<(), EditorError>,
    ) -> Result<ImageOutcome, EditorError> {
        if !self.tracker.finish(&request.ticket) {
            log::debug!(
                "Discarding full resolution image for page {}",
                request.page_id()
            );
            return Ok(ImageOutcome::Stale);
        }
        result?;
        self.loaded_for = Some(request.page_id());
        Ok(ImageOutcome::Applied)
    }
}
