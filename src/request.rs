//! Last-request-wins bookkeeping for asynchronous fetches.
//!
//! Every fetch takes a [`RequestTicket`] when it starts. Starting another fetch
//! bumps the generation, so when the older one resolves its ticket no longer
//! matches and its result is discarded. There is no cancellation primitive;
//! in-flight requests simply run to completion and are ignored.

use crate::model::PageId;

/// Identifies one started request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
    /// Page the request was issued for
    pub page_id: PageId,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Generation counter handing out tickets.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: u64,
    in_flight: Option<RequestTicket>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding any in-flight one.
    pub fn begin(&mut self, page_id: PageId) -> RequestTicket {
        self.generation += 1;
        let ticket = RequestTicket {
            generation: self.generation,
            page_id,
        };
        if let Some(old) = self.in_flight.replace(ticket) {
            log::trace!(
                "Request #{} for page {} superseded by #{}",
                old.generation,
                old.page_id,
                ticket.generation
            );
        }
        ticket
    }

    /// Whether `ticket` belongs to the newest request.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Mark a request as resolved. Returns false (and leaves state alone) if
    /// the ticket is stale.
    pub fn finish(&mut self, ticket: &RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Invalidate any in-flight request without starting a new one.
    pub fn supersede(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    /// The request still awaiting completion, if any.
    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }
}
