//! Monotonic request identifiers.
//!
//! Every submission that passes validation is issued a [`RequestId`] one
//! greater than the last. Only the latest issued id may change the session;
//! a response carrying any older id is discarded on arrival.

use super::CancellationToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Identifier of one submission, unique and increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Id and cancellation token handed to one submission.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: RequestId,
    pub token: CancellationToken,
}

/// Bookkeeping for issued and in-flight submissions.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
    in_flight: Option<Ticket>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id, cancelling whatever was still in flight.
    pub fn issue(&mut self) -> Ticket {
        self.cancel_in_flight();
        self.latest += 1;
        let ticket = Ticket {
            id: RequestId(self.latest),
            token: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Make every issued id stale without issuing a new one.
    ///
    /// Used when the dataset is replaced under a pending request.
    pub fn invalidate(&mut self) {
        if self.in_flight.is_some() {
            self.cancel_in_flight();
            self.latest += 1;
        }
    }

    /// Whether `id` is the most recently issued id.
    pub fn is_current(&self, id: RequestId) -> bool {
        self.latest == id.0
    }

    /// Mark `id` finished. Returns `false` (and changes nothing) for stale ids.
    pub fn complete(&mut self, id: RequestId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        if self.in_flight.as_ref().is_some_and(|t| t.id == id) {
            self.in_flight = None;
        }
        true
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(|t| t.id)
    }

    fn cancel_in_flight(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            debug!("Cancelling superseded request {}", previous.id);
            previous.token.cancel();
        }
    }
}
