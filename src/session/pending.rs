//! Pending-request table.
//!
//! Maps correlation ids of requests awaiting a TV response to the
//! continuation of the caller that issued them. Only the event loop touches
//! it, so it needs no lock.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::lg::ResponsePayload;

// ============================================================================
// Outcome
// ============================================================================

/// Result of a submitted command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The command was carried out (or written, for vendors without replies).
    Accepted,
    /// Reply of a status query.
    Reply(ResponsePayload),
}

impl Outcome {
    /// Returns the reply payload, if any.
    #[inline]
    #[must_use]
    pub fn into_reply(self) -> Option<ResponsePayload> {
        match self {
            Self::Accepted => None,
            Self::Reply(payload) => Some(payload),
        }
    }
}

/// Continuation of one submitted command.
pub(crate) type Responder = oneshot::Sender<Result<Outcome>>;

// ============================================================================
// PendingTable
// ============================================================================

/// One request awaiting its response.
struct PendingRequest {
    responder: Responder,
    wants_reply: bool,
}

/// Request id → waiting continuation.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: FxHashMap<RequestId, PendingRequest>,
}

impl PendingTable {
    /// Registers a request. `wants_reply` selects `Reply` over `Accepted`.
    pub(crate) fn insert(&mut self, id: RequestId, responder: Responder, wants_reply: bool) {
        self.entries.insert(
            id,
            PendingRequest {
                responder,
                wants_reply,
            },
        );
    }

    /// Returns `true` if a request with this id is waiting.
    #[inline]
    pub(crate) fn contains(&self, id: &RequestId) -> bool {
        self.entries.contains_key(id)
    }

    /// Resolves a request with the TV's payload. Returns `false` on a miss.
    pub(crate) fn resolve(&mut self, id: &RequestId, payload: Option<ResponsePayload>) -> bool {
        let Some(pending) = self.entries.remove(id) else {
            return false;
        };
        let outcome = if pending.wants_reply {
            Outcome::Reply(payload.unwrap_or_default())
        } else {
            Outcome::Accepted
        };
        let _ = pending.responder.send(Ok(outcome));
        true
    }

    /// Fails a request. Returns `false` on a miss.
    pub(crate) fn fail(&mut self, id: &RequestId, error: Error) -> bool {
        match self.entries.remove(id) {
            Some(pending) => {
                let _ = pending.responder.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fails every request with an error built by `make_error`.
    pub(crate) fn fail_all(&mut self, make_error: impl Fn() -> Error) {
        let count = self.entries.len();
        for (_, pending) in self.entries.drain() {
            let _ = pending.responder.send(Err(make_error()));
        }
        if count > 0 {
            debug!(count, "Failed pending requests");
        }
    }

    /// Number of waiting requests.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
