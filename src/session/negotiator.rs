//! Secondary channel negotiation.
//!
//! ```text
//! awaiting-registration ─► awaiting-socket-path ─► connecting-secondary ─► ready
//! ```
//!
//! After registration the session asks the TV for its pointer socket. Only
//! the response carrying the remembered request id may open the channel,
//! and only once: a later socket path is ignored.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// NegotiationState
// ============================================================================

/// Progress of the pointer channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NegotiationState {
    /// Registration not acknowledged yet.
    #[default]
    AwaitingRegistration,
    /// Socket request sent; waiting for the response with this id.
    AwaitingSocketPath {
        /// Id of the socket request.
        request_id: RequestId,
    },
    /// Secondary socket is opening.
    ConnectingSecondary,
    /// Secondary socket is open.
    Ready,
    /// Secondary socket closed. Never re-created for this session.
    Closed,
}

// ============================================================================
// Negotiator
// ============================================================================

/// Pointer-channel negotiation state machine.
#[derive(Debug, Default)]
pub struct Negotiator {
    state: NegotiationState,
}

impl Negotiator {
    /// Creates a negotiator awaiting registration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// Returns `true` once the pointer channel is usable.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == NegotiationState::Ready
    }

    /// Registration acknowledged: remember the id of the socket request.
    ///
    /// Returns `false` (and changes nothing) if negotiation already started.
    pub fn on_registered(&mut self, request_id: RequestId) -> bool {
        if self.state != NegotiationState::AwaitingRegistration {
            return false;
        }
        debug!(id = %request_id, "Requesting pointer socket");
        self.state = NegotiationState::AwaitingSocketPath { request_id };
        true
    }

    /// Offers a socket path carried by a response with id `response_id`.
    ///
    /// Returns the URL to open when the id matches the remembered request
    /// and no channel was learned yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the matching path is not a URL. The
    /// negotiation stays where it was.
    pub fn on_socket_path(
        &mut self,
        response_id: Option<&RequestId>,
        socket_path: &str,
    ) -> Result<Option<Url>> {
        let NegotiationState::AwaitingSocketPath { request_id } = &self.state else {
            debug!(state = ?self.state, "Ignoring socket path");
            return Ok(None);
        };
        if response_id != Some(request_id) {
            debug!(expected = %request_id, got = ?response_id, "Socket path for another request");
            return Ok(None);
        }

        let url = Url::parse(socket_path)
            .map_err(|e| Error::invalid_url(format!("pointer socket '{socket_path}': {e}")))?;
        self.state = NegotiationState::ConnectingSecondary;
        Ok(Some(url))
    }

    /// Secondary socket reported open.
    pub fn on_secondary_opened(&mut self) -> bool {
        if self.state != NegotiationState::ConnectingSecondary {
            return false;
        }
        self.state = NegotiationState::Ready;
        true
    }

    /// Secondary socket closed.
    pub fn on_secondary_closed(&mut self) {
        self.state = NegotiationState::Closed;
    }

    /// Id of the outstanding socket request, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<&RequestId> {
        match &self.state {
            NegotiationState::AwaitingSocketPath { request_id } => Some(request_id),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "wss://10.0.0.2:3001/resources/abc/netinput.pointer.sock";

    #[test]
    fn test_full_negotiation() {
        let mut negotiator = Negotiator::new();
        let id = RequestId::new("pointer_1");

        assert!(negotiator.on_registered(id.clone()));
        assert_eq!(negotiator.pending_request(), Some(&id));

        let url = negotiator.on_socket_path(Some(&id), PATH).expect("valid");
        assert_eq!(url.map(|u| u.to_string()).as_deref(), Some(PATH));
        assert_eq!(negotiator.state(), &NegotiationState::ConnectingSecondary);

        assert!(negotiator.on_secondary_opened());
        assert!(negotiator.is_ready());
    }

    #[test]
    fn test_mismatched_id_is_ignored() {
        let mut negotiator = Negotiator::new();
        negotiator.on_registered(RequestId::new("pointer_1"));

        let result = negotiator
            .on_socket_path(Some(&RequestId::new("other")), PATH)
            .expect("no error");
        assert!(result.is_none());
        assert!(negotiator.pending_request().is_some());

        let result = negotiator.on_socket_path(None, PATH).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn test_first_address_wins() {
        let mut negotiator = Negotiator::new();
        let id = RequestId::new("pointer_1");
        negotiator.on_registered(id.clone());

        assert!(negotiator.on_socket_path(Some(&id), PATH).expect("ok").is_some());
        assert!(negotiator.on_socket_path(Some(&id), PATH).expect("ok").is_none());
        assert!(!negotiator.on_registered(RequestId::new("pointer_2")));
    }

    #[test]
    fn test_invalid_path_keeps_waiting() {
        let mut negotiator = Negotiator::new();
        let id = RequestId::new("pointer_1");
        negotiator.on_registered(id.clone());

        let err = negotiator.on_socket_path(Some(&id), "not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
        assert!(negotiator.pending_request().is_some());
    }

    #[test]
    fn test_closed_is_final() {
        let mut negotiator = Negotiator::new();
        negotiator.on_secondary_closed();
        assert!(!negotiator.on_registered(RequestId::new("p")));
        assert!(!negotiator.on_secondary_opened());
    }
}
