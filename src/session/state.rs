//! Session lifecycle states.
//!
//! ```text
//! idle ─► connecting ─► connected ─► authorizing ─► authorized
//!   ▲                                                   │
//!   └──── connect() ◄── disconnected / denied / error ◄─┘  (from any state)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Created, never connected.
    #[default]
    Idle,
    /// Transport is opening.
    Connecting,
    /// Transport open, handshake not yet sent.
    Connected,
    /// Waiting for the TV to accept pairing.
    Authorizing,
    /// Commands are accepted.
    Authorized,
    /// The TV rejected pairing.
    Denied,
    /// Transport closed.
    Disconnected,
    /// Protocol failure.
    Error,
}

impl SessionState {
    /// Returns `true` if `connect` may start a new attempt from this state.
    #[inline]
    #[must_use]
    pub const fn can_connect(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Disconnected | Self::Denied | Self::Error
        )
    }

    /// Returns `true` for states that end a connection attempt.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Denied | Self::Error)
    }

    /// Wire-style lowercase name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authorizing => "authorizing",
            Self::Authorized => "authorized",
            Self::Denied => "denied",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AuthorizationState
// ============================================================================

/// Pairing status with the TV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthorizationState {
    /// No handshake yet.
    #[default]
    Unauthenticated,
    /// Handshake sent, waiting for the TV.
    Pending,
    /// Paired.
    Authorized,
    /// Pairing rejected.
    Denied,
}

// ============================================================================
// Status
// ============================================================================

/// Snapshot readable from any handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// Lifecycle state.
    pub state: SessionState,
    /// Pairing status.
    pub authorization: AuthorizationState,
    /// Pairing token surfaced by the TV, or supplied by the caller.
    pub token: Option<String>,
}

/// Status shared between the handle and the event loop.
///
/// Only the event loop and `connect`/`disconnect` write it.
#[derive(Debug, Default)]
pub(crate) struct SharedStatus {
    inner: RwLock<Status>,
}

impl SharedStatus {
    pub(crate) fn with_token(token: Option<String>) -> Self {
        Self {
            inner: RwLock::new(Status {
                token,
                ..Status::default()
            }),
        }
    }

    pub(crate) fn snapshot(&self) -> Status {
        self.inner.read().clone()
    }

    pub(crate) fn state(&self) -> SessionState {
        self.inner.read().state
    }

    pub(crate) fn authorization(&self) -> AuthorizationState {
        self.inner.read().authorization
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    /// Moves to `next`, returning the previous state.
    pub(crate) fn transition(&self, next: SessionState) -> SessionState {
        let mut inner = self.inner.write();
        let previous = inner.state;
        inner.state = next;
        inner.authorization = match next {
            SessionState::Idle | SessionState::Connecting | SessionState::Connected => {
                AuthorizationState::Unauthenticated
            }
            SessionState::Authorizing => AuthorizationState::Pending,
            SessionState::Authorized => AuthorizationState::Authorized,
            SessionState::Denied => AuthorizationState::Denied,
            // A rejection outlives the socket; anything else must pair again.
            SessionState::Disconnected | SessionState::Error => match inner.authorization {
                AuthorizationState::Denied => AuthorizationState::Denied,
                _ => AuthorizationState::Unauthenticated,
            },
        };
        if previous != next {
            debug!(from = %previous, to = %next, "Session state changed");
        }
        previous
    }

    pub(crate) fn set_token(&self, token: impl Into<String>) {
        self.inner.write().token = Some(token.into());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(SessionState::Authorizing.to_string(), "authorizing");
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn test_can_connect() {
        assert!(SessionState::Idle.can_connect());
        assert!(SessionState::Denied.can_connect());
        assert!(SessionState::Error.can_connect());
        assert!(!SessionState::Connecting.can_connect());
        assert!(!SessionState::Authorized.can_connect());
    }

    #[test]
    fn test_transition_tracks_authorization() {
        let status = SharedStatus::default();

        status.transition(SessionState::Authorizing);
        assert_eq!(status.authorization(), AuthorizationState::Pending);

        status.transition(SessionState::Authorized);
        assert_eq!(status.authorization(), AuthorizationState::Authorized);

        status.transition(SessionState::Disconnected);
        assert_eq!(status.authorization(), AuthorizationState::Unauthenticated);
        assert_eq!(status.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_error_resets_pending_authorization() {
        let status = SharedStatus::default();

        status.transition(SessionState::Authorizing);
        status.transition(SessionState::Error);
        assert_eq!(status.authorization(), AuthorizationState::Unauthenticated);
    }

    #[test]
    fn test_denial_survives_teardown() {
        let status = SharedStatus::default();

        status.transition(SessionState::Denied);
        status.transition(SessionState::Disconnected);
        assert_eq!(status.authorization(), AuthorizationState::Denied);

        status.transition(SessionState::Connecting);
        assert_eq!(status.authorization(), AuthorizationState::Unauthenticated);
    }

    #[test]
    fn test_token() {
        let status = SharedStatus::with_token(Some("abc".into()));
        assert_eq!(status.token().as_deref(), Some("abc"));
        status.set_token("def");
        assert_eq!(status.snapshot().token.as_deref(), Some("def"));
    }
}
