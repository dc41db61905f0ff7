//! Error types for TV remote sessions.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tv_remote::{Key, RemoteCommand, Result};
//!
//! async fn example(remote: &tv_remote::Remote) -> Result<()> {
//!     remote.submit(RemoteCommand::Key(Key::Enter)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`], [`Error::InvalidAddress`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::SessionClosed`] |
//! | Authorization | [`Error::NotAuthorized`], [`Error::AuthorizationDenied`], [`Error::MissingToken`], [`Error::InvalidPin`] |
//! | Protocol | [`Error::MalformedFrame`], [`Error::Protocol`], [`Error::Peer`], [`Error::HttpStatus`] |
//! | Dispatch | [`Error::AlreadyConnected`], [`Error::Unsupported`], [`Error::SecondaryChannelUnavailable`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::device::Vendor;
use crate::session::SessionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`RemoteBuilder::build`](crate::RemoteBuilder::build) when
    /// required settings are missing or inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The device descriptor cannot produce a connection URL.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Why URL construction failed.
        message: String,
    },

    /// Network address rejected by vendor validation.
    #[error("Invalid address: {address}")]
    InvalidAddress {
        /// The rejected address.
        address: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport could not open or failed while open.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the transport failure.
        message: String,
    },

    /// Transport closed underneath an operation.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The session was torn down while the operation was pending.
    #[error("Session closed")]
    SessionClosed,

    // ========================================================================
    // Authorization Errors
    // ========================================================================
    /// Command submitted while the session is not authorized.
    #[error("Not authorized (session is {state})")]
    NotAuthorized {
        /// State the session was in when the command was rejected.
        state: SessionState,
    },

    /// The TV explicitly rejected pairing.
    #[error("Authorization denied: {message}")]
    AuthorizationDenied {
        /// Reason reported by the peer.
        message: String,
    },

    /// A success response carried no pairing token.
    #[error("No pairing token in {context}")]
    MissingToken {
        /// Which response lacked the token.
        context: String,
    },

    /// PIN failed local validation or was rejected by the TV.
    #[error("Invalid PIN: {message}")]
    InvalidPin {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame could not be decoded.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Decoder diagnostic.
        message: String,
    },

    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The TV answered a specific request with an error.
    #[error("Request {request_id} failed: {message}")]
    Peer {
        /// Correlation id of the failed request.
        request_id: String,
        /// Error text reported by the TV.
        message: String,
    },

    /// HTTP endpoint returned a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// `connect` called on a session that is already live.
    #[error("Connection already established")]
    AlreadyConnected,

    /// The vendor has no mapping for this command.
    #[error("{vendor} does not support {command}")]
    Unsupported {
        /// Target vendor.
        vendor: Vendor,
        /// Command name.
        command: String,
    },

    /// Pointer/keyboard command before the secondary channel is ready.
    #[error("Pointer input channel is not available")]
    SecondaryChannelUnavailable,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Creates an invalid address error.
    #[inline]
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a not authorized error.
    #[inline]
    pub fn not_authorized(state: SessionState) -> Self {
        Self::NotAuthorized { state }
    }

    /// Creates an authorization denied error.
    #[inline]
    pub fn authorization_denied(message: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            message: message.into(),
        }
    }

    /// Creates a missing token error.
    #[inline]
    pub fn missing_token(context: impl Into<String>) -> Self {
        Self::MissingToken {
            context: context.into(),
        }
    }

    /// Creates an invalid PIN error.
    #[inline]
    pub fn invalid_pin(message: impl Into<String>) -> Self {
        Self::InvalidPin {
            message: message.into(),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a peer error for a correlated request.
    #[inline]
    pub fn peer(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Peer {
            request_id: request_id.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    #[inline]
    pub fn http_status(status: u16, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Creates an unsupported command error.
    #[inline]
    pub fn unsupported(vendor: Vendor, command: impl Into<String>) -> Self {
        Self::Unsupported {
            vendor,
            command: command.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport-level failure.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::SessionClosed
                | Self::WebSocket(_)
                | Self::Http(_)
        )
    }

    /// Returns `true` if this error stems from pairing or authorization.
    #[inline]
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized { .. }
                | Self::AuthorizationDenied { .. }
                | Self::MissingToken { .. }
                | Self::InvalidPin { .. }
        )
    }

    /// Returns `true` if a new session may succeed where this one failed.
    ///
    /// The crate never retries; this only informs the caller's policy.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::SessionClosed
                | Self::SecondaryChannelUnavailable
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_not_authorized_display_names_state() {
        let err = Error::not_authorized(SessionState::Authorizing);
        assert_eq!(err.to_string(), "Not authorized (session is authorizing)");
    }

    #[test]
    fn test_unsupported_display() {
        let err = Error::unsupported(Vendor::Roku, "set_pin");
        assert_eq!(err.to_string(), "Roku does not support set_pin");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::SessionClosed.is_connection_error());
        assert!(!Error::malformed_frame("x").is_connection_error());
    }

    #[test]
    fn test_authorization_and_malformed_are_distinct() {
        let denied = Error::authorization_denied("rejected");
        let malformed = Error::malformed_frame("bad json");

        assert!(denied.is_authorization_error());
        assert!(!malformed.is_authorization_error());
        assert!(!denied.is_connection_error());
        assert!(!malformed.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::ConnectionClosed.is_recoverable());
        assert!(!Error::authorization_denied("no").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
