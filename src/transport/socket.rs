//! Transport socket seam.
//!
//! A session never touches a WebSocket directly. It talks to a [`Socket`]
//! for writes and reads [`TransportEvent`]s from a channel, so the same
//! state machine runs over tokio-tungstenite in production and over the
//! in-memory transport in tests.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Close code for an orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code sent when the client goes away.
pub const GOING_AWAY: u16 = 1001;

// ============================================================================
// Types
// ============================================================================

/// Resolves once the transport has written the frame.
pub type SendCompletion = oneshot::Receiver<Result<()>>;

/// Resolves once the socket is closed.
pub type CloseCompletion = oneshot::Receiver<()>;

/// Inbound event stream of one socket.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

// ============================================================================
// Frame
// ============================================================================

/// One wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Returns the frame as text, decoding binary frames lossily.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Binary(data) => String::from_utf8_lossy(data).into_owned(),
        }
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Returns `true` for an empty payload.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle and data events of one socket, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished; writes go out from here on.
    Opened,
    /// Inbound frame.
    Frame(Frame),
    /// Socket closed. Always the last event.
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
    /// Socket failed. Followed by `Closed`.
    Error(String),
}

// ============================================================================
// SocketSink
// ============================================================================

/// Write half of a transport socket.
///
/// Both methods return immediately; the outcome arrives on the returned
/// channel. Frames are written in call order.
pub trait SocketSink: Send + Sync {
    /// Queues a frame for writing.
    fn send(&self, frame: Frame) -> SendCompletion;

    /// Closes the socket with the given code.
    fn close(&self, code: u16) -> CloseCompletion;
}

// ============================================================================
// Socket
// ============================================================================

/// Owned handle to one transport socket.
#[derive(Clone)]
pub struct Socket {
    url: Url,
    sink: Arc<dyn SocketSink>,
}

impl Socket {
    /// Wraps a sink.
    #[must_use]
    pub fn new(url: Url, sink: Arc<dyn SocketSink>) -> Self {
        Self { url, sink }
    }

    /// URL the socket was opened for.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Writes a text frame.
    #[inline]
    pub fn send_text(&self, text: impl Into<String>) -> SendCompletion {
        self.sink.send(Frame::Text(text.into()))
    }

    /// Writes a frame.
    #[inline]
    pub fn send(&self, frame: Frame) -> SendCompletion {
        self.sink.send(frame)
    }

    /// Closes with [`NORMAL_CLOSURE`].
    #[inline]
    pub fn close(&self) -> CloseCompletion {
        self.sink.close(NORMAL_CLOSURE)
    }

    /// Closes with a custom code.
    #[inline]
    pub fn close_with(&self, code: u16) -> CloseCompletion {
        self.sink.close(code)
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket").field("url", &self.url.as_str()).finish()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transport sockets.
///
/// `open` does not wait for the handshake. The result shows up on the event
/// stream as `Opened`, or as `Error` followed by `Closed`.
pub trait Connector: Send + Sync {
    /// Starts opening a socket to `url`.
    fn open(&self, url: &Url) -> (Socket, TransportEvents);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_text_conversion() {
        assert_eq!(Frame::Text("a".into()).to_text(), "a");
        assert_eq!(Frame::Binary(b"type:click\n\n".to_vec()).to_text(), "type:click\n\n");
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(Frame::Text("abc".into()).len(), 3);
        assert!(Frame::Binary(Vec::new()).is_empty());
    }
}
