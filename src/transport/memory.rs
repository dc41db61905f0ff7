//! In-process transport.
//!
//! [`MemoryConnector`] hands out sockets whose far end is a [`MemoryPeer`]
//! controlled by the caller. Every write is recorded synchronously, and in
//! [`CompletionMode::Manual`] its completion is held until the peer releases
//! it. That makes ordering properties of a session observable step by step.
//!
//! ```ignore
//! let connector = MemoryConnector::manual();
//! let (socket, mut events) = connector.open(&url);
//! let peer = connector.peer(0).unwrap();
//!
//! peer.open();
//! let done = socket.send_text("a");
//! assert_eq!(peer.sent_texts(), ["a"]);
//! peer.complete_next();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, oneshot};
use url::Url;

use crate::error::{Error, Result};

use super::socket::{
    CloseCompletion, Connector, Frame, SendCompletion, Socket, SocketSink, TransportEvent,
    TransportEvents,
};

// ============================================================================
// CompletionMode
// ============================================================================

/// When writes are reported complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Immediately on send.
    #[default]
    Auto,
    /// Only when the peer calls [`MemoryPeer::complete_next`].
    Manual,
}

// ============================================================================
// PeerState
// ============================================================================

struct PeerState {
    url: Url,
    mode: CompletionMode,
    sent: Mutex<Vec<Frame>>,
    held: Mutex<VecDeque<oneshot::Sender<Result<()>>>>,
    close_code: Mutex<Option<u16>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    sent_notify: Notify,
}

impl PeerState {
    fn is_closed(&self) -> bool {
        self.close_code.lock().is_some()
    }
}

// ============================================================================
// MemorySink
// ============================================================================

struct MemorySink {
    state: Arc<PeerState>,
}

impl SocketSink for MemorySink {
    fn send(&self, frame: Frame) -> SendCompletion {
        let (done, rx) = oneshot::channel();
        if self.state.is_closed() {
            let _ = done.send(Err(Error::ConnectionClosed));
            return rx;
        }

        self.state.sent.lock().push(frame);
        match self.state.mode {
            CompletionMode::Auto => {
                let _ = done.send(Ok(()));
            }
            CompletionMode::Manual => self.state.held.lock().push_back(done),
        }
        self.state.sent_notify.notify_waiters();
        rx
    }

    fn close(&self, code: u16) -> CloseCompletion {
        let (done, rx) = oneshot::channel();
        {
            let mut close_code = self.state.close_code.lock();
            if close_code.is_none() {
                *close_code = Some(code);
                for held in self.state.held.lock().drain(..) {
                    let _ = held.send(Err(Error::ConnectionClosed));
                }
                let _ = self.state.events.send(TransportEvent::Closed {
                    code: Some(code),
                    reason: String::new(),
                });
            }
        }
        let _ = done.send(());
        rx
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// Far end of an in-memory socket.
#[derive(Clone)]
pub struct MemoryPeer {
    state: Arc<PeerState>,
}

impl std::fmt::Debug for MemoryPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPeer")
            .field("url", &self.state.url.as_str())
            .field("sent", &self.sent_count())
            .finish()
    }
}

impl MemoryPeer {
    /// URL the socket was opened for.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.state.url
    }

    /// Frames written so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Frame> {
        self.state.sent.lock().clone()
    }

    /// Frames written so far, as text.
    #[must_use]
    pub fn sent_texts(&self) -> Vec<String> {
        self.state.sent.lock().iter().map(Frame::to_text).collect()
    }

    /// Number of frames written.
    #[inline]
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.state.sent.lock().len()
    }

    /// Number of writes whose completion is held.
    #[inline]
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.state.held.lock().len()
    }

    /// Releases the oldest held write as successful.
    ///
    /// Returns `false` if nothing was held.
    pub fn complete_next(&self) -> bool {
        let next = self.state.held.lock().pop_front();
        next.map(|done| done.send(Ok(()))).is_some()
    }

    /// Releases the oldest held write as failed.
    pub fn fail_next(&self, message: &str) -> bool {
        let next = self.state.held.lock().pop_front();
        next.map(|done| done.send(Err(Error::connection(message))))
            .is_some()
    }

    /// Reports the handshake as finished.
    pub fn open(&self) {
        let _ = self.state.events.send(TransportEvent::Opened);
    }

    /// Delivers an inbound text frame.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self
            .state
            .events
            .send(TransportEvent::Frame(Frame::Text(text.into())));
    }

    /// Closes the socket from the peer side.
    pub fn push_close(&self, code: u16, reason: impl Into<String>) {
        *self.state.close_code.lock() = Some(code);
        let _ = self.state.events.send(TransportEvent::Closed {
            code: Some(code),
            reason: reason.into(),
        });
    }

    /// Fails the socket: `Error` then `Closed`.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        *self.state.close_code.lock() = Some(1006);
        let _ = self.state.events.send(TransportEvent::Error(message.clone()));
        let _ = self.state.events.send(TransportEvent::Closed {
            code: None,
            reason: message,
        });
    }

    /// Returns `true` once either side closed the socket.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Close code, if closed.
    #[inline]
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        *self.state.close_code.lock()
    }

    /// Waits until at least `count` frames have been written.
    pub async fn wait_for_sent(&self, count: usize) {
        loop {
            let notified = self.state.sent_notify.notified();
            if self.sent_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Connector producing in-memory sockets.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    mode: CompletionMode,
    auto_open: bool,
    peers: Arc<Mutex<Vec<MemoryPeer>>>,
    opened: Arc<Notify>,
}

impl std::fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("mode", &self.mode)
            .field("peers", &self.peer_count())
            .finish()
    }
}

impl MemoryConnector {
    /// Writes complete immediately; the peer opens sockets explicitly.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes complete only when released by the peer.
    #[inline]
    #[must_use]
    pub fn manual() -> Self {
        Self {
            mode: CompletionMode::Manual,
            ..Self::default()
        }
    }

    /// Reports `Opened` as soon as a socket is created.
    #[inline]
    #[must_use]
    pub fn with_auto_open(mut self) -> Self {
        self.auto_open = true;
        self
    }

    /// Number of sockets opened so far.
    #[inline]
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }

    /// Peer of the `index`-th opened socket.
    #[must_use]
    pub fn peer(&self, index: usize) -> Option<MemoryPeer> {
        self.peers.lock().get(index).cloned()
    }

    /// Waits for the `index`-th socket to be opened.
    pub async fn wait_for_peer(&self, index: usize) -> MemoryPeer {
        loop {
            let notified = self.opened.notified();
            if let Some(peer) = self.peer(index) {
                return peer;
            }
            notified.await;
        }
    }
}

impl Connector for MemoryConnector {
    fn open(&self, url: &Url) -> (Socket, TransportEvents) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(PeerState {
            url: url.clone(),
            mode: self.mode,
            sent: Mutex::new(Vec::new()),
            held: Mutex::new(VecDeque::new()),
            close_code: Mutex::new(None),
            events: event_tx,
            sent_notify: Notify::new(),
        });

        let peer = MemoryPeer {
            state: Arc::clone(&state),
        };
        if self.auto_open {
            peer.open();
        }
        self.peers.lock().push(peer);
        self.opened.notify_waiters();

        let sink = Arc::new(MemorySink { state });
        (Socket::new(url.clone(), sink), event_rx)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("wss://10.0.0.2:3001").expect("url")
    }

    #[tokio::test]
    async fn test_manual_completion_holds_writes() {
        let connector = MemoryConnector::manual();
        let (socket, _events) = connector.open(&url());
        let peer = connector.peer(0).expect("peer");

        let first = socket.send_text("a");
        let _second = socket.send_text("b");

        assert_eq!(peer.sent_texts(), ["a", "b"]);
        assert_eq!(peer.held_count(), 2);

        assert!(peer.complete_next());
        assert!(matches!(first.await, Ok(Ok(()))));
        assert_eq!(peer.held_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_completion() {
        let connector = MemoryConnector::new();
        let (socket, _events) = connector.open(&url());

        assert!(matches!(socket.send_text("a").await, Ok(Ok(()))));
        assert!(!connector.peer(0).expect("peer").complete_next());
    }

    #[tokio::test]
    async fn test_peer_events_in_order() {
        let connector = MemoryConnector::new();
        let (_socket, mut events) = connector.open(&url());
        let peer = connector.peer(0).expect("peer");

        peer.open();
        peer.push_text("{}");
        peer.push_close(1000, "bye");

        assert_eq!(events.recv().await, Some(TransportEvent::Opened));
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Frame(Frame::Text("{}".into())))
        );
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Closed {
                code: Some(1000),
                reason: "bye".into()
            })
        );
    }

    #[tokio::test]
    async fn test_close_fails_held_writes_and_rejects_new_ones() {
        let connector = MemoryConnector::manual();
        let (socket, _events) = connector.open(&url());
        let peer = connector.peer(0).expect("peer");

        let held = socket.send_text("a");
        socket.close().await.expect("closed");

        assert!(peer.is_closed());
        assert!(matches!(held.await, Ok(Err(Error::ConnectionClosed))));
        assert!(matches!(
            socket.send_text("b").await,
            Ok(Err(Error::ConnectionClosed))
        ));
        assert_eq!(peer.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_peer() {
        let connector = MemoryConnector::new().with_auto_open();
        let waiter = {
            let connector = connector.clone();
            tokio::spawn(async move { connector.wait_for_peer(0).await })
        };
        tokio::task::yield_now().await;

        let (_socket, mut events) = connector.open(&url());
        let peer = waiter.await.expect("join");

        assert_eq!(peer.url().as_str(), "wss://10.0.0.2:3001/");
        assert_eq!(events.recv().await, Some(TransportEvent::Opened));
    }
}
