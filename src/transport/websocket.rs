//! tokio-tungstenite transport.
//!
//! # Event Loop
//!
//! Each opened socket spawns one task that owns the WebSocket stream:
//!
//! - Connects (TLS through the rustls config from [`tls`](super::tls))
//! - Forwards inbound frames as [`TransportEvent::Frame`]
//! - Writes outbound frames in call order and resolves their completions
//! - Emits `Closed` exactly once when the stream ends

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rustls::ClientConfig;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{Connector as TlsConnector, connect_async_tls_with_config};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::socket::{
    CloseCompletion, Connector, Frame, SendCompletion, Socket, SocketSink, TransportEvent,
    TransportEvents,
};
use super::tls::{self, TrustEvaluator};

// ============================================================================
// SinkCommand
// ============================================================================

/// Internal commands for the socket task.
enum SinkCommand {
    /// Write a frame.
    Send {
        frame: Frame,
        done: oneshot::Sender<Result<()>>,
    },
    /// Close the socket.
    Close {
        code: u16,
        done: oneshot::Sender<()>,
    },
}

// ============================================================================
// WebSocketSink
// ============================================================================

/// Sink half handed to the session.
struct WebSocketSink {
    command_tx: mpsc::UnboundedSender<SinkCommand>,
}

impl SocketSink for WebSocketSink {
    fn send(&self, frame: Frame) -> SendCompletion {
        let (done, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(SinkCommand::Send { done, .. })) =
            self.command_tx.send(SinkCommand::Send { frame, done })
        {
            let _ = done.send(Err(Error::ConnectionClosed));
        }
        rx
    }

    fn close(&self, code: u16) -> CloseCompletion {
        let (done, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(SinkCommand::Close { done, .. })) =
            self.command_tx.send(SinkCommand::Close { code, done })
        {
            let _ = done.send(());
        }
        rx
    }
}

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Opens WebSocket connections to TVs.
#[derive(Clone)]
pub struct WebSocketConnector {
    tls: Arc<ClientConfig>,
}

impl std::fmt::Debug for WebSocketConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnector").finish_non_exhaustive()
    }
}

impl WebSocketConnector {
    /// Creates a connector that defers certificate trust to `evaluator`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TLS config cannot be built.
    pub fn new(evaluator: Arc<dyn TrustEvaluator>) -> Result<Self> {
        Ok(Self {
            tls: tls::client_config(evaluator)?,
        })
    }

    /// Creates a connector from a prepared rustls config.
    #[inline]
    #[must_use]
    pub fn with_tls(tls: Arc<ClientConfig>) -> Self {
        Self { tls }
    }

    /// Socket task.
    async fn run(
        url: Url,
        tls: Arc<ClientConfig>,
        mut command_rx: mpsc::UnboundedReceiver<SinkCommand>,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let connect = connect_async_tls_with_config(
            url.as_str(),
            None,
            false,
            Some(TlsConnector::Rustls(tls)),
        );
        tokio::pin!(connect);

        // Writes issued before the handshake completes wait here.
        let mut backlog = VecDeque::new();

        let ws_stream = loop {
            tokio::select! {
                result = &mut connect => match result {
                    Ok((stream, _)) => break stream,
                    Err(e) => {
                        error!(url = %url, error = %e, "WebSocket connect failed");
                        let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                        let _ = event_tx.send(TransportEvent::Closed {
                            code: None,
                            reason: e.to_string(),
                        });
                        Self::fail_backlog(backlog, &mut command_rx);
                        return;
                    }
                },

                command = command_rx.recv() => match command {
                    Some(SinkCommand::Send { frame, done }) => backlog.push_back((frame, done)),
                    Some(SinkCommand::Close { done, .. }) => {
                        debug!(url = %url, "Closed before handshake finished");
                        let _ = event_tx.send(TransportEvent::Closed {
                            code: None,
                            reason: "closed before open".into(),
                        });
                        Self::fail_backlog(backlog, &mut command_rx);
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        debug!(url = %url, "Socket dropped before handshake finished");
                        return;
                    }
                },
            }
        };

        debug!(url = %url, "WebSocket opened");
        let _ = event_tx.send(TransportEvent::Opened);

        let (mut ws_write, mut ws_read) = ws_stream.split();

        for (frame, done) in backlog {
            let result = ws_write.send(to_message(frame)).await.map_err(Error::from);
            let _ = done.send(result);
        }

        let mut close_waiter = None;
        let (code, reason) = loop {
            tokio::select! {
                message = ws_read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Text frame received");
                        let _ = event_tx.send(TransportEvent::Frame(Frame::Text(text.as_str().to_owned())));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = event_tx.send(TransportEvent::Frame(Frame::Binary(data.to_vec())));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(url = %url, "WebSocket closed by remote");
                        break match frame {
                            Some(f) => (Some(u16::from(f.code)), f.reason.as_str().to_owned()),
                            None => (None, String::new()),
                        };
                    }
                    Some(Err(e)) => {
                        error!(url = %url, error = %e, "WebSocket error");
                        let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                        break (None, e.to_string());
                    }
                    None => {
                        debug!(url = %url, "WebSocket stream ended");
                        break (None, String::new());
                    }
                    // Ping, Pong, raw frames
                    Some(Ok(_)) => {}
                },

                command = command_rx.recv() => match command {
                    Some(SinkCommand::Send { frame, done }) => {
                        let result = ws_write.send(to_message(frame)).await.map_err(Error::from);
                        if let Err(e) = &result {
                            warn!(url = %url, error = %e, "Failed to write frame");
                        }
                        let _ = done.send(result);
                    }
                    Some(SinkCommand::Close { code, done }) => {
                        debug!(url = %url, code, "Closing WebSocket");
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                            debug!(error = %e, "Close frame not delivered");
                        }
                        close_waiter = Some(done);
                        break (Some(code), String::new());
                    }
                    None => {
                        debug!(url = %url, "Socket handle dropped");
                        let _ = ws_write.close().await;
                        break (None, String::new());
                    }
                },
            }
        };

        let _ = ws_write.close().await;
        let _ = event_tx.send(TransportEvent::Closed { code, reason });
        Self::fail_backlog(VecDeque::new(), &mut command_rx);
        if let Some(done) = close_waiter {
            let _ = done.send(());
        }
        debug!(url = %url, "Socket task terminated");
    }

    /// Fails queued writes and acknowledges queued closes.
    fn fail_backlog(
        backlog: VecDeque<(Frame, oneshot::Sender<Result<()>>)>,
        command_rx: &mut mpsc::UnboundedReceiver<SinkCommand>,
    ) {
        for (_, done) in backlog {
            let _ = done.send(Err(Error::ConnectionClosed));
        }
        command_rx.close();
        while let Ok(command) = command_rx.try_recv() {
            match command {
                SinkCommand::Send { done, .. } => {
                    let _ = done.send(Err(Error::ConnectionClosed));
                }
                SinkCommand::Close { done, .. } => {
                    let _ = done.send(());
                }
            }
        }
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, url: &Url) -> (Socket, TransportEvents) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        debug!(url = %url, "Opening WebSocket");
        tokio::spawn(Self::run(
            url.clone(),
            Arc::clone(&self.tls),
            command_rx,
            event_tx,
        ));

        let sink = Arc::new(WebSocketSink { command_tx });
        (Socket::new(url.clone(), sink), event_rx)
    }
}

/// Converts a transport frame to a tungstenite message.
fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
