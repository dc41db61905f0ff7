//! Per-session event loop.
//!
//! One tokio task per connection owns everything mutable about a session:
//! the sockets, the pending-request table, the vendor state (write queue,
//! negotiator) and the in-flight write completions. The public handle only
//! sends [`LoopCommand`]s, so submissions and inbound frames never race.
//!
//! # Event Loop
//!
//! The task `select!`s over:
//!
//! - Primary socket events (open, frames, close)
//! - Secondary socket events, once negotiated
//! - Write completions
//! - Commands from the handle
//!
//! Teardown closes the secondary socket before the primary one and fails
//! every pending continuation with [`Error::SessionClosed`].

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::device::Vendor;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::RemoteCommand;
use crate::transport::{
    Connector, Frame, GOING_AWAY, SendCompletion, Socket, TransportEvent, TransportEvents,
};

use super::events::{EventHub, SessionEvent};
use super::lg::LgProtocol;
use super::pending::{Outcome, PendingTable, Responder};
use super::samsung::SamsungProtocol;
use super::state::{SessionState, SharedStatus};

// ============================================================================
// LoopCommand
// ============================================================================

/// Commands from the session handle.
pub(crate) enum LoopCommand {
    /// Dispatch a command.
    Submit {
        command: RemoteCommand,
        responder: Responder,
    },
    /// Answer a PIN pairing prompt.
    PairWithPin { pin: String, responder: Responder },
    /// Tear the session down.
    Disconnect { done: oneshot::Sender<()> },
    /// Round-trip through the loop.
    #[cfg(test)]
    Sync(oneshot::Sender<()>),
}

// ============================================================================
// Writes
// ============================================================================

/// What a completed write belongs to.
pub(crate) enum WriteTag {
    /// Head of the strict-order queue.
    Queue,
    /// A request whose response is awaited in the pending table.
    Request(RequestId),
    /// Fire-and-forget write resolved by its own completion.
    Direct(Responder),
    /// Handshake traffic nobody waits on.
    Handshake,
}

/// Completion of one write.
pub(crate) struct WriteDone {
    pub(crate) tag: WriteTag,
    pub(crate) result: Result<()>,
}

type WriteFuture = Pin<Box<dyn Future<Output = WriteDone> + Send>>;

// ============================================================================
// Stop
// ============================================================================

/// Why and how the loop ends.
#[derive(Debug)]
pub(crate) struct Stop {
    state: SessionState,
    code: Option<u16>,
    reason: String,
}

// ============================================================================
// LoopContext
// ============================================================================

/// State shared by the loop and the vendor handlers.
pub(crate) struct LoopContext {
    pub(crate) vendor: Vendor,
    pub(crate) primary: Socket,
    pub(crate) pending: PendingTable,
    secondary: Option<Socket>,
    secondary_events: Option<TransportEvents>,
    writes: FuturesUnordered<WriteFuture>,
    status: Arc<SharedStatus>,
    hub: Arc<EventHub>,
    connector: Arc<dyn Connector>,
    stop: Option<Stop>,
}

impl LoopContext {
    /// Current lifecycle state.
    #[inline]
    pub(crate) fn state(&self) -> SessionState {
        self.status.state()
    }

    /// Token known to the session, if any.
    #[inline]
    pub(crate) fn token(&self) -> Option<String> {
        self.status.token()
    }

    #[inline]
    pub(crate) fn transition(&self, next: SessionState) {
        self.status.transition(next);
    }

    #[inline]
    pub(crate) fn emit(&self, event: SessionEvent) {
        self.hub.emit(&event);
    }

    /// Tracks a write completion.
    pub(crate) fn track(&mut self, completion: SendCompletion, tag: WriteTag) {
        self.writes.push(Box::pin(async move {
            let result = completion
                .await
                .unwrap_or_else(|_| Err(Error::ConnectionClosed));
            WriteDone { tag, result }
        }));
    }

    /// Writes a text frame on the primary socket.
    pub(crate) fn send_primary(&mut self, text: String, tag: WriteTag) {
        trace!(len = text.len(), "Writing primary frame");
        let completion = self.primary.send_text(text);
        self.track(completion, tag);
    }

    /// Writes a frame on the secondary socket, resolving `responder` on completion.
    pub(crate) fn send_secondary(&mut self, frame: Frame, responder: Responder) {
        match &self.secondary {
            Some(socket) => {
                let completion = socket.send(frame);
                self.track(completion, WriteTag::Direct(responder));
            }
            None => {
                let _ = responder.send(Err(Error::SecondaryChannelUnavailable));
            }
        }
    }

    /// Opens the secondary socket. A second call is ignored.
    pub(crate) fn open_secondary(&mut self, url: &Url) {
        if self.secondary.is_some() {
            debug!(url = %url, "Secondary socket already open");
            return;
        }
        info!(url = %url, "Opening pointer socket");
        let (socket, events) = self.connector.open(url);
        self.secondary = Some(socket);
        self.secondary_events = Some(events);
    }

    /// Drops the secondary socket after it closed.
    pub(crate) fn forget_secondary(&mut self) {
        self.secondary = None;
        self.secondary_events = None;
    }

    /// Records a successful pairing.
    pub(crate) fn authorize(&mut self, token: String) {
        info!(vendor = %self.vendor, "Paired");
        self.status.set_token(token.clone());
        self.transition(SessionState::Authorized);
        self.emit(SessionEvent::Paired { token });
    }

    /// The TV rejected pairing. Ends the session in `Denied`.
    ///
    /// Requests still waiting, such as a PIN submission, fail with
    /// [`Error::AuthorizationDenied`].
    pub(crate) fn deny(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(vendor = %self.vendor, reason = %reason, "Authorization denied");
        self.pending
            .fail_all(|| Error::authorization_denied(reason.clone()));
        self.transition(SessionState::Denied);
        self.emit(SessionEvent::AuthorizationDenied {
            reason: reason.clone(),
        });
        self.stop(SessionState::Denied, None, reason);
    }

    /// Protocol failure. Ends the session in `Error`.
    pub(crate) fn fail(&mut self, error: &Error) {
        error!(vendor = %self.vendor, error = %error, "Session failed");
        self.transition(SessionState::Error);
        self.emit(SessionEvent::Error {
            message: error.to_string(),
        });
        self.stop(SessionState::Error, None, error.to_string());
    }

    /// Reports an undecodable frame. The session stays up.
    pub(crate) fn malformed(&self, error: &Error) {
        warn!(vendor = %self.vendor, error = %error, "Dropping malformed frame");
        self.emit(SessionEvent::MalformedFrame {
            message: error.to_string(),
        });
    }

    /// Requests teardown after the current step. The first request wins.
    pub(crate) fn stop(&mut self, state: SessionState, code: Option<u16>, reason: String) {
        if self.stop.is_none() {
            self.stop = Some(Stop {
                state,
                code,
                reason,
            });
        }
    }
}

// ============================================================================
// VendorProtocol
// ============================================================================

/// Vendor-specific handshake and dispatch.
pub(crate) enum VendorProtocol {
    /// Strict in-order dispatch.
    Samsung(SamsungProtocol),
    /// Request/response dispatch with a pointer channel.
    Lg(LgProtocol),
}

impl VendorProtocol {
    fn on_open(&mut self, ctx: &mut LoopContext) {
        match self {
            Self::Samsung(p) => p.on_open(ctx),
            Self::Lg(p) => p.on_open(ctx),
        }
    }

    fn on_frame(&mut self, ctx: &mut LoopContext, text: &str) {
        match self {
            Self::Samsung(p) => p.on_frame(ctx, text),
            Self::Lg(p) => p.on_frame(ctx, text),
        }
    }

    fn submit(&mut self, ctx: &mut LoopContext, command: RemoteCommand, responder: Responder) {
        match self {
            Self::Samsung(p) => p.submit(ctx, command, responder),
            Self::Lg(p) => p.submit(ctx, command, responder),
        }
    }

    fn pair_with_pin(&mut self, ctx: &mut LoopContext, pin: String, responder: Responder) {
        match self {
            Self::Samsung(_) => {
                let _ = responder.send(Err(Error::unsupported(ctx.vendor, "pair_with_pin")));
            }
            Self::Lg(p) => p.pair_with_pin(ctx, pin, responder),
        }
    }

    fn on_queue_written(&mut self, ctx: &mut LoopContext, result: Result<()>) {
        match self {
            Self::Samsung(p) => p.on_written(ctx, result),
            Self::Lg(_) => trace!("Queue completion without a queue"),
        }
    }

    fn on_secondary_event(&mut self, ctx: &mut LoopContext, event: TransportEvent) {
        match self {
            Self::Samsung(_) => trace!(?event, "Samsung has no secondary socket"),
            Self::Lg(p) => p.on_secondary_event(ctx, event),
        }
    }

    fn teardown(&mut self, ctx: &mut LoopContext) {
        match self {
            Self::Samsung(p) => p.teardown(ctx),
            Self::Lg(_) => {}
        }
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// The per-session task.
pub(crate) struct EventLoop {
    ctx: LoopContext,
    protocol: VendorProtocol,
    commands: mpsc::UnboundedReceiver<LoopCommand>,
    primary_events: TransportEvents,
}

/// Everything needed to start a loop.
pub(crate) struct LoopParts {
    pub(crate) vendor: Vendor,
    pub(crate) protocol: VendorProtocol,
    pub(crate) primary: Socket,
    pub(crate) primary_events: TransportEvents,
    pub(crate) commands: mpsc::UnboundedReceiver<LoopCommand>,
    pub(crate) status: Arc<SharedStatus>,
    pub(crate) hub: Arc<EventHub>,
    pub(crate) connector: Arc<dyn Connector>,
}

impl EventLoop {
    pub(crate) fn new(parts: LoopParts) -> Self {
        Self {
            ctx: LoopContext {
                vendor: parts.vendor,
                primary: parts.primary,
                pending: PendingTable::default(),
                secondary: None,
                secondary_events: None,
                writes: FuturesUnordered::new(),
                status: parts.status,
                hub: parts.hub,
                connector: parts.connector,
                stop: None,
            },
            protocol: parts.protocol,
            commands: parts.commands,
            primary_events: parts.primary_events,
        }
    }

    /// Runs until disconnect, transport close, denial or protocol failure.
    pub(crate) async fn run(mut self) {
        let mut disconnect_waiter = None;

        loop {
            tokio::select! {
                event = self.primary_events.recv() => {
                    let event = event.unwrap_or_else(|| TransportEvent::Closed {
                        code: None,
                        reason: "transport dropped".into(),
                    });
                    self.on_primary_event(event);
                }

                Some(event) = next_event(&mut self.ctx.secondary_events) => {
                    self.protocol.on_secondary_event(&mut self.ctx, event);
                }

                Some(done) = self.ctx.writes.next(), if !self.ctx.writes.is_empty() => {
                    self.on_write(done);
                }

                command = self.commands.recv() => match command {
                    Some(LoopCommand::Disconnect { done }) => {
                        debug!(vendor = %self.ctx.vendor, "Disconnect requested");
                        disconnect_waiter = Some(done);
                        self.ctx.stop(SessionState::Disconnected, None, "disconnected".into());
                    }
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("Session handle dropped");
                        self.ctx.stop(SessionState::Disconnected, None, "handle dropped".into());
                    }
                },
            }

            if let Some(stop) = self.ctx.stop.take() {
                self.teardown(stop).await;
                break;
            }
        }

        if let Some(done) = disconnect_waiter {
            let _ = done.send(());
        }
        debug!("Session loop terminated");
    }

    fn on_primary_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                info!(vendor = %self.ctx.vendor, url = %self.ctx.primary.url(), "Connected");
                self.ctx.transition(SessionState::Connected);
                self.ctx.emit(SessionEvent::Connected);
                self.protocol.on_open(&mut self.ctx);
            }
            TransportEvent::Frame(frame) => {
                let text = frame.to_text();
                trace!(len = text.len(), "Primary frame received");
                self.protocol.on_frame(&mut self.ctx, &text);
            }
            TransportEvent::Error(message) => {
                error!(vendor = %self.ctx.vendor, error = %message, "Transport error");
                self.ctx.emit(SessionEvent::TransportError { message });
            }
            TransportEvent::Closed { code, reason } => {
                info!(vendor = %self.ctx.vendor, ?code, reason = %reason, "Primary socket closed");
                self.ctx.stop(SessionState::Disconnected, code, reason);
            }
        }
    }

    fn on_write(&mut self, done: WriteDone) {
        match done.tag {
            WriteTag::Queue => self.protocol.on_queue_written(&mut self.ctx, done.result),
            WriteTag::Request(id) => {
                if let Err(e) = done.result {
                    warn!(id = %id, error = %e, "Request write failed");
                    self.ctx.pending.fail(&id, e);
                }
            }
            WriteTag::Direct(responder) => {
                let _ = responder.send(done.result.map(|()| Outcome::Accepted));
            }
            WriteTag::Handshake => {
                if let Err(e) = done.result {
                    warn!(error = %e, "Handshake write failed");
                }
            }
        }
    }

    fn on_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Submit { command, responder } => {
                let state = self.ctx.state();
                if state != SessionState::Authorized {
                    let _ = responder.send(Err(Error::not_authorized(state)));
                    return;
                }
                debug!(command = command.name(), "Submitting");
                self.protocol.submit(&mut self.ctx, command, responder);
            }
            LoopCommand::PairWithPin { pin, responder } => {
                self.protocol.pair_with_pin(&mut self.ctx, pin, responder);
            }
            LoopCommand::Disconnect { .. } => {}
            #[cfg(test)]
            LoopCommand::Sync(done) => {
                let _ = done.send(());
            }
        }
    }

    async fn teardown(&mut self, stop: Stop) {
        debug!(state = %stop.state, pending = self.ctx.pending.len(), "Tearing down session");

        if let Some(secondary) = self.ctx.secondary.take() {
            let _ = secondary.close_with(GOING_AWAY).await;
        }
        self.ctx.secondary_events = None;
        let _ = self.ctx.primary.close_with(GOING_AWAY).await;

        self.protocol.teardown(&mut self.ctx);
        self.ctx.pending.fail_all(|| Error::SessionClosed);
        self.ctx.writes.clear();

        self.ctx.transition(stop.state);
        self.ctx.emit(SessionEvent::Disconnected {
            code: stop.code,
            reason: stop.reason,
        });
        info!(vendor = %self.ctx.vendor, state = %stop.state, "Session closed");
    }
}

/// Next event of an optional stream; pends forever when absent.
async fn next_event(events: &mut Option<TransportEvents>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
