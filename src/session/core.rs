//! Socket session handle.
//!
//! A [`Session`] is a cheap, clonable handle. Each [`connect`](Session::connect)
//! spawns one event-loop task that owns the sockets and all protocol state;
//! the handle only forwards commands to it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::protocol::RemoteCommand;
use crate::remote::SessionOptions;
use crate::transport::{Connector, WebSocketConnector, tls};

use super::event_loop::{EventLoop, LoopCommand, LoopParts, VendorProtocol};
use super::events::{EventHub, SessionEvent, Subscription};
use super::lg::{self, LgProtocol};
use super::pending::Outcome;
use super::samsung::{self, SamsungProtocol};
use super::state::{AuthorizationState, SessionState, SharedStatus, Status};

// ============================================================================
// Link
// ============================================================================

/// Channel to a running loop and its task.
struct Link {
    commands: mpsc::UnboundedSender<LoopCommand>,
    task: JoinHandle<()>,
}

// ============================================================================
// SessionInner
// ============================================================================

struct SessionInner {
    descriptor: DeviceDescriptor,
    options: SessionOptions,
    status: Arc<SharedStatus>,
    hub: Arc<EventHub>,
    connector: Arc<dyn Connector>,
    link: Mutex<Option<Link>>,
    /// Serializes `connect` and `disconnect`.
    lifecycle: tokio::sync::Mutex<()>,
}

// ============================================================================
// Session
// ============================================================================

/// WebSocket session with a Samsung or LG TV.
///
/// # Example
///
/// ```ignore
/// let session = Session::new(descriptor, SessionOptions::new())?;
/// let _sub = session.subscribe(|event| println!("{event:?}"));
/// session.connect().await?;
/// // ... wait for SessionEvent::Paired ...
/// session.submit(RemoteCommand::VolumeUp).await?;
/// session.disconnect().await;
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("vendor", &self.inner.descriptor.vendor())
            .field("address", &self.inner.descriptor.address())
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl Session {
    /// Creates an idle session.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for vendors without a socket protocol
    /// - An error if the default TLS configuration cannot be built
    pub fn new(descriptor: DeviceDescriptor, options: SessionOptions) -> Result<Self> {
        let vendor = descriptor.vendor();
        if !vendor.uses_socket() {
            return Err(Error::config(format!(
                "{vendor} is controlled over HTTP, not a socket session"
            )));
        }

        let connector: Arc<dyn Connector> = match options.connector() {
            Some(connector) => connector,
            None => Arc::new(WebSocketConnector::new(tls::resolve_evaluator(
                options.trust_evaluator(),
            ))?),
        };
        let status = Arc::new(SharedStatus::with_token(
            options.pairing_key().filter(|k| !k.is_empty()).map(str::to_owned),
        ));

        Ok(Self {
            inner: Arc::new(SessionInner {
                descriptor,
                options,
                status,
                hub: Arc::new(EventHub::new()),
                connector,
                link: Mutex::new(None),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        })
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Opens the control socket and starts pairing.
    ///
    /// Returns once the loop is running; progress arrives as events. The
    /// last pairing token known to the session is sent along.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] unless idle, disconnected, denied or failed
    /// - [`Error::InvalidAddress`] / [`Error::InvalidUrl`] / [`Error::Config`]
    ///   if no URL can be built; no socket is opened
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.inner.lifecycle.lock().await;

        let state = self.state();
        if !state.can_connect() {
            return Err(Error::AlreadyConnected);
        }
        self.reap().await;

        let inner = &self.inner;
        let token = inner.status.token();
        let (url, protocol) = match inner.descriptor.vendor() {
            Vendor::Samsung => (
                samsung::connect_url(&inner.descriptor, &inner.options, token.as_deref())?,
                VendorProtocol::Samsung(SamsungProtocol::new(token)),
            ),
            Vendor::Lg => (
                lg::connect_url(&inner.descriptor, &inner.options)?,
                VendorProtocol::Lg(LgProtocol::new(
                    inner.options.pairing_type(),
                    token,
                    inner.options.auto_subscribe(),
                )),
            ),
            vendor => {
                return Err(Error::config(format!("{vendor} has no socket session")));
            }
        };

        info!(vendor = %inner.descriptor.vendor(), url = %url, "Connecting");
        inner.status.transition(SessionState::Connecting);

        let (primary, primary_events) = inner.connector.open(&url);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(LoopParts {
            vendor: inner.descriptor.vendor(),
            protocol,
            primary,
            primary_events,
            commands: command_rx,
            status: Arc::clone(&inner.status),
            hub: Arc::clone(&inner.hub),
            connector: Arc::clone(&inner.connector),
        });
        let task = tokio::spawn(event_loop.run());

        *inner.link.lock() = Some(Link { commands, task });
        Ok(())
    }

    /// Closes both sockets and fails every pending command with
    /// [`Error::SessionClosed`]. Safe to call in any state, any number of times.
    pub async fn disconnect(&self) {
        let _guard = self.inner.lifecycle.lock().await;

        let link = self.inner.link.lock().take();
        let Some(link) = link else {
            debug!("Disconnect without a running session");
            return;
        };

        let (done, done_rx) = oneshot::channel();
        if link.commands.send(LoopCommand::Disconnect { done }).is_ok() {
            let _ = done_rx.await;
        }
        if let Err(e) = link.task.await {
            warn!(error = %e, "Session task ended abnormally");
        }
    }

    /// Awaits a loop that already stopped on its own.
    async fn reap(&self) {
        let link = self.inner.link.lock().take();
        if let Some(link) = link
            && let Err(e) = link.task.await
        {
            warn!(error = %e, "Previous session task ended abnormally");
        }
    }

    fn send(&self, command: LoopCommand) -> Result<()> {
        let guard = self.inner.link.lock();
        let Some(link) = guard.as_ref() else {
            return Err(Error::not_authorized(self.state()));
        };
        link.commands.send(command).map_err(|_| Error::SessionClosed)
    }
}

// ============================================================================
// Session - Commands
// ============================================================================

impl Session {
    /// Queues a command and returns the future of its outcome.
    ///
    /// The authorization check and the enqueue happen before this returns,
    /// so commands dispatched in sequence reach the wire in that sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthorized`] unless authorized; nothing is sent.
    pub fn dispatch(
        &self,
        command: RemoteCommand,
    ) -> Result<impl Future<Output = Result<Outcome>> + Send + 'static> {
        let state = self.state();
        if state != SessionState::Authorized {
            return Err(Error::not_authorized(state));
        }

        let (responder, reply) = oneshot::channel();
        self.send(LoopCommand::Submit { command, responder })?;
        Ok(async move { reply.await.unwrap_or_else(|_| Err(Error::SessionClosed)) })
    }

    /// Sends a command and waits for its outcome.
    ///
    /// Samsung commands resolve once written; LG requests resolve with the
    /// TV's response, carrying the payload for queries.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthorized`] unless authorized; nothing is sent
    /// - [`Error::Unsupported`] for commands the vendor cannot express
    /// - [`Error::Peer`] if the TV rejected the request
    /// - [`Error::SessionClosed`] if the session ended first
    pub async fn submit(&self, command: RemoteCommand) -> Result<Outcome> {
        self.dispatch(command)?.await
    }

    /// Answers an LG PIN prompt.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsupported`] for Samsung
    /// - [`Error::NotAuthorized`] outside `Authorizing`
    /// - [`Error::InvalidPin`] for a non-numeric PIN
    pub async fn pair_with_pin(&self, pin: impl Into<String>) -> Result<()> {
        let (responder, reply) = oneshot::channel();
        self.send(LoopCommand::PairWithPin {
            pin: pin.into(),
            responder,
        })?;
        reply.await.unwrap_or_else(|_| Err(Error::SessionClosed)).map(|_| ())
    }

    /// Waits until the loop has processed everything sent so far.
    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        let (done, rx) = oneshot::channel();
        if self.send(LoopCommand::Sync(done)).is_ok() {
            let _ = rx.await;
        }
    }
}

// ============================================================================
// Session - Events & Accessors
// ============================================================================

impl Session {
    /// Registers an event handler. It stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.inner.hub.subscribe(handler)
    }

    /// Event stream as a channel.
    #[must_use]
    pub fn events(&self) -> (Subscription, mpsc::UnboundedReceiver<SessionEvent>) {
        self.inner.hub.channel()
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.status.state()
    }

    /// Current authorization state.
    #[inline]
    #[must_use]
    pub fn authorization(&self) -> AuthorizationState {
        self.inner.status.authorization()
    }

    /// State, authorization and token in one snapshot.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.status.snapshot()
    }

    /// Pairing token to persist for the next session.
    #[inline]
    #[must_use]
    pub fn pairing_token(&self) -> Option<String> {
        self.inner.status.token()
    }

    /// Vendor of the device.
    #[inline]
    #[must_use]
    pub fn vendor(&self) -> Vendor {
        self.inner.descriptor.vendor()
    }

    /// Device this session talks to.
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.inner.descriptor
    }
}
