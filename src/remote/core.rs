//! Vendor-neutral remote.
//!
//! [`Remote`] is a closed enum over the four vendor sessions. Every variant
//! exposes the same lifecycle, so callers can hold one type regardless of
//! the TV they talk to.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::http::{FireTvSession, RokuSession};
use crate::protocol::RemoteCommand;
use crate::session::{
    AuthorizationState, Outcome, Session, SessionEvent, SessionState, Status, Subscription,
};
use crate::wol::WakeTarget;

use super::builder::RemoteBuilder;

// ============================================================================
// Remote
// ============================================================================

/// Session with a TV of any supported vendor.
///
/// # Example
///
/// ```no_run
/// use tv_remote::{DeviceDescriptor, Key, Remote, RemoteCommand, SessionEvent, Vendor};
///
/// # async fn example() -> tv_remote::Result<()> {
/// let remote = Remote::builder()
///     .device(DeviceDescriptor::new(Vendor::Samsung, "Living Room", "192.168.1.20"))
///     .build()?;
///
/// let (_sub, mut events) = remote.events();
/// remote.connect().await?;
/// while let Some(event) = events.recv().await {
///     if let SessionEvent::Paired { token } = event {
///         println!("store this token: {token}");
///         break;
///     }
/// }
///
/// remote.submit(RemoteCommand::Key(Key::Home)).await?;
/// remote.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub enum Remote {
    /// Samsung Tizen over WebSocket.
    Samsung(Session),
    /// LG webOS over WebSocket plus pointer socket.
    Lg(Session),
    /// Fire TV over HTTPS.
    FireTv(FireTvSession),
    /// Roku over HTTP.
    Roku(RokuSession),
}

impl Remote {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RemoteBuilder {
        RemoteBuilder::new()
    }
}

// ============================================================================
// Remote - Lifecycle
// ============================================================================

impl Remote {
    /// Connects and starts pairing. Progress arrives as events.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if a connection is active
    /// - [`Error::InvalidAddress`] / [`Error::InvalidUrl`] if no URL can be built
    /// - For HTTP vendors, the error of the initial request
    pub async fn connect(&self) -> Result<()> {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.connect().await,
            Self::FireTv(session) => session.connect().await,
            Self::Roku(session) => session.connect().await,
        }
    }

    /// Ends the session. Safe to call in any state, any number of times.
    pub async fn disconnect(&self) {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.disconnect().await,
            Self::FireTv(session) => session.disconnect(),
            Self::Roku(session) => session.disconnect(),
        }
    }

    /// Answers a PIN prompt shown on the TV.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsupported`] for vendors without PIN pairing
    /// - [`Error::NotAuthorized`] outside `Authorizing`
    /// - [`Error::InvalidPin`] for a malformed PIN
    pub async fn pair_with_pin(&self, pin: &str) -> Result<()> {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.pair_with_pin(pin).await,
            Self::FireTv(session) => session.pair_with_pin(pin).await.map(|_| ()),
            Self::Roku(_) => Err(Error::unsupported(Vendor::Roku, "pair_with_pin")),
        }
    }

    /// Sends a command and waits for its outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthorized`] unless authorized; nothing is sent
    /// - [`Error::Unsupported`] for commands the vendor cannot express
    /// - Vendor-specific transport or peer errors
    pub async fn submit(&self, command: RemoteCommand) -> Result<Outcome> {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.submit(command).await,
            Self::FireTv(session) => session.submit(command).await,
            Self::Roku(session) => session.submit(command).await,
        }
    }

    /// Wakes the TV with a magic packet to the MAC address on its descriptor.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the descriptor has no MAC address
    /// - [`Error::InvalidAddress`] if the MAC address is malformed
    /// - [`Error::Io`] if the datagram cannot be sent
    pub async fn wake(&self) -> Result<()> {
        WakeTarget::for_device(self.descriptor())?.send().await
    }
}

// ============================================================================
// Remote - Events & Accessors
// ============================================================================

impl Remote {
    /// Registers an event handler until the returned [`Subscription`] drops.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.subscribe(handler),
            Self::FireTv(session) => session.subscribe(handler),
            Self::Roku(session) => session.subscribe(handler),
        }
    }

    /// Event stream as a channel.
    #[must_use]
    pub fn events(&self) -> (Subscription, mpsc::UnboundedReceiver<SessionEvent>) {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.events(),
            Self::FireTv(session) => session.events(),
            Self::Roku(session) => session.events(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.state(),
            Self::FireTv(session) => session.state(),
            Self::Roku(session) => session.state(),
        }
    }

    /// Current authorization state.
    #[must_use]
    pub fn authorization(&self) -> AuthorizationState {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.authorization(),
            Self::FireTv(session) => session.authorization(),
            Self::Roku(session) => session.authorization(),
        }
    }

    /// State, authorization and token in one snapshot.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.status(),
            Self::FireTv(session) => session.status(),
            Self::Roku(session) => session.status(),
        }
    }

    /// Pairing token to persist for the next session. Roku has none.
    #[must_use]
    pub fn pairing_token(&self) -> Option<String> {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.pairing_token(),
            Self::FireTv(session) => session.pairing_token(),
            Self::Roku(_) => None,
        }
    }

    /// Device this remote talks to.
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        match self {
            Self::Samsung(session) | Self::Lg(session) => session.descriptor(),
            Self::FireTv(session) => session.descriptor(),
            Self::Roku(session) => session.descriptor(),
        }
    }

    /// Vendor of the device.
    #[inline]
    #[must_use]
    pub fn vendor(&self) -> Vendor {
        self.descriptor().vendor()
    }
}

// ============================================================================
// Tests
// ============================================================================
