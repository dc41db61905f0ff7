//! TV Remote - pairing and remote control for networked televisions.
//!
//! This library drives Samsung, LG, Fire TV and Roku TVs over their local
//! network control APIs, behind one session shape: connect, pair, submit
//! commands, observe events, disconnect.
//!
//! # Architecture
//!
//! - **Samsung** (WebSocket): commands carry no acknowledgement, so the
//!   session keeps exactly one write in flight and sends commands strictly
//!   in submission order.
//! - **LG webOS** (WebSocket): JSON requests correlated by id; after
//!   registration a second socket is negotiated for pointer input.
//! - **Fire TV / Roku** (HTTP): every command is an independent request.
//!
//! Key design principles:
//!
//! - Each socket session owns one tokio task: sockets, pending requests and
//!   protocol state never leave it
//! - Transports sit behind the [`Connector`] and [`HttpExecutor`] seams, so
//!   the state machines run against in-memory doubles in tests
//! - Progress is reported as [`SessionEvent`]s (no polling)
//!
//! # Quick Start
//!
//! ```no_run
//! use tv_remote::{DeviceDescriptor, Key, Remote, RemoteCommand, Result, SessionEvent, Vendor};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let remote = Remote::builder()
//!         .device(DeviceDescriptor::new(Vendor::Lg, "Bedroom", "192.168.1.31"))
//!         .app_name("Bedroom Remote")
//!         .build()?;
//!
//!     let (_sub, mut events) = remote.events();
//!     remote.connect().await?;
//!
//!     // Accept the prompt on the TV.
//!     while let Some(event) = events.recv().await {
//!         if let SessionEvent::Paired { token } = event {
//!             println!("pairing key: {token}");
//!             break;
//!         }
//!     }
//!
//!     remote.submit(RemoteCommand::VolumeUp).await?;
//!     remote.submit(RemoteCommand::Key(Key::Home)).await?;
//!     remote.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`device`] | [`DeviceDescriptor`] and [`Vendor`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | Fire TV and Roku sessions |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Commands and vendor wire formats |
//! | [`remote`] | [`Remote`], [`RemoteBuilder`], [`SessionOptions`] |
//! | [`session`] | Samsung and LG socket sessions |
//! | [`transport`] | Socket seam, WebSocket/TLS and in-memory transports |
//! | [`wol`] | Wake-on-LAN |

// ============================================================================
// Modules
// ============================================================================

/// Discovered TV descriptors.
pub mod device;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// HTTP-controlled TVs.
pub mod http;

/// Type-safe identifiers.
pub mod identifiers;

/// Commands and vendor wire formats.
pub mod protocol;

/// Vendor-neutral remote, builder and options.
pub mod remote;

/// Socket sessions.
///
/// Lifecycle state machine, strict-order dispatch and pointer channel
/// negotiation.
pub mod session;

/// Socket transport layer.
pub mod transport;

/// Wake-on-LAN magic packets.
pub mod wol;

// ============================================================================
// Re-exports
// ============================================================================

// Device types
pub use device::{DeviceDescriptor, Vendor};

// Error types
pub use error::{Error, Result};

// HTTP sessions
pub use http::{FireTvSession, HttpExecutor, RokuSession};

// Identifier types
pub use identifiers::{RequestId, SubscriptionId};

// Command types
pub use protocol::{Key, PointerAction, RemoteCommand};

// Remote types
pub use remote::{Remote, RemoteBuilder, SessionOptions};

// Session types
pub use session::{
    AuthorizationState, Outcome, Session, SessionEvent, SessionState, Status, Subscription,
};

// Transport types
pub use transport::{Connector, PinnedCertificates, TrustAll, TrustEvaluator};
