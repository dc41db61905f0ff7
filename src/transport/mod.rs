//! Transport layer.
//!
//! Sessions talk to TVs through the [`Socket`] / [`Connector`] seam and
//! never own a WebSocket directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   send / close    ┌──────────────────┐        wss        ┌──────┐
//! │  Session loop   │──────────────────►│  Socket task     │◄─────────────────►│  TV  │
//! │                 │◄──────────────────│  (tungstenite)   │                   └──────┘
//! └─────────────────┘  TransportEvent   └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | Frame, event and trait definitions |
//! | `websocket` | tokio-tungstenite implementation |
//! | `tls` | Pluggable certificate trust |
//! | `memory` | In-process transport for tests and demos |

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport.
pub mod memory;

/// Transport traits and frame types.
pub mod socket;

/// Certificate trust evaluation.
pub mod tls;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{CompletionMode, MemoryConnector, MemoryPeer};
pub use socket::{
    CloseCompletion, Connector, Frame, GOING_AWAY, NORMAL_CLOSURE, SendCompletion, Socket, SocketSink,
    TransportEvent, TransportEvents,
};
pub use tls::{PinnedCertificates, TrustAll, TrustEvaluator};
pub use websocket::WebSocketConnector;
