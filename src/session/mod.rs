//! Socket sessions: lifecycle, pairing and command dispatch.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐  LoopCommand   ┌──────────────────────────────┐  Socket   ┌──────┐
//! │  Session  │───────────────►│  EventLoop (one tokio task)  │──────────►│  TV  │
//! │  (handle) │                │  ├─ SamsungProtocol (queue)  │◄──────────│      │
//! └───────────┘                │  └─ LgProtocol (negotiator)  │  events   └──────┘
//!       ▲                      └──────────────┬───────────────┘
//!       │        SessionEvent                 │
//!       └────────────── EventHub ◄────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Session`] handle |
//! | `state` | Lifecycle and authorization states |
//! | `events` | [`SessionEvent`] and subscription fan-out |
//! | `negotiator` | LG pointer channel state machine |
//! | `pending` | Request correlation table |
//! | `queue` | Strict-order pending queue |

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod event_loop;
mod lg;
mod pending;
mod queue;
mod samsung;

/// Session events and their fan-out.
pub mod events;

/// LG pointer channel negotiation.
pub mod negotiator;

/// Session lifecycle states.
pub mod state;

#[cfg(test)]
mod tests;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Session;
pub use events::{EventHandler, EventHub, SessionEvent, Subscription};
pub use negotiator::{NegotiationState, Negotiator};
pub use pending::Outcome;
pub use state::{AuthorizationState, SessionState, Status};

pub(crate) use state::SharedStatus;
