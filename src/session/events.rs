//! Caller-facing session events and their fan-out.
//!
//! Handlers are registered with [`EventHub::subscribe`] and unregistered
//! when the returned [`Subscription`] is dropped. The hub is owned by the
//! session; a subscription outliving it simply does nothing on drop.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::identifiers::SubscriptionId;
use crate::protocol::lg::AppInfo;

// ============================================================================
// SessionEvent
// ============================================================================

/// Event raised by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transport opened.
    Connected,
    /// The TV is showing a pairing prompt or PIN.
    PairingRequested {
        /// `true` when the TV expects a PIN via `pair_with_pin`.
        pin_required: bool,
    },
    /// Pairing succeeded.
    Paired {
        /// Token to persist and pass on the next connect.
        token: String,
    },
    /// The TV rejected pairing.
    AuthorizationDenied {
        /// Reason reported by the TV.
        reason: String,
    },
    /// Session ended.
    Disconnected {
        /// Close code, if any.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
    /// Transport failure.
    TransportError {
        /// Transport diagnostic.
        message: String,
    },
    /// An inbound frame could not be decoded. The session stays up.
    MalformedFrame {
        /// Decoder diagnostic.
        message: String,
    },
    /// Protocol-level error.
    Error {
        /// Description.
        message: String,
    },
    /// A strictly ordered command left the wire queue.
    CommandWritten {
        /// Short command description.
        command: String,
    },
    /// The pointer channel is open.
    SecondaryChannelReady,
    /// Mute state pushed by the TV.
    MuteChanged {
        /// New mute state.
        muted: bool,
    },
    /// Volume pushed by the TV.
    VolumeChanged {
        /// New volume level.
        volume: i64,
    },
    /// Installed app list.
    AppsChanged {
        /// Apps reported by the TV.
        apps: Vec<AppInfo>,
    },
}

// ============================================================================
// EventHub
// ============================================================================

/// Event handler callback type.
pub type EventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

type HandlerMap = Mutex<FxHashMap<SubscriptionId, EventHandler>>;

/// One-to-many event fan-out.
#[derive(Default)]
pub struct EventHub {
    handlers: Arc<HandlerMap>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("handlers", &self.len())
            .finish()
    }
}

impl EventHub {
    /// Creates an empty hub.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler until the returned subscription is dropped.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        self.handlers.lock().insert(id, Arc::new(handler));
        trace!(%id, "Event handler registered");
        Subscription {
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    /// Registers a channel that receives a clone of every event.
    #[must_use = "dropping the subscription unregisters the channel"]
    pub fn channel(&self) -> (Subscription, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Delivers an event to every handler.
    ///
    /// Handlers run outside the lock, so they may subscribe or unsubscribe.
    pub fn emit(&self, event: &SessionEvent) {
        let handlers: Vec<EventHandler> = self.handlers.lock().values().cloned().collect();
        trace!(?event, handlers = handlers.len(), "Emitting event");
        for handler in handlers {
            handler(event);
        }
    }

    /// Number of registered handlers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Returns `true` if no handler is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every handler.
    pub fn clear(&self) {
        self.handlers.lock().clear();
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Registration guard. Dropping it unregisters the handler.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    handlers: Weak<HandlerMap>,
}

impl Subscription {
    /// Id of the registration.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keeps the handler registered for the life of the hub.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.lock().remove(&self.id);
            trace!(id = %self.id, "Event handler unregistered");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
