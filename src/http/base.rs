//! Lifecycle shared by the HTTP sessions.
//!
//! HTTP vendors have no socket, so "connected" only means the TV answered
//! a probe. Commands are independent requests with no ordering guarantee.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::device::DeviceDescriptor;
use crate::error::{Error, Result};
use crate::session::{AuthorizationState, EventHub, SessionEvent, SessionState, Status, SharedStatus};

use super::client::{HttpExecutor, HttpRequest, HttpResponse};

// ============================================================================
// HttpBase
// ============================================================================

/// State, events and executor of one HTTP session.
pub(crate) struct HttpBase {
    descriptor: DeviceDescriptor,
    status: SharedStatus,
    hub: Arc<EventHub>,
    executor: Arc<dyn HttpExecutor>,
}

impl HttpBase {
    pub(crate) fn new(
        descriptor: DeviceDescriptor,
        token: Option<String>,
        executor: Arc<dyn HttpExecutor>,
    ) -> Self {
        Self {
            descriptor,
            status: SharedStatus::with_token(token.filter(|t| !t.is_empty())),
            hub: Arc::new(EventHub::new()),
            executor,
        }
    }

    #[inline]
    pub(crate) fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    #[inline]
    pub(crate) fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    #[inline]
    pub(crate) fn state(&self) -> SessionState {
        self.status.state()
    }

    #[inline]
    pub(crate) fn authorization(&self) -> AuthorizationState {
        self.status.authorization()
    }

    #[inline]
    pub(crate) fn status(&self) -> Status {
        self.status.snapshot()
    }

    #[inline]
    pub(crate) fn token(&self) -> Option<String> {
        self.status.token()
    }

    #[inline]
    pub(crate) fn emit(&self, event: SessionEvent) {
        self.hub.emit(&event);
    }

    /// Moves to `Connecting`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConnected`] unless the state allows a new attempt.
    pub(crate) fn begin_connect(&self) -> Result<()> {
        let state = self.state();
        if !state.can_connect() {
            return Err(Error::AlreadyConnected);
        }
        self.status.transition(SessionState::Connecting);
        Ok(())
    }

    /// The TV answered the probe.
    pub(crate) fn on_reachable(&self) {
        info!(vendor = %self.descriptor.vendor(), "Connected");
        self.status.transition(SessionState::Connected);
        self.emit(SessionEvent::Connected);
    }

    /// The TV is showing a pairing prompt.
    pub(crate) fn on_pairing_requested(&self, pin_required: bool) {
        self.status.transition(SessionState::Authorizing);
        self.emit(SessionEvent::PairingRequested { pin_required });
    }

    /// Pairing finished. `token` is surfaced in a `Paired` event when present.
    pub(crate) fn authorize(&self, token: Option<String>) {
        if let Some(token) = &token {
            self.status.set_token(token.clone());
        }
        self.status.transition(SessionState::Authorized);
        if let Some(token) = token {
            self.emit(SessionEvent::Paired { token });
        }
    }

    /// A connect attempt failed: surface it and end in `Disconnected`.
    pub(crate) fn connect_failed(&self, error: &Error) {
        warn!(vendor = %self.descriptor.vendor(), error = %error, "Connect failed");
        self.emit(SessionEvent::TransportError {
            message: error.to_string(),
        });
        self.status.transition(SessionState::Disconnected);
        self.emit(SessionEvent::Disconnected {
            code: None,
            reason: error.to_string(),
        });
    }

    /// Ends the session. A second call does nothing.
    pub(crate) fn disconnect(&self) {
        let state = self.state();
        if matches!(state, SessionState::Idle) || state.is_terminal() {
            debug!(state = %state, "Already disconnected");
            return;
        }
        self.status.transition(SessionState::Disconnected);
        self.emit(SessionEvent::Disconnected {
            code: None,
            reason: "disconnected".into(),
        });
    }

    /// Fails with [`Error::NotAuthorized`] unless authorized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthorized`] in every other state.
    pub(crate) fn ensure_authorized(&self) -> Result<()> {
        let state = self.state();
        if state == SessionState::Authorized {
            Ok(())
        } else {
            Err(Error::not_authorized(state))
        }
    }

    /// Joins `path` onto the session base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the result is not a URL.
    pub(crate) fn url(base: &Url, path: &str) -> Result<Url> {
        base.join(path)
            .map_err(|e| Error::invalid_url(format!("{base}{path}: {e}")))
    }

    /// Executes `request` and requires a 2xx status.
    ///
    /// # Errors
    ///
    /// Returns the transport error or [`Error::HttpStatus`].
    pub(crate) async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        debug!(method = %request.method, url = %url, "Sending");
        self.executor.execute(request).await?.ensure_success(&url)
    }

    /// Executes a command request and reports the outcome as an event.
    ///
    /// # Errors
    ///
    /// Returns the transport error or [`Error::HttpStatus`].
    pub(crate) async fn send_command(
        &self,
        command: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        match self.execute(request).await {
            Ok(response) => {
                self.emit(SessionEvent::CommandWritten {
                    command: command.to_string(),
                });
                Ok(response)
            }
            Err(e) => {
                warn!(command, error = %e, "Command failed");
                let message = e.to_string();
                if e.is_connection_error() {
                    self.emit(SessionEvent::TransportError { message });
                } else {
                    self.emit(SessionEvent::Error { message });
                }
                Err(e)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! Recording executor for the HTTP session tests.

    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    /// Records requests and answers from a scripted queue, then with 200.
    #[derive(Default)]
    pub(crate) struct RecordingExecutor {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<VecDeque<Result<HttpResponse>>>,
    }

    impl RecordingExecutor {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn respond(&self, response: Result<HttpResponse>) {
            self.responses.lock().push_back(response);
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().clone()
        }

        pub(crate) fn paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .iter()
                .map(|r| match r.url.query() {
                    Some(query) => format!("{}?{query}", r.url.path()),
                    None => r.url.path().to_string(),
                })
                .collect()
        }
    }

    #[async_trait]
    impl HttpExecutor for RecordingExecutor {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "")))
        }
    }
}
