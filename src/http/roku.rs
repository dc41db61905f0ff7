//! Roku session over the External Control Protocol.
//!
//! No pairing: the session is authorized as soon as the device answers
//! `GET /query/device-info`.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;
use url::Url;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::protocol::{Key, RemoteCommand};
use crate::remote::SessionOptions;
use crate::session::{
    AuthorizationState, EventHub, Outcome, SessionEvent, SessionState, Status, Subscription,
};

use super::base::HttpBase;
use super::client::{HttpRequest, resolve_executor};

// ============================================================================
// Constants
// ============================================================================

/// Default ECP port.
pub const CONTROL_PORT: u16 = 8060;

const PATH_DEVICE_INFO: &str = "/query/device-info";

// ============================================================================
// Command Mapping
// ============================================================================

/// ECP key name.
fn key_name(key: Key) -> Option<String> {
    let name = match key {
        Key::Up => "Up",
        Key::Down => "Down",
        Key::Left => "Left",
        Key::Right => "Right",
        Key::Enter => "Select",
        Key::Back | Key::Exit => "Back",
        Key::Home => "Home",
        Key::Info | Key::Menu => "Info",
        Key::Play | Key::Pause => "Play",
        Key::Rewind => "Rev",
        Key::FastForward => "Fwd",
        Key::Stop => return None,
        Key::Digit(d) if d <= 9 => return Some(format!("Lit_{d}")),
        Key::Digit(_) => return None,
    };
    Some(name.to_string())
}

/// Request paths for a vendor-neutral command, sent in order.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] for commands Roku has no mapping for.
pub(crate) fn translate(command: &RemoteCommand) -> Result<Vec<String>> {
    let unsupported = || Error::unsupported(Vendor::Roku, command.name());
    let key = |name: &str| -> Result<Vec<String>> { Ok(vec![format!("/keypress/{name}")]) };

    match command {
        RemoteCommand::Key(k) => key(&key_name(*k).ok_or_else(unsupported)?),
        RemoteCommand::PressKey(k) => Ok(vec![format!(
            "/keydown/{}",
            key_name(*k).ok_or_else(unsupported)?
        )]),
        RemoteCommand::ReleaseKey(k) => Ok(vec![format!(
            "/keyup/{}",
            key_name(*k).ok_or_else(unsupported)?
        )]),
        RemoteCommand::VolumeUp => key("VolumeUp"),
        RemoteCommand::VolumeDown => key("VolumeDown"),
        // Roku only toggles.
        RemoteCommand::SetMute(_) => key("VolumeMute"),
        RemoteCommand::PowerOff => key("PowerOff"),
        RemoteCommand::ChannelUp => key("ChannelUp"),
        RemoteCommand::ChannelDown => key("ChannelDown"),
        RemoteCommand::SendEnter => key("Enter"),
        RemoteCommand::SetSource(input) => key(&format!("Input{}", urlencoding::encode(input))),
        RemoteCommand::LaunchApp { app_id, .. } => {
            Ok(vec![format!("/launch/{}", urlencoding::encode(app_id))])
        }
        RemoteCommand::Text(text) => {
            if text.is_empty() {
                return Err(Error::config("text must not be empty"));
            }
            let mut buf = [0u8; 4];
            Ok(text
                .chars()
                .map(|c| {
                    format!(
                        "/keypress/Lit_{}",
                        urlencoding::encode(c.encode_utf8(&mut buf))
                    )
                })
                .collect())
        }
        _ => Err(unsupported()),
    }
}

// ============================================================================
// RokuSession
// ============================================================================

/// Session with one Roku device.
pub struct RokuSession {
    base: HttpBase,
    endpoint: Url,
}

impl std::fmt::Debug for RokuSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RokuSession")
            .field("endpoint", &self.endpoint.as_str())
            .field("state", &self.base.state())
            .finish_non_exhaustive()
    }
}

impl RokuSession {
    /// Creates an idle session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the address does not form a URL.
    pub fn new(descriptor: DeviceDescriptor, options: &SessionOptions) -> Result<Self> {
        let address = descriptor.address().trim();
        if address.is_empty() {
            return Err(Error::invalid_address(address));
        }
        let port = options.port().unwrap_or(CONTROL_PORT);
        let endpoint = Url::parse(&format!("http://{address}:{port}"))
            .map_err(|e| Error::invalid_url(format!("'{address}': {e}")))?;

        Ok(Self {
            base: HttpBase::new(descriptor, None, resolve_executor(options)?),
            endpoint,
        })
    }

    /// Probes the device and authorizes the session.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if a connection is active
    /// - The transport or status error of the probe
    pub async fn connect(&self) -> Result<()> {
        self.base.begin_connect()?;
        let url = HttpBase::url(&self.endpoint, PATH_DEVICE_INFO)?;
        match self.base.execute(HttpRequest::get(url)).await {
            Ok(_) => {
                self.base.on_reachable();
                self.base.authorize(None);
                Ok(())
            }
            Err(e) => {
                self.base.connect_failed(&e);
                Err(e)
            }
        }
    }

    /// Ends the session. Idempotent.
    pub fn disconnect(&self) {
        self.base.disconnect();
    }

    /// Sends a command. Text goes out one character per request, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthorized`] unless authorized; nothing is sent
    /// - [`Error::Unsupported`] for unmapped commands
    /// - The transport or status error of the first failed request
    pub async fn submit(&self, command: RemoteCommand) -> Result<Outcome> {
        self.base.ensure_authorized()?;
        let paths = translate(&command)?;
        debug!(command = command.name(), requests = paths.len(), "Submitting");

        for path in paths {
            let url = HttpBase::url(&self.endpoint, &path)?;
            self.base
                .send_command(command.name(), HttpRequest::post(url))
                .await?;
        }
        Ok(Outcome::Accepted)
    }

    /// Registers an event handler.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.base.hub().subscribe(handler)
    }

    /// Event stream as a channel.
    #[must_use]
    pub fn events(&self) -> (Subscription, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
        self.base.hub().channel()
    }

    /// Event hub of this session.
    #[inline]
    #[must_use]
    pub fn hub(&self) -> &EventHub {
        self.base.hub()
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.base.state()
    }

    /// Current authorization state.
    #[inline]
    #[must_use]
    pub fn authorization(&self) -> AuthorizationState {
        self.base.authorization()
    }

    /// State, authorization and token in one snapshot.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.base.status()
    }

    /// Device this session talks to.
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        self.base.descriptor()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::http::HttpResponse;
    use crate::http::base::testing::RecordingExecutor;

    fn session(executor: &Arc<RecordingExecutor>) -> RokuSession {
        let tv = DeviceDescriptor::new(Vendor::Roku, "Den", "10.0.0.3");
        RokuSession::new(tv, &SessionOptions::new().with_http_executor(executor.clone()))
            .expect("session")
    }

    #[test]
    fn test_translate_keys() {
        assert_eq!(
            translate(&RemoteCommand::Key(Key::Enter)).expect("select"),
            ["/keypress/Select"]
        );
        assert_eq!(
            translate(&RemoteCommand::PressKey(Key::Right)).expect("down"),
            ["/keydown/Right"]
        );
        assert_eq!(
            translate(&RemoteCommand::Key(Key::Digit(7))).expect("digit"),
            ["/keypress/Lit_7"]
        );
        assert!(matches!(
            translate(&RemoteCommand::GetVolume),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn test_translate_text_encodes_each_char() {
        assert_eq!(
            translate(&RemoteCommand::Text("a b&".into())).expect("text"),
            ["/keypress/Lit_a", "/keypress/Lit_%20", "/keypress/Lit_b", "/keypress/Lit_%26"]
        );
    }

    #[tokio::test]
    async fn test_connect_authorizes_without_pairing() {
        let executor = RecordingExecutor::new();
        let tv = session(&executor);

        let (_sub, mut events) = tv.events();
        tv.connect().await.expect("connect");

        assert_eq!(tv.state(), SessionState::Authorized);
        assert_eq!(tv.authorization(), AuthorizationState::Authorized);
        assert_eq!(events.recv().await, Some(SessionEvent::Connected));
        assert_eq!(executor.paths(), [PATH_DEVICE_INFO]);
    }

    #[tokio::test]
    async fn test_submit_before_connect_sends_nothing() {
        let executor = RecordingExecutor::new();
        let tv = session(&executor);

        assert!(matches!(
            tv.submit(RemoteCommand::Key(Key::Home)).await,
            Err(Error::NotAuthorized { .. })
        ));
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_probe_disconnects() {
        let executor = RecordingExecutor::new();
        executor.respond(Ok(HttpResponse::new(503, "")));
        let tv = session(&executor);

        assert!(matches!(
            tv.connect().await,
            Err(Error::HttpStatus { status: 503, .. })
        ));
        assert_eq!(tv.state(), SessionState::Disconnected);
        tv.connect().await.expect("retry allowed");
    }

    #[tokio::test]
    async fn test_text_is_sent_in_order() {
        let executor = RecordingExecutor::new();
        let tv = session(&executor);
        tv.connect().await.expect("connect");

        tv.submit(RemoteCommand::Text("hi".into())).await.expect("text");
        assert_eq!(
            executor.paths(),
            [PATH_DEVICE_INFO, "/keypress/Lit_h", "/keypress/Lit_i"]
        );
    }
}
