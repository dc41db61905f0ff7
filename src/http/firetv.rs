//! Fire TV session.
//!
//! Pairing shows a PIN on screen (`pin/display`); the caller reads it back
//! through [`FireTvSession::pair_with_pin`], which trades it for a client
//! token. Every later request carries `x-api-key` and `x-client-token`.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::protocol::lg::{AppInfo, ResponsePayload};
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

/// Default control port.
pub const CONTROL_PORT: u16 = 8080;

const API_KEY_HEADER: &str = "x-api-key";
const TOKEN_HEADER: &str = "x-client-token";

const PATH_ROOT: &str = "/v1/FireTV";
const PATH_PIN_DISPLAY: &str = "/v1/FireTV/pin/display";
const PATH_PIN_VERIFY: &str = "/v1/FireTV/pin/verify";
const PATH_TEXT: &str = "/v1/FireTV/text";
const PATH_APPS: &str = "/v1/FireTV/apps";
const PATH_MEDIA: &str = "/v1/media";

// ============================================================================
// Command Mapping
// ============================================================================

/// One Fire TV request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FireTvAction {
    /// `POST /v1/FireTV?action=<a>`
    Remote(&'static str),
    /// `POST /v1/media?action=<a>` with an optional body.
    Media {
        action: &'static str,
        body: Option<Value>,
    },
    /// `POST /v1/FireTV/text`
    Text(String),
    /// `POST /v1/FireTV/app/<id>`
    OpenApp(String),
    /// `GET /v1/FireTV/apps`
    ListApps,
}

/// Translates a vendor-neutral command.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] for commands Fire TV has no mapping for.
pub(crate) fn translate(command: &RemoteCommand) -> Result<FireTvAction> {
    let unsupported = || Error::unsupported(Vendor::FireTv, command.name());
    let action = match command {
        RemoteCommand::Key(key) => match key {
            Key::Up => FireTvAction::Remote("dpad_up"),
            Key::Down => FireTvAction::Remote("dpad_down"),
            Key::Left => FireTvAction::Remote("dpad_left"),
            Key::Right => FireTvAction::Remote("dpad_right"),
            Key::Enter => FireTvAction::Remote("select"),
            Key::Back | Key::Exit => FireTvAction::Remote("back"),
            Key::Home => FireTvAction::Remote("home"),
            Key::Menu => FireTvAction::Remote("menu"),
            Key::Play => FireTvAction::Media {
                action: "play",
                body: None,
            },
            Key::Pause => FireTvAction::Media {
                action: "pause",
                body: None,
            },
            Key::FastForward => FireTvAction::Media {
                action: "scan",
                body: Some(json!({ "direction": "forward" })),
            },
            Key::Rewind => FireTvAction::Media {
                action: "scan",
                body: Some(json!({ "direction": "back" })),
            },
            Key::Info | Key::Stop | Key::Digit(_) => return Err(unsupported()),
        },
        RemoteCommand::SendEnter => FireTvAction::Remote("select"),
        RemoteCommand::Text(text) => FireTvAction::Text(text.clone()),
        RemoteCommand::LaunchApp { app_id, .. } => FireTvAction::OpenApp(app_id.clone()),
        RemoteCommand::ListApps => FireTvAction::ListApps,
        _ => return Err(unsupported()),
    };
    Ok(action)
}

/// App entry of `GET /v1/FireTV/apps`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FireTvApp {
    app_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    icon_art_small_uri: Option<String>,
}

impl From<FireTvApp> for AppInfo {
    fn from(app: FireTvApp) -> Self {
        Self {
            id: Some(app.app_id),
            title: app.name,
            system_app: None,
            icon: app.icon_art_small_uri,
        }
    }
}

/// Extracts the client token from a `pin/verify` body.
///
/// # Errors
///
/// - [`Error::MalformedFrame`] if the body is not a JSON object
/// - [`Error::MissingToken`] if `description` is absent or empty
pub(crate) fn parse_verify_token(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::malformed_frame(format!("pin verify response: {e}")))?;
    match value.get("description").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(Error::missing_token("pin verify response")),
    }
}

/// Requires exactly four ASCII digits.
///
/// # Errors
///
/// Returns [`Error::InvalidPin`] otherwise.
pub(crate) fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::invalid_pin("Fire TV PINs are four digits"))
    }
}

// ============================================================================
// FireTvSession
// ============================================================================

/// Session with one Fire TV device.
pub struct FireTvSession {
    base: HttpBase,
    endpoint: Url,
    api_key: String,
    friendly_name: String,
}

impl std::fmt::Debug for FireTvSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireTvSession")
            .field("endpoint", &self.endpoint.as_str())
            .field("state", &self.base.state())
            .finish_non_exhaustive()
    }
}

impl FireTvSession {
    /// Creates an idle session.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no API key is configured
    /// - [`Error::InvalidUrl`] if the address does not form a URL
    pub fn new(descriptor: DeviceDescriptor, options: &SessionOptions) -> Result<Self> {
        let api_key = options
            .api_key()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config("Fire TV requires an API key (with_api_key)"))?
            .to_string();

        let address = descriptor.address().trim();
        if address.is_empty() {
            return Err(Error::invalid_address(address));
        }
        let port = options.port().unwrap_or(CONTROL_PORT);
        let endpoint = Url::parse(&format!("https://{address}:{port}"))
            .map_err(|e| Error::invalid_url(format!("'{address}': {e}")))?;

        let executor = resolve_executor(options)?;
        Ok(Self {
            base: HttpBase::new(descriptor, options.pairing_key().map(str::to_owned), executor),
            endpoint,
            api_key,
            friendly_name: options.app_name().to_string(),
        })
    }

    fn request(&self, post: bool, path: &str) -> Result<HttpRequest> {
        let url = HttpBase::url(&self.endpoint, path)?;
        let request = if post {
            HttpRequest::post(url)
        } else {
            HttpRequest::get(url)
        };
        let request = request.with_header(API_KEY_HEADER, self.api_key.as_str());
        Ok(match self.base.token() {
            Some(token) => request.with_header(TOKEN_HEADER, token),
            None => request,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connects.
    ///
    /// With a stored token the token is checked; otherwise, or if the TV
    /// rejects it, a PIN is shown on screen and the session waits in
    /// `Authorizing` for [`pair_with_pin`](Self::pair_with_pin).
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if a connection is active
    /// - The transport or status error of the failed request
    pub async fn connect(&self) -> Result<()> {
        self.base.begin_connect()?;

        if let Some(token) = self.base.token() {
            match self.base.execute(self.request(false, PATH_ROOT)?).await {
                Ok(_) => {
                    self.base.on_reachable();
                    self.base.authorize(Some(token));
                    return Ok(());
                }
                Err(Error::HttpStatus { status, .. }) => {
                    debug!(status, "Stored token rejected, requesting a new PIN");
                }
                Err(e) => {
                    self.base.connect_failed(&e);
                    return Err(e);
                }
            }
        }

        let request = self
            .request(true, PATH_PIN_DISPLAY)?
            .with_json(&json!({ "friendlyName": self.friendly_name }));
        match self.base.execute(request).await {
            Ok(_) => {
                self.base.on_reachable();
                info!("PIN shown on Fire TV");
                self.base.on_pairing_requested(true);
                Ok(())
            }
            Err(e) => {
                self.base.connect_failed(&e);
                Err(e)
            }
        }
    }

    /// Verifies the PIN shown on screen and returns the client token.
    ///
    /// A rejected PIN leaves the session in `Authorizing` so the caller can
    /// try again.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPin`] unless `pin` is four digits
    /// - [`Error::NotAuthorized`] outside `Authorizing`
    /// - [`Error::MissingToken`] if the response has no token
    pub async fn pair_with_pin(&self, pin: &str) -> Result<String> {
        let pin = pin.trim();
        validate_pin(pin)?;
        let state = self.base.state();
        if state != SessionState::Authorizing {
            return Err(Error::not_authorized(state));
        }

        let request = self
            .request(true, PATH_PIN_VERIFY)?
            .with_json(&json!({ "pin": pin }));
        let verified = match self.base.execute(request).await {
            Ok(response) => parse_verify_token(&response.body),
            Err(e) => Err(e),
        };

        match verified {
            Ok(token) => {
                info!("Fire TV paired");
                self.base.authorize(Some(token.clone()));
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "PIN verification failed");
                self.base.emit(SessionEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Ends the session. Idempotent.
    pub fn disconnect(&self) {
        self.base.disconnect();
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a command. Requests are independent and unordered.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthorized`] unless authorized; nothing is sent
    /// - [`Error::Unsupported`] for unmapped commands
    /// - The transport or status error of the request
    pub async fn submit(&self, command: RemoteCommand) -> Result<Outcome> {
        self.base.ensure_authorized()?;
        let action = translate(&command)?;

        let request = match &action {
            FireTvAction::Remote(name) => {
                let mut request = self.request(true, PATH_ROOT)?;
                request.url.query_pairs_mut().append_pair("action", name);
                request
            }
            FireTvAction::Media { action, body } => {
                let mut request = self.request(true, PATH_MEDIA)?;
                request.url.query_pairs_mut().append_pair("action", action);
                match body {
                    Some(body) => request.with_json(body),
                    None => request,
                }
            }
            FireTvAction::Text(text) => self
                .request(true, PATH_TEXT)?
                .with_json(&json!({ "text": text })),
            FireTvAction::OpenApp(app_id) => self.request(
                true,
                &format!("{PATH_ROOT}/app/{}", urlencoding::encode(app_id)),
            )?,
            FireTvAction::ListApps => self.request(false, PATH_APPS)?,
        };

        let response = self.base.send_command(command.name(), request).await?;
        if action != FireTvAction::ListApps {
            return Ok(Outcome::Accepted);
        }

        let apps: Vec<FireTvApp> = serde_json::from_str(&response.body)
            .map_err(|e| Error::malformed_frame(format!("app list: {e}")))?;
        let apps: Vec<AppInfo> = apps.into_iter().map(AppInfo::from).collect();
        debug!(count = apps.len(), "App list received");
        self.base.emit(SessionEvent::AppsChanged { apps: apps.clone() });
        Ok(Outcome::Reply(ResponsePayload {
            applications: Some(apps),
            ..Default::default()
        }))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

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

    /// Client token, once paired.
    #[inline]
    #[must_use]
    pub fn pairing_token(&self) -> Option<String> {
        self.base.token()
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
