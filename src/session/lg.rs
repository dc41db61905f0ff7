//! LG webOS session handler.
//!
//! # Flow
//!
//! 1. Transport opens: send `register` with the manifest and stored key
//! 2. `response` to the register id: the TV shows a prompt or PIN
//! 3. `registered`: capture the client key, request the pointer socket,
//!    optionally request the app list and subscribe to volume
//! 4. `response` carrying `socketPath` for the pointer request: open the
//!    secondary socket
//!
//! Keys and pointer actions go to the secondary socket as line frames;
//! everything else is a JSON request on the primary socket, resolved by the
//! TV's correlated response.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, info, trace, warn};
use url::Url;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::lg::{
    CONTROL_PORT, PairingType, Request, RequestPayload, Response, ResponsePayload, ResponseType,
    uri,
};
use crate::protocol::{PointerFrame, RemoteCommand};
use crate::remote::SessionOptions;
use crate::transport::{Frame, TransportEvent};

use super::event_loop::{LoopContext, WriteTag};
use super::events::SessionEvent;
use super::negotiator::Negotiator;
use super::pending::{Outcome, Responder};
use super::state::SessionState;

// ============================================================================
// Constants
// ============================================================================

/// Id of the registration request.
pub(crate) const REGISTER_ID: &str = "register_0";

/// Id of the automatic app list request.
pub(crate) const APPS_REQUEST_ID: &str = "listAppsRequest";

/// Id of the automatic volume subscription.
pub(crate) const VOLUME_SUBSCRIPTION_ID: &str = "volumeSubscription";

// ============================================================================
// URL
// ============================================================================

/// Builds the control channel URL.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the address does not form a URL.
pub(crate) fn connect_url(device: &DeviceDescriptor, options: &SessionOptions) -> Result<Url> {
    let address = device.address().trim();
    if address.is_empty() {
        return Err(Error::invalid_address(address));
    }
    let port = options.port().unwrap_or(CONTROL_PORT);
    Url::parse(&format!("wss://{address}:{port}"))
        .map_err(|e| Error::invalid_url(format!("'{address}': {e}")))
}

// ============================================================================
// Command Mapping
// ============================================================================

/// Wire action of a vendor-neutral command.
#[derive(Debug)]
pub(crate) enum LgAction {
    /// JSON request on the control socket.
    Request {
        request: Request,
        /// Resolve with the reply payload.
        wants_reply: bool,
    },
    /// Start the volume subscription.
    Subscribe(Request),
    /// Stop the volume subscription.
    Unsubscribe(Request),
    /// Line frame on the pointer socket.
    Pointer(PointerFrame),
}

/// Translates a vendor-neutral command.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] for commands webOS has no mapping for.
pub(crate) fn translate(command: &RemoteCommand) -> Result<LgAction> {
    let call = |target: &str| LgAction::Request {
        request: Request::call(target),
        wants_reply: false,
    };
    let with = |target: &str, payload: RequestPayload| LgAction::Request {
        request: Request::call(target).with_payload(payload),
        wants_reply: false,
    };
    let query = |target: &str| LgAction::Request {
        request: Request::call(target),
        wants_reply: true,
    };

    let action = match command {
        RemoteCommand::Key(key) => LgAction::Pointer(PointerFrame::key(*key)),
        RemoteCommand::Pointer(action) => LgAction::Pointer((*action).into()),
        RemoteCommand::VolumeUp => call(uri::VOLUME_UP),
        RemoteCommand::VolumeDown => call(uri::VOLUME_DOWN),
        RemoteCommand::SetVolume(volume) => with(
            uri::SET_VOLUME,
            RequestPayload {
                volume: Some(*volume),
                ..Default::default()
            },
        ),
        RemoteCommand::SetMute(mute) => with(
            uri::SET_MUTE,
            RequestPayload {
                mute: Some(*mute),
                ..Default::default()
            },
        ),
        RemoteCommand::PowerOff => call(uri::TURN_OFF),
        RemoteCommand::ScreenOff | RemoteCommand::ScreenOn => with(
            if matches!(command, RemoteCommand::ScreenOff) {
                uri::SCREEN_OFF
            } else {
                uri::SCREEN_ON
            },
            RequestPayload {
                standby_mode: Some("active".into()),
                ..Default::default()
            },
        ),
        RemoteCommand::ChannelUp => call(uri::CHANNEL_UP),
        RemoteCommand::ChannelDown => call(uri::CHANNEL_DOWN),
        RemoteCommand::LaunchApp {
            app_id,
            content_id,
            params,
        } => with(
            uri::LAUNCH,
            RequestPayload {
                id: Some(app_id.clone()),
                content_id: content_id.clone(),
                params: params.clone(),
                ..Default::default()
            },
        ),
        RemoteCommand::CloseApp { app_id, session_id } => with(
            uri::CLOSE,
            RequestPayload {
                id: Some(app_id.clone()),
                session_id: session_id.clone(),
                ..Default::default()
            },
        ),
        RemoteCommand::Text(text) => with(
            uri::INSERT_TEXT,
            RequestPayload {
                text: Some(text.clone()),
                replace: Some(false),
                ..Default::default()
            },
        ),
        RemoteCommand::SendEnter => call(uri::SEND_ENTER),
        RemoteCommand::SetSource(input) => with(
            uri::SET_SOURCE,
            RequestPayload {
                input_id: Some(input.clone()),
                ..Default::default()
            },
        ),
        RemoteCommand::ListApps => query(uri::LIST_APPS),
        RemoteCommand::ListSources => query(uri::LIST_SOURCES),
        RemoteCommand::GetVolume => query(uri::GET_VOLUME),
        RemoteCommand::SubscribeVolume => {
            LgAction::Subscribe(Request::subscription(uri::GET_VOLUME, true))
        }
        RemoteCommand::UnsubscribeVolume => {
            LgAction::Unsubscribe(Request::subscription(uri::GET_VOLUME, false))
        }
        RemoteCommand::PressKey(_) | RemoteCommand::ReleaseKey(_) => {
            return Err(Error::unsupported(Vendor::Lg, command.name()));
        }
    };
    Ok(action)
}

// ============================================================================
// LgProtocol
// ============================================================================

/// LG handshake, negotiation and dispatch.
pub(crate) struct LgProtocol {
    pairing_type: PairingType,
    client_key: Option<String>,
    auto_subscribe: bool,
    register_id: RequestId,
    negotiator: Negotiator,
    /// The one live volume subscription, automatic or requested.
    volume_subscription: Option<RequestId>,
    apps_request: Option<RequestId>,
}

impl LgProtocol {
    pub(crate) fn new(
        pairing_type: PairingType,
        client_key: Option<String>,
        auto_subscribe: bool,
    ) -> Self {
        Self {
            pairing_type,
            client_key: client_key.filter(|k| !k.is_empty()),
            auto_subscribe,
            register_id: RequestId::new(REGISTER_ID),
            negotiator: Negotiator::new(),
            volume_subscription: None,
            apps_request: None,
        }
    }

    pub(crate) fn on_open(&mut self, ctx: &mut LoopContext) {
        let request = Request::register(self.pairing_type, self.client_key.clone());
        match request.encode_with_id(&self.register_id) {
            Ok(text) => {
                debug!(has_key = self.client_key.is_some(), "Registering");
                ctx.transition(SessionState::Authorizing);
                ctx.send_primary(text, WriteTag::Handshake);
            }
            Err(e) => ctx.fail(&e),
        }
    }

    pub(crate) fn on_frame(&mut self, ctx: &mut LoopContext, text: &str) {
        let (kind, response) = match Response::decode(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                ctx.malformed(&e);
                return;
            }
        };

        match kind {
            ResponseType::Registered => self.on_registered(ctx, &response),
            ResponseType::Response => self.on_response(ctx, response),
            ResponseType::Error => self.on_error(ctx, response),
        }
    }

    fn on_registered(&mut self, ctx: &mut LoopContext, response: &Response) {
        if ctx.state() == SessionState::Authorized {
            trace!("Repeated registration acknowledgement");
            return;
        }
        let Some(key) = response.client_key().map(str::to_owned) else {
            ctx.fail(&Error::missing_token("registered response"));
            return;
        };

        self.client_key = Some(key.clone());
        ctx.authorize(key);

        let pointer_id = RequestId::generate();
        if self.negotiator.on_registered(pointer_id.clone()) {
            self.send_tracked(
                ctx,
                &Request::call(uri::POINTER_INPUT_SOCKET),
                &pointer_id,
                WriteTag::Handshake,
            );
        }

        if self.auto_subscribe {
            let apps_id = RequestId::new(APPS_REQUEST_ID);
            self.send_tracked(
                ctx,
                &Request::call(uri::LIST_APPS),
                &apps_id,
                WriteTag::Handshake,
            );
            self.apps_request = Some(apps_id);

            let volume_id = RequestId::new(VOLUME_SUBSCRIPTION_ID);
            self.send_tracked(
                ctx,
                &Request::subscription(uri::GET_VOLUME, true),
                &volume_id,
                WriteTag::Handshake,
            );
            self.volume_subscription = Some(volume_id);
        }
    }

    fn on_response(&mut self, ctx: &mut LoopContext, response: Response) {
        if response.id.as_ref() == Some(&self.register_id) {
            if let Some(pairing_type) = response.payload().and_then(|p| p.pairing_type) {
                info!(?pairing_type, "Pairing prompt shown on TV");
                ctx.emit(SessionEvent::PairingRequested {
                    pin_required: pairing_type == PairingType::Pin,
                });
            }
            return;
        }

        if let Some(path) = response.socket_path() {
            match self.negotiator.on_socket_path(response.id.as_ref(), path) {
                Ok(Some(url)) => ctx.open_secondary(&url),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Unusable pointer socket path");
                    ctx.emit(SessionEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        }

        let Some(id) = response.id else {
            debug!("Response without id");
            return;
        };

        if self.volume_subscription.as_ref() == Some(&id) {
            if let Some(payload) = &response.payload {
                push_volume(ctx, payload);
            }
            ctx.pending.resolve(&id, response.payload);
            return;
        }

        if self.apps_request.as_ref() == Some(&id) {
            let apps = response
                .payload
                .and_then(|p| p.applications)
                .unwrap_or_default();
            debug!(count = apps.len(), "App list received");
            ctx.emit(SessionEvent::AppsChanged { apps });
            return;
        }

        if let Some(message) = response.payload.as_ref().and_then(ResponsePayload::failure) {
            debug!(id = %id, error = %message, "Request rejected");
            if !ctx.pending.fail(&id, Error::peer(id.as_str(), message)) {
                debug!(id = %id, "Rejection for unknown request");
            }
            return;
        }

        if !ctx.pending.resolve(&id, response.payload) {
            debug!(id = %id, "Response for unknown request");
        }
    }

    fn on_error(&mut self, ctx: &mut LoopContext, response: Response) {
        let message = response
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());

        match response.id {
            Some(id) if ctx.pending.contains(&id) => {
                debug!(id = %id, error = %message, "Request failed");
                ctx.pending.fail(&id, Error::peer(id.as_str(), message));
            }
            Some(id)
                if self.negotiator.pending_request() == Some(&id)
                    || self.volume_subscription.as_ref() == Some(&id)
                    || self.apps_request.as_ref() == Some(&id) =>
            {
                warn!(id = %id, error = %message, "Follow-up request failed");
                ctx.emit(SessionEvent::Error { message });
            }
            _ => ctx.deny(message),
        }
    }

    pub(crate) fn submit(
        &mut self,
        ctx: &mut LoopContext,
        command: RemoteCommand,
        responder: Responder,
    ) {
        let action = match translate(&command) {
            Ok(action) => action,
            Err(e) => {
                let _ = responder.send(Err(e));
                return;
            }
        };

        match action {
            LgAction::Request {
                request,
                wants_reply,
            } => {
                let id = RequestId::generate();
                self.send_request(ctx, &request, id, responder, wants_reply);
            }
            LgAction::Subscribe(request) => {
                if let Some(id) = &self.volume_subscription {
                    debug!(id = %id, "Volume subscription already live");
                    let _ = responder.send(Ok(Outcome::Accepted));
                    return;
                }
                let id = RequestId::generate();
                self.volume_subscription = Some(id.clone());
                self.send_request(ctx, &request, id, responder, false);
            }
            LgAction::Unsubscribe(request) => {
                let Some(id) = self.volume_subscription.take() else {
                    debug!("No volume subscription to cancel");
                    let _ = responder.send(Ok(Outcome::Accepted));
                    return;
                };
                // The TV does not answer unsubscribe.
                match request.encode_with_id(&id) {
                    Ok(text) => {
                        let completion = ctx.primary.send_text(text);
                        ctx.track(completion, WriteTag::Direct(responder));
                    }
                    Err(e) => {
                        let _ = responder.send(Err(e));
                    }
                }
            }
            LgAction::Pointer(frame) => {
                if !self.negotiator.is_ready() {
                    let _ = responder.send(Err(Error::SecondaryChannelUnavailable));
                    return;
                }
                trace!(?frame, "Pointer frame");
                ctx.send_secondary(Frame::Binary(frame.encode().into_bytes()), responder);
            }
        }
    }

    pub(crate) fn pair_with_pin(&mut self, ctx: &mut LoopContext, pin: String, responder: Responder) {
        let state = ctx.state();
        if state != SessionState::Authorizing {
            let _ = responder.send(Err(Error::not_authorized(state)));
            return;
        }
        let pin = pin.trim().to_string();
        if pin.is_empty() || !pin.chars().all(|c| c.is_ascii_digit()) {
            let _ = responder.send(Err(Error::invalid_pin("PIN must be digits")));
            return;
        }

        let request = Request::call(uri::SET_PIN).with_payload(RequestPayload {
            pin: Some(pin),
            ..Default::default()
        });
        self.send_request(ctx, &request, RequestId::generate(), responder, false);
    }

    pub(crate) fn on_secondary_event(&mut self, ctx: &mut LoopContext, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if self.negotiator.on_secondary_opened() {
                    info!("Pointer socket ready");
                    ctx.emit(SessionEvent::SecondaryChannelReady);
                }
            }
            TransportEvent::Frame(frame) => trace!(len = frame.len(), "Ignoring pointer socket frame"),
            TransportEvent::Error(message) => warn!(error = %message, "Pointer socket error"),
            TransportEvent::Closed { code, .. } => {
                info!(?code, "Pointer socket closed");
                self.negotiator.on_secondary_closed();
                ctx.forget_secondary();
            }
        }
    }

    /// Registers `id` in the pending table and writes the request.
    fn send_request(
        &mut self,
        ctx: &mut LoopContext,
        request: &Request,
        id: RequestId,
        responder: Responder,
        wants_reply: bool,
    ) {
        match request.encode_with_id(&id) {
            Ok(text) => {
                ctx.pending.insert(id.clone(), responder, wants_reply);
                ctx.send_primary(text, WriteTag::Request(id));
            }
            Err(e) => {
                let _ = responder.send(Err(e));
            }
        }
    }

    /// Writes a request nobody awaits.
    fn send_tracked(&self, ctx: &mut LoopContext, request: &Request, id: &RequestId, tag: WriteTag) {
        match request.encode_with_id(id) {
            Ok(text) => ctx.send_primary(text, tag),
            Err(e) => warn!(error = %e, "Failed to encode follow-up request"),
        }
    }
}

/// Raises mute and volume events for the fields the TV reported.
fn push_volume(ctx: &LoopContext, payload: &ResponsePayload) {
    if let Some(muted) = payload.mute_status() {
        ctx.emit(SessionEvent::MuteChanged { muted });
    }
    if let Some(volume) = payload.volume_level() {
        ctx.emit(SessionEvent::VolumeChanged { volume });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{Key, PointerAction};

    #[test]
    fn test_connect_url() {
        let tv = DeviceDescriptor::new(Vendor::Lg, "Bedroom", "10.0.0.2");
        let url = connect_url(&tv, &SessionOptions::new()).expect("url");
        assert_eq!(url.as_str(), "wss://10.0.0.2:3001/");

        let custom = connect_url(&tv, &SessionOptions::new().with_port(3000)).expect("url");
        assert_eq!(custom.port(), Some(3000));
    }

    #[test]
    fn test_connect_url_rejects_garbage() {
        let tv = DeviceDescriptor::new(Vendor::Lg, "Bedroom", "not a host");
        assert!(matches!(
            connect_url(&tv, &SessionOptions::new()),
            Err(Error::InvalidUrl { .. })
        ));

        let empty = DeviceDescriptor::new(Vendor::Lg, "Bedroom", "");
        assert!(matches!(
            connect_url(&empty, &SessionOptions::new()),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_translate_keys_go_to_pointer_socket() {
        assert!(matches!(
            translate(&RemoteCommand::Key(Key::Home)),
            Ok(LgAction::Pointer(frame)) if frame == PointerFrame::button("HOME")
        ));
        assert!(matches!(
            translate(&RemoteCommand::Pointer(PointerAction::Click)),
            Ok(LgAction::Pointer(PointerFrame::Click))
        ));
    }

    #[test]
    fn test_translate_requests() {
        let LgAction::Request {
            request,
            wants_reply,
        } = translate(&RemoteCommand::SetVolume(10)).expect("volume")
        else {
            panic!("expected request");
        };
        assert_eq!(request.uri.as_deref(), Some(uri::SET_VOLUME));
        assert_eq!(request.payload.and_then(|p| p.volume), Some(10));
        assert!(!wants_reply);

        let LgAction::Request { wants_reply, .. } =
            translate(&RemoteCommand::ListApps).expect("list")
        else {
            panic!("expected request");
        };
        assert!(wants_reply);
    }

    #[test]
    fn test_translate_unsupported() {
        assert!(matches!(
            translate(&RemoteCommand::PressKey(Key::Up)),
            Err(Error::Unsupported {
                vendor: Vendor::Lg,
                ..
            })
        ));
    }

    #[test]
    fn test_translate_screen_uses_active_standby() {
        let LgAction::Request { request, .. } =
            translate(&RemoteCommand::ScreenOff).expect("screen off")
        else {
            panic!("expected request");
        };
        assert_eq!(request.uri.as_deref(), Some(uri::SCREEN_OFF));
        assert_eq!(
            request.payload.and_then(|p| p.standby_mode).as_deref(),
            Some("active")
        );
    }
}
