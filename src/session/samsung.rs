//! Samsung session handler.
//!
//! The pairing intent travels in the URL; the TV answers with
//! `ms.channel.connect` once the user accepts. Commands have no
//! acknowledgement, so they go through the strict-order [`PendingQueue`]:
//! one write in flight, the next sent only when it completes.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, trace, warn};
use url::Url;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::protocol::RemoteCommand;
use crate::protocol::samsung::{
    CONTROL_PATH, CONTROL_PORT, ChannelEvent, ChannelMessage, ControlKey, KeyAction,
    RemoteControlCommand,
};
use crate::remote::SessionOptions;

use super::event_loop::{LoopContext, WriteTag};
use super::events::SessionEvent;
use super::pending::{Outcome, Responder};
use super::queue::PendingQueue;
use super::state::SessionState;

// ============================================================================
// URL
// ============================================================================

/// Builds the remote-control channel URL.
///
/// # Errors
///
/// - [`Error::InvalidAddress`] if the address is not IPv4
/// - [`Error::Config`] if the app name is empty
pub(crate) fn connect_url(
    device: &DeviceDescriptor,
    options: &SessionOptions,
    token: Option<&str>,
) -> Result<Url> {
    let ip = device.ipv4()?;
    let app_name = options.app_name().trim();
    if app_name.is_empty() {
        return Err(Error::config("Samsung requires a non-empty app name"));
    }

    let port = options.port().unwrap_or(CONTROL_PORT);
    let mut url = Url::parse(&format!("wss://{ip}:{port}{CONTROL_PATH}"))
        .map_err(|e| Error::invalid_url(e.to_string()))?;

    let name = BASE64.encode(app_name);
    let query = match token.filter(|t| !t.is_empty()) {
        Some(token) => format!("name={name}&token={token}"),
        None => format!("name={name}"),
    };
    // Base64 padding must stay literal.
    url.set_query(Some(&query));
    Ok(url)
}

// ============================================================================
// Command Mapping
// ============================================================================

/// Translates a vendor-neutral command.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] for commands Samsung has no mapping for.
pub(crate) fn translate(command: &RemoteCommand) -> Result<RemoteControlCommand> {
    let key = |key: ControlKey| -> Result<RemoteControlCommand> {
        Ok(RemoteControlCommand::click(key))
    };
    match command {
        RemoteCommand::Key(k) => key(ControlKey::from(*k)),
        RemoteCommand::PressKey(k) => Ok(RemoteControlCommand::Key {
            action: KeyAction::Press,
            key: ControlKey::from(*k),
        }),
        RemoteCommand::ReleaseKey(k) => Ok(RemoteControlCommand::Key {
            action: KeyAction::Release,
            key: ControlKey::from(*k),
        }),
        RemoteCommand::VolumeUp => key(ControlKey::VolumeUp),
        RemoteCommand::VolumeDown => key(ControlKey::VolumeDown),
        // Samsung only toggles.
        RemoteCommand::SetMute(_) => key(ControlKey::Mute),
        RemoteCommand::PowerOff => key(ControlKey::Power),
        RemoteCommand::ChannelUp => key(ControlKey::ChannelUp),
        RemoteCommand::ChannelDown => key(ControlKey::ChannelDown),
        RemoteCommand::SendEnter => key(ControlKey::Enter),
        RemoteCommand::Text(text) => Ok(RemoteControlCommand::Text(text.clone())),
        RemoteCommand::LaunchApp { app_id, .. } => Ok(RemoteControlCommand::LaunchApp {
            app_id: app_id.clone(),
        }),
        other => Err(Error::unsupported(Vendor::Samsung, other.name())),
    }
}

// ============================================================================
// SamsungProtocol
// ============================================================================

/// A command waiting for its turn on the wire.
struct QueuedCommand {
    text: String,
    description: String,
    responder: Option<Responder>,
}

/// Samsung handshake and strict-order dispatch.
pub(crate) struct SamsungProtocol {
    queue: PendingQueue<QueuedCommand>,
    supplied_token: Option<String>,
}

impl SamsungProtocol {
    pub(crate) fn new(supplied_token: Option<String>) -> Self {
        Self {
            queue: PendingQueue::default(),
            supplied_token,
        }
    }

    pub(crate) fn on_open(&mut self, ctx: &mut LoopContext) {
        ctx.transition(SessionState::Authorizing);
        if self.supplied_token.is_none() {
            ctx.emit(SessionEvent::PairingRequested {
                pin_required: false,
            });
        }
    }

    pub(crate) fn on_frame(&mut self, ctx: &mut LoopContext, text: &str) {
        let (event, message) = match ChannelMessage::decode(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                ctx.malformed(&e);
                return;
            }
        };

        match event {
            ChannelEvent::Connect => {
                if ctx.state() == SessionState::Authorized {
                    trace!("Repeated channel connect");
                    return;
                }
                // A TV that already trusts the token may not echo it.
                let token = message
                    .token()
                    .map(str::to_owned)
                    .or_else(|| self.supplied_token.clone());
                match token {
                    Some(token) => ctx.authorize(token),
                    None => ctx.fail(&Error::missing_token("ms.channel.connect")),
                }
            }
            ChannelEvent::Unauthorized => ctx.deny("pairing rejected on the TV"),
            ChannelEvent::TimedOut => ctx.fail(&Error::protocol("pairing prompt timed out")),
            ChannelEvent::Ready | ChannelEvent::ClientConnect | ChannelEvent::ClientDisconnect => {
                trace!(?event, "Channel notification");
            }
            ChannelEvent::Other(name) => {
                warn!(event = %name, "Unexpected channel event");
                ctx.emit(SessionEvent::Error {
                    message: format!("unexpected channel event '{name}'"),
                });
            }
        }
    }

    pub(crate) fn submit(
        &mut self,
        ctx: &mut LoopContext,
        command: RemoteCommand,
        responder: Responder,
    ) {
        let encoded = translate(&command).and_then(|c| Ok((c.encode()?, c.describe())));
        let (text, description) = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                let _ = responder.send(Err(e));
                return;
            }
        };

        let send_now = self.queue.push(QueuedCommand {
            text,
            description,
            responder: Some(responder),
        });
        debug!(pending = self.queue.len(), "Command queued");

        if send_now {
            self.send_head(ctx);
        }
    }

    /// Sends the queue head if nothing is in flight.
    fn send_head(&mut self, ctx: &mut LoopContext) {
        if let Some(head) = self.queue.start_head() {
            trace!(command = %head.description, "Writing queue head");
            let text = head.text.clone();
            ctx.send_primary(text, WriteTag::Queue);
        }
    }

    /// The in-flight head finished writing: pop it and send the next one.
    pub(crate) fn on_written(&mut self, ctx: &mut LoopContext, result: Result<()>) {
        let Some(done) = self.queue.finish_head() else {
            trace!("Write completion with nothing in flight");
            return;
        };
        self.send_head(ctx);

        match result {
            Ok(()) => {
                if let Some(responder) = done.responder {
                    let _ = responder.send(Ok(Outcome::Accepted));
                }
                ctx.emit(SessionEvent::CommandWritten {
                    command: done.description,
                });
            }
            Err(e) => {
                warn!(command = %done.description, error = %e, "Command write failed");
                if let Some(responder) = done.responder {
                    let _ = responder.send(Err(e));
                }
            }
        }
    }

    pub(crate) fn teardown(&mut self, _ctx: &mut LoopContext) {
        let mut dropped = 0usize;
        for queued in self.queue.drain() {
            if let Some(responder) = queued.responder {
                let _ = responder.send(Err(Error::SessionClosed));
            }
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded queued commands");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::Key;

    fn tv() -> DeviceDescriptor {
        DeviceDescriptor::new(Vendor::Samsung, "Living Room", "192.168.1.20")
    }

    #[test]
    fn test_connect_url_without_token() {
        let url = connect_url(&tv(), &SessionOptions::new().with_app_name("Remote"), None)
            .expect("url");
        assert_eq!(
            url.as_str(),
            "wss://192.168.1.20:8002/api/v2/channels/samsung.remote.control?name=UmVtb3Rl"
        );
    }

    #[test]
    fn test_connect_url_with_token_keeps_padding() {
        let url = connect_url(&tv(), &SessionOptions::new().with_app_name("TV"), Some("123"))
            .expect("url");
        assert_eq!(url.query(), Some("name=VFY=&token=123"));
    }

    #[test]
    fn test_connect_url_validation() {
        let bad_ip = DeviceDescriptor::new(Vendor::Samsung, "tv", "samsung.local");
        assert!(matches!(
            connect_url(&bad_ip, &SessionOptions::new(), None),
            Err(Error::InvalidAddress { .. })
        ));

        let empty_name = SessionOptions::new().with_app_name("  ");
        assert!(matches!(
            connect_url(&tv(), &empty_name, None),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_translate() {
        assert_eq!(
            translate(&RemoteCommand::Key(Key::Back)).expect("key"),
            RemoteControlCommand::click(ControlKey::Return)
        );
        assert_eq!(
            translate(&RemoteCommand::PressKey(Key::Up)).expect("press"),
            RemoteControlCommand::Key {
                action: KeyAction::Press,
                key: ControlKey::Up
            }
        );
        assert!(matches!(
            translate(&RemoteCommand::GetVolume),
            Err(Error::Unsupported {
                vendor: Vendor::Samsung,
                ..
            })
        ));
    }
}
