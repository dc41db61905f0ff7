//! Samsung Tizen remote-control channel codec.
//!
//! Outbound commands:
//!
//! ```json
//! { "method": "ms.remote.control",
//!   "params": { "Cmd": "Click", "DataOfCmd": "KEY_ENTER", "Option": "false", "TypeOfRemote": "SendRemoteKey" } }
//! ```
//!
//! Inbound channel events:
//!
//! ```json
//! { "event": "ms.channel.connect", "data": { "token": "12345", "clients": [ ... ] } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

use super::command::Key;

// ============================================================================
// Constants
// ============================================================================

/// Secure WebSocket port.
pub const CONTROL_PORT: u16 = 8002;

/// Remote-control channel path.
pub const CONTROL_PATH: &str = "/api/v2/channels/samsung.remote.control";

// ============================================================================
// ControlKey
// ============================================================================

/// Samsung key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    /// `KEY_UP`
    Up,
    /// `KEY_DOWN`
    Down,
    /// `KEY_LEFT`
    Left,
    /// `KEY_RIGHT`
    Right,
    /// `KEY_ENTER`
    Enter,
    /// `KEY_RETURN`
    Return,
    /// `KEY_HOME`
    Home,
    /// `KEY_EXIT`
    Exit,
    /// `KEY_MENU`
    Menu,
    /// `KEY_INFO`
    Info,
    /// `KEY_PLAY`
    Play,
    /// `KEY_PAUSE`
    Pause,
    /// `KEY_STOP`
    Stop,
    /// `KEY_REWIND`
    Rewind,
    /// `KEY_FF`
    FastForward,
    /// `KEY_VOLUP`
    VolumeUp,
    /// `KEY_VOLDOWN`
    VolumeDown,
    /// `KEY_MUTE`
    Mute,
    /// `KEY_CHUP`
    ChannelUp,
    /// `KEY_CHDOWN`
    ChannelDown,
    /// `KEY_POWER`
    Power,
    /// `KEY_SOURCE`
    Source,
    /// `KEY_0` .. `KEY_9`
    Digit(u8),
}

impl ControlKey {
    /// Wire code of the key.
    #[must_use]
    pub fn code(self) -> String {
        let code = match self {
            Self::Up => "KEY_UP",
            Self::Down => "KEY_DOWN",
            Self::Left => "KEY_LEFT",
            Self::Right => "KEY_RIGHT",
            Self::Enter => "KEY_ENTER",
            Self::Return => "KEY_RETURN",
            Self::Home => "KEY_HOME",
            Self::Exit => "KEY_EXIT",
            Self::Menu => "KEY_MENU",
            Self::Info => "KEY_INFO",
            Self::Play => "KEY_PLAY",
            Self::Pause => "KEY_PAUSE",
            Self::Stop => "KEY_STOP",
            Self::Rewind => "KEY_REWIND",
            Self::FastForward => "KEY_FF",
            Self::VolumeUp => "KEY_VOLUP",
            Self::VolumeDown => "KEY_VOLDOWN",
            Self::Mute => "KEY_MUTE",
            Self::ChannelUp => "KEY_CHUP",
            Self::ChannelDown => "KEY_CHDOWN",
            Self::Power => "KEY_POWER",
            Self::Source => "KEY_SOURCE",
            Self::Digit(d) => return format!("KEY_{}", d % 10),
        };
        code.to_string()
    }
}

impl From<Key> for ControlKey {
    fn from(key: Key) -> Self {
        match key {
            Key::Up => Self::Up,
            Key::Down => Self::Down,
            Key::Left => Self::Left,
            Key::Right => Self::Right,
            Key::Enter => Self::Enter,
            Key::Back => Self::Return,
            Key::Home => Self::Home,
            Key::Exit => Self::Exit,
            Key::Menu => Self::Menu,
            Key::Info => Self::Info,
            Key::Play => Self::Play,
            Key::Pause => Self::Pause,
            Key::Stop => Self::Stop,
            Key::Rewind => Self::Rewind,
            Key::FastForward => Self::FastForward,
            Key::Digit(d) => Self::Digit(d),
        }
    }
}

// ============================================================================
// KeyAction
// ============================================================================

/// How a key is actuated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAction {
    /// Press and release.
    #[default]
    Click,
    /// Hold down.
    Press,
    /// Let go after `Press`.
    Release,
}

impl KeyAction {
    /// Wire value of `Cmd`.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "Click",
            Self::Press => "Press",
            Self::Release => "Release",
        }
    }
}

// ============================================================================
// RemoteControlCommand
// ============================================================================

/// An outbound Samsung command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteControlCommand {
    /// Key event.
    Key {
        /// Actuation.
        action: KeyAction,
        /// Key code.
        key: ControlKey,
    },
    /// Replace the focused text field with `text`.
    Text(String),
    /// Launch an installed app.
    LaunchApp {
        /// Samsung app id.
        app_id: String,
    },
}

impl RemoteControlCommand {
    /// Click command for a key.
    #[inline]
    #[must_use]
    pub fn click(key: ControlKey) -> Self {
        Self::Key {
            action: KeyAction::Click,
            key,
        }
    }

    /// Builds the wire JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Key { action, key } => json!({
                "method": "ms.remote.control",
                "params": {
                    "Cmd": action.as_str(),
                    "DataOfCmd": key.code(),
                    "Option": "false",
                    "TypeOfRemote": "SendRemoteKey",
                }
            }),
            Self::Text(text) => json!({
                "method": "ms.remote.control",
                "params": {
                    "Cmd": BASE64.encode(text.as_bytes()),
                    "DataOfCmd": "base64",
                    "Option": "false",
                    "TypeOfRemote": "SendInputString",
                }
            }),
            Self::LaunchApp { app_id } => json!({
                "method": "ms.channel.emit",
                "params": {
                    "event": "ed.apps.launch",
                    "to": "host",
                    "data": {
                        "appId": app_id,
                        "action_type": "DEEP_LINK",
                    }
                }
            }),
        }
    }

    /// Serializes the command to wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    /// Short description for logs and events.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Key { action, key } => format!("{} {}", action.as_str(), key.code()),
            Self::Text(text) => format!("text ({} chars)", text.chars().count()),
            Self::LaunchApp { app_id } => format!("launch {app_id}"),
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Client attributes inside `ms.channel.connect`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientAttributes {
    /// Token carried for a refreshed pairing.
    #[serde(default)]
    pub token: Option<String>,
    /// Client name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Connected client entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelClient {
    /// Client id.
    #[serde(default)]
    pub id: Option<String>,
    /// Attributes.
    #[serde(default)]
    pub attributes: Option<ClientAttributes>,
}

/// Data block of a channel event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelData {
    /// Newly issued token.
    #[serde(default)]
    pub token: Option<String>,
    /// Clients connected to the channel.
    #[serde(default)]
    pub clients: Option<Vec<ChannelClient>>,
}

/// Channel event discriminant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// `ms.channel.connect`: authorized.
    Connect,
    /// `ms.channel.unauthorized`: user denied.
    Unauthorized,
    /// `ms.channel.timeOut`: prompt expired.
    TimedOut,
    /// `ms.channel.ready`.
    Ready,
    /// `ms.channel.clientConnect`.
    ClientConnect,
    /// `ms.channel.clientDisconnect`.
    ClientDisconnect,
    /// Any other event name.
    Other(String),
}

impl ChannelEvent {
    /// Parses the wire event name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "ms.channel.connect" => Self::Connect,
            "ms.channel.unauthorized" => Self::Unauthorized,
            "ms.channel.timeOut" => Self::TimedOut,
            "ms.channel.ready" => Self::Ready,
            "ms.channel.clientConnect" => Self::ClientConnect,
            "ms.channel.clientDisconnect" => Self::ClientDisconnect,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Raw inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelMessage {
    /// Event name.
    #[serde(default)]
    pub event: Option<String>,
    /// Event data.
    #[serde(default)]
    pub data: Option<ChannelData>,
}

impl ChannelMessage {
    /// Decodes an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not a channel
    /// message or has no event name.
    pub fn decode(text: &str) -> Result<(ChannelEvent, Self)> {
        let message: Self = serde_json::from_str(text)
            .map_err(|e| Error::malformed_frame(format!("Samsung channel message: {e}")))?;
        let event = message
            .event
            .as_deref()
            .map(ChannelEvent::parse)
            .ok_or_else(|| Error::malformed_frame("channel message has no event"))?;
        Ok((event, message))
    }

    /// Token issued by the TV: a fresh one in `data.token`, otherwise the
    /// refreshed one of the first client. Empty strings count as absent.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        data.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                data.clients
                    .as_ref()?
                    .first()?
                    .attributes
                    .as_ref()?
                    .token
                    .as_deref()
                    .filter(|t| !t.is_empty())
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
