//! LG webOS JSON envelope codec.
//!
//! # Format
//!
//! Outbound:
//!
//! ```json
//! { "type": "request", "id": "1f0c...", "uri": "ssap://audio/volumeUp", "payload": { ... } }
//! ```
//!
//! Inbound:
//!
//! ```json
//! { "type": "registered", "id": "register_0", "payload": { "client-key": "abc" } }
//! ```
//!
//! Every payload field decodes to `Option`, so a field the TV did not report
//! stays distinguishable from a reported `false` or `0`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Constants
// ============================================================================

/// Port of the secure control channel.
pub const CONTROL_PORT: u16 = 3001;

/// Signature of the public LG remote manifest.
const MANIFEST_SIGNATURE: &str = "eyJhbGdvcml0aG0iOiJSU0EtU0hBMjU2Iiwia2V5SWQiOiJ0ZXN0LXNpZ25pbmctY2VydCIsInNpZ25hdHVyZVZlcnNpb24iOjF9.hrVRgjCwXVvE2OOSpDZ58hR+59aFNwYDyjQgKk3auukd7pcegmE2CzPCa0bJ0ZsRAcKkCTJrWo5iDzNhMBWRyaMOv5zWSrthlf7G128qvIlpMT0YNY+n/FaOHE73uLrS/g7swl3/qH/BGFG2Hu4RlL48eb3lLKqTt2xKHdCs6Cd4RMfJPYnzgvI4BNrFUKsjkcu+WD4OO2A27Pq1n50cMchmcaXadJhGrOqH5YmHdOCj5NSHzJYrsW0HPlpuAx/ECMeIZYDh6RMqaFM2DXzdKX9NmmyqzJ3o/0lkk/N97gfVRLW5hA29yeAwaCViZNCP8iC9aO0q9fQojoa7NQnAtw==";

/// Permissions granted by the signed manifest.
const SIGNED_PERMISSIONS: &[&str] = &[
    "TEST_SECURE",
    "CONTROL_INPUT_TEXT",
    "CONTROL_MOUSE_AND_KEYBOARD",
    "READ_INSTALLED_APPS",
    "READ_LGE_SDX",
    "READ_NOTIFICATIONS",
    "SEARCH",
    "WRITE_SETTINGS",
    "WRITE_NOTIFICATION_ALERT",
    "CONTROL_POWER",
    "READ_CURRENT_CHANNEL",
    "READ_RUNNING_APPS",
    "READ_UPDATE_INFO",
    "UPDATE_FROM_REMOTE_APP",
    "READ_LGE_TV_INPUT_EVENTS",
    "READ_TV_CURRENT_TIME",
];

/// Permissions requested at registration.
const REQUESTED_PERMISSIONS: &[&str] = &[
    "LAUNCH",
    "LAUNCH_WEBAPP",
    "APP_TO_APP",
    "CLOSE",
    "TEST_OPEN",
    "TEST_PROTECTED",
    "CONTROL_AUDIO",
    "CONTROL_DISPLAY",
    "CONTROL_INPUT_JOYSTICK",
    "CONTROL_INPUT_MEDIA_RECORDING",
    "CONTROL_INPUT_MEDIA_PLAYBACK",
    "CONTROL_INPUT_TV",
    "CONTROL_POWER",
    "CONTROL_INPUT_TEXT",
    "CONTROL_MOUSE_AND_KEYBOARD",
    "READ_APP_STATUS",
    "READ_CURRENT_CHANNEL",
    "READ_INPUT_DEVICE_LIST",
    "READ_NETWORK_STATE",
    "READ_RUNNING_APPS",
    "READ_TV_CHANNEL_LIST",
    "WRITE_NOTIFICATION_TOAST",
    "READ_POWER_STATE",
    "READ_COUNTRY_INFO",
];

// ============================================================================
// Enums
// ============================================================================

/// How the TV confirms a new client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairingType {
    /// On-screen accept/deny prompt.
    #[default]
    #[serde(rename = "PROMPT")]
    Prompt,
    /// PIN shown on screen, entered by the client.
    #[serde(rename = "PIN")]
    Pin,
}

/// Outbound envelope discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// Registration handshake.
    Register,
    /// One-shot request.
    Request,
    /// Start a push subscription.
    Subscribe,
    /// Stop a push subscription.
    Unsubscribe,
}

/// Inbound envelope discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Reply to a request or subscription push.
    Response,
    /// Registration accepted.
    Registered,
    /// Request or registration failed.
    Error,
}

impl ResponseType {
    /// Parses the wire discriminant.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "response" => Some(Self::Response),
            "registered" => Some(Self::Registered),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Signature entry of the manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSignature {
    /// Signature scheme version.
    pub signature_version: u32,
    /// Signature blob.
    pub signature: String,
}

/// Signed application descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedManifest {
    /// Creation date stamp.
    pub created: String,
    /// Application id.
    pub app_id: String,
    /// Vendor id.
    pub vendor_id: String,
    /// Localized application names.
    pub localized_app_names: Map<String, Value>,
    /// Localized vendor names.
    pub localized_vendor_names: Map<String, Value>,
    /// Signed permissions.
    pub permissions: Vec<String>,
    /// Serial.
    pub serial: String,
}

/// Registration manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Manifest format version.
    pub manifest_version: u32,
    /// Client application version.
    pub app_version: String,
    /// Signed descriptor.
    pub signed: SignedManifest,
    /// Requested permissions.
    pub permissions: Vec<String>,
    /// Signatures over `signed`.
    pub signatures: Vec<ManifestSignature>,
}

impl Default for Manifest {
    fn default() -> Self {
        let mut app_names = Map::new();
        app_names.insert(String::new(), Value::from("LG Remote App"));
        app_names.insert("ko-KR".into(), Value::from("리모컨 앱"));
        app_names.insert("zxx-XX".into(), Value::from("ЛГ Rэмotэ AПП"));

        let mut vendor_names = Map::new();
        vendor_names.insert(String::new(), Value::from("LG Electronics"));

        Self {
            manifest_version: 1,
            app_version: "1.1".into(),
            signed: SignedManifest {
                created: "20140509".into(),
                app_id: "com.lge.test".into(),
                vendor_id: "com.lge".into(),
                localized_app_names: app_names,
                localized_vendor_names: vendor_names,
                permissions: SIGNED_PERMISSIONS.iter().map(|p| (*p).to_string()).collect(),
                serial: "2f930e2d2cfe083771f68e4fe7bb07".into(),
            },
            permissions: REQUESTED_PERMISSIONS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            signatures: vec![ManifestSignature {
                signature_version: 1,
                signature: MANIFEST_SIGNATURE.into(),
            }],
        }
    }
}

// ============================================================================
// RequestPayload
// ============================================================================

/// Method-specific request payload. Unset fields are omitted from the wire.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    /// Registration: force a new pairing prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_pairing: Option<bool>,
    /// Registration: prompt or PIN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_type: Option<PairingType>,
    /// Registration: previous pairing key.
    #[serde(rename = "client-key", skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Registration: manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
    /// PIN pairing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// Absolute volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    /// Mute flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    /// Screen power mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standby_mode: Option<String>,
    /// App id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Deep-link content id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Extra launch params.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// App session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// IME text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// IME replace flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<bool>,
    /// External input id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_id: Option<String>,
}

// ============================================================================
// Request
// ============================================================================

/// Outbound JSON envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Envelope discriminant.
    #[serde(rename = "type")]
    pub kind: RequestType,

    /// Correlation id, set at send time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Method identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Method payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<RequestPayload>,
}

impl Request {
    /// Creates a `request` envelope for a method.
    #[inline]
    #[must_use]
    pub fn call(uri: impl Into<String>) -> Self {
        Self {
            kind: RequestType::Request,
            id: None,
            uri: Some(uri.into()),
            payload: None,
        }
    }

    /// Creates a `subscribe` or `unsubscribe` envelope.
    #[inline]
    #[must_use]
    pub fn subscription(uri: impl Into<String>, subscribe: bool) -> Self {
        Self {
            kind: if subscribe {
                RequestType::Subscribe
            } else {
                RequestType::Unsubscribe
            },
            id: None,
            uri: Some(uri.into()),
            payload: None,
        }
    }

    /// Creates the `register` envelope.
    #[must_use]
    pub fn register(pairing_type: PairingType, client_key: Option<String>) -> Self {
        Self {
            kind: RequestType::Register,
            id: None,
            uri: None,
            payload: Some(RequestPayload {
                force_pairing: Some(false),
                pairing_type: Some(pairing_type),
                client_key,
                manifest: Some(Manifest::default()),
                ..Default::default()
            }),
        }
    }

    /// Attaches a payload.
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: RequestPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Serializes the envelope with the given correlation id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode_with_id(&self, id: &RequestId) -> Result<String> {
        let mut copy = self.clone();
        copy.id = Some(id.clone());
        Ok(serde_json::to_string(&copy)?)
    }
}

// ============================================================================
// Response
// ============================================================================

/// Volume status block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatus {
    /// Mute state, if reported.
    #[serde(default)]
    pub mute_status: Option<bool>,
    /// Volume level, if reported.
    #[serde(default)]
    pub volume: Option<i64>,
}

/// Installed application entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    /// App id.
    #[serde(default)]
    pub id: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Whether the app ships with the system.
    #[serde(default)]
    pub system_app: Option<bool>,
    /// Icon URL.
    #[serde(default)]
    pub icon: Option<String>,
}

/// External input entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExternalInput {
    /// Input id for `switchInput`.
    #[serde(default)]
    pub id: Option<String>,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
}

/// Method-specific response payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    /// Pairing type the TV is using.
    #[serde(default)]
    pub pairing_type: Option<PairingType>,
    /// Pairing key issued on registration.
    #[serde(rename = "client-key", default)]
    pub client_key: Option<String>,
    /// Generic success flag.
    #[serde(default)]
    pub return_value: Option<bool>,
    /// Nested volume status (newer firmware).
    #[serde(default)]
    pub volume_status: Option<VolumeStatus>,
    /// Top-level mute flag (older firmware).
    #[serde(default)]
    pub mute: Option<bool>,
    /// Top-level volume (older firmware).
    #[serde(default)]
    pub volume: Option<i64>,
    /// App list.
    #[serde(rename = "apps", default)]
    pub applications: Option<Vec<AppInfo>>,
    /// External inputs.
    #[serde(default)]
    pub devices: Option<Vec<ExternalInput>>,
    /// Pointer socket address.
    #[serde(default)]
    pub socket_path: Option<String>,
    /// Any field not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponsePayload {
    /// Mute state from either payload layout.
    #[inline]
    #[must_use]
    pub fn mute_status(&self) -> Option<bool> {
        self.volume_status
            .as_ref()
            .and_then(|s| s.mute_status)
            .or(self.mute)
    }

    /// Volume level from either payload layout.
    #[inline]
    #[must_use]
    pub fn volume_level(&self) -> Option<i64> {
        self.volume_status
            .as_ref()
            .and_then(|s| s.volume)
            .or(self.volume)
    }

    /// Failure reported through `returnValue: false`, with the TV's
    /// `errorText` when present.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        if self.return_value != Some(false) {
            return None;
        }
        let text = self
            .extra
            .get("errorText")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Some(text.to_string())
    }
}

/// Inbound JSON envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Raw discriminant.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Echoed correlation id.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Method payload.
    #[serde(default)]
    pub payload: Option<ResponsePayload>,

    /// Error text for `error` envelopes.
    #[serde(default)]
    pub error: Option<String>,
}

impl Response {
    /// Decodes an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not a JSON envelope
    /// or its `type` is absent or unknown.
    pub fn decode(text: &str) -> Result<(ResponseType, Self)> {
        let response: Self = serde_json::from_str(text)
            .map_err(|e| Error::malformed_frame(format!("LG envelope: {e}")))?;

        let kind = match response.kind.as_deref() {
            Some(raw) => ResponseType::parse(raw)
                .ok_or_else(|| Error::malformed_frame(format!("unknown envelope type '{raw}'")))?,
            None => return Err(Error::malformed_frame("envelope has no type")),
        };

        Ok((kind, response))
    }

    /// Payload field accessor that tolerates an absent payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&ResponsePayload> {
        self.payload.as_ref()
    }

    /// Socket path if present.
    #[inline]
    #[must_use]
    pub fn socket_path(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.socket_path.as_deref())
    }

    /// Non-empty pairing key if present.
    #[inline]
    #[must_use]
    pub fn client_key(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.client_key.as_deref())
            .filter(|k| !k.is_empty())
    }
}

// ============================================================================
// Targets
// ============================================================================

/// SSAP method URIs.
pub mod uri {
    /// PIN pairing.
    pub const SET_PIN: &str = "ssap://pairing/setPin";
    /// Volume up.
    pub const VOLUME_UP: &str = "ssap://audio/volumeUp";
    /// Volume down.
    pub const VOLUME_DOWN: &str = "ssap://audio/volumeDown";
    /// Volume query/subscription.
    pub const GET_VOLUME: &str = "ssap://audio/getVolume";
    /// Absolute volume.
    pub const SET_VOLUME: &str = "ssap://audio/setVolume";
    /// Mute.
    pub const SET_MUTE: &str = "ssap://audio/setMute";
    /// Screen off.
    pub const SCREEN_OFF: &str = "ssap://com.webos.service.tvpower/power/turnOffScreen";
    /// Screen on.
    pub const SCREEN_ON: &str = "ssap://com.webos.service.tvpower/power/turnOnScreen";
    /// Pointer socket negotiation.
    pub const POINTER_INPUT_SOCKET: &str =
        "ssap://com.webos.service.networkinput/getPointerInputSocket";
    /// Power off.
    pub const TURN_OFF: &str = "ssap://system/turnOff";
    /// App list.
    pub const LIST_APPS: &str = "ssap://com.webos.applicationManager/listApps";
    /// App launch.
    pub const LAUNCH: &str = "ssap://system.launcher/launch";
    /// App close.
    pub const CLOSE: &str = "ssap://system.launcher/close";
    /// IME text.
    pub const INSERT_TEXT: &str = "ssap://com.webos.service.ime/insertText";
    /// IME enter.
    pub const SEND_ENTER: &str = "ssap://com.webos.service.ime/sendEnterKey";
    /// Channel up.
    pub const CHANNEL_UP: &str = "ssap://tv/channelUp";
    /// Channel down.
    pub const CHANNEL_DOWN: &str = "ssap://tv/channelDown";
    /// Input list.
    pub const LIST_SOURCES: &str = "ssap://tv/getExternalInputList";
    /// Input switch.
    pub const SET_SOURCE: &str = "ssap://tv/switchInput";
}

// ============================================================================
// Tests
// ============================================================================
