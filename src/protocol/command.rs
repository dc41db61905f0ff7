//! Vendor-neutral command vocabulary.
//!
//! Callers describe what they want with [`RemoteCommand`]; each session
//! variant translates it into its own wire request or rejects it with
//! [`Error::Unsupported`](crate::Error::Unsupported).
//!
//! | Group | Commands |
//! |-------|----------|
//! | Navigation | [`RemoteCommand::Key`], `PressKey`, `ReleaseKey` |
//! | Volume | `VolumeUp`, `VolumeDown`, `SetVolume`, `SetMute` |
//! | Power | `PowerOff`, `ScreenOff`, `ScreenOn` |
//! | Apps | `LaunchApp`, `CloseApp`, `ListApps` |
//! | Text | `Text`, `SendEnter` |
//! | Sources | `SetSource`, `ListSources` |
//! | Status | `GetVolume`, `SubscribeVolume`, `UnsubscribeVolume` |
//! | Pointer | [`RemoteCommand::Pointer`] |

// ============================================================================
// Key
// ============================================================================

/// Navigation and media keys common to every vendor remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // ========================================================================
    // Directional
    // ========================================================================
    /// D-pad up.
    Up,
    /// D-pad down.
    Down,
    /// D-pad left.
    Left,
    /// D-pad right.
    Right,
    /// OK / select.
    Enter,

    // ========================================================================
    // Menus
    // ========================================================================
    /// Back / return.
    Back,
    /// Home screen.
    Home,
    /// Exit the current app or overlay.
    Exit,
    /// Settings / options menu.
    Menu,
    /// Info overlay.
    Info,

    // ========================================================================
    // Media
    // ========================================================================
    /// Play.
    Play,
    /// Pause.
    Pause,
    /// Stop.
    Stop,
    /// Rewind.
    Rewind,
    /// Fast forward.
    FastForward,

    // ========================================================================
    // Digits
    // ========================================================================
    /// Numeric key `0..=9`.
    Digit(u8),
}

// ============================================================================
// PointerAction
// ============================================================================

/// Raw pointer input for vendors with a pointer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// Relative cursor move, optionally with the button held.
    Move {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
        /// Whether the button is held during the move.
        down: bool,
    },
    /// Click at the current cursor position.
    Click,
    /// Scroll by a delta.
    Scroll {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
    },
}

// ============================================================================
// RemoteCommand
// ============================================================================

/// A high-level command submitted to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Press a navigation or media key.
    Key(Key),
    /// Hold a key down until `ReleaseKey`.
    PressKey(Key),
    /// Release a held key.
    ReleaseKey(Key),

    /// Raise volume one step.
    VolumeUp,
    /// Lower volume one step.
    VolumeDown,
    /// Set absolute volume.
    SetVolume(u8),
    /// Mute or unmute. Vendors without absolute mute toggle instead.
    SetMute(bool),

    /// Power the TV off.
    PowerOff,
    /// Turn the panel off while audio keeps playing.
    ScreenOff,
    /// Turn the panel back on.
    ScreenOn,

    /// Next channel.
    ChannelUp,
    /// Previous channel.
    ChannelDown,

    /// Launch an app.
    LaunchApp {
        /// Vendor app id.
        app_id: String,
        /// Deep-link content id.
        content_id: Option<String>,
        /// Extra launch parameters.
        params: Option<String>,
    },
    /// Close a running app.
    CloseApp {
        /// Vendor app id.
        app_id: String,
        /// Session id returned by a previous launch.
        session_id: Option<String>,
    },

    /// Type text into the focused field.
    Text(String),
    /// Submit the focused text field.
    SendEnter,

    /// Switch to an external input.
    SetSource(String),

    /// Query installed apps.
    ListApps,
    /// Query external inputs.
    ListSources,
    /// Query volume and mute status.
    GetVolume,
    /// Start receiving volume pushes.
    SubscribeVolume,
    /// Stop receiving volume pushes.
    UnsubscribeVolume,

    /// Raw pointer input.
    Pointer(PointerAction),
}

impl RemoteCommand {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Key(_) => "key",
            Self::PressKey(_) => "press_key",
            Self::ReleaseKey(_) => "release_key",
            Self::VolumeUp => "volume_up",
            Self::VolumeDown => "volume_down",
            Self::SetVolume(_) => "set_volume",
            Self::SetMute(_) => "set_mute",
            Self::PowerOff => "power_off",
            Self::ScreenOff => "screen_off",
            Self::ScreenOn => "screen_on",
            Self::ChannelUp => "channel_up",
            Self::ChannelDown => "channel_down",
            Self::LaunchApp { .. } => "launch_app",
            Self::CloseApp { .. } => "close_app",
            Self::Text(_) => "text",
            Self::SendEnter => "send_enter",
            Self::SetSource(_) => "set_source",
            Self::ListApps => "list_apps",
            Self::ListSources => "list_sources",
            Self::GetVolume => "get_volume",
            Self::SubscribeVolume => "subscribe_volume",
            Self::UnsubscribeVolume => "unsubscribe_volume",
            Self::Pointer(_) => "pointer",
        }
    }

    /// Returns `true` if the caller expects a reply payload.
    #[inline]
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(self, Self::ListApps | Self::ListSources | Self::GetVolume)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_commands() {
        assert!(RemoteCommand::ListApps.is_query());
        assert!(RemoteCommand::GetVolume.is_query());
        assert!(!RemoteCommand::VolumeUp.is_query());
        assert!(!RemoteCommand::SubscribeVolume.is_query());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(RemoteCommand::Key(Key::Up).name(), "key");
        assert_eq!(RemoteCommand::Text("x".into()).name(), "text");
        assert_eq!(
            RemoteCommand::Pointer(PointerAction::Click).name(),
            "pointer"
        );
    }
}
