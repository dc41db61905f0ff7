//! Line-oriented frames for the LG pointer channel.
//!
//! The pointer socket takes plain ASCII frames, one per action:
//!
//! ```text
//! type:move
//! dx:10
//! dy:-4
//! down:0
//!
//! ```
//!
//! Every field line ends with `\n` and a blank line ends the frame. The
//! channel is write-only, so there is no decoder.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Write as _;

use super::command::{Key, PointerAction};

// ============================================================================
// PointerFrame
// ============================================================================

/// One pointer-channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerFrame {
    /// `type:move` with `dx`, `dy`, `down`.
    Move {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
        /// Button held.
        down: bool,
    },
    /// `type:click`.
    Click,
    /// `type:scroll` with `dx`, `dy`.
    Scroll {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
    },
    /// `type:button` with `name`.
    Button(String),
}

impl PointerFrame {
    /// Creates a button frame for a navigation key.
    #[must_use]
    pub fn key(key: Key) -> Self {
        Self::Button(button_name(key))
    }

    /// Creates a button frame from a raw LG button name (`VOLUMEUP`, `MUTE`, ...).
    #[must_use]
    pub fn button(name: impl Into<String>) -> Self {
        Self::Button(name.into())
    }

    /// Encodes the frame as wire text.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(48);
        // Writing into a String cannot fail.
        let _ = match self {
            Self::Move { dx, dy, down } => write!(
                out,
                "type:move\ndx:{dx}\ndy:{dy}\ndown:{}\n",
                u8::from(*down)
            ),
            Self::Click => write!(out, "type:click\n"),
            Self::Scroll { dx, dy } => write!(out, "type:scroll\ndx:{dx}\ndy:{dy}\n"),
            Self::Button(name) => write!(out, "type:button\nname:{name}\n"),
        };
        out.push('\n');
        out
    }
}

impl From<PointerAction> for PointerFrame {
    fn from(action: PointerAction) -> Self {
        match action {
            PointerAction::Move { dx, dy, down } => Self::Move { dx, dy, down },
            PointerAction::Click => Self::Click,
            PointerAction::Scroll { dx, dy } => Self::Scroll { dx, dy },
        }
    }
}

// ============================================================================
// Key Names
// ============================================================================

/// LG button name for a key.
#[must_use]
pub fn button_name(key: Key) -> String {
    let name = match key {
        Key::Up => "UP",
        Key::Down => "DOWN",
        Key::Left => "LEFT",
        Key::Right => "RIGHT",
        Key::Enter => "ENTER",
        Key::Back => "BACK",
        Key::Home => "HOME",
        Key::Exit => "EXIT",
        Key::Menu => "MENU",
        Key::Info => "INFO",
        Key::Play => "PLAY",
        Key::Pause => "PAUSE",
        Key::Stop => "STOP",
        Key::Rewind => "REWIND",
        Key::FastForward => "FASTFORWARD",
        Key::Digit(d) => return (d % 10).to_string(),
    };
    name.to_string()
}

// ============================================================================
// Tests
// ============================================================================
