//! Wire codecs.
//!
//! | Codec | Direction | Shape |
//! |-------|-----------|-------|
//! | [`lg`] | both | JSON envelope `{type, id, uri?, payload?}` |
//! | [`samsung`] | both | `ms.remote.control` commands, `ms.channel.*` events |
//! | [`pointer`] | write-only | `type:<k>\n<field>:<v>\n\n` line frames |
//!
//! Decode failures surface as [`Error::MalformedFrame`](crate::Error::MalformedFrame),
//! distinct from authorization and transport failures.

// ============================================================================
// Submodules
// ============================================================================

/// Vendor-neutral commands.
pub mod command;

/// LG webOS envelope codec.
pub mod lg;

/// LG pointer channel frames.
pub mod pointer;

/// Samsung remote channel codec.
pub mod samsung;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Key, PointerAction, RemoteCommand};
pub use pointer::PointerFrame;
