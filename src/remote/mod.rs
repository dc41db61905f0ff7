//! Vendor-neutral entry point.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Remote`] enum over the vendor sessions |
//! | `builder` | [`RemoteBuilder`] with validation |
//! | `options` | [`SessionOptions`] shared by every vendor |

// ============================================================================
// Submodules
// ============================================================================

/// Remote builder.
pub mod builder;

/// Remote enum.
mod core;

/// Session options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::RemoteBuilder;
pub use core::Remote;
pub use options::{DEFAULT_APP_NAME, SessionOptions};
