//! HTTP-controlled TVs.
//!
//! Fire TV and Roku expose the same session shape as the socket vendors
//! (`connect`, `submit`, `disconnect`, events) but dispatch every command
//! as an independent request, with no ordering between them.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | [`HttpExecutor`] seam and the reqwest implementation |
//! | `firetv` | PIN pairing and remote API |
//! | `roku` | External Control Protocol |

// ============================================================================
// Submodules
// ============================================================================

mod base;

/// HTTP executor seam.
pub mod client;

/// Fire TV session.
pub mod firetv;

/// Roku session.
pub mod roku;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{HttpExecutor, HttpRequest, HttpResponse, Method, ReqwestExecutor};
pub use firetv::FireTvSession;
pub use roku::RokuSession;

#[cfg(test)]
pub(crate) use base::testing;
