//! Vendor-neutral device identity.
//!
//! A [`DeviceDescriptor`] is produced by whatever discovery or lookup the
//! caller uses and is immutable afterwards. Sessions read it to build their
//! connection URLs.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::Ipv4Addr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Metadata key for a vendor device id.
pub const META_ID: &str = "id";

/// Metadata key for the MAC address used by wake-on-LAN.
pub const META_MAC: &str = "mac";

// ============================================================================
// Vendor
// ============================================================================

/// Supported TV vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// Samsung Tizen TVs (WebSocket, strict in-order dispatch).
    Samsung,
    /// LG webOS TVs (WebSocket control channel + pointer channel).
    Lg,
    /// Amazon Fire TV (HTTPS, unordered dispatch).
    FireTv,
    /// Roku (HTTP ECP, unordered dispatch).
    Roku,
}

impl Vendor {
    /// Returns `true` for vendors driven by a persistent WebSocket session.
    #[inline]
    #[must_use]
    pub const fn uses_socket(self) -> bool {
        matches!(self, Self::Samsung | Self::Lg)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Samsung => "Samsung",
            Self::Lg => "LG",
            Self::FireTv => "Fire TV",
            Self::Roku => "Roku",
        };
        f.write_str(name)
    }
}

// ============================================================================
// DeviceDescriptor
// ============================================================================

/// Identity of one TV on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    name: String,
    address: String,
    vendor: Vendor,
    #[serde(default)]
    metadata: FxHashMap<String, String>,
}

impl DeviceDescriptor {
    /// Creates a descriptor with no metadata.
    #[must_use]
    pub fn new(vendor: Vendor, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            vendor,
            metadata: FxHashMap::default(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Friendly name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host or IP address, without scheme or port.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Vendor of the device.
    #[inline]
    #[must_use]
    pub const fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Looks up a metadata value.
    #[inline]
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Vendor device id, if known.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.metadata(META_ID)
    }

    /// MAC address, if known.
    #[inline]
    #[must_use]
    pub fn mac(&self) -> Option<&str> {
        self.metadata(META_MAC)
    }

    /// Returns the address parsed as IPv4.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is not a dotted quad.
    pub fn ipv4(&self) -> Result<Ipv4Addr> {
        self.address
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::invalid_address(&self.address))
    }
}

// ============================================================================
// Tests
// ============================================================================
