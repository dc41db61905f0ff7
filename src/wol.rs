//! Wake-on-LAN.
//!
//! A magic packet is six `0xFF` bytes followed by the target MAC address
//! repeated sixteen times, sent as one UDP datagram to a broadcast address.
//!
//! # Example
//!
//! ```no_run
//! use tv_remote::wol::WakeTarget;
//!
//! # async fn example() -> tv_remote::Result<()> {
//! WakeTarget::parse("A0:B1:C2:D3:E4:F5")?.send().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::device::DeviceDescriptor;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default broadcast address.
pub const DEFAULT_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Default Wake-on-LAN port.
pub const DEFAULT_PORT: u16 = 9;

/// Size of a magic packet in bytes.
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}([:-])[0-9A-Fa-f]{2}(?:[:-][0-9A-Fa-f]{2}){4}$")
        .expect("Invalid MAC regex")
});

// ============================================================================
// MacAddress
// ============================================================================

/// Hardware address of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Creates an address from raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[inline]
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Builds the magic packet for this address.
    #[must_use]
    pub fn magic_packet(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(MAGIC_PACKET_LEN);
        packet.extend_from_slice(&[0xFF; 6]);
        for _ in 0..16 {
            packet.extend_from_slice(&self.0);
        }
        packet
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    /// Parses `AA:BB:CC:DD:EE:FF` or `AA-BB-CC-DD-EE-FF`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let separator = MAC_PATTERN
            .captures(s)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| Error::invalid_address(s))?;

        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(s.split(separator)) {
            *slot = u8::from_str_radix(part, 16).map_err(|_| Error::invalid_address(s))?;
        }
        // Mixed separators pass the pattern but not the split.
        if s.split(separator).count() != 6 {
            return Err(Error::invalid_address(s));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

// ============================================================================
// WakeTarget
// ============================================================================

/// Where and to whom a magic packet is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeTarget {
    mac: MacAddress,
    broadcast: Ipv4Addr,
    port: u16,
}

impl WakeTarget {
    /// Targets `mac` on the default broadcast address and port.
    #[inline]
    #[must_use]
    pub const fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            broadcast: DEFAULT_BROADCAST,
            port: DEFAULT_PORT,
        }
    }

    /// Parses `mac` and targets it with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed MAC address.
    pub fn parse(mac: &str) -> Result<Self> {
        Ok(Self::new(mac.parse()?))
    }

    /// Targets the MAC address recorded on a device.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the descriptor has no MAC address
    /// - [`Error::InvalidAddress`] if it is malformed
    pub fn for_device(device: &DeviceDescriptor) -> Result<Self> {
        let mac = device.mac().ok_or_else(|| {
            Error::config(format!(
                "Device '{}' has no MAC address for Wake-on-LAN",
                device.name()
            ))
        })?;
        Self::parse(mac)
    }

    /// Sets the broadcast address, e.g. a subnet broadcast.
    #[inline]
    #[must_use]
    pub const fn with_broadcast(mut self, broadcast: Ipv4Addr) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Sets the UDP port.
    #[inline]
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Target MAC address.
    #[inline]
    #[must_use]
    pub const fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Destination of the datagram.
    #[inline]
    #[must_use]
    pub fn destination(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.broadcast, self.port))
    }

    /// Sends the magic packet once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the socket cannot be bound or the datagram
    /// cannot be sent.
    pub async fn send(&self) -> Result<()> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let packet = self.mac.magic_packet();
        let destination = self.destination();
        let sent = socket.send_to(&packet, destination).await?;
        debug!(bytes = sent, "Magic packet written");
        info!(mac = %self.mac, destination = %destination, "Wake-on-LAN sent");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
