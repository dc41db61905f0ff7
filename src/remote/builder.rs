//! Builder pattern for remote configuration.
//!
//! Provides a fluent API for configuring and creating [`Remote`] instances.
//!
//! # Example
//!
//! ```no_run
//! use tv_remote::{DeviceDescriptor, Remote, Vendor};
//!
//! # fn example() -> tv_remote::Result<()> {
//! let remote = Remote::builder()
//!     .device(DeviceDescriptor::new(Vendor::Lg, "Bedroom", "192.168.1.31"))
//!     .app_name("Bedroom Remote")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::sync::Arc;

use url::Url;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::{Error, Result};
use crate::http::{FireTvSession, HttpExecutor, RokuSession};
use crate::protocol::lg::PairingType;
use crate::session::Session;
use crate::transport::{Connector, TrustEvaluator};

use super::core::Remote;
use super::options::SessionOptions;

// ============================================================================
// RemoteBuilder
// ============================================================================

/// Builder for configuring a [`Remote`].
///
/// Use [`Remote::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct RemoteBuilder {
    /// Target device.
    device: Option<DeviceDescriptor>,
    /// Session options.
    options: SessionOptions,
}

// ============================================================================
// RemoteBuilder Implementation
// ============================================================================

impl RemoteBuilder {
    /// Creates a builder with default options and no device.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device to control.
    #[inline]
    #[must_use]
    pub fn device(mut self, device: DeviceDescriptor) -> Self {
        self.device = Some(device);
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the app name shown in the TV's pairing prompt.
    #[inline]
    #[must_use]
    pub fn app_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.options = self.options.with_app_name(name);
        self
    }

    /// Sets a pairing token from an earlier session.
    #[inline]
    #[must_use]
    pub fn pairing_key(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.with_pairing_key(key);
        self
    }

    /// Sets how an LG TV confirms pairing.
    #[inline]
    #[must_use]
    pub fn pairing_type(mut self, pairing_type: PairingType) -> Self {
        self.options = self.options.with_pairing_type(pairing_type);
        self
    }

    /// Enables or disables LG follow-up subscriptions.
    #[inline]
    #[must_use]
    pub fn auto_subscribe(mut self, enabled: bool) -> Self {
        self.options = self.options.with_auto_subscribe(enabled);
        self
    }

    /// Sets the Fire TV API key.
    #[inline]
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.with_api_key(key);
        self
    }

    /// Overrides the vendor's default port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options = self.options.with_port(port);
        self
    }

    /// Sets the certificate trust policy.
    #[inline]
    #[must_use]
    pub fn trust_evaluator(mut self, evaluator: Arc<dyn TrustEvaluator>) -> Self {
        self.options = self.options.with_trust_evaluator(evaluator);
        self
    }

    /// Uses a custom socket connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.options = self.options.with_connector(connector);
        self
    }

    /// Uses a custom HTTP executor.
    #[inline]
    #[must_use]
    pub fn http_executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.options = self.options.with_http_executor(executor);
        self
    }

    /// Builds the remote with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no device is set, the options are invalid, a
    ///   Fire TV has no API key, or the address does not form a URL
    pub fn build(self) -> Result<Remote> {
        let device = self.validate_device()?;
        self.validate_options(device.vendor())?;

        let remote = match device.vendor() {
            Vendor::Samsung => Remote::Samsung(Session::new(device, self.options)?),
            Vendor::Lg => Remote::Lg(Session::new(device, self.options)?),
            Vendor::FireTv => Remote::FireTv(FireTvSession::new(device, &self.options)?),
            Vendor::Roku => Remote::Roku(RokuSession::new(device, &self.options)?),
        };
        Ok(remote)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl RemoteBuilder {
    /// Validates the device configuration.
    fn validate_device(&self) -> Result<DeviceDescriptor> {
        let device = self.device.clone().ok_or_else(|| {
            Error::config(
                "Device is required. Use .device() to set it.\n\
                 Example: Remote::builder().device(DeviceDescriptor::new(Vendor::Lg, \"TV\", \"192.168.1.31\"))",
            )
        })?;

        let address = device.address().trim();
        if address.is_empty() {
            return Err(Error::config(
                "Device address is empty. Pass the TV's IP address or host name.",
            ));
        }

        let formed = Url::parse(&format!("ws://{address}/"))
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned));
        if formed.is_none() {
            return Err(Error::config(format!(
                "Device address '{address}' does not form a valid URL.\n\
                 Use a bare IP address or host name without scheme or path."
            )));
        }

        if device.vendor() == Vendor::Samsung && device.ipv4().is_err() {
            return Err(Error::config(format!(
                "Samsung TVs are addressed by IPv4, got '{address}'."
            )));
        }

        Ok(device)
    }

    /// Validates options against the vendor.
    fn validate_options(&self, vendor: Vendor) -> Result<()> {
        self.options.validate().map_err(Error::config)?;

        if vendor == Vendor::FireTv
            && self
                .options
                .api_key()
                .is_none_or(|key| key.trim().is_empty())
        {
            return Err(Error::config(
                "Fire TV requires an API key. Use .api_key() to set it.",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::MemoryConnector;

    fn lg() -> DeviceDescriptor {
        DeviceDescriptor::new(Vendor::Lg, "Bedroom", "192.168.1.31")
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = RemoteBuilder::new();
        assert!(builder.device.is_none());
        assert!(builder.options.validate().is_ok());
    }

    #[test]
    fn test_setters_reach_options() {
        let builder = RemoteBuilder::new()
            .app_name("Den")
            .pairing_key("k")
            .pairing_type(PairingType::Pin)
            .auto_subscribe(false)
            .port(3001);

        assert_eq!(builder.options.app_name(), "Den");
        assert_eq!(builder.options.pairing_key(), Some("k"));
        assert_eq!(builder.options.pairing_type(), PairingType::Pin);
        assert!(!builder.options.auto_subscribe());
        assert_eq!(builder.options.port(), Some(3001));
    }

    #[test]
    fn test_build_fails_without_device() {
        let err = RemoteBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Device"));
    }

    #[test]
    fn test_build_fails_with_empty_app_name() {
        let err = RemoteBuilder::new()
            .device(lg())
            .app_name("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("App name"));
    }

    #[test]
    fn test_build_fails_for_fire_tv_without_api_key() {
        let tv = DeviceDescriptor::new(Vendor::FireTv, "Stick", "192.168.1.40");
        let err = RemoteBuilder::new().device(tv).build().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_build_fails_for_unformable_address() {
        let tv = DeviceDescriptor::new(Vendor::Roku, "Den", "bad host/with path");
        assert!(matches!(
            RemoteBuilder::new().device(tv).build(),
            Err(Error::Config { .. })
        ));

        let tv = DeviceDescriptor::new(Vendor::Roku, "Den", "  ");
        assert!(RemoteBuilder::new().device(tv).build().is_err());
    }

    #[test]
    fn test_build_fails_for_samsung_host_name() {
        let tv = DeviceDescriptor::new(Vendor::Samsung, "tv", "samsung.local");
        let err = RemoteBuilder::new().device(tv).build().unwrap_err();
        assert!(err.to_string().contains("IPv4"));
    }

    #[test]
    fn test_build_picks_vendor_variant() {
        let remote = RemoteBuilder::new()
            .device(lg())
            .connector(Arc::new(MemoryConnector::new()))
            .build()
            .expect("lg remote");
        assert!(matches!(remote, Remote::Lg(_)));

        let roku = DeviceDescriptor::new(Vendor::Roku, "Den", "192.168.1.50");
        let remote = RemoteBuilder::new().device(roku).build().expect("roku remote");
        assert_eq!(remote.vendor(), Vendor::Roku);
    }
}
