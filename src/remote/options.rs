//! Session configuration.
//!
//! # Example
//!
//! ```ignore
//! use tv_remote::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_app_name("Living Room Remote")
//!     .with_pairing_key(stored_token)
//!     .with_auto_subscribe(false);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::http::HttpExecutor;
use crate::protocol::lg::PairingType;
use crate::transport::{Connector, TrustEvaluator};

// ============================================================================
// Constants
// ============================================================================

/// App name shown on the TV when none is configured.
pub const DEFAULT_APP_NAME: &str = "TV Remote";

// ============================================================================
// SessionOptions
// ============================================================================

/// Options shared by every vendor session.
///
/// Fields a vendor has no use for are ignored by it.
#[derive(Clone)]
pub struct SessionOptions {
    app_name: Cow<'static, str>,
    pairing_key: Option<String>,
    pairing_type: PairingType,
    auto_subscribe: bool,
    trust_evaluator: Option<Arc<dyn TrustEvaluator>>,
    api_key: Option<String>,
    port: Option<u16>,
    connector: Option<Arc<dyn Connector>>,
    http_executor: Option<Arc<dyn HttpExecutor>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("app_name", &self.app_name)
            .field("has_pairing_key", &self.pairing_key.is_some())
            .field("pairing_type", &self.pairing_type)
            .field("auto_subscribe", &self.auto_subscribe)
            .field("trust_evaluator", &self.trust_evaluator)
            .field("has_api_key", &self.api_key.is_some())
            .field("port", &self.port)
            .field("custom_connector", &self.connector.is_some())
            .field("custom_http_executor", &self.http_executor.is_some())
            .finish()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            app_name: Cow::Borrowed(DEFAULT_APP_NAME),
            pairing_key: None,
            pairing_type: PairingType::Prompt,
            auto_subscribe: true,
            trust_evaluator: None,
            api_key: None,
            port: None,
            connector: None,
            http_executor: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the app name shown in the TV's pairing prompt.
    #[inline]
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets a pairing token from an earlier session.
    #[inline]
    #[must_use]
    pub fn with_pairing_key(mut self, key: impl Into<String>) -> Self {
        self.pairing_key = Some(key.into());
        self
    }

    /// Sets how an LG TV confirms pairing.
    #[inline]
    #[must_use]
    pub fn with_pairing_type(mut self, pairing_type: PairingType) -> Self {
        self.pairing_type = pairing_type;
        self
    }

    /// Enables or disables the app list request and volume subscription
    /// sent after LG registration.
    #[inline]
    #[must_use]
    pub fn with_auto_subscribe(mut self, enabled: bool) -> Self {
        self.auto_subscribe = enabled;
        self
    }

    /// Sets the certificate trust policy.
    #[inline]
    #[must_use]
    pub fn with_trust_evaluator(mut self, evaluator: Arc<dyn TrustEvaluator>) -> Self {
        self.trust_evaluator = Some(evaluator);
        self
    }

    /// Sets the Fire TV API key.
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the vendor's default port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Uses a custom socket connector.
    #[inline]
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Uses a custom HTTP executor.
    #[inline]
    #[must_use]
    pub fn with_http_executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.http_executor = Some(executor);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl SessionOptions {
    /// App name shown on the TV.
    #[inline]
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Stored pairing token.
    #[inline]
    #[must_use]
    pub fn pairing_key(&self) -> Option<&str> {
        self.pairing_key.as_deref()
    }

    /// LG pairing type.
    #[inline]
    #[must_use]
    pub const fn pairing_type(&self) -> PairingType {
        self.pairing_type
    }

    /// Whether LG follow-up subscriptions are sent.
    #[inline]
    #[must_use]
    pub const fn auto_subscribe(&self) -> bool {
        self.auto_subscribe
    }

    /// Configured trust policy.
    #[inline]
    #[must_use]
    pub fn trust_evaluator(&self) -> Option<Arc<dyn TrustEvaluator>> {
        self.trust_evaluator.clone()
    }

    /// Fire TV API key.
    #[inline]
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Port override.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Custom connector.
    #[inline]
    #[must_use]
    pub fn connector(&self) -> Option<Arc<dyn Connector>> {
        self.connector.clone()
    }

    /// Custom HTTP executor.
    #[inline]
    #[must_use]
    pub fn http_executor(&self) -> Option<Arc<dyn HttpExecutor>> {
        self.http_executor.clone()
    }

    /// Validates settings every vendor depends on.
    ///
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_name.trim().is_empty() {
            return Err("App name must not be empty".to_string());
        }
        if self.port == Some(0) {
            return Err("Port must be greater than zero".to_string());
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

    use crate::transport::{MemoryConnector, TrustAll};

    #[test]
    fn test_defaults() {
        let options = SessionOptions::new();
        assert_eq!(options.app_name(), DEFAULT_APP_NAME);
        assert_eq!(options.pairing_type(), PairingType::Prompt);
        assert!(options.auto_subscribe());
        assert!(options.pairing_key().is_none());
        assert!(options.trust_evaluator().is_none());
        assert!(options.connector().is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = SessionOptions::new()
            .with_app_name(String::from("Den"))
            .with_pairing_key("abc")
            .with_pairing_type(PairingType::Pin)
            .with_auto_subscribe(false)
            .with_trust_evaluator(Arc::new(TrustAll))
            .with_port(3000)
            .with_connector(Arc::new(MemoryConnector::new()));

        assert_eq!(options.app_name(), "Den");
        assert_eq!(options.pairing_key(), Some("abc"));
        assert_eq!(options.pairing_type(), PairingType::Pin);
        assert!(!options.auto_subscribe());
        assert!(options.trust_evaluator().is_some());
        assert_eq!(options.port(), Some(3000));
        assert!(options.connector().is_some());
    }

    #[test]
    fn test_validate() {
        assert!(SessionOptions::new().with_app_name(" ").validate().is_err());
        assert!(SessionOptions::new().with_port(0).validate().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", SessionOptions::new().with_api_key("secret"));
        assert!(!debug.contains("secret"));
    }
}
