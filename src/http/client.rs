//! HTTP executor seam.
//!
//! Fire TV and Roku sessions build [`HttpRequest`]s and hand them to an
//! [`HttpExecutor`]. Production uses [`ReqwestExecutor`]; tests plug in a
//! recorder.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};
use crate::remote::SessionOptions;
use crate::transport::TrustEvaluator;
use crate::transport::tls;

// ============================================================================
// Request / Response
// ============================================================================

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// One outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<String>,
}

impl HttpRequest {
    /// Creates a `GET` request.
    #[inline]
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a `POST` request without a body.
    #[inline]
    #[must_use]
    pub fn post(url: Url) -> Self {
        Self {
            method: Method::Post,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    #[inline]
    #[must_use]
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response status and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[inline]
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for a 2xx status.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails with [`Error::HttpStatus`] unless the status is 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpStatus`] for a non-2xx status.
    pub fn ensure_success(self, url: &Url) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::http_status(self.status, url.as_str()))
        }
    }
}

// ============================================================================
// HttpExecutor
// ============================================================================

/// Executes HTTP requests.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

// ============================================================================
// ReqwestExecutor
// ============================================================================

/// [`HttpExecutor`] backed by reqwest with the crate's TLS trust policy.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    /// Creates an executor trusting certificates through `evaluator`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration or client cannot be built.
    pub fn new(evaluator: Option<Arc<dyn TrustEvaluator>>) -> Result<Self> {
        let config = tls::client_config(tls::resolve_evaluator(evaluator))?;
        let client = reqwest::Client::builder()
            .use_preconfigured_tls((*config).clone())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[inline]
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        trace!(method = %request.method, url = %request.url, "HTTP request");

        let mut builder = match request.method {
            Method::Get => self.client.get(request.url),
            Method::Post => self.client.post(request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Executor configured in `options`, or a [`ReqwestExecutor`] using its
/// trust evaluator.
///
/// # Errors
///
/// Returns an error if the default client cannot be built.
pub(crate) fn resolve_executor(options: &SessionOptions) -> Result<Arc<dyn HttpExecutor>> {
    match options.http_executor() {
        Some(executor) => Ok(executor),
        None => Ok(Arc::new(ReqwestExecutor::new(options.trust_evaluator())?)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://10.0.0.3:8060/keypress/Home").expect("url")
    }

    #[test]
    fn test_request_builders() {
        let request = HttpRequest::post(url())
            .with_header("X-Api-Key", "0987654321")
            .with_json(&serde_json::json!({ "pin": "1234" }));

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.header("x-api-key"), Some("0987654321"));
        assert_eq!(request.body.as_deref(), Some(r#"{"pin":"1234"}"#));
        assert_eq!(HttpRequest::get(url()).header("x-api-key"), None);
    }

    #[test]
    fn test_ensure_success() {
        assert!(HttpResponse::new(204, "").ensure_success(&url()).is_ok());
        assert!(matches!(
            HttpResponse::new(403, "").ensure_success(&url()),
            Err(Error::HttpStatus { status: 403, .. })
        ));
    }

    #[test]
    fn test_reqwest_executor_builds() {
        assert!(ReqwestExecutor::new(None).is_ok());
    }
}
