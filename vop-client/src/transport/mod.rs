//! Transport layer.
//!
//! The pipeline hands a fully built [`RequestEnvelope`] to a [`Transport`] and
//! gets a [`TransportResponse`] back. A transport only fails for problems below
//! HTTP; any status code, including 4xx and 5xx, comes back as a response so
//! the pipeline can inspect it.
//!
//! - [`TransportIdentity`] assembles the mutual-TLS material into a reusable
//!   `reqwest::Client`.
//! - [`HttpTransport`] sends envelopes over that client.
//!
//! The trait is open so callers and tests can supply their own transport.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vop_client::{
//!     config::ClientConfig,
//!     transport::{BasicAuth, HttpTransport, RequestEnvelope, Transport},
//! };
//!
//! # async fn example(config: ClientConfig) -> vop_client::error::Result<()> {
//! let transport = HttpTransport::from_config(&config)?;
//!
//! let envelope = RequestEnvelope::new(
//!     reqwest::Method::GET,
//!     &config.base_url,
//!     "vdp/helloworld",
//!     BasicAuth::new(&config.user_id, &config.passphrase),
//! );
//!
//! let response = transport.send(&envelope).await?;
//! println!("Status: {} {}", response.status, response.status_text);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::{fmt, sync::Arc};

use reqwest::Method;
use serde_json::Value;

use crate::error::Result;

pub mod config;
pub mod http;
pub mod identity;

pub use config::HttpConfig;
pub use http::HttpTransport;
pub use identity::TransportIdentity;

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// User id.
    pub username: String,
    /// Password.
    pub password: String,
}

impl BasicAuth {
    /// Creates Basic credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// One fully merged outbound request.
///
/// Built fresh for every call from the client's defaults plus the per-call
/// overlay, then dropped once the call completes.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    /// HTTP method.
    pub method: Method,
    /// Base URL the path was joined onto.
    pub base_url: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers in send order.
    pub headers: Vec<(String, String)>,
    /// Query parameters in send order.
    pub params: Vec<(String, String)>,
    /// Basic credentials.
    pub auth: BasicAuth,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Catalog operation id, when dispatched by name.
    pub operation_id: Option<String>,
}

impl RequestEnvelope {
    /// Creates an envelope for `path` relative to `base_url`.
    #[must_use]
    pub fn new(method: Method, base_url: &str, path: &str, auth: BasicAuth) -> Self {
        Self {
            method,
            base_url: base_url.to_owned(),
            url: join_url(base_url, path),
            headers: Vec::new(),
            params: Vec::new(),
            auth,
            body: None,
            operation_id: None,
        }
    }

    /// Sets a header, replacing an existing one with the same name
    /// (case-insensitive).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Records the catalog operation id.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Returns the header value for `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the loggable view of this request.
    ///
    /// Restricted to `baseURL`, `url`, `method`, `headers`, `params` and
    /// `data`; credentials never appear in it.
    #[must_use]
    pub fn redacted(&self) -> Value {
        let pairs = |items: &[(String, String)]| {
            items
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<serde_json::Map<_, _>>()
        };

        serde_json::json!({
            "baseURL": self.base_url,
            "url": self.url,
            "method": self.method.as_str(),
            "headers": pairs(&self.headers),
            "params": pairs(&self.params),
            "data": self.body,
        })
    }
}

/// Joins a relative path onto a base URL with exactly one slash between them.
#[must_use]
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Response from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase for the status.
    pub status_text: String,
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl TransportResponse {
    /// Creates a response with a JSON body.
    #[must_use]
    pub fn json(status: u16, status_text: impl Into<String>, body: &Value) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.to_string().into_bytes(),
            headers: vec![("content-type".to_owned(), "application/json".to_owned())],
        }
    }
}

/// Sends request envelopes to the remote service.
///
/// Implementations must not fail on HTTP status. Errors are reserved for
/// connection, TLS, timeout and similar failures, reported as
/// [`VopError::TransportError`](crate::error::VopError::TransportError).
pub trait Transport: Send + Sync {
    /// Sends one request and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::TransportError`](crate::error::VopError::TransportError)
    /// if no response was received.
    fn send<'a>(
        &'a self,
        request: &'a RequestEnvelope,
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a;

    /// Returns the protocol name for logging.
    fn protocol_name(&self) -> &'static str;
}

impl<T: Transport> Transport for Arc<T> {
    fn send<'a>(
        &'a self,
        request: &'a RequestEnvelope,
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a {
        (**self).send(request)
    }

    fn protocol_name(&self) -> &'static str {
        (**self).protocol_name()
    }
}
