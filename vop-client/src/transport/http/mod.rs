//! HTTP transport implementation.
//!
//! Sends [`RequestEnvelope`]s with reqwest over the mutual-TLS client built by
//! [`TransportIdentity`]. Status codes are never treated as errors here.

use reqwest::Client;
use tracing::{debug, dispatcher, instrument};

use crate::{
    config::ClientConfig,
    error::{Result, VopError},
    transport::{RequestEnvelope, Transport, TransportIdentity, TransportResponse},
};

/// Validates header name and value for CRLF injection prevention.
fn validate_header(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || name.contains(['\r', '\n', '\0']) {
        return Err(VopError::ConfigurationError(format!(
            "invalid header name {name:?}: control characters not allowed"
        )));
    }
    if value.contains(['\r', '\n', '\0']) {
        return Err(VopError::ConfigurationError(format!(
            "invalid value for header {name}: control characters not allowed"
        )));
    }
    Ok(())
}

/// reqwest-backed transport.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds the mutual-TLS transport for `config`.
    ///
    /// Events raised while building go to `config.logger` when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if the certificate, key,
    /// passphrase or HTTP settings are unusable.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.http.validate()?;
        let identity = TransportIdentity::build(config)?;
        let build = || identity.into_client(&config.http);
        let client = match &config.logger {
            Some(logger) => dispatcher::with_default(logger, build)?,
            None => build()?,
        };
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    #[instrument(
        skip(self, request),
        fields(
            method = %request.method,
            url = %request.url,
            operation_id = request.operation_id.as_deref(),
        )
    )]
    async fn execute_request(&self, request: &RequestEnvelope) -> Result<TransportResponse> {
        for (name, value) in &request.headers {
            validate_header(name, value)?;
        }

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .basic_auth(&request.auth.username, Some(&request.auth.password));

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_owned()))
            .collect();

        let body = response.bytes().await?.to_vec();
        debug!(status = status.as_u16(), body_len = body.len(), "response received");

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_owned(),
            body,
            headers,
        })
    }
}

impl Transport for HttpTransport {
    async fn send<'a>(&'a self, request: &'a RequestEnvelope) -> Result<TransportResponse> {
        self.execute_request(request).await
    }

    fn protocol_name(&self) -> &'static str {
        "https"
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use reqwest::Method;

    use super::*;
    use crate::transport::BasicAuth;

    #[test]
    fn test_validate_header_valid() {
        assert!(validate_header("Content-Type", "application/json").is_ok());
        assert!(validate_header("keyId", "7f1c-mle").is_ok());
    }

    #[test]
    fn test_validate_header_crlf_injection_blocked() {
        assert!(validate_header("X-Evil\r\n", "value").is_err());
        assert!(validate_header("X-Custom", "value\r\nEvil-Header: injected").is_err());
        assert!(validate_header("X-Evil\0", "value").is_err());
        assert!(validate_header("X-Custom", "value\0evil").is_err());
        assert!(validate_header("", "value").is_err());
    }

    #[tokio::test]
    async fn test_crlf_header_rejected_before_send() {
        let transport = HttpTransport::with_client(Client::new());
        let request = RequestEnvelope::new(
            Method::GET,
            "http://127.0.0.1:9",
            "vdp/helloworld",
            BasicAuth::new("u", "p"),
        )
        .with_header("X-Evil", "a\r\nb");

        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, VopError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = HttpTransport::with_client(Client::new());
        // Port 9 (discard) is closed on loopback in test environments.
        let request = RequestEnvelope::new(
            Method::GET,
            "http://127.0.0.1:9",
            "vdp/helloworld",
            BasicAuth::new("u", "p"),
        );

        let err = transport.send(&request).await.unwrap_err();
        let VopError::TransportError(source) = &err else {
            panic!("expected TransportError, got {err:?}");
        };
        assert!(source.downcast_ref::<reqwest::Error>().is_some());
        assert_eq!(err.status(), None);
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_from_config_logs_to_injected_logger() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let config = ClientConfig::new(
            "https://sandbox.api.visa.com",
            include_str!("../../../tests/fixtures/client_cert.pem"),
            include_str!("../../../tests/fixtures/client_key.pem"),
            "ACMECU",
            "pw",
            "user-1",
        )
        .with_logger(tracing::Dispatch::new(subscriber));

        HttpTransport::from_config(&config).unwrap();

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("host-name verification is disabled"), "{logs}");
    }

    #[test]
    fn test_protocol_name() {
        assert_eq!(HttpTransport::with_client(Client::new()).protocol_name(), "https");
    }
}
