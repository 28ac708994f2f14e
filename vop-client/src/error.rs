//! Error types for the VOP client.
//!
//! Every fallible operation in this crate returns [`VopError`]. The four
//! variants separate failures by where they happen, which also decides who
//! has to act on them:
//!
//! - **Configuration** ([`VopError::ConfigurationError`]): raised before any
//!   network I/O. Missing constructor fields, missing MLE arguments, unknown
//!   operation ids. Always a caller bug.
//! - **Remote** ([`VopError::RemoteError`]): the service answered with a status
//!   of 400 or above. Carries the status, status text and raw body.
//! - **Transport** ([`VopError::TransportError`]): anything below HTTP (DNS, TLS
//!   handshake, timeout, reset). The underlying error is kept as-is.
//! - **Envelope** ([`VopError::EnvelopeError`]): key parsing, encryption or
//!   decryption of message-level encryption tokens.
//!
//! # Examples
//!
//! ```
//! use vop_client::error::{Result, VopError};
//!
//! fn require(name: &str, value: &str) -> Result<()> {
//!     if value.is_empty() {
//!         return Err(VopError::ConfigurationError(format!("`{name}` is required")));
//!     }
//!     Ok(())
//! }
//!
//! let err = require("userId", "").unwrap_err();
//! assert_eq!(err.status(), None);
//! assert!(err.to_string().contains("userId"));
//! ```

use serde_json::Value;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, VopError>;

/// Boxed error produced by a [`Transport`](crate::transport::Transport) implementation.
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while talking to the VOP API.
///
/// The pipeline never retries. [`VopError::is_retryable`] is a hint for callers
/// that own their own retry policy.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum VopError {
    /// Invalid setup or input, detected before any request was built.
    ///
    /// The message names the offending field, argument or operation id.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The remote service responded with a failure status (400 or above).
    ///
    /// `message` is the JSON text `{"status","statusText","data"}` so the full
    /// remote answer survives when the error is only logged as a string.
    #[error("remote service error {status}: {message}")]
    RemoteError {
        /// HTTP status code.
        status: u16,
        /// Reason phrase for the status.
        status_text: String,
        /// Decoded response body (JSON if it parsed, otherwise a string).
        body: Value,
        /// Serialized `{status, statusText, data}` payload.
        message: String,
    },

    /// Failure below the HTTP layer.
    ///
    /// The source is the transport's own error. For [`HttpTransport`] that is a
    /// [`reqwest::Error`], which can be recovered with
    /// [`downcast_ref`](std::error::Error::downcast_ref).
    ///
    /// [`HttpTransport`]: crate::transport::HttpTransport
    #[error("transport error: {0}")]
    TransportError(#[source] TransportSource),

    /// Message-level encryption failed.
    ///
    /// Covers malformed key material, serialization of the plaintext,
    /// encryption, and decryption (bad tag, wrong key id, unparsable token).
    #[error("envelope error: {0}")]
    EnvelopeError(String),
}

impl VopError {
    /// Builds a [`VopError::RemoteError`] from a received response.
    pub fn remote(status: u16, status_text: impl Into<String>, body: Value) -> Self {
        let status_text = status_text.into();
        let message = serde_json::json!({
            "status": status,
            "statusText": status_text,
            "data": body,
        })
        .to_string();
        Self::RemoteError { status, status_text, body, message }
    }

    /// Returns the remote status code.
    ///
    /// `None` means the call failed before a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if retrying the same call might succeed.
    ///
    /// Server errors, throttling and transport failures are retryable. Client
    /// errors, configuration and envelope failures are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteError { status, .. } => *status >= 500 || *status == 429,
            Self::TransportError(_) => true,
            Self::ConfigurationError(_) | Self::EnvelopeError(_) => false,
        }
    }
}

impl From<reqwest::Error> for VopError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(Box::new(err))
    }
}
