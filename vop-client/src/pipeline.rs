//! Request pipeline.
//!
//! Every call goes through the same sequence:
//!
//! 1. Resolve the operation id in the catalog (named calls only). Unknown ids
//!    fail here, before a request exists.
//! 2. Check that MLE is initialized if the call or the catalog entry needs it.
//! 3. Build a fresh [`RequestEnvelope`] from the immutable [`RequestDefaults`]
//!    plus the call's own fields, encrypting the body if required.
//! 4. Send it through the [`Transport`]. Transport errors are returned as-is.
//! 5. Inspect the status. 400 and above becomes [`VopError::RemoteError`];
//!    anything else returns the decoded body.
//!
//! Nothing is retried. Logging happens alongside each step and never changes
//! the outcome.

use std::sync::{Arc, OnceLock};

use reqwest::Method;
use serde_json::Value;
use tracing::{
    Dispatch, Instrument as _, Span, debug, error, field, info_span,
    instrument::WithSubscriber as _,
};

use crate::{
    catalog::{Operation, OperationCatalog},
    config::ClientConfig,
    error::{Result, VopError},
    mle::{self, EncryptedPayload, EnvelopeKey, KEY_ID_HEADER},
    transport::{BasicAuth, RequestEnvelope, Transport, TransportResponse, join_url},
};

const APPLICATION_JSON: &str = "application/json";

/// Configuration shared by every call of one client.
///
/// Never modified after construction; each call copies what it needs into its
/// own envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    base_url: String,
    auth: BasicAuth,
    headers: Vec<(String, String)>,
}

impl RequestDefaults {
    /// Creates defaults with JSON `Content-Type` and `Accept` headers.
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: BasicAuth) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            headers: vec![
                ("Content-Type".to_owned(), APPLICATION_JSON.to_owned()),
                ("Accept".to_owned(), APPLICATION_JSON.to_owned()),
            ],
        }
    }

    /// Derives defaults from client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, BasicAuth::new(&config.user_id, &config.passphrase))
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the Basic credentials.
    #[must_use]
    pub const fn auth(&self) -> &BasicAuth {
        &self.auth
    }

    /// Returns the default headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Where a call is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Catalog operation, resolved by id.
    Operation(String),
    /// Direct HTTP call to a path relative to the base URL.
    Raw {
        /// HTTP method.
        method: Method,
        /// Path relative to the base URL.
        path: String,
    },
}

/// Per-call overlay on top of [`RequestDefaults`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    target: Target,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    path_params: Vec<(String, String)>,
    encrypt: bool,
}

impl Call {
    /// Creates a call to a catalog operation.
    #[must_use]
    pub fn operation(operation_id: impl Into<String>) -> Self {
        Self::with_target(Target::Operation(operation_id.into()))
    }

    /// Creates a direct HTTP call.
    #[must_use]
    pub fn raw(method: Method, path: impl Into<String>) -> Self {
        Self::with_target(Target::Raw { method, path: path.into() })
    }

    fn with_target(target: Target) -> Self {
        Self {
            target,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
            path_params: Vec::new(),
            encrypt: false,
        }
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds or overrides a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Supplies a value for a `{name}` placeholder in the operation's path.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    /// Wraps the body in an MLE envelope even if the catalog does not ask for it.
    #[must_use]
    pub const fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    /// Returns the dispatch target.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Returns the operation id for named calls.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        match &self.target {
            Target::Operation(id) => Some(id),
            Target::Raw { .. } => None,
        }
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl From<Operation> for Call {
    fn from(operation: Operation) -> Self {
        Self::operation(operation.as_str())
    }
}

/// Runs calls against one transport with one set of defaults.
///
/// Safe to share between concurrent calls: the defaults and the catalog are
/// read-only and the envelope key can be set only once.
pub struct RequestPipeline<T> {
    defaults: RequestDefaults,
    transport: T,
    catalog: Arc<OperationCatalog>,
    envelope_key: OnceLock<EnvelopeKey>,
    logger: Option<Dispatch>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for RequestPipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("defaults", &self.defaults)
            .field("transport", &self.transport)
            .field("operations", &self.catalog.len())
            .field("envelope_key", &self.envelope_key.get())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl<T: Transport> RequestPipeline<T> {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(defaults: RequestDefaults, transport: T, catalog: Arc<OperationCatalog>) -> Self {
        Self { defaults, transport, catalog, envelope_key: OnceLock::new(), logger: None }
    }

    /// Routes this pipeline's log events to `logger` instead of the global
    /// subscriber.
    #[must_use]
    pub fn with_logger(mut self, logger: Option<Dispatch>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the shared defaults.
    #[must_use]
    pub const fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the operation catalog.
    #[must_use]
    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    /// Returns the MLE key, if initialized.
    #[must_use]
    pub fn envelope_key(&self) -> Option<&EnvelopeKey> {
        self.envelope_key.get()
    }

    /// Initializes MLE from a key id and the server's public key PEM.
    ///
    /// # Errors
    ///
    /// - [`VopError::ConfigurationError`] if an argument is missing or MLE is
    ///   already initialized.
    /// - [`VopError::EnvelopeError`] if the key does not parse.
    pub fn init_mle(&self, key_id: &str, server_key_pem: &str) -> Result<()> {
        self.set_envelope_key(EnvelopeKey::init(key_id, server_key_pem)?)
    }

    /// Installs a prepared MLE key.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if a key is already set. The
    /// key cannot be replaced for the life of the pipeline.
    pub fn set_envelope_key(&self, key: EnvelopeKey) -> Result<()> {
        self.envelope_key.set(key).map_err(|rejected| {
            VopError::ConfigurationError(format!(
                "message-level encryption is already initialized; refusing kid {}",
                rejected.key_id()
            ))
        })
    }

    /// Executes one call.
    ///
    /// # Errors
    ///
    /// - [`VopError::ConfigurationError`] for an unknown operation id, a
    ///   missing path parameter, or an encrypted call without MLE initialized.
    ///   No request is sent in these cases.
    /// - [`VopError::EnvelopeError`] if encrypting the request or decrypting
    ///   the response fails.
    /// - [`VopError::TransportError`] if no response was received.
    /// - [`VopError::RemoteError`] if the response status is 400 or above.
    pub async fn execute(&self, call: Call) -> Result<Value> {
        match &self.logger {
            Some(logger) => self.run(call).with_subscriber(logger.clone()).await,
            None => self.run(call).await,
        }
    }

    async fn run(&self, call: Call) -> Result<Value> {
        let span = info_span!(
            "vop.request",
            operation_id = call.operation_id(),
            method = field::Empty,
            status = field::Empty,
            protocol = self.transport.protocol_name(),
        );
        self.dispatch(call).instrument(span).await
    }

    async fn dispatch(&self, call: Call) -> Result<Value> {
        let (method, url, requires_encryption) = match &call.target {
            Target::Operation(id) => {
                let spec = self.catalog.resolve(id)?;
                let url = spec.bind(&self.defaults.base_url, &call.path_params)?;
                (spec.method.clone(), url, spec.requires_encryption)
            }
            Target::Raw { method, path } => {
                (method.clone(), join_url(&self.defaults.base_url, path), false)
            }
        };

        let key = if call.encrypt || requires_encryption {
            Some(self.envelope_key.get().ok_or_else(|| {
                VopError::ConfigurationError(format!(
                    "{} requires message-level encryption; call init_mle first",
                    call.operation_id().unwrap_or(url.as_str())
                ))
            })?)
        } else {
            None
        };

        let envelope = self.build_envelope(method, url, call, key)?;
        Span::current().record("method", envelope.method.as_str());

        debug!(
            operation_id = envelope.operation_id.as_deref(),
            request = %envelope.redacted(),
            "dispatching request"
        );

        let response = self.transport.send(&envelope).await?;
        let data = decode_body(&response);
        Span::current().record("status", response.status);

        debug!(status = response.status, data = %data, "response received");

        if response.status >= 400 {
            error!(
                operation_id = envelope.operation_id.as_deref(),
                request = %envelope.redacted(),
                status = response.status,
                status_text = %response.status_text,
                response_headers = ?response.headers,
                response = %data,
                "request failed"
            );
            return Err(VopError::remote(response.status, response.status_text, data));
        }

        match (key, EncryptedPayload::from_value(&data)) {
            (Some(key), Some(payload)) if key.can_decrypt() => mle::decode(key, &payload.enc_data),
            _ => Ok(data),
        }
    }

    fn build_envelope(
        &self,
        method: Method,
        url: String,
        call: Call,
        key: Option<&EnvelopeKey>,
    ) -> Result<RequestEnvelope> {
        let Call { target, body, headers, query, .. } = call;

        let mut envelope = RequestEnvelope {
            method,
            base_url: self.defaults.base_url.clone(),
            url,
            headers: self.defaults.headers.clone(),
            params: query,
            auth: self.defaults.auth.clone(),
            body: None,
            operation_id: match target {
                Target::Operation(id) => Some(id),
                Target::Raw { .. } => None,
            },
        };

        for (name, value) in headers {
            envelope = envelope.with_header(name, value);
        }

        envelope.body = match (key, body) {
            (Some(key), Some(body)) => {
                envelope = envelope.with_header(KEY_ID_HEADER, key.key_id());
                let payload = EncryptedPayload { enc_data: mle::encode(key, &body)? };
                Some(serde_json::to_value(payload).map_err(|e| {
                    VopError::EnvelopeError(format!("cannot serialize encrypted payload: {e}"))
                })?)
            }
            (Some(key), None) => {
                envelope = envelope.with_header(KEY_ID_HEADER, key.key_id());
                None
            }
            (None, body) => body,
        };

        Ok(envelope)
    }
}

/// Decodes a response body: empty is `null`, JSON is parsed, anything else is
/// returned as a string.
fn decode_body(response: &TransportResponse) -> Value {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(&response.body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&response.body).into_owned()))
}
