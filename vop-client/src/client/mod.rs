//! Client facade.
//!
//! [`VopClient`] exposes one method per user operation. Each method assembles
//! the request body and hands it to the [`RequestPipeline`]; none of them
//! branch on anything else.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vop_client::{client::VopClient, config::ClientConfig};
//!
//! # async fn example() -> vop_client::error::Result<()> {
//! let client = VopClient::new(ClientConfig::from_env())?;
//!
//! let hello = client.hello_world().await?;
//! println!("{}", hello["message"]);
//!
//! let card = serde_json::json!({ "cardNumber": "4111111111111111" });
//! client.enroll_user("user-123", card).await?;
//! let record = client.get_user("user-123").await?;
//! println!("{record:#}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::{
    catalog::{Operation, OperationCatalog},
    config::ClientConfig,
    error::Result,
    mle::EnvelopeKey,
    pipeline::{Call, RequestDefaults, RequestPipeline},
    transport::{HttpTransport, Transport},
};

mod payload;

pub use payload::{COMMUNITY_TERMS_VERSION, CorrelationId};

/// Path of the connectivity check endpoint.
pub const HELLO_WORLD_PATH: &str = "vdp/helloworld";

/// Visa Offers Platform user API client.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and calls do not
/// interfere with each other.
#[derive(Debug)]
pub struct VopClient<T = HttpTransport> {
    community_code: String,
    pipeline: RequestPipeline<T>,
}

impl VopClient<HttpTransport> {
    /// Creates a client over mutual TLS with the bundled operation catalog.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`](crate::error::VopError::ConfigurationError)
    /// if a required field is missing or the TLS material is unusable. No
    /// network activity happens here.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        let catalog = Arc::new(OperationCatalog::bundled()?);
        Self::with_transport(config, transport, catalog)
    }
}

impl<T: Transport> VopClient<T> {
    /// Creates a client over any transport and catalog.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`](crate::error::VopError::ConfigurationError)
    /// if a required field is missing.
    pub fn with_transport(
        config: ClientConfig,
        transport: T,
        catalog: Arc<OperationCatalog>,
    ) -> Result<Self> {
        config.validate()?;

        let defaults = RequestDefaults::from_config(&config);
        let pipeline = RequestPipeline::new(defaults, transport, catalog).with_logger(config.logger);

        Ok(Self { community_code: config.community_code, pipeline })
    }

    /// Initializes message-level encryption.
    ///
    /// # Errors
    ///
    /// - [`VopError::ConfigurationError`](crate::error::VopError::ConfigurationError)
    ///   naming `keyId` or `serverKey` if one is missing, or if MLE is already
    ///   initialized.
    /// - [`VopError::EnvelopeError`](crate::error::VopError::EnvelopeError) if
    ///   the server key does not parse.
    pub fn init_mle(&self, key_id: &str, server_key: &str) -> Result<()> {
        self.pipeline.init_mle(key_id, server_key)
    }

    /// Installs a prepared MLE key, e.g. one with a decryption key attached.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`](crate::error::VopError::ConfigurationError)
    /// if MLE is already initialized.
    pub fn set_envelope_key(&self, key: EnvelopeKey) -> Result<()> {
        self.pipeline.set_envelope_key(key)
    }

    /// Returns the underlying pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &RequestPipeline<T> {
        &self.pipeline
    }

    /// Returns the community code sent with every business call.
    #[must_use]
    pub fn community_code(&self) -> &str {
        &self.community_code
    }

    /// Runs an arbitrary call through the pipeline.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn execute(&self, call: Call) -> Result<Value> {
        self.pipeline.execute(call).await
    }

    /// Adds a card to an enrolled user.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn add_card(&self, user_key: &str, card: Value) -> Result<Value> {
        let body = payload::add_card(&self.community_code, user_key, card);
        self.execute(Call::from(Operation::AddCard).with_body(body)).await
    }

    /// Removes a card from an enrolled user.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn delete_card(&self, user_key: &str, card_id: &str) -> Result<Value> {
        let body = payload::delete_card(&self.community_code, user_key, card_id);
        self.execute(Call::from(Operation::DeleteCard).with_body(body)).await
    }

    /// Enrolls a user with one card.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn enroll_user(&self, user_key: &str, card: Value) -> Result<Value> {
        let body = payload::enroll(&self.community_code, user_key, card);
        self.execute(Call::from(Operation::EnrollUser).with_body(body)).await
    }

    /// Fetches a user's enrollment record.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn get_user(&self, user_key: &str) -> Result<Value> {
        let body = payload::user(&self.community_code, user_key);
        self.execute(Call::from(Operation::GetUser).with_body(body)).await
    }

    /// Unenrolls a user.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn unenroll_user(&self, user_key: &str) -> Result<Value> {
        let body = payload::user(&self.community_code, user_key);
        self.execute(Call::from(Operation::UnenrollUser).with_body(body)).await
    }

    /// Calls the connectivity check endpoint.
    ///
    /// Answers `{"message": "helloworld", "timestamp": "..."}` when the
    /// credentials and certificates are accepted.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn hello_world(&self) -> Result<Value> {
        self.execute(Call::raw(Method::GET, HELLO_WORLD_PATH)).await
    }
}
