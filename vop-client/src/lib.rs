//! Visa Offers Platform client.
//!
//! A typed client for the Visa Offers Platform (VOP) user API: enroll a user,
//! add or remove cards, fetch an enrollment record, and unenroll. Every call
//! goes over mutual TLS with Basic credentials, and bodies can optionally be
//! wrapped in a message-level encryption (MLE) envelope.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   VopClient     │  one method per user operation
//! └────────┬────────┘
//!          │ Call (operation id + body)
//! ┌────────▼──────────────────────────────────────┐
//! │              RequestPipeline                  │
//! │  ┌───────────────┐      ┌──────────────────┐  │
//! │  │ Operation     │──────│  MLE envelope    │  │
//! │  │ catalog       │      │  (RSA-OAEP-256 + │  │
//! │  │ (OpenAPI)     │      │   A128GCM)       │  │
//! │  └───────────────┘      └──────────────────┘  │
//! └────────┬──────────────────────────────────────┘
//!          │ RequestEnvelope
//! ┌────────▼────────┐
//! │  Transport      │  mutual TLS + Basic auth
//! └────────┬────────┘
//!          │ HTTPS
//! ┌────────▼────────┐
//! │ Visa payment    │
//! │ network API     │
//! └─────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vop_client::{VopClient, config::ClientConfig};
//!
//! # async fn example() -> vop_client::Result<()> {
//! let config = ClientConfig::from_file("vop.toml")?;
//! let client = VopClient::new(config)?;
//!
//! let hello = client.hello_world().await?;
//! println!("{hello}");
//!
//! let card = serde_json::json!({ "cardNumber": "4111111111111111" });
//! let enrolled = client.enroll_user("user-123", card).await?;
//! println!("{enrolled:#}");
//! # Ok(())
//! # }
//! ```
//!
//! # Message-Level Encryption
//!
//! MLE is off until [`VopClient::init_mle`] is called with the key id and the
//! server's public key. Operations flagged in the catalog, and calls built
//! with [`Call::encrypted`](pipeline::Call::encrypted), are then sent as
//! `{"encData": "<compact JWE>"}` with a `keyId` header. Such calls fail with
//! a configuration error, without touching the network, while MLE is off.
//!
//! # Module Organization
//!
//! - [`client`]: the facade
//! - [`pipeline`]: request assembly, dispatch and status handling
//! - [`catalog`]: `operationId` to method and path
//! - [`mle`]: JWE envelope
//! - [`transport`]: transport abstraction and the mutual TLS implementation
//! - [`config`]: client configuration
//! - [`error`]: error types
//!
//! # Error Handling
//!
//! All operations return [`Result<T, VopError>`](error::Result):
//!
//! ```rust,no_run
//! use vop_client::{VopClient, VopError};
//!
//! # async fn example(client: VopClient) {
//! match client.get_user("user-123").await {
//!     Ok(record) => println!("{record}"),
//!     Err(VopError::RemoteError { status, body, .. }) => {
//!         eprintln!("rejected with {status}: {body}");
//!     }
//!     Err(e) if e.is_retryable() => eprintln!("try again later: {e}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from josekit and reqwest"
)]

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod mle;
pub mod pipeline;
pub mod transport;

pub use client::VopClient;
pub use config::ClientConfig;
pub use error::{Result, VopError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = std::marker::PhantomData::<VopClient>;
        let _ = std::marker::PhantomData::<VopError>;
    }
}
