//! Message-level encryption (MLE).
//!
//! Visa APIs that require MLE expect the JSON body wrapped in a compact JWE
//! token, sent as `{"encData": "<token>"}` together with a `keyId` header.
//! Tokens use RSA-OAEP-256 to wrap a fresh AES-128-GCM content key, so the
//! payload stays confidential end to end even where TLS is terminated early.
//!
//! # Examples
//!
//! ```no_run
//! use vop_client::mle::{self, EnvelopeKey};
//!
//! # fn example() -> vop_client::error::Result<()> {
//! let server_key = std::fs::read_to_string("mle_server_cert.pem").unwrap_or_default();
//! let client_key = std::fs::read_to_string("mle_private_key.pem").unwrap_or_default();
//!
//! let key = EnvelopeKey::init("8c2f6b7e-mle", &server_key)?.with_decryption_key(&client_key)?;
//!
//! let token = mle::encode(&key, &serde_json::json!({"userKey": "u-1"}))?;
//! assert_eq!(token.split('.').count(), 5);
//! # Ok(())
//! # }
//! ```

mod envelope;
mod key;

pub use envelope::{EncryptedPayload, KEY_ID_HEADER, decode, encode};
pub use key::{CONTENT_ALGORITHM, EnvelopeKey, KEY_ALGORITHM, KeyDescription};
