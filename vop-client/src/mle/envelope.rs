//! Compact JWE encoding and decoding.

use chrono::Utc;
use josekit::jwe::{self, JweHeader};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use super::{CONTENT_ALGORITHM, EnvelopeKey, KEY_ALGORITHM};
use crate::error::{Result, VopError};

/// Header carrying the MLE key id on encrypted requests.
pub const KEY_ID_HEADER: &str = "keyId";

/// Wire body of an encrypted request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Compact JWE token.
    #[serde(rename = "encData")]
    pub enc_data: String,
}

impl EncryptedPayload {
    /// Extracts an encrypted payload from a response body, if it is one.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.len() != 1 {
            return None;
        }
        object.get("encData")?.as_str().map(|token| Self { enc_data: token.to_owned() })
    }
}

/// Encrypts `plaintext` into a compact JWE token.
///
/// The protected header carries `alg`, `enc`, `kid` and `iat` (milliseconds
/// since the epoch). Output differs on every call even for equal input.
///
/// # Errors
///
/// Returns [`VopError::EnvelopeError`] if serialization or encryption fails.
pub fn encode<T: Serialize + ?Sized>(key: &EnvelopeKey, plaintext: &T) -> Result<String> {
    let json = Zeroizing::new(
        serde_json::to_vec(plaintext)
            .map_err(|e| VopError::EnvelopeError(format!("cannot serialize plaintext: {e}")))?,
    );

    let mut header = JweHeader::new();
    header.set_algorithm(KEY_ALGORITHM);
    header.set_content_encryption(CONTENT_ALGORITHM);
    header.set_key_id(key.key_id());
    header
        .set_claim("iat", Some(Value::from(Utc::now().timestamp_millis())))
        .map_err(|e| VopError::EnvelopeError(format!("cannot set iat claim: {e}")))?;

    jwe::serialize_compact(&json, &header, key.encrypter())
        .map_err(|e| VopError::EnvelopeError(format!("JWE encryption failed: {e}")))
}

/// Decrypts a compact JWE token produced for `key`.
///
/// # Errors
///
/// Returns [`VopError::EnvelopeError`] if:
/// - `key` has no decryption key attached
/// - the token is not five dot-separated segments
/// - decryption or tag verification fails
/// - the token's `kid` is not `key`'s id
/// - the plaintext is not JSON
pub fn decode(key: &EnvelopeKey, token: &str) -> Result<Value> {
    let decrypter = key.decrypter().ok_or_else(|| {
        VopError::EnvelopeError(format!("no decryption key for kid {}", key.key_id()))
    })?;

    if token.split('.').count() != 5 {
        return Err(VopError::EnvelopeError("malformed token: expected 5 segments".to_owned()));
    }

    let (plaintext, header) = jwe::deserialize_compact(token, decrypter)
        .map_err(|e| VopError::EnvelopeError(format!("JWE decryption failed: {e}")))?;
    let plaintext = Zeroizing::new(plaintext);

    match header.key_id() {
        Some(kid) if kid == key.key_id() => {}
        other => {
            return Err(VopError::EnvelopeError(format!(
                "key id mismatch: expected {}, got {}",
                key.key_id(),
                other.unwrap_or("<none>")
            )));
        }
    }

    serde_json::from_slice(&plaintext)
        .map_err(|e| VopError::EnvelopeError(format!("decrypted payload is not JSON: {e}")))
}
