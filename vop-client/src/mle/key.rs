//! MLE key material.

use std::fmt;

use josekit::jwe::{
    RSA_OAEP_256,
    alg::rsaes::{RsaesJweDecrypter, RsaesJweEncrypter},
};
use serde::Serialize;

use crate::error::{Result, VopError};

/// Key-wrapping algorithm for every MLE token.
pub const KEY_ALGORITHM: &str = "RSA-OAEP-256";

/// Content-encryption algorithm for every MLE token.
pub const CONTENT_ALGORITHM: &str = "A128GCM";

/// Declared description of an MLE key.
///
/// Fixed to RSA-OAEP-256 key wrapping and AES-128-GCM content encryption,
/// usable only for `wrapKey` and `encrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyDescription {
    /// Key type.
    pub kty: &'static str,
    /// Key identifier.
    pub kid: String,
    /// Key-wrapping algorithm.
    pub alg: &'static str,
    /// Content-encryption algorithm.
    pub enc: &'static str,
    /// Permitted operations.
    pub key_ops: [&'static str; 2],
}

/// Server MLE key, optionally paired with the client's private key.
///
/// Created by [`EnvelopeKey::init`] and never modified afterwards except to
/// attach a decryption key before it is handed to a client.
pub struct EnvelopeKey {
    key_id: String,
    encrypter: RsaesJweEncrypter,
    decrypter: Option<RsaesJweDecrypter>,
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("key_id", &self.key_id)
            .field("alg", &KEY_ALGORITHM)
            .field("enc", &CONTENT_ALGORITHM)
            .field("can_decrypt", &self.decrypter.is_some())
            .finish()
    }
}

impl EnvelopeKey {
    /// Initializes the key from the MLE key id and the server's public key.
    ///
    /// # Errors
    ///
    /// - [`VopError::ConfigurationError`] naming `keyId` or `serverKey` if
    ///   either is empty. Nothing is parsed in that case.
    /// - [`VopError::EnvelopeError`] if `server_key_pem` is not an RSA key.
    ///
    /// # Examples
    ///
    /// ```
    /// use vop_client::{error::VopError, mle::EnvelopeKey};
    ///
    /// let err = EnvelopeKey::init("", "-----BEGIN PUBLIC KEY-----").unwrap_err();
    /// assert!(matches!(err, VopError::ConfigurationError(ref m) if m.contains("keyId")));
    ///
    /// let err = EnvelopeKey::init("mle-key-1", "").unwrap_err();
    /// assert!(matches!(err, VopError::ConfigurationError(ref m) if m.contains("serverKey")));
    /// ```
    pub fn init(key_id: &str, server_key_pem: &str) -> Result<Self> {
        if key_id.trim().is_empty() {
            return Err(VopError::ConfigurationError("`keyId` is required".to_owned()));
        }
        if server_key_pem.trim().is_empty() {
            return Err(VopError::ConfigurationError("`serverKey` is required".to_owned()));
        }

        let encrypter = RSA_OAEP_256.encrypter_from_pem(server_key_pem).map_err(|e| {
            VopError::EnvelopeError(format!("failed to load MLE server key: {e}"))
        })?;

        Ok(Self { key_id: key_id.to_owned(), encrypter, decrypter: None })
    }

    /// Attaches the client's MLE private key so inbound tokens can be decoded.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::EnvelopeError`] if the PEM is not an RSA private key.
    pub fn with_decryption_key(mut self, private_key_pem: &str) -> Result<Self> {
        let decrypter = RSA_OAEP_256.decrypter_from_pem(private_key_pem).map_err(|e| {
            VopError::EnvelopeError(format!("failed to load MLE private key: {e}"))
        })?;
        self.decrypter = Some(decrypter);
        Ok(self)
    }

    /// Returns the key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns `true` if a decryption key is attached.
    #[must_use]
    pub const fn can_decrypt(&self) -> bool {
        self.decrypter.is_some()
    }

    /// Returns the declared key description.
    #[must_use]
    pub fn description(&self) -> KeyDescription {
        KeyDescription {
            kty: "RSA",
            kid: self.key_id.clone(),
            alg: KEY_ALGORITHM,
            enc: CONTENT_ALGORITHM,
            key_ops: ["wrapKey", "encrypt"],
        }
    }

    pub(crate) const fn encrypter(&self) -> &RsaesJweEncrypter {
        &self.encrypter
    }

    pub(crate) const fn decrypter(&self) -> Option<&RsaesJweDecrypter> {
        self.decrypter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC: &str = include_str!("../../tests/fixtures/mle_public_key.pem");
    const PRIVATE: &str = include_str!("../../tests/fixtures/mle_private_key.pem");

    #[test]
    fn test_init_requires_key_id_first() {
        let err = EnvelopeKey::init("", "").unwrap_err();
        assert!(err.to_string().contains("keyId"));
    }

    #[test]
    fn test_init_requires_server_key() {
        let err = EnvelopeKey::init("kid-1", "  ").unwrap_err();
        assert!(matches!(err, VopError::ConfigurationError(_)));
        assert!(err.to_string().contains("serverKey"));
    }

    #[test]
    fn test_init_rejects_garbage_pem() {
        let err = EnvelopeKey::init("kid-1", "not a key").unwrap_err();
        assert!(matches!(err, VopError::EnvelopeError(_)));
    }

    #[test]
    fn test_init_and_describe() {
        let key = EnvelopeKey::init("kid-1", PUBLIC).unwrap();
        assert_eq!(key.key_id(), "kid-1");
        assert!(!key.can_decrypt());

        let description = serde_json::to_value(key.description()).unwrap();
        assert_eq!(
            description,
            serde_json::json!({
                "kty": "RSA",
                "kid": "kid-1",
                "alg": "RSA-OAEP-256",
                "enc": "A128GCM",
                "key_ops": ["wrapKey", "encrypt"],
            })
        );
    }

    #[test]
    fn test_with_decryption_key() {
        let key = EnvelopeKey::init("kid-1", PUBLIC).unwrap().with_decryption_key(PRIVATE).unwrap();
        assert!(key.can_decrypt());
        assert!(format!("{key:?}").contains("can_decrypt: true"));
    }

    #[test]
    fn test_with_decryption_key_rejects_garbage() {
        let result = EnvelopeKey::init("kid-1", PUBLIC).unwrap().with_decryption_key("garbage");
        assert!(matches!(result, Err(VopError::EnvelopeError(_))));
    }
}
