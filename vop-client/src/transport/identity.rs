//! Mutual-TLS identity.
//!
//! Turns the PEM material from [`ClientConfig`] into a `reqwest::Client` that
//! trusts only the configured anchor and presents the client certificate.

use std::fmt;

use pkcs8::{EncryptedPrivateKeyInfo, LineEnding, der::Document};
use reqwest::{Certificate, Client, Identity};
use tracing::warn;
use zeroize::Zeroizing;

use super::HttpConfig;
use crate::{
    config::ClientConfig,
    error::{Result, VopError},
};

const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const PKCS8_LABEL: &str = "PRIVATE KEY";

/// Trust anchor, client certificate and unlocked client key.
///
/// Built once per client. The key is held decrypted in memory and wiped on
/// drop.
pub struct TransportIdentity {
    trust_anchor: String,
    client_cert: String,
    client_key: Zeroizing<String>,
    accept_invalid_hostnames: bool,
}

impl fmt::Debug for TransportIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportIdentity")
            .field("trust_anchor_len", &self.trust_anchor.len())
            .field("client_cert_len", &self.client_cert.len())
            .field("client_key", &"[REDACTED]")
            .field("accept_invalid_hostnames", &self.accept_invalid_hostnames)
            .finish()
    }
}

impl TransportIdentity {
    /// Assembles the identity from configuration.
    ///
    /// An encrypted PKCS#8 key (`ENCRYPTED PRIVATE KEY`) is unlocked with
    /// `config.passphrase`. Unencrypted keys ignore the passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if:
    /// - the trust anchor or client certificate holds no PEM certificate
    /// - the key holds no PEM private key
    /// - the key is a legacy OpenSSL-encrypted key (`Proc-Type: 4,ENCRYPTED`)
    /// - the passphrase does not unlock an encrypted key
    pub fn build(config: &ClientConfig) -> Result<Self> {
        let trust_anchor = config.trust_anchor_pem();
        require_certificate("trustAnchor", trust_anchor)?;
        require_certificate("clientCert", &config.client_cert)?;

        let client_key = unlock_key(&config.client_key, &config.passphrase)?;

        Ok(Self {
            trust_anchor: trust_anchor.to_owned(),
            client_cert: config.client_cert.clone(),
            client_key,
            accept_invalid_hostnames: config.danger_accept_invalid_hostnames,
        })
    }

    /// Returns `true` if server host names are not verified.
    #[must_use]
    pub const fn accepts_invalid_hostnames(&self) -> bool {
        self.accept_invalid_hostnames
    }

    /// Builds the reusable HTTP client.
    ///
    /// Built-in roots are disabled; the server chain must lead to the
    /// configured trust anchor.
    ///
    /// # Errors
    ///
    /// Returns [`VopError::ConfigurationError`] if rustls rejects the
    /// certificate or key material.
    pub fn into_client(&self, http: &HttpConfig) -> Result<Client> {
        let anchor = Certificate::from_pem(self.trust_anchor.as_bytes())
            .map_err(|e| VopError::ConfigurationError(format!("invalid trustAnchor: {e}")))?;

        let mut pem = Zeroizing::new(Vec::with_capacity(
            self.client_cert.len() + self.client_key.len() + 1,
        ));
        pem.extend_from_slice(self.client_cert.as_bytes());
        pem.push(b'\n');
        pem.extend_from_slice(self.client_key.as_bytes());

        let identity = Identity::from_pem(&pem).map_err(|e| {
            VopError::ConfigurationError(format!("invalid clientCert/clientKey pair: {e}"))
        })?;

        if self.accept_invalid_hostnames {
            warn!("server host-name verification is disabled; chain is still checked");
        }

        Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(anchor)
            .identity(identity)
            .danger_accept_invalid_hostnames(self.accept_invalid_hostnames)
            .pool_max_idle_per_host(http.pool_max_idle_per_host)
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout())
            .build()
            .map_err(|e| VopError::ConfigurationError(format!("cannot build TLS client: {e}")))
    }
}

fn require_certificate(field: &str, pem: &str) -> Result<()> {
    if pem.contains("-----BEGIN CERTIFICATE-----") {
        Ok(())
    } else {
        Err(VopError::ConfigurationError(format!("`{field}` is not a PEM certificate")))
    }
}

fn unlock_key(pem: &str, passphrase: &str) -> Result<Zeroizing<String>> {
    if pem.contains("Proc-Type: 4,ENCRYPTED") {
        return Err(VopError::ConfigurationError(
            "`clientKey` uses legacy OpenSSL encryption; convert it to encrypted PKCS#8".to_owned(),
        ));
    }

    if !pem.contains(&format!("-----BEGIN {ENCRYPTED_PKCS8_LABEL}-----")) {
        if !pem.contains("PRIVATE KEY-----") {
            return Err(VopError::ConfigurationError(
                "`clientKey` is not a PEM private key".to_owned(),
            ));
        }
        return Ok(Zeroizing::new(pem.to_owned()));
    }

    let (label, document) = Document::from_pem(pem.trim())
        .map_err(|e| VopError::ConfigurationError(format!("invalid clientKey PEM: {e}")))?;
    if label != ENCRYPTED_PKCS8_LABEL {
        return Err(VopError::ConfigurationError(format!(
            "`clientKey` has unexpected PEM label: {label}"
        )));
    }

    let encrypted = EncryptedPrivateKeyInfo::try_from(document.as_bytes())
        .map_err(|e| VopError::ConfigurationError(format!("invalid encrypted clientKey: {e}")))?;
    let decrypted = encrypted.decrypt(passphrase).map_err(|_| {
        VopError::ConfigurationError("`passphrase` does not unlock `clientKey`".to_owned())
    })?;

    decrypted
        .to_pem(PKCS8_LABEL, LineEnding::LF)
        .map_err(|e| VopError::ConfigurationError(format!("cannot re-encode clientKey: {e}")))
}
