//! License token issuance.

use crate::attributes::LicenseAttributes;
use crate::codec;
use crate::error::{LicenseError, LicenseResult};
use crate::identity::IdentityKeyPair;
use crate::signature;
use crate::verifier::{LicenseVerifier, Verification};
use licensekey_crypto::{derive_passphrase, EnvelopeCipher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An issued license token (base64 envelope text).
///
/// Opaque to storage and transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseToken(String);

impl LicenseToken {
    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for LicenseToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl std::fmt::Display for LicenseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signs and encrypts license attributes.
#[derive(Debug, Clone)]
pub struct LicenseIssuer {
    keypair: Arc<IdentityKeyPair>,
    cipher: EnvelopeCipher,
}

impl LicenseIssuer {
    /// Creates an issuer signing with `keypair`.
    #[must_use]
    pub fn new(keypair: Arc<IdentityKeyPair>, cipher: EnvelopeCipher) -> Self {
        Self { keypair, cipher }
    }

    /// Returns a verifier for the tokens this issuer produces.
    #[must_use]
    pub fn verifier(&self) -> LicenseVerifier {
        LicenseVerifier::new(self.keypair.public_key(), self.cipher.clone())
    }

    /// Issues a token on the current thread.
    ///
    /// # Errors
    ///
    /// Fails only if signing or encryption fails.
    pub fn issue_blocking(&self, attrs: &LicenseAttributes) -> LicenseResult<LicenseToken> {
        let passphrase = derive_passphrase(&attrs.product_id);
        let message = codec::encode_message(attrs);
        let signature = signature::sign(&self.keypair, &attrs.product_id, &message)?;
        let plaintext = codec::append_signature(&message, &signature);
        let token = self.cipher.encrypt(&plaintext, &passphrase)?;

        debug!(product_id = %attrs.product_id, "issued license token");
        Ok(LicenseToken(token))
    }

    /// Issues a token on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Fails if signing or encryption fails, or the worker task dies.
    pub async fn issue(&self, attrs: &LicenseAttributes) -> LicenseResult<LicenseToken> {
        let issuer = self.clone();
        let attrs = attrs.clone();
        tokio::task::spawn_blocking(move || issuer.issue_blocking(&attrs))
            .await
            .map_err(|e| LicenseError::Task(e.to_string()))?
    }

    /// Issues a token and immediately verifies it on the current thread,
    /// logging the outcome.
    ///
    /// Diagnostic only; production issuance uses [`LicenseIssuer::issue`].
    ///
    /// # Errors
    ///
    /// Same as [`LicenseIssuer::issue_blocking`].
    pub fn issue_with_self_check_blocking(
        &self,
        attrs: &LicenseAttributes,
        verifier: &LicenseVerifier,
    ) -> LicenseResult<(LicenseToken, Verification)> {
        let token = self.issue_blocking(attrs)?;
        let verification = verifier.verify_blocking(&attrs.product_id, token.as_str());

        match verification.failure() {
            None => info!(product_id = %attrs.product_id, "self-check: issued token verified"),
            Some(failure) => warn!(
                product_id = %attrs.product_id,
                ?failure,
                "self-check: issued token failed verification"
            ),
        }

        Ok((token, verification))
    }

    /// [`LicenseIssuer::issue_with_self_check_blocking`] on the blocking
    /// thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`LicenseIssuer::issue`].
    pub async fn issue_with_self_check(
        &self,
        attrs: &LicenseAttributes,
        verifier: &LicenseVerifier,
    ) -> LicenseResult<(LicenseToken, Verification)> {
        let issuer = self.clone();
        let attrs = attrs.clone();
        let verifier = verifier.clone();
        tokio::task::spawn_blocking(move || issuer.issue_with_self_check_blocking(&attrs, &verifier))
            .await
            .map_err(|e| LicenseError::Task(e.to_string()))?
    }
}
