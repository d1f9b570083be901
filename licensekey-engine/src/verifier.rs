//! License token verification.

use crate::attributes::LicenseAttributes;
use crate::codec;
use crate::error::{LicenseError, LicenseResult};
use crate::identity::PublicKey;
use crate::signature;
use licensekey_crypto::{derive_passphrase, EnvelopeCipher};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The stage at which a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    /// The envelope is malformed or did not authenticate under the product's
    /// passphrase (wrong product id or tampered token).
    Decryption,
    /// The plaintext is not a five-field signed message.
    MalformedToken,
    /// The signature does not match the message and issuer key.
    SignatureMismatch,
}

/// Detailed verification outcome, for logging and tests.
///
/// Untrusted callers should only ever see [`Verification::report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The token is genuine; carries the recovered attributes.
    Valid(LicenseAttributes),
    /// The token was rejected.
    Invalid(VerificationFailure),
}

impl Verification {
    /// Returns true if the token verified.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the recovered attributes of a valid token.
    #[must_use]
    pub fn attributes(&self) -> Option<&LicenseAttributes> {
        match self {
            Self::Valid(attrs) => Some(attrs),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the failure stage of an invalid token.
    #[must_use]
    pub fn failure(&self) -> Option<VerificationFailure> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(failure) => Some(*failure),
        }
    }

    /// Collapses to the external `{ valid, attrs? }` result, hiding which
    /// stage failed.
    #[must_use]
    pub fn report(self) -> VerificationReport {
        match self {
            Self::Valid(attrs) => VerificationReport {
                valid: true,
                attrs: Some(attrs),
            },
            Self::Invalid(_) => VerificationReport {
                valid: false,
                attrs: None,
            },
        }
    }
}

/// External verification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Whether the token is genuine for the product.
    pub valid: bool,
    /// Recovered attributes, present only when valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<LicenseAttributes>,
}

/// Decrypts tokens and checks their embedded signatures.
#[derive(Debug, Clone)]
pub struct LicenseVerifier {
    public_key: PublicKey,
    cipher: EnvelopeCipher,
}

impl LicenseVerifier {
    /// Creates a verifier for tokens signed by `public_key`.
    #[must_use]
    pub fn new(public_key: PublicKey, cipher: EnvelopeCipher) -> Self {
        Self { public_key, cipher }
    }

    /// Returns the issuer public key this verifier trusts.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Verifies `token` for `product_id` on the current thread.
    #[must_use]
    pub fn verify_blocking(&self, product_id: &str, token: &str) -> Verification {
        let passphrase = derive_passphrase(product_id);

        let plaintext = match self.cipher.decrypt(token, &passphrase) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(product_id = %product_id, "token rejected at decryption: {e}");
                return Verification::Invalid(VerificationFailure::Decryption);
            }
        };

        let payload = match codec::decode(&plaintext) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(product_id = %product_id, "token rejected at decoding: {e}");
                return Verification::Invalid(VerificationFailure::MalformedToken);
            }
        };

        if !signature::verify(&payload.signature, product_id, payload.message(), &self.public_key) {
            debug!(product_id = %product_id, "token rejected: signature mismatch");
            return Verification::Invalid(VerificationFailure::SignatureMismatch);
        }

        Verification::Valid(payload.into_attributes(product_id))
    }

    /// Verifies `token` for `product_id` on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Task`] only if the worker task dies; rejected
    /// tokens are reported through [`Verification::Invalid`].
    pub async fn verify(&self, product_id: &str, token: &str) -> LicenseResult<Verification> {
        let verifier = self.clone();
        let product_id = product_id.to_string();
        let token = token.to_string();
        tokio::task::spawn_blocking(move || verifier.verify_blocking(&product_id, &token))
            .await
            .map_err(|e| LicenseError::Task(e.to_string()))
    }
}
