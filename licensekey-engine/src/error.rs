//! Error types for the licensing engine.

use licensekey_crypto::CryptoError;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Identity keys could not be created or loaded.
    #[error("key store error: {0}")]
    KeyStore(String),

    /// Filesystem error while handling identity keys.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored key bytes are malformed or inconsistent.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Envelope encryption or decryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Decrypted plaintext is not a well-formed signed message.
    #[error("malformed license token: {0}")]
    MalformedToken(String),

    /// Schnorr signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A license attribute failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidAttributes {
        /// Attribute name as it appears on the wire.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A blocking crypto task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
