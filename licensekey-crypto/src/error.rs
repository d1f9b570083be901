//! Errors raised while sealing or opening license envelopes.

use thiserror::Error;

/// Result alias for this crate.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Envelope and key-derivation failures.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Sealing the plaintext failed.
    #[error("envelope sealing failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong passphrase or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The token is not a well-formed envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}
