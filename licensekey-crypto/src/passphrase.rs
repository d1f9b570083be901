//! Passphrase derivation from product identifiers.
//!
//! The passphrase is never stored: issuance and verification run in
//! different requests and must both arrive at the same value from the
//! product id alone.

use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A symmetric encryption passphrase derived from a product id.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Returns the passphrase text (128 lowercase hex characters).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Passphrase").field(&"[REDACTED]").finish()
    }
}

/// SHA-512 of `data`, rendered as lowercase hex.
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

/// Derives the encryption passphrase for a product.
pub fn derive_passphrase(product_id: &str) -> Passphrase {
    Passphrase(sha512_hex(product_id.as_bytes()))
}
