//! Cryptographic primitives for license tokens.
//!
//! - Passphrase derivation: SHA-512 of the product id, lowercase hex
//! - Envelope encryption: Argon2id key/nonce derivation + ChaCha20-Poly1305
//!
//! Envelope format: `base64("Salted__" || salt[8] || ciphertext || tag[16])`

mod envelope;
mod error;
mod key;
mod passphrase;

pub use envelope::{Envelope, EnvelopeCipher, HEADER_SIZE, MAGIC, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, DerivedKey, KdfParams, Salt, KEY_SIZE, NONCE_SIZE, SALT_SIZE};
pub use passphrase::{derive_passphrase, sha512_hex, Passphrase};
