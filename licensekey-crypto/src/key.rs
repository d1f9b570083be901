//! Key derivation for envelope encryption.
//!
//! Uses Argon2id to stretch a passphrase and an envelope salt into both the
//! ChaCha20-Poly1305 key and the nonce, so the envelope only has to carry
//! the salt.

use crate::error::{CryptoError, CryptoResult};
use crate::passphrase::Passphrase;
use argon2::{Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of encryption keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of the envelope salt in bytes.
pub const SALT_SIZE: usize = 8;

/// Key and nonce derived for a single envelope, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
}

impl DerivedKey {
    /// Returns the cipher key bytes.
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Returns the nonce bytes.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}

/// Per-envelope salt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt {
    bytes: [u8; SALT_SIZE],
}

impl Salt {
    /// Generates a random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a salt from raw bytes.
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.bytes
    }
}

/// Key derivation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // OWASP recommendations for Argon2id (2023)
        Self {
            memory_cost: 19 * 1024, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and local tooling. Not for production tokens.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024, // 1 MiB
            time_cost: 1,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Checks the parameters against Argon2's limits without deriving anything.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyDerivation`] naming the rejected parameter.
    pub fn validate(&self) -> CryptoResult<()> {
        self.argon2_params().map(|_| ())
    }

    fn argon2_params(&self) -> CryptoResult<Params> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(KEY_SIZE + NONCE_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }
}

/// Derives the envelope key and nonce from a passphrase and salt.
pub fn derive_key(passphrase: &Passphrase, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    let argon2_params = params.argon2_params()?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut output = [0u8; KEY_SIZE + NONCE_SIZE];
    argon2
        .hash_password_into(passphrase.as_str().as_bytes(), salt.as_bytes(), &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut derived = DerivedKey {
        key: [0u8; KEY_SIZE],
        nonce: [0u8; NONCE_SIZE],
    };
    derived.key.copy_from_slice(&output[..KEY_SIZE]);
    derived.nonce.copy_from_slice(&output[KEY_SIZE..]);
    output.zeroize();

    Ok(derived)
}
