//! License token envelopes using ChaCha20-Poly1305.
//!
//! Layout: `MAGIC || salt || ciphertext`, base64-encoded. The ciphertext
//! carries the Poly1305 tag, so a wrong passphrase or any tampering fails
//! decryption instead of yielding garbage plaintext.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, KdfParams, Salt, SALT_SIZE};
use crate::passphrase::Passphrase;
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};

/// Format marker at the start of every envelope.
pub const MAGIC: &[u8; 8] = b"Salted__";

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the fixed envelope header (magic + salt).
pub const HEADER_SIZE: usize = MAGIC.len() + SALT_SIZE;

/// A decoded envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Salt used to derive the key and nonce.
    pub salt: Salt,
    /// The encrypted ciphertext (includes auth tag).
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Returns the total size of the encoded envelope in bytes.
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.ciphertext.len()
    }

    /// Returns true if the ciphertext is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Encodes to base64 for storage/transmission.
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(self.salt.as_bytes());
        bytes.extend_from_slice(&self.ciphertext);
        STANDARD.encode(&bytes)
    }

    /// Decodes from base64.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidEnvelope(format!("invalid base64: {e}")))?;

        if bytes.len() < HEADER_SIZE + TAG_SIZE {
            return Err(CryptoError::InvalidEnvelope("data too short".to_string()));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::InvalidEnvelope("missing magic marker".to_string()));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[MAGIC.len()..HEADER_SIZE]);

        Ok(Self {
            salt: Salt::from_bytes(salt),
            ciphertext: bytes[HEADER_SIZE..].to_vec(),
        })
    }
}

/// Passphrase-based envelope cipher.
///
/// Stateless apart from its KDF cost, so one instance can be shared across
/// concurrent requests.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeCipher {
    params: KdfParams,
}

impl EnvelopeCipher {
    /// Creates a cipher with the given key derivation cost.
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Returns the key derivation parameters.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Encrypts `plaintext` under a fresh random salt.
    pub fn seal(&self, plaintext: &[u8], passphrase: &Passphrase) -> CryptoResult<Envelope> {
        self.seal_with_salt(plaintext, passphrase, Salt::random())
    }

    /// Encrypts `plaintext` under an explicit salt.
    ///
    /// Reusing a salt with the same passphrase reuses the nonce; only tests
    /// should call this directly.
    pub fn seal_with_salt(
        &self,
        plaintext: &[u8],
        passphrase: &Passphrase,
        salt: Salt,
    ) -> CryptoResult<Envelope> {
        let derived = derive_key(passphrase, &salt, &self.params)?;
        let cipher = ChaCha20Poly1305::new(derived.key().into());

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(derived.nonce()), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(Envelope { salt, ciphertext })
    }

    /// Decrypts an envelope.
    pub fn open(&self, envelope: &Envelope, passphrase: &Passphrase) -> CryptoResult<Vec<u8>> {
        let derived = derive_key(passphrase, &envelope.salt, &self.params)?;
        let cipher = ChaCha20Poly1305::new(derived.key().into());

        cipher
            .decrypt(Nonce::from_slice(derived.nonce()), envelope.ciphertext.as_ref())
            .map_err(|_| {
                CryptoError::Decryption("wrong passphrase or tampered data".to_string())
            })
    }

    /// Encrypts a string and returns the base64 envelope text.
    pub fn encrypt(&self, plaintext: &str, passphrase: &Passphrase) -> CryptoResult<String> {
        Ok(self.seal(plaintext.as_bytes(), passphrase)?.to_base64())
    }

    /// Decrypts base64 envelope text back into a string.
    pub fn decrypt(&self, token: &str, passphrase: &Passphrase) -> CryptoResult<String> {
        let envelope = Envelope::from_base64(token)?;
        let plaintext = self.open(&envelope, passphrase)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
    }
}
