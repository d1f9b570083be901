//! Issuer identity keys and their on-disk store.
//!
//! The issuer owns one long-lived secp256k1 Schnorr keypair. Both halves are
//! persisted as comma-separated decimal byte lists (`12,240,7,...`) in two
//! files inside a key directory. The directory only ever appears fully
//! populated: a bootstrapper writes both files into a private staging
//! directory and renames it into place, so concurrent first starts cannot
//! both win key generation.

use crate::error::{LicenseError, LicenseResult};
use k256::schnorr::{SigningKey, VerifyingKey};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Size of both the secret scalar and the x-only public key.
pub const KEY_SIZE: usize = 32;

/// Staging directories older than this were left by a bootstrap that died
/// before publishing.
const STALE_STAGING_AGE: Duration = Duration::from_secs(10 * 60);

/// An x-only secp256k1 public key (BIP-340).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Wraps raw public key bytes. The bytes are checked when used.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte public key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn verifying_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).ok()
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

/// The issuer's signing keypair.
///
/// The public key is always derived from the private key.
#[derive(Clone)]
pub struct IdentityKeyPair {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl IdentityKeyPair {
    /// Generates a fresh keypair from the OS random number generator.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Restores a keypair from its 32-byte secret scalar.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKeyMaterial`] if the bytes are not a
    /// valid non-zero scalar.
    pub fn from_private_bytes(bytes: &[u8]) -> LicenseResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(LicenseError::InvalidKeyMaterial(format!(
                "private key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes)
            .map_err(|_| LicenseError::InvalidKeyMaterial("private key out of range".to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Restores a keypair and checks the stored public key against it.
    ///
    /// # Errors
    ///
    /// Fails if the private key is invalid or the public key does not match.
    pub fn from_parts(private: &[u8], public: &[u8]) -> LicenseResult<Self> {
        let keypair = Self::from_private_bytes(private)?;
        if keypair.public_key.as_bytes().as_slice() != public {
            return Err(LicenseError::InvalidKeyMaterial(
                "public key does not match private key".to_string(),
            ));
        }
        Ok(keypair)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let mut public = [0u8; KEY_SIZE];
        public.copy_from_slice(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key: PublicKey(public),
        }
    }

    /// Returns the public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Returns a copy of the secret scalar, wiped when dropped.
    #[must_use]
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; KEY_SIZE]> {
        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        bytes.copy_from_slice(&self.signing_key.to_bytes());
        bytes
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Where the identity keys live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreConfig {
    /// Key directory. Its absence triggers key generation.
    pub dir: PathBuf,
    /// File name of the private key inside `dir`.
    pub private_key_file: String,
    /// File name of the public key inside `dir`.
    pub public_key_file: String,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("id-keys"),
            private_key_file: "private.key".to_string(),
            public_key_file: "public.key".to_string(),
        }
    }
}

/// Outcome of trying to move a staged key directory into place.
enum Publish {
    Published,
    AlreadyExists,
}

/// Loads or creates the issuer identity keypair.
#[derive(Debug, Clone)]
pub struct IdentityKeyStore {
    config: KeyStoreConfig,
}

impl IdentityKeyStore {
    /// Creates a store over the given location.
    #[must_use]
    pub fn new(config: KeyStoreConfig) -> Self {
        Self { config }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &KeyStoreConfig {
        &self.config
    }

    /// Path of the private key file.
    #[must_use]
    pub fn private_key_path(&self) -> PathBuf {
        self.config.dir.join(&self.config.private_key_file)
    }

    /// Path of the public key file.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.config.dir.join(&self.config.public_key_file)
    }

    /// Loads the keypair, generating and persisting one on first run.
    ///
    /// Blocks until the keys are durable on disk. Call once at startup,
    /// before serving any request.
    ///
    /// # Errors
    ///
    /// Any filesystem or parse error. Callers should treat it as fatal.
    pub fn load(&self) -> LicenseResult<IdentityKeyPair> {
        if self.config.dir.exists() {
            info!("Loading identity keys from {:?}", self.config.dir);
            return self.read();
        }

        info!("Generating new identity keys at {:?}", self.config.dir);
        let keypair = IdentityKeyPair::generate();
        match self.publish(&keypair)? {
            Publish::Published => Ok(keypair),
            Publish::AlreadyExists => {
                warn!(
                    "Identity keys at {:?} were created concurrently, using those",
                    self.config.dir
                );
                self.read()
            }
        }
    }

    /// Generates and persists a keypair, refusing to touch existing keys.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::KeyStore`] if the key directory already exists.
    pub fn bootstrap(&self) -> LicenseResult<IdentityKeyPair> {
        if self.config.dir.exists() {
            return Err(LicenseError::KeyStore(format!(
                "identity keys already exist at {}",
                self.config.dir.display()
            )));
        }

        let keypair = IdentityKeyPair::generate();
        match self.publish(&keypair)? {
            Publish::Published => {
                info!("Identity keys written to {:?}", self.config.dir);
                Ok(keypair)
            }
            Publish::AlreadyExists => Err(LicenseError::KeyStore(format!(
                "identity keys were created concurrently at {}",
                self.config.dir.display()
            ))),
        }
    }

    fn read(&self) -> LicenseResult<IdentityKeyPair> {
        let private = Zeroizing::new(read_key_file(&self.private_key_path())?);
        let public = read_key_file(&self.public_key_path())?;
        IdentityKeyPair::from_parts(&private, &public)
    }

    fn publish(&self, keypair: &IdentityKeyPair) -> LicenseResult<Publish> {
        let dir = &self.config.dir;
        let name = dir.file_name().ok_or_else(|| {
            LicenseError::KeyStore(format!("invalid key directory {}", dir.display()))
        })?;
        let parent = match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let name = name.to_string_lossy();
        remove_stale_staging(&parent, &name, STALE_STAGING_AGE);

        let staging = parent.join(format!("{}{}", staging_prefix(&name), Uuid::new_v4()));
        fs::create_dir(&staging)?;

        let staged = write_key_file(
            &staging.join(&self.config.private_key_file),
            keypair.private_key_bytes().as_slice(),
            true,
        )
        .and_then(|()| {
            write_key_file(
                &staging.join(&self.config.public_key_file),
                keypair.public_key().as_bytes(),
                false,
            )
        })
        .and_then(|()| sync_dir(&staging));
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }

        match fs::rename(&staging, dir) {
            Ok(()) => {
                sync_dir(&parent)?;
                Ok(Publish::Published)
            }
            Err(_) if dir.join(&self.config.private_key_file).exists() => {
                let _ = fs::remove_dir_all(&staging);
                Ok(Publish::AlreadyExists)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                Err(LicenseError::KeyStore(format!(
                    "failed to move keys into {}: {e}",
                    dir.display()
                )))
            }
        }
    }
}

/// Renders key bytes as `12,240,7,...`.
#[must_use]
pub fn format_key_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a comma-separated decimal byte list.
///
/// # Errors
///
/// Returns [`LicenseError::InvalidKeyMaterial`] on any non-byte entry.
pub fn parse_key_bytes(text: &str) -> LicenseResult<Vec<u8>> {
    text.trim()
        .split(',')
        .map(|part| {
            part.trim().parse::<u8>().map_err(|_| {
                LicenseError::InvalidKeyMaterial(format!("invalid key byte {:?}", part.trim()))
            })
        })
        .collect()
}

fn read_key_file(path: &Path) -> LicenseResult<Vec<u8>> {
    let text = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
        LicenseError::KeyStore(format!("failed to read {}: {e}", path.display()))
    })?);
    parse_key_bytes(&text)
        .map_err(|e| LicenseError::InvalidKeyMaterial(format!("{}: {e}", path.display())))
}

fn write_key_file(path: &Path, bytes: &[u8], secret: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(if secret { 0o600 } else { 0o644 });
    }
    #[cfg(not(unix))]
    let _ = secret;

    let mut file = options.open(path)?;
    let text = Zeroizing::new(format_key_bytes(bytes));
    file.write_all(text.as_bytes())?;
    file.sync_all()
}

/// Flushes a directory's entries so a completed rename survives power loss.
fn sync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    fs::File::open(path)?.sync_all()?;
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn staging_prefix(name: &str) -> String {
    format!(".{name}.staging-")
}

/// Best-effort removal of staging directories for `name` older than `max_age`.
fn remove_stale_staging(parent: &Path, name: &str, max_age: Duration) {
    let prefix = staging_prefix(name);
    let Ok(entries) = fs::read_dir(parent) else {
        return;
    };

    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .map(|modified| modified.elapsed().unwrap_or_default());
        let Ok(age) = age else {
            continue;
        };
        if age < max_age {
            continue;
        }

        let path = entry.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => warn!("Removed stale key staging directory {:?}", path),
            Err(e) => warn!("Failed to remove stale key staging directory {:?}: {}", path, e),
        }
    }
}
