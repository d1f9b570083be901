//! License issuance and verification.
//!
//! This module handles:
//! - The issuer's secp256k1 Schnorr identity keypair and its on-disk store
//! - Signing product-bound license messages
//! - Encoding attributes + signature into a single delimited plaintext
//! - Issuing encrypted tokens and verifying them offline
//!
//! # Token Format
//!
//! A token is an envelope (see `licensekey-crypto`) encrypted under a
//! passphrase derived from the product id. It decrypts to
//! `holderName;email;expiryMillis;licenseType;signatureHex`, where the
//! signature covers `productId;holderName;email;expiryMillis;licenseType`.
//!
//! Verification needs only the product id, the token and the issuer's
//! public key.

mod attributes;
pub mod codec;
mod error;
mod identity;
mod issuer;
pub mod signature;
mod verifier;

pub use attributes::{truncate_to_millis, LicenseAttributes};
pub use error::{LicenseError, LicenseResult};
pub use identity::{
    format_key_bytes, parse_key_bytes, IdentityKeyPair, IdentityKeyStore, KeyStoreConfig,
    PublicKey, KEY_SIZE,
};
pub use issuer::{LicenseIssuer, LicenseToken};
pub use verifier::{LicenseVerifier, Verification, VerificationFailure, VerificationReport};
