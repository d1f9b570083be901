//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use licensekey_crypto::{EnvelopeCipher, KdfParams};
use licensekey_engine::{IdentityKeyPair, LicenseAttributes, LicenseIssuer, LicenseVerifier};
use std::sync::Arc;

pub const PRODUCT_ID: &str = "5f95888a-6519-44bc-a08e-e76dda4621f1";
pub const EXPIRY_MILLIS: i64 = 1_652_265_028_236;

/// Returns a deterministic keypair from a fixed secret scalar.
pub fn test_keypair() -> IdentityKeyPair {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    IdentityKeyPair::from_private_bytes(&seed).unwrap()
}

/// Envelope cipher with a cheap KDF.
pub fn fast_cipher() -> EnvelopeCipher {
    EnvelopeCipher::new(KdfParams::fast())
}

/// Issuer/verifier pair over the test keypair.
pub fn issuer_and_verifier() -> (LicenseIssuer, LicenseVerifier) {
    let issuer = LicenseIssuer::new(Arc::new(test_keypair()), fast_cipher());
    let verifier = issuer.verifier();
    (issuer, verifier)
}

pub fn expiry() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(EXPIRY_MILLIS).unwrap()
}

/// The reference purchase used throughout the tests.
pub fn kennedy_attrs() -> LicenseAttributes {
    LicenseAttributes::new(
        PRODUCT_ID,
        "John Fitzgerald Kennedy",
        "user@mail.com",
        "Trial",
        expiry(),
    )
}
