//! Schnorr signatures over product-bound messages.
//!
//! The signed digest is SHA-512 (hex) of `productId;message`, so a token
//! signed for one product never verifies for another.

use crate::codec;
use crate::error::{LicenseError, LicenseResult};
use crate::identity::{IdentityKeyPair, PublicKey};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::schnorr::Signature;
use licensekey_crypto::sha512_hex;

/// Length of a hex-encoded signature (64 bytes).
pub const SIGNATURE_HEX_LEN: usize = 128;

fn digest(product_id: &str, message: &str) -> String {
    sha512_hex(codec::signed_message(product_id, message).as_bytes())
}

/// Signs `message` for `product_id`, returning the signature as lowercase hex.
///
/// # Errors
///
/// Returns [`LicenseError::Signing`] if the underlying primitive fails.
pub fn sign(keypair: &IdentityKeyPair, product_id: &str, message: &str) -> LicenseResult<String> {
    let digest = digest(product_id, message);
    let signature: Signature = keypair
        .signing_key()
        .try_sign(digest.as_bytes())
        .map_err(|e| LicenseError::Signing(e.to_string()))?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Checks a hex signature over `message` for `product_id`.
///
/// Never errors: malformed hex, a bad signature length or an invalid public
/// key all report `false`.
#[must_use]
pub fn verify(signature_hex: &str, product_id: &str, message: &str, public_key: &PublicKey) -> bool {
    if signature_hex.len() != SIGNATURE_HEX_LEN {
        return false;
    }
    let Ok(bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
        return false;
    };
    let Some(verifying_key) = public_key.verifying_key() else {
        return false;
    };

    let digest = digest(product_id, message);
    verifying_key.verify(digest.as_bytes(), &signature).is_ok()
}
