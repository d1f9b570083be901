//! Property-based tests for the crypto module.
//!
//! These tests verify properties that must always hold:
//! - Encryption is reversible with the correct passphrase
//! - Wrong passphrases fail decryption
//! - Tampering is detected
//! - Passphrases are derived deterministically from product ids

use licensekey_crypto::{derive_passphrase, EnvelopeCipher, KdfParams, HEADER_SIZE, TAG_SIZE};
use proptest::prelude::*;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn plaintext_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[\\x00-\\x7F]{0,512}").unwrap()
}

fn product_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9-]{1,64}").unwrap()
}

fn cipher() -> EnvelopeCipher {
    EnvelopeCipher::new(KdfParams::fast())
}

fn config() -> ProptestConfig {
    // Every case runs Argon2; keep the case count modest.
    ProptestConfig::with_cases(32)
}

// =============================================================================
// ENCRYPTION PROPERTIES
// =============================================================================

mod encryption_properties {
    use super::*;

    proptest! {
        #![proptest_config(config())]

        /// Decrypting with the same passphrase returns the original plaintext
        #[test]
        fn roundtrip_preserves_data(
            plaintext in plaintext_strategy(),
            product_id in product_id_strategy(),
        ) {
            let passphrase = derive_passphrase(&product_id);

            let token = cipher().encrypt(&plaintext, &passphrase).unwrap();
            let decrypted = cipher().decrypt(&token, &passphrase).unwrap();

            prop_assert_eq!(decrypted, plaintext);
        }

        /// A different product id never decrypts the token
        #[test]
        fn wrong_passphrase_fails_decryption(
            plaintext in plaintext_strategy(),
            product_a in product_id_strategy(),
            product_b in product_id_strategy(),
        ) {
            prop_assume!(product_a != product_b);

            let token = cipher().encrypt(&plaintext, &derive_passphrase(&product_a)).unwrap();
            let result = cipher().decrypt(&token, &derive_passphrase(&product_b));

            prop_assert!(result.is_err());
        }

        /// Tampered ciphertext fails authentication
        #[test]
        fn tampered_ciphertext_fails(
            plaintext in plaintext_strategy(),
            tamper_pos in any::<usize>(),
            tamper_byte in any::<u8>(),
        ) {
            let passphrase = derive_passphrase("product");
            let mut envelope = cipher().seal(plaintext.as_bytes(), &passphrase).unwrap();

            let pos = tamper_pos % envelope.ciphertext.len();
            if envelope.ciphertext[pos] != tamper_byte {
                envelope.ciphertext[pos] = tamper_byte;
                prop_assert!(cipher().open(&envelope, &passphrase).is_err());
            }
        }

        /// Envelope is header + plaintext + auth tag
        #[test]
        fn envelope_size(plaintext in plaintext_strategy()) {
            let envelope = cipher().seal(plaintext.as_bytes(), &derive_passphrase("p")).unwrap();
            prop_assert_eq!(envelope.len(), HEADER_SIZE + plaintext.len() + TAG_SIZE);
        }
    }
}

// =============================================================================
// PASSPHRASE PROPERTIES
// =============================================================================

mod passphrase_properties {
    use super::*;

    proptest! {
        /// Same product id always yields the same passphrase
        #[test]
        fn derivation_is_deterministic(product_id in any::<String>()) {
            prop_assert_eq!(derive_passphrase(&product_id), derive_passphrase(&product_id));
        }

        /// Passphrase is always 128 hex characters
        #[test]
        fn passphrase_shape(product_id in any::<String>()) {
            let passphrase = derive_passphrase(&product_id);
            prop_assert_eq!(passphrase.as_str().len(), 128);
            prop_assert!(passphrase.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
        }

        /// Distinct product ids yield distinct passphrases
        #[test]
        fn distinct_products_distinct_passphrases(
            a in product_id_strategy(),
            b in product_id_strategy(),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(derive_passphrase(&a), derive_passphrase(&b));
        }
    }
}
