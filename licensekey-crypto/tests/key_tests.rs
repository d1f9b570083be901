use licensekey_crypto::{
    derive_key, derive_passphrase, CryptoError, KdfParams, Salt, KEY_SIZE, NONCE_SIZE,
};

fn test_params() -> KdfParams {
    KdfParams::fast()
}

// ── derive_key ───────────────────────────────────────────────────

#[test]
fn derive_key_produces_consistent_results() {
    let salt = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
    let passphrase = derive_passphrase("product-a");
    let key1 = derive_key(&passphrase, &salt, &test_params()).unwrap();
    let key2 = derive_key(&passphrase, &salt, &test_params()).unwrap();
    assert_eq!(key1.key(), key2.key());
    assert_eq!(key1.nonce(), key2.nonce());
}

#[test]
fn different_passphrases_produce_different_keys() {
    let salt = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
    let key1 = derive_key(&derive_passphrase("product-a"), &salt, &test_params()).unwrap();
    let key2 = derive_key(&derive_passphrase("product-b"), &salt, &test_params()).unwrap();
    assert_ne!(key1.key(), key2.key());
}

#[test]
fn different_salts_produce_different_keys_and_nonces() {
    let passphrase = derive_passphrase("product-a");
    let salt1 = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
    let salt2 = Salt::from_bytes([8, 7, 6, 5, 4, 3, 2, 1]);
    let key1 = derive_key(&passphrase, &salt1, &test_params()).unwrap();
    let key2 = derive_key(&passphrase, &salt2, &test_params()).unwrap();
    assert_ne!(key1.key(), key2.key());
    assert_ne!(key1.nonce(), key2.nonce());
}

#[test]
fn derived_sizes() {
    let key = derive_key(&derive_passphrase("p"), &Salt::from_bytes([9; 8]), &test_params()).unwrap();
    assert_eq!(key.key().len(), KEY_SIZE);
    assert_eq!(key.nonce().len(), NONCE_SIZE);
}

#[test]
fn kdf_cost_changes_output() {
    let passphrase = derive_passphrase("product-a");
    let salt = Salt::from_bytes([3; 8]);
    let cheap = derive_key(&passphrase, &salt, &test_params()).unwrap();
    let costly = derive_key(
        &passphrase,
        &salt,
        &KdfParams {
            memory_cost: 2048,
            time_cost: 2,
            parallelism: 1,
        },
    )
    .unwrap();
    assert_ne!(cheap.key(), costly.key());
}

#[test]
fn invalid_params_fail() {
    let params = KdfParams {
        memory_cost: 0,
        time_cost: 0,
        parallelism: 0,
    };
    let result = derive_key(&derive_passphrase("p"), &Salt::random(), &params);
    assert!(result.is_err());
}

// ── Salt ─────────────────────────────────────────────────────────

#[test]
fn random_salts_differ() {
    assert_ne!(Salt::random(), Salt::random());
}

#[test]
fn salt_from_bytes_roundtrip() {
    let salt = Salt::from_bytes([42; 8]);
    assert_eq!(*salt.as_bytes(), [42; 8]);
}

// ── DerivedKey / KdfParams ───────────────────────────────────────

#[test]
fn key_debug_does_not_leak_bytes() {
    let key = derive_key(&derive_passphrase("p"), &Salt::random(), &test_params()).unwrap();
    let debug = format!("{:?}", key);
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains(&format!("{:?}", key.key())));
}

#[test]
fn default_params_follow_owasp() {
    let params = KdfParams::default();
    assert_eq!(params.memory_cost, 19 * 1024);
    assert_eq!(params.time_cost, 2);
    assert_eq!(params.parallelism, 1);
}

#[test]
fn default_and_fast_params_validate() {
    assert!(KdfParams::default().validate().is_ok());
    assert!(KdfParams::fast().validate().is_ok());
}

#[test]
fn too_little_memory_is_rejected_up_front() {
    let params = KdfParams {
        memory_cost: 4,
        time_cost: 1,
        parallelism: 1,
    };
    assert!(matches!(params.validate(), Err(CryptoError::KeyDerivation(_))));
}

#[test]
fn zero_iterations_are_rejected_up_front() {
    let params = KdfParams {
        time_cost: 0,
        ..KdfParams::fast()
    };
    assert!(matches!(params.validate(), Err(CryptoError::KeyDerivation(_))));
}
