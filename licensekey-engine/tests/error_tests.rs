use licensekey_crypto::CryptoError;
use licensekey_engine::LicenseError;

#[test]
fn error_display_key_store() {
    let err = LicenseError::KeyStore("no such directory".into());
    assert!(format!("{err}").contains("key store"));
}

#[test]
fn error_display_invalid_key_material() {
    let err = LicenseError::InvalidKeyMaterial("bad byte".into());
    let msg = format!("{err}");
    assert!(msg.contains("invalid key material"));
    assert!(msg.contains("bad byte"));
}

#[test]
fn error_display_malformed_token() {
    let err = LicenseError::MalformedToken("expected 5 fields, found 4".into());
    assert!(format!("{err}").contains("malformed license token"));
}

#[test]
fn error_display_signing() {
    let err = LicenseError::Signing("nonce".into());
    assert!(format!("{err}").contains("signing failed"));
}

#[test]
fn error_display_invalid_attributes() {
    let err = LicenseError::InvalidAttributes {
        field: "email",
        reason: "incorrect e-mail".into(),
    };
    assert_eq!(format!("{err}"), "invalid email: incorrect e-mail");
}

#[test]
fn error_display_task() {
    let err = LicenseError::Task("cancelled".into());
    assert!(format!("{err}").contains("background task"));
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: LicenseError = io.into();
    assert!(format!("{err}").contains("denied"));
}

#[test]
fn error_from_crypto_is_transparent() {
    let err: LicenseError = CryptoError::Decryption("tampered".into()).into();
    assert_eq!(format!("{err}"), "decryption failed: tampered");
}

#[test]
fn error_is_debug() {
    let err = LicenseError::Task("x".into());
    let _ = format!("{err:?}");
}
