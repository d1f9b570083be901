mod common;

use common::{kennedy_attrs, PRODUCT_ID};
use licensekey_engine::codec::{self, DELIMITER, FIELD_COUNT};
use licensekey_engine::{LicenseAttributes, LicenseError};
use pretty_assertions::assert_eq;

const SIG: &str = "ab01";

#[test]
fn encode_joins_fields_in_fixed_order() {
    assert_eq!(
        codec::encode(&kennedy_attrs(), SIG),
        "John Fitzgerald Kennedy;user@mail.com;1652265028236;Trial;ab01"
    );
}

#[test]
fn encode_message_omits_product_and_signature() {
    assert_eq!(
        codec::encode_message(&kennedy_attrs()),
        "John Fitzgerald Kennedy;user@mail.com;1652265028236;Trial"
    );
}

#[test]
fn signed_message_prefixes_product_id() {
    assert_eq!(
        codec::signed_message(PRODUCT_ID, "a;b"),
        format!("{PRODUCT_ID};a;b")
    );
    assert_eq!(codec::signed_message("x;y", "m"), r"x\;y;m");
}

#[test]
fn decode_recovers_fields_and_signature() {
    let attrs = kennedy_attrs();
    let payload = codec::decode(&codec::encode(&attrs, SIG)).unwrap();

    assert_eq!(payload.signature, SIG);
    assert_eq!(payload.message(), codec::encode_message(&attrs));
    assert_eq!(payload.into_attributes(PRODUCT_ID), attrs);
}

#[test]
fn message_and_decoded_message_split_on_the_delimiter() {
    let attrs = kennedy_attrs();
    let message = codec::encode_message(&attrs);
    assert_eq!(message.split(DELIMITER).count(), FIELD_COUNT - 1);

    let payload = codec::decode(&codec::encode(&attrs, SIG)).unwrap();
    assert_eq!(payload.message().split(DELIMITER).count(), FIELD_COUNT - 1);
}

#[test]
fn decode_keeps_escaped_message_text() {
    let attrs = LicenseAttributes::new("p", "a;b", "c\\d@mail.com", "T", common::expiry());
    let encoded = codec::encode(&attrs, SIG);
    assert_eq!(encoded, r"a\;b;c\\d@mail.com;1652265028236;T;ab01");

    let payload = codec::decode(&encoded).unwrap();
    assert_eq!(payload.message(), r"a\;b;c\\d@mail.com;1652265028236;T");
    assert_eq!(payload.holder_name, "a;b");
    assert_eq!(payload.email, r"c\d@mail.com");
}

#[test]
fn too_few_fields_is_malformed() {
    let err = codec::decode("a;b;1;d").unwrap_err();
    assert!(matches!(err, LicenseError::MalformedToken(_)));
    assert!(err.to_string().contains(&FIELD_COUNT.to_string()));
}

#[test]
fn too_many_fields_is_malformed() {
    // An unescaped delimiter inside a value is not silently truncated.
    let err = codec::decode("Kennedy;John;user@mail.com;1;Trial;ab").unwrap_err();
    assert!(matches!(err, LicenseError::MalformedToken(_)));
}

#[test]
fn non_numeric_expiry_is_malformed() {
    let err = codec::decode("a;b;tomorrow;d;e").unwrap_err();
    assert!(matches!(err, LicenseError::MalformedToken(_)));
}

#[test]
fn out_of_range_expiry_is_malformed() {
    let err = codec::decode(&format!("a;b;{};d;e", i64::MAX)).unwrap_err();
    assert!(matches!(err, LicenseError::MalformedToken(_)));
}

#[test]
fn bad_escape_is_malformed() {
    assert!(codec::decode(r"a\x;b;1;d;e").is_err());
    assert!(codec::decode(r"a;b;1;d;e\").is_err());
}

#[test]
fn empty_plaintext_is_malformed() {
    assert!(codec::decode("").is_err());
}

#[test]
fn negative_expiry_decodes() {
    let payload = codec::decode("a;b;-1000;d;e").unwrap();
    assert_eq!(payload.expiry_date.timestamp_millis(), -1000);
}
