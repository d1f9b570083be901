//! Signed message encoding.
//!
//! Plaintext layout: `holderName;email;expiryMillis;licenseType;signatureHex`.
//!
//! Fields are escaped (`\` as `\\`, `;` as `\;`) so that values containing the
//! delimiter still split unambiguously. Values without `;` or `\` encode
//! exactly as plain delimiter-joined text.

use crate::attributes::LicenseAttributes;
use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};

/// Field delimiter.
pub const DELIMITER: char = ';';

/// Escape character for delimiters inside field values.
pub const ESCAPE: char = '\\';

/// Number of fields in a signed plaintext (four attributes plus signature).
pub const FIELD_COUNT: usize = 5;

/// A decoded signed plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Purchaser full name.
    pub holder_name: String,
    /// Purchaser e-mail.
    pub email: String,
    /// Expiration instant.
    pub expiry_date: DateTime<Utc>,
    /// License type.
    pub license_type: String,
    /// Detached signature, hex.
    pub signature: String,
    /// The encoded message exactly as it appeared before the signature.
    message: String,
}

impl SignedPayload {
    /// Returns the message text the signature was computed over
    /// (without the product id prefix).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Rebuilds the full attribute set for the product this payload was
    /// decrypted under.
    #[must_use]
    pub fn into_attributes(self, product_id: &str) -> LicenseAttributes {
        LicenseAttributes {
            product_id: product_id.to_string(),
            holder_name: self.holder_name,
            email: self.email,
            license_type: self.license_type,
            expiry_date: self.expiry_date,
        }
    }
}

/// Escapes a single field value.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ESCAPE || c == DELIMITER {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Encodes the signed portion of the attributes (everything but the product id).
#[must_use]
pub fn encode_message(attrs: &LicenseAttributes) -> String {
    [
        escape(&attrs.holder_name),
        escape(&attrs.email),
        attrs.expiry_millis().to_string(),
        escape(&attrs.license_type),
    ]
    .join(&*DELIMITER.encode_utf8(&mut [0; 4]))
}

/// Appends a signature to an encoded message.
#[must_use]
pub fn append_signature(message: &str, signature: &str) -> String {
    format!("{message}{DELIMITER}{}", escape(signature))
}

/// Encodes attributes and signature into the plaintext carried by a token.
#[must_use]
pub fn encode(attrs: &LicenseAttributes, signature: &str) -> String {
    append_signature(&encode_message(attrs), signature)
}

/// Builds the string that is hashed and signed: `productId;message`.
#[must_use]
pub fn signed_message(product_id: &str, message: &str) -> String {
    format!("{}{DELIMITER}{message}", escape(product_id))
}

/// Decodes a token plaintext.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedToken`] if the plaintext does not split
/// into exactly [`FIELD_COUNT`] fields, contains a bad escape sequence, or
/// carries a non-numeric expiry.
pub fn decode(plaintext: &str) -> LicenseResult<SignedPayload> {
    let fields = split_fields(plaintext)?;
    if fields.len() != FIELD_COUNT {
        return Err(LicenseError::MalformedToken(format!(
            "expected {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    }

    let message = fields[..FIELD_COUNT - 1]
        .iter()
        .map(|field| field.raw)
        .collect::<Vec<_>>()
        .join(&*DELIMITER.encode_utf8(&mut [0; 4]));

    let values: Vec<String> = fields.into_iter().map(|field| field.value).collect();
    let [holder_name, email, expiry, license_type, signature]: [String; FIELD_COUNT] = values
        .try_into()
        .map_err(|_| LicenseError::MalformedToken("missing fields".to_string()))?;

    let millis: i64 = expiry
        .parse()
        .map_err(|_| LicenseError::MalformedToken(format!("invalid expiry timestamp: {expiry:?}")))?;
    let expiry_date = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        LicenseError::MalformedToken(format!("expiry timestamp out of range: {millis}"))
    })?;

    Ok(SignedPayload {
        holder_name,
        email,
        expiry_date,
        license_type,
        signature,
        message,
    })
}

struct Field<'a> {
    raw: &'a str,
    value: String,
}

fn split_fields(plaintext: &str) -> LicenseResult<Vec<Field<'_>>> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut value = String::new();
    let mut start = 0;
    let mut chars = plaintext.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some((_, escaped @ (ESCAPE | DELIMITER))) => value.push(escaped),
                Some((_, other)) => {
                    return Err(LicenseError::MalformedToken(format!(
                        "unknown escape sequence \\{other}"
                    )));
                }
                None => {
                    return Err(LicenseError::MalformedToken("dangling escape".to_string()));
                }
            },
            DELIMITER => {
                fields.push(Field {
                    raw: &plaintext[start..i],
                    value: std::mem::take(&mut value),
                });
                start = i + DELIMITER.len_utf8();
            }
            _ => value.push(c),
        }
    }
    fields.push(Field {
        raw: &plaintext[start..],
        value,
    });

    Ok(fields)
}
