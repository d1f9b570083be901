//! License attributes supplied by the purchaser-facing layer.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The attributes a license token is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseAttributes {
    /// Product identifier: UUID, Power BI visual GUID, etc.
    pub product_id: String,
    /// Purchaser full name.
    pub holder_name: String,
    /// Purchaser e-mail.
    pub email: String,
    /// Free-form license type, e.g. `Trial`.
    pub license_type: String,
    /// Expiration instant, millisecond precision.
    #[serde(serialize_with = "serialize_expiry", deserialize_with = "deserialize_expiry")]
    pub expiry_date: DateTime<Utc>,
}

impl LicenseAttributes {
    /// Creates attributes, truncating the expiry to millisecond precision.
    pub fn new(
        product_id: impl Into<String>,
        holder_name: impl Into<String>,
        email: impl Into<String>,
        license_type: impl Into<String>,
        expiry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            holder_name: holder_name.into(),
            email: email.into(),
            license_type: license_type.into(),
            expiry_date: truncate_to_millis(expiry_date),
        }
    }

    /// Returns the expiry as milliseconds since the Unix epoch.
    #[must_use]
    pub fn expiry_millis(&self) -> i64 {
        self.expiry_date.timestamp_millis()
    }

    /// Checks that every field is present and the e-mail is plausible.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidAttributes`] naming the first bad field.
    pub fn validate(&self) -> LicenseResult<()> {
        for (field, value) in [
            ("productId", &self.product_id),
            ("holderName", &self.holder_name),
            ("email", &self.email),
            ("licenseType", &self.license_type),
        ] {
            if value.trim().is_empty() {
                return Err(LicenseError::InvalidAttributes {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if !is_plausible_email(&self.email) {
            return Err(LicenseError::InvalidAttributes {
                field: "email",
                reason: "incorrect e-mail".to_string(),
            });
        }

        Ok(())
    }
}

/// Drops sub-millisecond precision, which the token format cannot carry.
#[must_use]
pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn serialize_expiry<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Accepts a millisecond timestamp, an RFC 3339 date-time or a plain date.
fn deserialize_expiry<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawExpiry {
        Millis(i64),
        Text(String),
    }

    let parsed = match RawExpiry::deserialize(deserializer)? {
        RawExpiry::Millis(ms) => DateTime::from_timestamp_millis(ms),
        RawExpiry::Text(text) => parse_expiry_text(text.trim()),
    };

    parsed
        .map(truncate_to_millis)
        .ok_or_else(|| serde::de::Error::custom("must be a correct date"))
}

fn parse_expiry_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_emails() {
        assert!(is_plausible_email("user@mail.com"));
        assert!(!is_plausible_email("user.mail.com"));
        assert!(!is_plausible_email("@mail.com"));
        assert!(!is_plausible_email("user@"));
        assert!(!is_plausible_email("a@b@c"));
        assert!(!is_plausible_email("us er@mail.com"));
    }

    #[test]
    fn expiry_text_forms() {
        let date = parse_expiry_text("2022-05-11").unwrap();
        assert_eq!(date.timestamp_millis(), 1_652_227_200_000);

        let datetime = parse_expiry_text("2022-05-11T10:30:28.236Z").unwrap();
        assert_eq!(datetime.timestamp_millis(), 1_652_265_028_236);

        assert!(parse_expiry_text("next tuesday").is_none());
    }
}
