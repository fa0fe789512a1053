//! License key generation and format validation.
//!
//! Keys look like `FOOD-1A2B-3C4D-5E6F`: a fixed product prefix followed by
//! three groups of four uppercase hex digits. Each group carries two bytes
//! from the operating system CSPRNG. The format check is a syntactic filter
//! applied before any database lookup; it proves nothing about authenticity.

use crate::{Error, Result};
use chrono::{DateTime, Months, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Product prefix of every key.
pub const KEY_PREFIX: &str = "FOOD";

/// Number of random groups after the prefix.
const KEY_GROUPS: usize = 3;

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^FOOD-[A-F0-9]{4}-[A-F0-9]{4}-[A-F0-9]{4}$").expect("static key pattern")
});

/// A license key that has passed the format check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Generate a fresh random key.
    ///
    /// Uniqueness is not checked here. The store's unique constraint is the
    /// only guarantee, so callers must handle [`Error::DuplicateKey`].
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_GROUPS * 2];
        OsRng.fill_bytes(&mut bytes);

        let mut key = String::with_capacity(KEY_PREFIX.len() + KEY_GROUPS * 5);
        key.push_str(KEY_PREFIX);
        for pair in bytes.chunks_exact(2) {
            key.push_str(&format!("-{:02X}{:02X}", pair[0], pair[1]));
        }
        Self(key)
    }

    /// Returns true iff `key` matches `FOOD-XXXX-XXXX-XXXX` exactly
    /// (uppercase hex only).
    pub fn is_valid_format(key: &str) -> bool {
        KEY_PATTERN.is_match(key)
    }

    /// Parse and validate a key.
    pub fn parse(key: &str) -> Result<Self> {
        if Self::is_valid_format(key) {
            Ok(Self(key.to_string()))
        } else {
            Err(Error::Validation("Invalid license key format".to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LicenseKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LicenseKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if Self::is_valid_format(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Validation("Invalid license key format".to_string()))
        }
    }
}

impl From<LicenseKey> for String {
    fn from(key: LicenseKey) -> Self {
        key.0
    }
}

impl AsRef<str> for LicenseKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Absolute expiry `months` calendar months after `now`.
///
/// Day-of-month overflow clamps to the last day of the target month, so
/// Jan 31 + 1 month lands on the last day of February.
pub fn expiry_from_months(months: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    now.checked_add_months(Months::new(months))
        .ok_or_else(|| Error::Validation(format!("Subscription of {} months is out of range", months)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use std::collections::HashSet;

    #[test]
    fn test_generated_keys_pass_format_check() {
        for _ in 0..500 {
            let key = LicenseKey::generate();
            assert!(LicenseKey::is_valid_format(key.as_str()), "bad key {}", key);
            assert_eq!(key.as_str().len(), 19);
        }
    }

    #[test]
    fn test_generated_keys_are_distinct() {
        let keys: HashSet<String> = (0..200).map(|_| LicenseKey::generate().into()).collect();
        assert_eq!(keys.len(), 200);
    }

    #[test]
    fn test_format_rejects_malformed_keys() {
        let bad = [
            "",
            "FOOD",
            "FOOD-1234-5678",
            "FOOD-1234-5678-9ABC-DEF0",
            "food-1234-5678-9ABC",
            "FOOD-abcd-5678-9ABC",
            "FOOD-12G4-5678-9ABC",
            "BEER-1234-5678-9ABC",
            "FOOD_1234_5678_9ABC",
            " FOOD-1234-5678-9ABC",
            "FOOD-1234-5678-9ABC\n",
            "FOOD-12345-678-9ABC",
        ];
        for key in bad {
            assert!(!LicenseKey::is_valid_format(key), "accepted {:?}", key);
        }
    }

    #[test]
    fn test_format_accepts_uppercase_hex() {
        assert!(LicenseKey::is_valid_format("FOOD-AAAA-BBBB-CCCC"));
        assert!(LicenseKey::is_valid_format("FOOD-0000-9F9F-A1B2"));
    }

    #[test]
    fn test_parse_and_serde() {
        let key: LicenseKey = "FOOD-AAAA-BBBB-CCCC".parse().unwrap();
        assert_eq!(key.to_string(), "FOOD-AAAA-BBBB-CCCC");

        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"FOOD-AAAA-BBBB-CCCC\"");

        let err = serde_json::from_str::<LicenseKey>("\"FOOD-aaaa-BBBB-CCCC\"");
        assert!(err.is_err());
        assert!(matches!(LicenseKey::parse("nope"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_expiry_adds_calendar_months() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let expiry = expiry_from_months(1, now).unwrap();
        assert_eq!(expiry, Utc.with_ymd_and_hms(2024, 4, 15, 10, 30, 0).unwrap());

        let expiry = expiry_from_months(12, now).unwrap();
        assert_eq!(expiry.year(), 2025);
        assert_eq!(expiry.month(), 3);
    }

    #[test]
    fn test_expiry_clamps_to_month_end() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let expiry = expiry_from_months(1, now).unwrap();
        assert_eq!(expiry, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap();
        let expiry = expiry_from_months(1, now).unwrap();
        assert_eq!(expiry.day(), 28);
    }

    #[test]
    fn test_expiry_zero_months_is_now() {
        let now = Utc::now();
        assert_eq!(expiry_from_months(0, now).unwrap(), now);
    }
}
