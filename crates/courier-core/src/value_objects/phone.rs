//! Customer phone number in the digits-only form used by the messaging provider

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized customer phone number (digits only, international format)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const MIN_DIGITS: usize = 10;
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// Formatting characters are stripped. A domestic 11-digit number with a
    /// leading `8` is rewritten to the `7` country code.
    pub fn parse(raw: &str) -> Result<Self, PhoneParseError> {
        let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PhoneParseError::Empty);
        }

        if digits.len() == 11 && digits.starts_with('8') {
            digits.replace_range(0..1, "7");
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneParseError::InvalidLength(digits.len()));
        }

        Ok(Self(digits))
    }

    /// Digits-only representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error when parsing a phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhoneParseError {
    #[error("phone number is empty")]
    Empty,

    #[error("phone number has {0} digits")]
    InvalidLength(usize),
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
