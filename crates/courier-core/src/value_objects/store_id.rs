//! Store identifier - the unit of session and settings isolation

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier of a merchant store (tenant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StoreId(i64);

impl StoreId {
    /// Create a new StoreId from a raw i64 value
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Result<Self, StoreIdParseError> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(StoreId(id)),
            _ => Err(StoreIdParseError::InvalidFormat),
        }
    }
}

/// Error when parsing a StoreId from string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreIdParseError {
    #[error("invalid store id format")]
    InvalidFormat,
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StoreId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<StoreId> for i64 {
    fn from(id: StoreId) -> Self {
        id.0
    }
}

impl std::str::FromStr for StoreId {
    type Err = StoreIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreId::parse(s)
    }
}

// Serialize as string for JSON (JavaScript BigInt safety)
impl Serialize for StoreId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for StoreId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct StoreIdVisitor;

        impl Visitor<'_> for StoreIdVisitor {
            type Value = StoreId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a store id")
            }

            fn visit_i64<E>(self, value: i64) -> Result<StoreId, E>
            where
                E: de::Error,
            {
                Ok(StoreId(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<StoreId, E>
            where
                E: de::Error,
            {
                i64::try_from(value)
                    .map(StoreId)
                    .map_err(|_| E::custom("store id out of range"))
            }

            fn visit_str<E>(self, value: &str) -> Result<StoreId, E>
            where
                E: de::Error,
            {
                StoreId::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(StoreIdVisitor)
    }
}
