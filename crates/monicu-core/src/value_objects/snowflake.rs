//! Snowflake ID - the platform's 64-bit unsigned identifier
//!
//! Structure:
//! - Bits 63-22: Timestamp (milliseconds since the platform epoch)
//! - Bits 21-17: Internal worker ID
//! - Bits 16-12: Internal process ID
//! - Bits 11-0:  Increment
//!
//! Snowflakes arrive as decimal strings. PostgreSQL has no unsigned 64-bit
//! integer, so they are stored in `BIGINT` columns by a bit-preserving cast.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Platform Snowflake ID (64-bit unsigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(u64);

impl Snowflake {
    /// Platform epoch: 2015-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: u64 = 1_420_070_400_000;

    /// Create a new Snowflake from a raw u64 value
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    #[inline]
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// Check if the Snowflake is zero (uninitialized)
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Bit-preserving conversion for `BIGINT` columns
    #[inline]
    pub const fn to_db(self) -> i64 {
        self.0 as i64
    }

    /// Inverse of [`Snowflake::to_db`]
    #[inline]
    pub const fn from_db(value: i64) -> Self {
        Self(value as u64)
    }

    /// Extract timestamp (milliseconds since Unix epoch)
    #[inline]
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 22) + Self::EPOCH
    }

    /// Convert timestamp to DateTime<Utc>
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.timestamp() as i64).unwrap_or_default()
    }

    /// Parse from the decimal string representation
    ///
    /// Empty strings are rejected: the platform sends `""` for ids that do not
    /// apply (e.g. the community of a direct message).
    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        if s.is_empty() {
            return Err(SnowflakeParseError::Empty);
        }
        s.parse::<u64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat)
    }
}

/// Error when parsing a Snowflake from string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("empty snowflake")]
    Empty,

    #[error("invalid snowflake format")]
    InvalidFormat,
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::str::FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snowflake::parse(s)
    }
}

// Serialize as string for JSON (JavaScript BigInt safety)
impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a snowflake ID")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Snowflake, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(Snowflake)
                    .map_err(|_| de::Error::custom("negative snowflake"))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Snowflake, E>
            where
                E: de::Error,
            {
                Ok(Snowflake(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Snowflake, E>
            where
                E: de::Error,
            {
                Snowflake::parse(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_creation() {
        let sf = Snowflake::new(123456789);
        assert_eq!(sf.into_inner(), 123456789);
    }

    #[test]
    fn test_snowflake_zero() {
        assert!(Snowflake::default().is_zero());
        assert!(!Snowflake::new(1).is_zero());
    }

    #[test]
    fn test_snowflake_parse() {
        let sf = Snowflake::parse("123456789").unwrap();
        assert_eq!(sf.into_inner(), 123456789);

        assert_eq!(Snowflake::parse(""), Err(SnowflakeParseError::Empty));
        assert_eq!(
            Snowflake::parse("invalid"),
            Err(SnowflakeParseError::InvalidFormat)
        );
        assert!(Snowflake::parse("-5").is_err());
    }

    #[test]
    fn test_full_unsigned_range_survives_db_cast() {
        let sf = Snowflake::new(u64::MAX - 7);
        assert!(sf.to_db() < 0);
        assert_eq!(Snowflake::from_db(sf.to_db()), sf);
    }

    #[test]
    fn test_snowflake_serialize_json() {
        let sf = Snowflake::new(175928847299117063);
        let json = serde_json::to_string(&sf).unwrap();
        assert_eq!(json, "\"175928847299117063\"");
    }

    #[test]
    fn test_snowflake_deserialize() {
        let sf: Snowflake = serde_json::from_str("\"175928847299117063\"").unwrap();
        assert_eq!(sf.into_inner(), 175928847299117063);

        let sf: Snowflake = serde_json::from_str("12345").unwrap();
        assert_eq!(sf.into_inner(), 12345);

        assert!(serde_json::from_str::<Snowflake>("\"\"").is_err());
        assert!(serde_json::from_str::<Snowflake>("-1").is_err());
    }

    #[test]
    fn test_created_at() {
        // 2016-04-30 11:18:25.796 UTC
        let sf = Snowflake::new(175928847299117063);
        assert_eq!(sf.timestamp(), 1462015105796);
        assert_eq!(sf.created_at().timestamp_millis(), 1462015105796);
    }
}
