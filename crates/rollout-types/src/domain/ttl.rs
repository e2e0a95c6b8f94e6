use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Retention applied when no TTL is configured
pub const DEFAULT_TTL_DAYS: u32 = 60;

const PERMANENT: &str = "permanent";

/// Session retention policy.
///
/// Serialized as either a bare day count (`30`) or the string
/// `"permanent"`. Expiry is fixed at creation time and is not extended
/// when the session is written to or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlConfig {
    /// Session expires this many days after creation
    Days(u32),
    /// Session is never reaped
    Permanent,
}

impl Default for TtlConfig {
    fn default() -> Self {
        TtlConfig::Days(DEFAULT_TTL_DAYS)
    }
}

impl TtlConfig {
    /// Expiry instant for a session created at `created`, `None` if permanent.
    ///
    /// Fails with [`Error::TtlOutOfRange`] when the expiry would fall outside
    /// the representable date range.
    pub fn expires_at(&self, created: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        match self {
            TtlConfig::Days(days) => created
                .checked_add_signed(Duration::days(i64::from(*days)))
                .map(Some)
                .ok_or(Error::TtlOutOfRange(*days)),
            TtlConfig::Permanent => Ok(None),
        }
    }
}

impl fmt::Display for TtlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlConfig::Days(days) => write!(f, "{}", days),
            TtlConfig::Permanent => f.write_str(PERMANENT),
        }
    }
}

impl FromStr for TtlConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(PERMANENT) {
            return Ok(TtlConfig::Permanent);
        }
        trimmed
            .parse::<u32>()
            .map(TtlConfig::Days)
            .map_err(|_| Error::InvalidTtl(s.to_string()))
    }
}

impl Serialize for TtlConfig {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            TtlConfig::Days(days) => serializer.serialize_u32(*days),
            TtlConfig::Permanent => serializer.serialize_str(PERMANENT),
        }
    }
}

impl<'de> Deserialize<'de> for TtlConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Days(u32),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Days(days) => Ok(TtlConfig::Days(days)),
            Raw::Word(word) => word.parse().map_err(serde::de::Error::custom),
        }
    }
}
