use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use rollout_types::{SessionId, from_millis, to_millis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const CURSOR_VERSION: u8 = 1;

/// Pagination cursor identifying a session by `(updated, id)`.
///
/// The token is base64url(JSON) with an explicit version field, so it does
/// not depend on the store's native key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    ts: DateTime<Utc>,
    id: SessionId,
}

#[derive(Serialize, Deserialize)]
struct CursorToken {
    v: u8,
    ts: i64,
    id: SessionId,
}

impl Cursor {
    pub fn new(ts: DateTime<Utc>, id: SessionId) -> Self {
        // Truncate to the index's millisecond resolution
        Self {
            ts: from_millis(to_millis(ts)),
            id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn timestamp_millis(&self) -> i64 {
        to_millis(self.ts)
    }

    /// Serialize to an opaque token string
    pub fn encode(&self) -> String {
        let token = CursorToken {
            v: CURSOR_VERSION,
            ts: to_millis(self.ts),
            id: self.id,
        };
        // Serializing a plain struct of integers and a string cannot fail
        let json = serde_json::to_vec(&token).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Parse a token produced by [`Cursor::encode`]
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = || Error::InvalidCursor(token.to_string());

        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| invalid())?;
        let decoded: CursorToken = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
        if decoded.v != CURSOR_VERSION {
            return Err(invalid());
        }

        let ts = Utc
            .timestamp_millis_opt(decoded.ts)
            .single()
            .ok_or_else(invalid)?;

        Ok(Self { ts, id: decoded.id })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Cursor {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Cursor {
        let ts = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let id = SessionId::parse("5973b6c0-94b8-487b-a530-2aeb6098ae0e").unwrap();
        Cursor::new(ts, id)
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let cursor = sample();
        let token = cursor.encode();
        assert!(!token.contains('='));
        assert_eq!(Cursor::parse(&token).unwrap(), cursor);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for token in ["", "not base64!", "e30", "eyJ2IjoyfQ"] {
            assert!(
                matches!(Cursor::parse(token), Err(Error::InvalidCursor(_))),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range_timestamp() {
        for ts in [i64::MAX, i64::MIN] {
            let json =
                format!(r#"{{"v":1,"ts":{ts},"id":"5973b6c0-94b8-487b-a530-2aeb6098ae0e"}}"#);
            let token = URL_SAFE_NO_PAD.encode(json);
            assert!(
                matches!(Cursor::parse(&token), Err(Error::InvalidCursor(_))),
                "ts {ts} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_future_version() {
        let json = br#"{"v":2,"ts":0,"id":"5973b6c0-94b8-487b-a530-2aeb6098ae0e"}"#;
        let token = URL_SAFE_NO_PAD.encode(json);
        assert!(matches!(Cursor::parse(&token), Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn test_serde_as_token_string() {
        let cursor = sample();
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, format!("\"{}\"", cursor.encode()));
        let back: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);
    }
}
